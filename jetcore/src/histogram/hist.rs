//! Dense weighted histograms of one to three dimensions.

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::histogram::axis::Axis;

#[derive(Debug, Error, PartialEq)]
pub enum HistogramError {
    #[error("histogram {name}: expected {expected} coordinates, got {got}")]
    DimensionMismatch { name: String, expected: usize, got: usize },
    #[error("histogram {name}: incompatible binning, cannot merge")]
    IncompatibleAxes { name: String },
    #[error("histogram {name}: {got} stored cells, binning requires {expected}")]
    CorruptStorage { name: String, expected: usize, got: usize },
    #[error("histogram {name}: unsupported dimension {dim}")]
    UnsupportedDimension { name: String, dim: usize },
}

/// Weighted histogram with under- and overflow cells on every axis.
///
/// The cell layout is the usual global-bin ordering with the first axis running fastest.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Histogram {
    pub name: String,
    #[serde(default)]
    pub title: String,
    pub axes: Vec<Axis>,
    pub contents: Vec<f64>,
    #[serde(default)]
    pub sumw2: Vec<f64>,
    #[serde(default)]
    pub entries: u64,
}

impl Histogram {
    pub fn new(name: &str, title: &str, axes: Vec<Axis>) -> Self {
        let n_cells = axes.iter().map(Axis::n_cells).product();
        Histogram {
            name: name.to_string(),
            title: title.to_string(),
            axes,
            contents: vec![0.0; n_cells],
            sumw2: vec![0.0; n_cells],
            entries: 0,
        }
    }

    pub fn new_1d(name: &str, title: &str, x: Axis) -> Self {
        Histogram::new(name, title, vec![x])
    }

    pub fn new_2d(name: &str, title: &str, x: Axis, y: Axis) -> Self {
        Histogram::new(name, title, vec![x, y])
    }

    pub fn new_3d(name: &str, title: &str, x: Axis, y: Axis, z: Axis) -> Self {
        Histogram::new(name, title, vec![x, y, z])
    }

    pub fn dim(&self) -> usize {
        self.axes.len()
    }

    /// Checks that a deserialized histogram is self-consistent.
    pub fn validate(&self) -> Result<(), HistogramError> {
        if self.axes.is_empty() || self.axes.len() > 3 {
            return Err(HistogramError::UnsupportedDimension {
                name: self.name.clone(),
                dim: self.axes.len(),
            });
        }
        let expected: usize = self.axes.iter().map(Axis::n_cells).product();
        if self.contents.len() != expected {
            return Err(HistogramError::CorruptStorage {
                name: self.name.clone(),
                expected,
                got: self.contents.len(),
            });
        }
        Ok(())
    }

    /// Global cell index of a tuple of per-axis bins.
    pub fn global_bin(&self, bins: &[usize]) -> usize {
        let mut global = 0;
        let mut stride = 1;
        for (axis, &bin) in self.axes.iter().zip(bins) {
            global += bin.min(axis.nbins + 1) * stride;
            stride *= axis.n_cells();
        }
        global
    }

    fn find_global_bin(&self, values: &[f64]) -> usize {
        let bins: Vec<usize> = self.axes.iter().zip(values).map(|(a, &v)| a.find_bin(v)).collect();
        self.global_bin(&bins)
    }

    /// Adds `weight` at the given coordinates, one per axis.
    pub fn fill(&mut self, values: &[f64], weight: f64) -> Result<(), HistogramError> {
        if values.len() != self.dim() {
            return Err(HistogramError::DimensionMismatch {
                name: self.name.clone(),
                expected: self.dim(),
                got: values.len(),
            });
        }
        let global = self.find_global_bin(values);
        self.contents[global] += weight;
        if self.sumw2.len() == self.contents.len() {
            self.sumw2[global] += weight * weight;
        }
        self.entries += 1;
        Ok(())
    }

    pub fn bin_content(&self, bins: &[usize]) -> f64 {
        self.contents.get(self.global_bin(bins)).copied().unwrap_or(0.0)
    }

    /// Content of the cell containing the given coordinates.
    pub fn content_at(&self, values: &[f64]) -> f64 {
        self.contents.get(self.find_global_bin(values)).copied().unwrap_or(0.0)
    }

    /// Sum of the regular cells, flows excluded.
    pub fn integral(&self) -> f64 {
        let shape: Vec<usize> = self.axes.iter().map(Axis::n_cells).collect();
        self.contents
            .iter()
            .enumerate()
            .filter(|(global, _)| {
                let mut rest = *global;
                shape.iter().zip(&self.axes).all(|(&n, axis)| {
                    let bin = rest % n;
                    rest /= n;
                    axis.in_range(bin)
                })
            })
            .map(|(_, c)| c)
            .sum()
    }

    /// Projection of a 2D histogram onto its second axis for a single bin of the first.
    ///
    /// Returns `None` for non-2D histograms or for an x bin outside the regular range.
    pub fn project_y(&self, bin_x: usize) -> Option<Histogram> {
        if self.dim() != 2 || !self.axes[0].in_range(bin_x) {
            return None;
        }
        let y_axis = self.axes[1].clone();
        let mut projection = Histogram::new_1d(&format!("{}_py", self.name), &self.title, y_axis);
        for bin_y in 0..projection.axes[0].n_cells() {
            let global = self.global_bin(&[bin_x, bin_y]);
            projection.contents[bin_y] = self.contents[global];
            if let Some(w2) = self.sumw2.get(global) {
                projection.sumw2[bin_y] = *w2;
            }
        }
        projection.entries = projection.contents.iter().filter(|c| **c != 0.0).count() as u64;
        Some(projection)
    }

    /// Draws a random value distributed like the contents of a 1D histogram,
    /// uniformly within the selected bin.
    ///
    /// Returns `None` when the histogram is not 1D or has no positive integral.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<f64> {
        if self.dim() != 1 {
            return None;
        }
        let axis = &self.axes[0];

        let mut cumulative = Vec::with_capacity(axis.nbins + 1);
        cumulative.push(0.0);
        let mut running = 0.0;
        for bin in 1..=axis.nbins {
            running += self.contents[bin];
            cumulative.push(running);
        }
        if running <= 0.0 {
            return None;
        }
        for c in cumulative.iter_mut() {
            *c /= running;
        }

        let r: f64 = rng.gen();
        // last edge not above r
        let idx = cumulative.partition_point(|c| *c <= r).saturating_sub(1).min(axis.nbins - 1);
        let mut x = axis.bin_low_edge(idx + 1);
        let step = cumulative[idx + 1] - cumulative[idx];
        if step > 0.0 {
            x += axis.bin_width() * (r - cumulative[idx]) / step;
        }
        Some(x)
    }

    /// Adds another histogram with identical binning.
    pub fn merge(&mut self, other: &Histogram) -> Result<(), HistogramError> {
        if self.axes.len() != other.axes.len()
            || self
                .axes
                .iter()
                .zip(&other.axes)
                .any(|(a, b)| a.nbins != b.nbins || a.min != b.min || a.max != b.max)
        {
            return Err(HistogramError::IncompatibleAxes { name: self.name.clone() });
        }
        for (a, b) in self.contents.iter_mut().zip(&other.contents) {
            *a += b;
        }
        if self.sumw2.len() == other.sumw2.len() {
            for (a, b) in self.sumw2.iter_mut().zip(&other.sumw2) {
                *a += b;
            }
        }
        self.entries += other.entries;
        Ok(())
    }
}
