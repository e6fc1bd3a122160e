use serde::{Deserialize, Serialize};

/// Fixed-width binning over `[min, max)`.
///
/// Bin numbering follows the usual convention: bin 0 is the underflow, bins
/// `1..=nbins` are regular and bin `nbins + 1` is the overflow.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Axis {
    pub nbins: usize,
    pub min: f64,
    pub max: f64,
    #[serde(default)]
    pub title: String,
}

impl Axis {
    /// Creates a new `Axis`.
    ///
    /// # Arguments
    ///
    /// * `nbins` - number of regular bins, at least one.
    /// * `min`, `max` - lower and upper edge of the axis.
    /// * `title` - axis label, e.g. `"#it{p}_{T} (GeV/#it{c})"`.
    ///
    /// # Examples
    ///
    /// ```
    /// use jetcore::histogram::axis::Axis;
    ///
    /// let axis = Axis::new(10, 0.0, 10.0, "x");
    /// assert_eq!(axis.find_bin(0.5), 1);
    /// assert_eq!(axis.find_bin(-1.0), 0);
    /// assert_eq!(axis.find_bin(10.0), 11);
    /// ```
    pub fn new(nbins: usize, min: f64, max: f64, title: &str) -> Self {
        Axis {
            nbins: nbins.max(1),
            min,
            max,
            title: title.to_string(),
        }
    }

    /// Number of bins including under- and overflow.
    pub fn n_cells(&self) -> usize {
        self.nbins + 2
    }

    pub fn bin_width(&self) -> f64 {
        (self.max - self.min) / self.nbins as f64
    }

    pub fn find_bin(&self, value: f64) -> usize {
        if value.is_nan() || value < self.min {
            return 0;
        }
        if value >= self.max {
            return self.nbins + 1;
        }
        let bin = ((value - self.min) / self.bin_width()) as usize + 1;
        // rounding at the upper edge
        bin.min(self.nbins)
    }

    pub fn bin_low_edge(&self, bin: usize) -> f64 {
        self.min + (bin as f64 - 1.0) * self.bin_width()
    }

    pub fn bin_up_edge(&self, bin: usize) -> f64 {
        self.min + bin as f64 * self.bin_width()
    }

    pub fn bin_center(&self, bin: usize) -> f64 {
        self.min + (bin as f64 - 0.5) * self.bin_width()
    }

    /// True if `bin` is a regular bin.
    pub fn in_range(&self, bin: usize) -> bool {
        (1..=self.nbins).contains(&bin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edges_and_centers() {
        let axis = Axis::new(4, -2.0, 2.0, "");
        assert_eq!(axis.bin_width(), 1.0);
        assert_eq!(axis.bin_low_edge(1), -2.0);
        assert_eq!(axis.bin_up_edge(4), 2.0);
        assert_eq!(axis.bin_center(2), -0.5);
        assert_eq!(axis.find_bin(-0.5), 2);
        assert_eq!(axis.find_bin(f64::NAN), 0);
        assert!(axis.in_range(4));
        assert!(!axis.in_range(5));
    }
}
