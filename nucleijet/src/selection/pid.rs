//! Particle identification with the ITS cluster size.

use serde::{Deserialize, Serialize};
use statrs::function::erf::erf;

use crate::data::track::{Species, SpeciesValues, TrackView};
use crate::selection::filter::{is_high_purity_antiproton, NSigmaWindow};

/// Expected detector response for a species hypothesis, expressed as a significance.
pub trait ItsResponse: Send + Sync {
    fn n_sigma(&self, track: &dyn TrackView, species: Species) -> f64;
}

/// Parameters of the cluster-size response for one charge class.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResponseParams {
    /// `p0 / bg^p1 + p2`
    pub signal: [f64; 3],
    /// Relative resolution `p0 * erf((bg - p1) / p2)`.
    pub resolution: [f64; 3],
}

impl ResponseParams {
    pub fn expected_signal(&self, bg: f64) -> f64 {
        let [p0, p1, p2] = self.signal;
        p0 / bg.powf(p1) + p2
    }

    pub fn relative_resolution(&self, bg: f64) -> f64 {
        let [p0, p1, p2] = self.resolution;
        p0 * erf((bg - p1) / p2)
    }
}

/// Truncated-mean cluster size versus βγ, one parameter set for singly and one for
/// doubly charged species.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterSizeResponse {
    pub z1: ResponseParams,
    pub z2: ResponseParams,
}

impl Default for ClusterSizeResponse {
    fn default() -> Self {
        Self {
            z1: ResponseParams {
                signal: [1.18941, 1.53792, 1.69961],
                resolution: [1.94669e-01, -2.08616e-01, 1.30753],
            },
            z2: ResponseParams {
                signal: [2.35117, 1.80347, 5.14355],
                resolution: [8.74371e-02, -1.82804, 5.06449e-01],
            },
        }
    }
}

impl ClusterSizeResponse {
    fn params(&self, species: Species) -> &ResponseParams {
        if species.charge() > 1.0 { &self.z2 } else { &self.z1 }
    }

    /// Mean cluster size over the layers with a hit.
    pub fn average_cluster_size(track: &dyn TrackView) -> f64 {
        let sizes = track.its_cluster_sizes();
        let (sum, hits) = sizes
            .iter()
            .filter(|size| **size > 0)
            .fold((0u32, 0u32), |(sum, hits), size| (sum + *size as u32, hits + 1));
        if hits == 0 { 0.0 } else { sum as f64 / hits as f64 }
    }
}

impl ItsResponse for ClusterSizeResponse {
    fn n_sigma(&self, track: &dyn TrackView, species: Species) -> f64 {
        let params = self.params(species);
        let bg = track.p() * species.charge() / species.mass();
        let expected = params.expected_signal(bg);
        let resolution = params.relative_resolution(bg) * expected;
        if resolution == 0.0 || !resolution.is_finite() {
            return f64::NAN;
        }
        let cos_lambda = 1.0 / (1.0 + track.tgl() * track.tgl()).sqrt();
        (Self::average_cluster_size(track) * cos_lambda - expected) / resolution
    }
}

/// Independent PID outcome per species.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct SpeciesPidFlags {
    pub proton: bool,
    pub deuteron: bool,
    pub helium: bool,
}

impl SpeciesPidFlags {
    pub fn all() -> Self {
        SpeciesPidFlags { proton: true, deuteron: true, helium: true }
    }

    pub fn get(&self, species: Species) -> bool {
        match species {
            Species::Proton => self.proton,
            Species::Deuteron => self.deuteron,
            Species::Helium3 => self.helium,
        }
    }
}

/// Window on the ITS significance, disabled above a per-species pt ceiling.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ItsPidSelector {
    pub apply: bool,
    pub window: NSigmaWindow,
    /// Above this pt (2 pt for helium-3) the cluster size no longer separates species.
    pub pt_max: SpeciesValues,
}

impl Default for ItsPidSelector {
    fn default() -> Self {
        Self {
            apply: true,
            window: NSigmaWindow::new(-2.0, 2.0),
            pt_max: SpeciesValues::uniform(1.0),
        }
    }
}

impl ItsPidSelector {
    pub fn passes(&self, track: &dyn TrackView, species: Species, response: &dyn ItsResponse) -> bool {
        if !self.apply {
            return true;
        }
        let pt = match species {
            Species::Helium3 => 2.0 * track.pt(),
            _ => track.pt(),
        };
        if pt > self.pt_max.get(species) {
            return true;
        }
        self.window.contains(response.n_sigma(track, species))
    }

    pub fn flags(&self, track: &dyn TrackView, response: &dyn ItsResponse) -> SpeciesPidFlags {
        SpeciesPidFlags {
            proton: self.passes(track, Species::Proton, response),
            deuteron: self.passes(track, Species::Deuteron, response),
            helium: self.passes(track, Species::Helium3, response),
        }
    }
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct TrackClassification {
    pub pid: SpeciesPidFlags,
    /// Negative track in the clean antiproton sample.
    pub high_purity_antiproton: bool,
}

pub fn classify_track(track: &dyn TrackView, selector: &ItsPidSelector, response: &dyn ItsResponse) -> TrackClassification {
    TrackClassification {
        pid: selector.flags(track, response),
        high_purity_antiproton: track.sign() < 0 && is_high_purity_antiproton(track),
    }
}
