//! Track quality selections.

use serde::{Deserialize, Serialize};

use crate::data::track::{Species, TrackView};
use crate::selection::systematics::SystematicCutSet;

// ---------------------------------------------------------------------------
// Jet-reconstruction input. Fixed, so jets do not move with the physics cuts.
// ---------------------------------------------------------------------------

const JET_MIN_TPC_CROSSED_ROWS: i32 = 70;
const JET_MIN_CROSSED_ROWS_OVER_FINDABLE: f64 = 0.8;
const JET_MAX_CHI2_TPC: f64 = 4.0;
const JET_MAX_CHI2_ITS: f64 = 36.0;
const JET_MAX_ABS_ETA: f64 = 0.8;
const JET_MIN_PT: f64 = 0.1;
const JET_DCA_XY_PAR0: f64 = 0.0105;
const JET_DCA_XY_PAR1: f64 = 0.035;
const JET_DCA_XY_PAR2: f64 = 1.1;
const JET_MAX_DCA_Z: f64 = 2.0;

/// Selection of the tracks that enter the jet finder.
pub fn passed_jet_reconstruction<T: TrackView + ?Sized>(track: &T) -> bool {
    if !track.has_its() {
        return false;
    }
    if !(1..=3).any(|layer| track.has_its_hit(layer)) {
        return false;
    }
    if !track.has_tpc() {
        return false;
    }
    if track.tpc_n_cls_crossed_rows() < JET_MIN_TPC_CROSSED_ROWS {
        return false;
    }
    if track.tpc_crossed_rows_over_findable() < JET_MIN_CROSSED_ROWS_OVER_FINDABLE {
        return false;
    }
    if track.tpc_chi2_ncl() > JET_MAX_CHI2_TPC || track.its_chi2_ncl() > JET_MAX_CHI2_ITS {
        return false;
    }
    let eta = track.eta();
    if !(-JET_MAX_ABS_ETA..=JET_MAX_ABS_ETA).contains(&eta) {
        return false;
    }
    let pt = track.pt();
    if pt < JET_MIN_PT {
        return false;
    }
    if track.dca_xy().abs() > JET_DCA_XY_PAR0 + JET_DCA_XY_PAR1 / pt.powf(JET_DCA_XY_PAR2) {
        return false;
    }
    track.dca_z().abs() <= JET_MAX_DCA_Z
}

// ---------------------------------------------------------------------------
// Physics selection
// ---------------------------------------------------------------------------

/// Configurable selection of the tracks examined for nuclei.
///
/// The DCA limits are kept apart from [`TrackCuts::passes`] because the DCA control
/// distributions are recorded before they are applied.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackCuts {
    pub require_pv_contributor: bool,
    pub min_its_nclusters: u8,
    pub min_tpc_ncrossed_rows: i32,
    pub min_tpc_ncrossed_rows_over_findable: f64,
    pub max_chi_square_tpc: f64,
    pub max_chi_square_its: f64,
    pub min_pt: f64,
    pub min_eta: f64,
    pub max_eta: f64,
    pub max_dca_xy: f64,
    pub max_dca_z: f64,
}

impl Default for TrackCuts {
    fn default() -> Self {
        Self {
            require_pv_contributor: false,
            min_its_nclusters: 5,
            min_tpc_ncrossed_rows: 80,
            min_tpc_ncrossed_rows_over_findable: 0.8,
            max_chi_square_tpc: 4.0,
            max_chi_square_its: 36.0,
            min_pt: 0.3,
            min_eta: -0.8,
            max_eta: 0.8,
            max_dca_xy: 0.05,
            max_dca_z: 0.05,
        }
    }
}

impl TrackCuts {
    /// Copy of these cuts with the ITS, TPC and DCA limits of a systematic variation.
    pub fn with_variation(&self, variation: &SystematicCutSet) -> Self {
        Self {
            min_its_nclusters: variation.min_its_nclusters,
            min_tpc_ncrossed_rows: variation.min_tpc_ncrossed_rows,
            max_dca_xy: variation.max_dca_xy,
            max_dca_z: variation.max_dca_z,
            ..self.clone()
        }
    }

    pub fn passes<T: TrackView + ?Sized>(&self, track: &T) -> bool {
        if self.require_pv_contributor && !track.is_pv_contributor() {
            return false;
        }
        if !track.has_its() || track.its_n_cls() < self.min_its_nclusters {
            return false;
        }
        if !track.has_tpc() || track.tpc_n_cls_crossed_rows() < self.min_tpc_ncrossed_rows {
            return false;
        }
        if track.tpc_crossed_rows_over_findable() < self.min_tpc_ncrossed_rows_over_findable {
            return false;
        }
        if track.tpc_chi2_ncl() > self.max_chi_square_tpc || track.its_chi2_ncl() > self.max_chi_square_its {
            return false;
        }
        if !self.eta_accepted(track.eta()) {
            return false;
        }
        track.pt() >= self.min_pt
    }

    pub fn passes_dca<T: TrackView + ?Sized>(&self, track: &T) -> bool {
        track.dca_xy().abs() <= self.max_dca_xy && track.dca_z().abs() <= self.max_dca_z
    }

    /// Full selection, quality and DCA.
    pub fn passes_all<T: TrackView + ?Sized>(&self, track: &T) -> bool {
        self.passes(track) && self.passes_dca(track)
    }

    pub fn eta_accepted(&self, eta: f64) -> bool {
        eta >= self.min_eta && eta <= self.max_eta
    }
}

// ---------------------------------------------------------------------------
// Significance windows
// ---------------------------------------------------------------------------

/// Open interval on a detector significance.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NSigmaWindow {
    pub min: f64,
    pub max: f64,
}

impl NSigmaWindow {
    pub fn new(min: f64, max: f64) -> Self {
        NSigmaWindow { min, max }
    }

    pub fn contains(&self, n_sigma: f64) -> bool {
        n_sigma > self.min && n_sigma < self.max
    }
}

const HIGH_PURITY_PT_THRESHOLD: f64 = 0.5;
const HIGH_PURITY_MAX_N_SIGMA: f64 = 2.0;

/// Clean proton-like sample used for the DCA control distributions. The charge
/// sign is not part of this predicate.
pub fn is_high_purity_antiproton<T: TrackView + ?Sized>(track: &T) -> bool {
    let tpc = track.tpc_n_sigma(Species::Proton).abs() < HIGH_PURITY_MAX_N_SIGMA;
    if track.pt() < HIGH_PURITY_PT_THRESHOLD {
        return tpc;
    }
    tpc && track.has_tof() && track.tof_n_sigma(Species::Proton).abs() < HIGH_PURITY_MAX_N_SIGMA
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::track::{SpeciesValues, Track};

    fn good_track(pt: f64) -> Track {
        Track::from_pt_eta_phi(pt, 0.1, 1.0, -1)
    }

    #[test]
    fn test_jet_reconstruction_filter() {
        assert!(passed_jet_reconstruction(&good_track(0.5)));

        let mut no_inner_hit = good_track(0.5);
        no_inner_hit.its_cluster_sizes = [0, 0, 0, 3, 3, 3, 3];
        assert!(!passed_jet_reconstruction(&no_inner_hit));

        assert!(!passed_jet_reconstruction(&good_track(0.05)));
        assert!(!passed_jet_reconstruction(&Track::from_pt_eta_phi(1.0, 0.85, 0.0, 1)));

        // pt dependent DCA_xy limit: 0.0105 + 0.035 / 1 at pt = 1
        let mut displaced = good_track(1.0);
        displaced.dca_xy = 0.045;
        assert!(passed_jet_reconstruction(&displaced));
        displaced.dca_xy = 0.047;
        assert!(!passed_jet_reconstruction(&displaced));

        let mut far_z = good_track(1.0);
        far_z.dca_z = 2.5;
        assert!(!passed_jet_reconstruction(&far_z));
    }

    #[test]
    fn test_physics_selection() {
        let cuts = TrackCuts::default();
        assert!(cuts.passes(&good_track(1.0)));
        assert!(!cuts.passes(&good_track(0.2)));

        let mut few_clusters = good_track(1.0);
        few_clusters.its_cluster_sizes = [3, 3, 3, 3, 0, 0, 0];
        assert!(!cuts.passes(&few_clusters));

        let mut rows = good_track(1.0);
        rows.tpc_n_cls_crossed_rows = 79;
        assert!(!cuts.passes(&rows));

        let pv_cuts = TrackCuts { require_pv_contributor: true, ..TrackCuts::default() };
        let mut secondary = good_track(1.0);
        secondary.is_pv_contributor = false;
        assert!(cuts.passes(&secondary));
        assert!(!pv_cuts.passes(&secondary));
    }

    #[test]
    fn test_dca_step_is_separate() {
        let cuts = TrackCuts::default();
        let mut track = good_track(1.0);
        track.dca_xy = 0.2;
        assert!(cuts.passes(&track));
        assert!(!cuts.passes_dca(&track));
        assert!(!cuts.passes_all(&track));
    }

    #[test]
    fn test_variation_overrides_limits() {
        let variation = SystematicCutSet::new("loose", 3, 90, 0.15, 0.18);
        let cuts = TrackCuts::default().with_variation(&variation);
        assert_eq!(cuts.min_its_nclusters, 3);
        assert_eq!(cuts.min_tpc_ncrossed_rows, 90);
        assert_eq!(cuts.max_dca_z, 0.18);
        assert_eq!(cuts.min_pt, 0.3);
    }

    #[test]
    fn test_window_is_open() {
        let window = NSigmaWindow::new(-3.0, 3.0);
        assert!(window.contains(2.99));
        assert!(!window.contains(3.0));
        assert!(!window.contains(-3.0));
    }

    #[test]
    fn test_high_purity_antiproton() {
        let mut low = good_track(0.4);
        low.tpc_n_sigma = SpeciesValues::new(1.5, 0.0, 0.0);
        assert!(is_high_purity_antiproton(&low));

        let mut high = good_track(0.8);
        high.tpc_n_sigma = SpeciesValues::new(1.5, 0.0, 0.0);
        assert!(!is_high_purity_antiproton(&high));
        high.has_tof = true;
        high.tof_n_sigma = SpeciesValues::new(-1.0, 0.0, 0.0);
        assert!(is_high_purity_antiproton(&high));
        high.tof_n_sigma = SpeciesValues::new(-2.5, 0.0, 0.0);
        assert!(!is_high_purity_antiproton(&high));
    }
}
