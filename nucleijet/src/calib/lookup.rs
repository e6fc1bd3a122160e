//! Correction lookups built from calibration histograms.

use std::sync::atomic::{AtomicBool, Ordering};

use jetcore::histogram::hist::Histogram;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::calib::store::{CalibrationError, CalibrationStore};

/// Where the calibration objects live and which ones to use.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    pub apply_reweighting: bool,
    pub url_to_ccdb: String,
    pub path_to_file: String,
    pub histo_name_weight_antip_jet: String,
    pub histo_name_weight_antip_ue: String,
    pub apply_pt_unfolding: bool,
    pub url_to_ccdb_pt_unfolding: String,
    pub path_to_file_pt_unfolding: String,
    pub histo_name_pt_unfolding: String,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            apply_reweighting: true,
            url_to_ccdb: "file://ccdb".to_string(),
            path_to_file: String::new(),
            histo_name_weight_antip_jet: String::new(),
            histo_name_weight_antip_ue: String::new(),
            apply_pt_unfolding: true,
            url_to_ccdb_pt_unfolding: "file://ccdb".to_string(),
            path_to_file_pt_unfolding: "Users/c/chpinto/My/Object/ResponseMatrix".to_string(),
            histo_name_pt_unfolding: "detectorResponseMatrix".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Jet pt unfolding
// ---------------------------------------------------------------------------

/// Stochastic jet-pt correction drawn from a detector response matrix with
/// x = reconstructed pt and y = generated minus reconstructed pt.
///
/// Never fails: without a usable table the reconstructed pt is returned.
#[derive(Debug, Default)]
pub struct PtUnfolding {
    response: Option<Histogram>,
    reported_missing: AtomicBool,
    reported_out_of_range: AtomicBool,
}

impl PtUnfolding {
    pub fn new(response: Histogram) -> Self {
        PtUnfolding { response: Some(response), ..Self::default() }
    }

    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self) -> bool {
        self.response.is_some()
    }

    /// Reconstructed pt plus a shift drawn from the response column of `pt_rec`.
    ///
    /// A column counts as empty when its integral is not positive, not when it has no
    /// entries; the two only differ for columns whose negative weights cancel.
    pub fn corrected_pt<R: Rng + ?Sized>(&self, pt_rec: f64, rng: &mut R) -> f64 {
        let Some(response) = &self.response else {
            if !self.reported_missing.swap(true, Ordering::Relaxed) {
                log::error!("response matrix is not available, returning uncorrected jet pt");
            }
            return pt_rec;
        };

        let bin_x = response.axes[0].find_bin(pt_rec);
        let Some(projection) = response.project_y(bin_x) else {
            if !self.reported_out_of_range.swap(true, Ordering::Relaxed) {
                log::error!("jet pt {} outside the response matrix (bin {}), returning uncorrected pt", pt_rec, bin_x);
            }
            return pt_rec;
        };

        match projection.sample(rng) {
            Some(delta_pt) => pt_rec + delta_pt,
            None => pt_rec,
        }
    }
}

// ---------------------------------------------------------------------------
// Antiproton reweighting
// ---------------------------------------------------------------------------

/// (pt, eta) weights for generated antiprotons in jets and in the underlying event.
#[derive(Clone, Debug, Default)]
pub struct ReweightingTables {
    pub jet: Option<Histogram>,
    pub ue: Option<Histogram>,
}

impl ReweightingTables {
    pub fn is_enabled(&self) -> bool {
        self.jet.is_some() && self.ue.is_some()
    }

    pub fn jet_weight(&self, pt: f64, eta: f64) -> f64 {
        Self::weight(self.jet.as_ref(), pt, eta)
    }

    pub fn ue_weight(&self, pt: f64, eta: f64) -> f64 {
        Self::weight(self.ue.as_ref(), pt, eta)
    }

    /// Table content at (pt, eta); 1 without a table or outside its regular bins.
    fn weight(table: Option<&Histogram>, pt: f64, eta: f64) -> f64 {
        let Some(table) = table else {
            return 1.0;
        };
        let covered = table
            .axes
            .iter()
            .zip([pt, eta])
            .all(|(axis, value)| axis.in_range(axis.find_bin(value)));
        if !covered {
            return 1.0;
        }
        table.content_at(&[pt, eta])
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// All correction objects, fetched once before processing and shared read-only.
#[derive(Debug, Default)]
pub struct Calibrations {
    pub unfolding: PtUnfolding,
    pub reweighting: ReweightingTables,
}

fn fetch_2d(store: &dyn CalibrationStore, path: &str, name: &str) -> Result<Histogram, CalibrationError> {
    let histogram = store.fetch(path, name)?;
    if histogram.dim() != 2 {
        return Err(CalibrationError::WrongDimension {
            name: name.to_string(),
            expected: 2,
            got: histogram.dim(),
        });
    }
    Ok(histogram)
}

impl Calibrations {
    pub fn none() -> Self {
        Self::default()
    }

    /// Fetches the enabled objects. A failed fetch is logged and disables the feature.
    ///
    /// `unfolding_store` serves the response matrix and `weights_store` the reweighting
    /// tables, as the two may live at different locations.
    pub fn load(
        config: &CalibrationConfig,
        weights_store: Option<&dyn CalibrationStore>,
        unfolding_store: Option<&dyn CalibrationStore>,
    ) -> Self {
        let mut calibrations = Calibrations::none();

        if config.apply_reweighting {
            if let Some(store) = weights_store {
                calibrations.reweighting = Self::load_reweighting(config, store);
            }
        }

        if config.apply_pt_unfolding {
            if let Some(store) = unfolding_store {
                match fetch_2d(store, &config.path_to_file_pt_unfolding, &config.histo_name_pt_unfolding) {
                    Ok(response) => {
                        log::info!("opened histogram {}", config.histo_name_pt_unfolding);
                        calibrations.unfolding = PtUnfolding::new(response);
                    }
                    Err(e) => log::error!("jet pt unfolding disabled: {}", e),
                }
            }
        }

        calibrations
    }

    fn load_reweighting(config: &CalibrationConfig, store: &dyn CalibrationStore) -> ReweightingTables {
        let jet_name = format!("{}_antiproton", config.histo_name_weight_antip_jet);
        let ue_name = format!("{}_antiproton", config.histo_name_weight_antip_ue);

        let jet = match fetch_2d(store, &config.path_to_file, &jet_name) {
            Ok(h) => h,
            Err(e) => {
                log::error!("reweighting disabled: {}", e);
                return ReweightingTables::default();
            }
        };
        let ue = match fetch_2d(store, &config.path_to_file, &ue_name) {
            Ok(h) => h,
            Err(e) => {
                log::error!("reweighting disabled: {}", e);
                return ReweightingTables::default();
            }
        };

        log::info!("opened histogram {}", jet_name);
        log::info!("opened histogram {}", ue_name);
        ReweightingTables { jet: Some(jet), ue: Some(ue) }
    }
}
