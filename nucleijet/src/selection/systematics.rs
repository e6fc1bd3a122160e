//! Track-selection variations used to estimate systematic uncertainties.

use serde::{Deserialize, Serialize};

/// One variation of the ITS, TPC and DCA limits.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SystematicCutSet {
    pub name: String,
    pub min_its_nclusters: u8,
    pub min_tpc_ncrossed_rows: i32,
    pub max_dca_xy: f64,
    pub max_dca_z: f64,
}

impl SystematicCutSet {
    pub fn new(name: &str, min_its_nclusters: u8, min_tpc_ncrossed_rows: i32, max_dca_xy: f64, max_dca_z: f64) -> Self {
        SystematicCutSet {
            name: name.to_string(),
            min_its_nclusters,
            min_tpc_ncrossed_rows,
            max_dca_xy,
            max_dca_z,
        }
    }
}

// (ITS clusters, TPC crossed rows, DCA_xy, DCA_z)
const DEFAULT_VARIATIONS: [(u8, i32, f64, f64); 10] = [
    (5, 100, 0.05, 0.1),
    (6, 85, 0.07, 0.15),
    (5, 80, 0.10, 0.3),
    (4, 110, 0.03, 0.075),
    (5, 95, 0.06, 0.12),
    (3, 90, 0.15, 0.18),
    (5, 105, 0.08, 0.2),
    (6, 95, 0.04, 0.1),
    (3, 100, 0.09, 0.15),
    (4, 105, 0.10, 0.2),
];

/// The ten standard variations, in the order their index is recorded.
pub fn default_variations() -> Vec<SystematicCutSet> {
    DEFAULT_VARIATIONS
        .iter()
        .enumerate()
        .map(|(i, &(its, tpc, dca_xy, dca_z))| SystematicCutSet::new(&format!("variation_{}", i), its, tpc, dca_xy, dca_z))
        .collect()
}
