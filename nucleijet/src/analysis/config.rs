//! Analysis configuration: TOML sections plus flat `key=value` overrides.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use jetcore::jet::background::BackgroundMethod;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::calib::lookup::CalibrationConfig;
use crate::data::track::SpeciesValues;
use crate::selection::filter::{NSigmaWindow, TrackCuts};
use crate::selection::pid::{ClusterSizeResponse, ItsPidSelector};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read configuration {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid configuration file: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("unknown configuration key {0}")]
    UnknownKey(String),
    #[error("invalid value {value:?} for {key}")]
    InvalidValue { key: String, value: String },
    #[error("expected key=value, got {0:?}")]
    MalformedOverride(String),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JetConfig {
    pub min_jet_pt: f64,
    pub r_jet: f64,
    pub z_vtx: f64,
    pub delta_eta_edge: f64,
    pub ghost_max_rap: f64,
    pub ghost_area: f64,
    pub background_method: BackgroundMethod,
    pub n_hard_reject: usize,
    pub use_rho_mass: bool,
}

impl Default for JetConfig {
    fn default() -> Self {
        Self {
            min_jet_pt: 10.0,
            r_jet: 0.3,
            z_vtx: 10.0,
            delta_eta_edge: 0.05,
            ghost_max_rap: 1.0,
            ghost_area: 0.01,
            background_method: BackgroundMethod::AreaMedian,
            n_hard_reject: 2,
            use_rho_mass: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PidConfig {
    pub apply_its_pid: bool,
    pub n_sigma_its_min: f64,
    pub n_sigma_its_max: f64,
    pub pt_max_its_pid_prot: f64,
    pub pt_max_its_pid_deut: f64,
    pub pt_max_its_pid_hel: f64,
    pub min_nsigma_tpc: f64,
    pub max_nsigma_tpc: f64,
    pub min_nsigma_tof: f64,
    pub max_nsigma_tof: f64,
    pub its_response: ClusterSizeResponse,
}

impl Default for PidConfig {
    fn default() -> Self {
        Self {
            apply_its_pid: true,
            n_sigma_its_min: -2.0,
            n_sigma_its_max: 2.0,
            pt_max_its_pid_prot: 1.0,
            pt_max_its_pid_deut: 1.0,
            pt_max_its_pid_hel: 1.0,
            min_nsigma_tpc: -3.0,
            max_nsigma_tpc: 3.0,
            min_nsigma_tof: -3.0,
            max_nsigma_tof: 3.5,
            its_response: ClusterSizeResponse::default(),
        }
    }
}

impl PidConfig {
    pub fn its_selector(&self) -> ItsPidSelector {
        ItsPidSelector {
            apply: self.apply_its_pid,
            window: NSigmaWindow::new(self.n_sigma_its_min, self.n_sigma_its_max),
            pt_max: SpeciesValues::new(self.pt_max_its_pid_prot, self.pt_max_its_pid_deut, self.pt_max_its_pid_hel),
        }
    }

    pub fn tpc_window(&self) -> NSigmaWindow {
        NSigmaWindow::new(self.min_nsigma_tpc, self.max_nsigma_tpc)
    }

    pub fn tof_window(&self) -> NSigmaWindow {
        NSigmaWindow::new(self.min_nsigma_tof, self.max_nsigma_tof)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventConfig {
    pub reject_events: bool,
    pub rejection_percentage: u32,
}

impl Default for EventConfig {
    fn default() -> Self {
        Self { reject_events: false, rejection_percentage: 3 }
    }
}

/// Execution modes; each enabled mode is a separate pass over the events.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModeConfig {
    pub process_data: bool,
    pub process_qc: bool,
    pub process_efficiency: bool,
    pub process_jets_mc_gen: bool,
    pub process_jets_mc_rec: bool,
    pub process_systematics_data: bool,
    pub process_systematics_efficiency: bool,
}

impl Default for ModeConfig {
    fn default() -> Self {
        Self {
            process_data: true,
            process_qc: false,
            process_efficiency: false,
            process_jets_mc_gen: false,
            process_jets_mc_rec: false,
            process_systematics_data: false,
            process_systematics_efficiency: false,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub jet: JetConfig,
    pub tracks: TrackCuts,
    pub pid: PidConfig,
    pub events: EventConfig,
    pub calibration: CalibrationConfig,
    pub modes: ModeConfig,
    /// Seed of every random draw; drawn from entropy when absent.
    pub seed: Option<u64>,
}

fn parse<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue { key: key.to_string(), value: value.to_string() }),
    }
}

fn parse_params(key: &str, value: &str) -> Result<[f64; 3], ConfigError> {
    let parsed: Vec<f64> = value.split(',').map(|v| parse(key, v)).collect::<Result<_, _>>()?;
    parsed.try_into().map_err(|_| ConfigError::InvalidValue { key: key.to_string(), value: value.to_string() })
}

fn parse_background_method(key: &str, value: &str) -> Result<BackgroundMethod, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "areamedian" | "area_median" | "median" => Ok(BackgroundMethod::AreaMedian),
        "perpcone" | "perp_cone" => Ok(BackgroundMethod::PerpCone),
        _ => Err(ConfigError::InvalidValue { key: key.to_string(), value: value.to_string() }),
    }
}

impl AnalysisConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        Self::from_toml_str(&text)
    }

    /// Applies a `key=value` override.
    pub fn apply_override(&mut self, assignment: &str) -> Result<(), ConfigError> {
        let (key, value) = assignment
            .split_once('=')
            .ok_or_else(|| ConfigError::MalformedOverride(assignment.to_string()))?;
        self.set(key.trim(), value)
    }

    /// Sets one option by its flat name.
    ///
    /// # Examples
    ///
    /// ```
    /// use nucleijet::analysis::config::AnalysisConfig;
    ///
    /// let mut config = AnalysisConfig::default();
    /// config.set("minJetPt", "20").unwrap();
    /// assert_eq!(config.jet.min_jet_pt, 20.0);
    /// assert!(config.set("noSuchOption", "1").is_err());
    /// ```
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        match key {
            // jets and events
            "minJetPt" => self.jet.min_jet_pt = parse(key, value)?,
            "rJet" => self.jet.r_jet = parse(key, value)?,
            "zVtx" => self.jet.z_vtx = parse(key, value)?,
            "deltaEtaEdge" => self.jet.delta_eta_edge = parse(key, value)?,
            "ghostMaxRap" => self.jet.ghost_max_rap = parse(key, value)?,
            "ghostArea" => self.jet.ghost_area = parse(key, value)?,
            "backgroundMethod" => self.jet.background_method = parse_background_method(key, value)?,
            "nHardReject" => self.jet.n_hard_reject = parse(key, value)?,
            "useRhoMass" => self.jet.use_rho_mass = parse_bool(key, value)?,
            "rejectEvents" => self.events.reject_events = parse_bool(key, value)?,
            "rejectionPercentage" => self.events.rejection_percentage = parse(key, value)?,
            "seed" => self.seed = Some(parse(key, value)?),

            // tracks
            "requirePvContributor" => self.tracks.require_pv_contributor = parse_bool(key, value)?,
            "minItsNclusters" => self.tracks.min_its_nclusters = parse(key, value)?,
            "minTpcNcrossedRows" => self.tracks.min_tpc_ncrossed_rows = parse(key, value)?,
            "minTpcNcrossedRowsOverFindable" => self.tracks.min_tpc_ncrossed_rows_over_findable = parse(key, value)?,
            "maxChiSquareTpc" => self.tracks.max_chi_square_tpc = parse(key, value)?,
            "maxChiSquareIts" => self.tracks.max_chi_square_its = parse(key, value)?,
            "minPt" => self.tracks.min_pt = parse(key, value)?,
            "minEta" => self.tracks.min_eta = parse(key, value)?,
            "maxEta" => self.tracks.max_eta = parse(key, value)?,
            "maxDcaxy" => self.tracks.max_dca_xy = parse(key, value)?,
            "maxDcaz" => self.tracks.max_dca_z = parse(key, value)?,

            // pid
            "applyItsPid" => self.pid.apply_its_pid = parse_bool(key, value)?,
            "minNsigmaTpc" => self.pid.min_nsigma_tpc = parse(key, value)?,
            "maxNsigmaTpc" => self.pid.max_nsigma_tpc = parse(key, value)?,
            "minNsigmaTof" => self.pid.min_nsigma_tof = parse(key, value)?,
            "maxNsigmaTof" => self.pid.max_nsigma_tof = parse(key, value)?,
            "ptMaxItsPidProt" => self.pid.pt_max_its_pid_prot = parse(key, value)?,
            "ptMaxItsPidDeut" => self.pid.pt_max_its_pid_deut = parse(key, value)?,
            "ptMaxItsPidHel" => self.pid.pt_max_its_pid_hel = parse(key, value)?,
            "nSigmaItsMin" => self.pid.n_sigma_its_min = parse(key, value)?,
            "nSigmaItsMax" => self.pid.n_sigma_its_max = parse(key, value)?,
            "itsRespParams" => self.pid.its_response.z1.signal = parse_params(key, value)?,
            "itsResolutionParams" => self.pid.its_response.z1.resolution = parse_params(key, value)?,
            "itsRespParamsZ2" => self.pid.its_response.z2.signal = parse_params(key, value)?,
            "itsResolutionParamsZ2" => self.pid.its_response.z2.resolution = parse_params(key, value)?,

            // calibration
            "applyReweighting" => self.calibration.apply_reweighting = parse_bool(key, value)?,
            "urlToCcdb" => self.calibration.url_to_ccdb = value.trim().to_string(),
            "pathToFile" => self.calibration.path_to_file = value.trim().to_string(),
            "histoNameWeightAntipJet" => self.calibration.histo_name_weight_antip_jet = value.trim().to_string(),
            "histoNameWeightAntipUe" => self.calibration.histo_name_weight_antip_ue = value.trim().to_string(),
            "applyPtUnfolding" => self.calibration.apply_pt_unfolding = parse_bool(key, value)?,
            "urlToCcdbPtUnfolding" => self.calibration.url_to_ccdb_pt_unfolding = value.trim().to_string(),
            "pathToFilePtUnfolding" => self.calibration.path_to_file_pt_unfolding = value.trim().to_string(),
            "histoNamePtUnfolding" => self.calibration.histo_name_pt_unfolding = value.trim().to_string(),

            // modes
            "processData" => self.modes.process_data = parse_bool(key, value)?,
            "processQC" => self.modes.process_qc = parse_bool(key, value)?,
            "processEfficiency" => self.modes.process_efficiency = parse_bool(key, value)?,
            "processJetsMCgen" => self.modes.process_jets_mc_gen = parse_bool(key, value)?,
            "processJetsMCrec" => self.modes.process_jets_mc_rec = parse_bool(key, value)?,
            "processSystematicsData" => self.modes.process_systematics_data = parse_bool(key, value)?,
            "processSystematicsEfficiency" => self.modes.process_systematics_efficiency = parse_bool(key, value)?,

            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AnalysisConfig::default();
        assert_eq!(config.jet.min_jet_pt, 10.0);
        assert_eq!(config.jet.r_jet, 0.3);
        assert_eq!(config.tracks.min_its_nclusters, 5);
        assert_eq!(config.pid.tof_window(), NSigmaWindow::new(-3.0, 3.5));
        assert_eq!(config.events.rejection_percentage, 3);
        assert!(config.modes.process_data);
        assert!(!config.modes.process_qc);
        assert!(config.seed.is_none());
    }

    #[test]
    fn test_flat_overrides() {
        let mut config = AnalysisConfig::default();
        config.apply_override("rJet=0.4").unwrap();
        config.apply_override("processQC = true").unwrap();
        config.apply_override("backgroundMethod=perpCone").unwrap();
        config.apply_override("itsRespParams=1.0,2.0,3.0").unwrap();
        assert_eq!(config.jet.r_jet, 0.4);
        assert!(config.modes.process_qc);
        assert_eq!(config.jet.background_method, BackgroundMethod::PerpCone);
        assert_eq!(config.pid.its_response.z1.signal, [1.0, 2.0, 3.0]);

        assert!(matches!(config.apply_override("rJet"), Err(ConfigError::MalformedOverride(_))));
        assert!(matches!(config.set("rJet", "wide"), Err(ConfigError::InvalidValue { .. })));
        assert!(matches!(config.set("itsRespParams", "1,2"), Err(ConfigError::InvalidValue { .. })));
        assert!(matches!(config.set("jetRadius", "0.4"), Err(ConfigError::UnknownKey(_))));
    }

    #[test]
    fn test_toml_sections() {
        let config = AnalysisConfig::from_toml_str(
            r#"
            seed = 42

            [jet]
            min_jet_pt = 15.0

            [tracks]
            max_dca_xy = 0.1

            [modes]
            process_data = false
            process_jets_mc_rec = true
            "#,
        )
        .unwrap();
        assert_eq!(config.seed, Some(42));
        assert_eq!(config.jet.min_jet_pt, 15.0);
        assert_eq!(config.jet.r_jet, 0.3);
        assert_eq!(config.tracks.max_dca_xy, 0.1);
        assert_eq!(config.tracks.min_pt, 0.3);
        assert!(!config.modes.process_data);
        assert!(config.modes.process_jets_mc_rec);
    }
}
