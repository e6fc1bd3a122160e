//! Histogram declarations of every execution mode.
//!
//! Names and binnings are the ones downstream macros expect; do not rename.

use std::f64::consts::{FRAC_PI_2, TAU};

use jetcore::histogram::axis::Axis;
use jetcore::histogram::hist::Histogram;
use jetcore::histogram::registry::HistogramRegistry;

use crate::analysis::task::Mode;

pub const REGISTRY_DATA: &str = "registryData";
pub const REGISTRY_MC: &str = "registryMC";
pub const REGISTRY_QC: &str = "registryQC";

const PT_BINS: usize = 120;
const PT_MIN: f64 = 0.0;
const PT_MAX: f64 = 6.0;
const PT_TITLE: &str = "#it{p}_{T} (GeV/#it{c})";

/// Number of bins along the variation axis of the systematics histograms.
pub const N_VARIATION_BINS: usize = 10;

/// Jet or underlying-event region; selects between histogram name pairs.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Region {
    Jet,
    Ue,
}

impl Region {
    pub const ALL: [Region; 2] = [Region::Jet, Region::Ue];

    pub fn label(&self) -> &'static str {
        match self {
            Region::Jet => "jet",
            Region::Ue => "ue",
        }
    }
}

/// Histogram names of the data pass for one region.
#[derive(Copy, Clone, Debug)]
pub struct DataNames {
    pub antiproton_tpc: &'static str,
    pub antiproton_tof: &'static str,
    pub antiproton_dca: &'static str,
    pub antideuteron_tpc: &'static str,
    pub antideuteron_tof: &'static str,
    pub deuteron_tof: &'static str,
    pub antihelium3_tpc: &'static str,
    pub helium3_tpc: &'static str,
}

pub const DATA_JET: DataNames = DataNames {
    antiproton_tpc: "antiproton_jet_tpc",
    antiproton_tof: "antiproton_jet_tof",
    antiproton_dca: "antiproton_dca_jet",
    antideuteron_tpc: "antideuteron_jet_tpc",
    antideuteron_tof: "antideuteron_jet_tof",
    deuteron_tof: "deuteron_jet_tof",
    antihelium3_tpc: "antihelium3_jet_tpc",
    helium3_tpc: "helium3_jet_tpc",
};

pub const DATA_UE: DataNames = DataNames {
    antiproton_tpc: "antiproton_ue_tpc",
    antiproton_tof: "antiproton_ue_tof",
    antiproton_dca: "antiproton_dca_ue",
    antideuteron_tpc: "antideuteron_ue_tpc",
    antideuteron_tof: "antideuteron_ue_tof",
    deuteron_tof: "deuteron_ue_tof",
    antihelium3_tpc: "antihelium3_ue_tpc",
    helium3_tpc: "helium3_ue_tpc",
};

/// Histogram names of the reconstructed-jet MC pass for one region.
#[derive(Copy, Clone, Debug)]
pub struct McRecNames {
    pub all: &'static str,
    pub prim: &'static str,
    pub rec_tpc: &'static str,
    pub rec_tof: &'static str,
}

pub const MC_REC_JET: McRecNames = McRecNames {
    all: "antiproton_jet_all",
    prim: "antiproton_jet_prim",
    rec_tpc: "antiproton_jet_rec_tpc",
    rec_tof: "antiproton_jet_rec_tof",
};

pub const MC_REC_UE: McRecNames = McRecNames {
    all: "antiproton_ue_all",
    prim: "antiproton_ue_prim",
    rec_tpc: "antiproton_ue_rec_tpc",
    rec_tof: "antiproton_ue_rec_tof",
};

impl Region {
    pub fn data_names(&self) -> &'static DataNames {
        match self {
            Region::Jet => &DATA_JET,
            Region::Ue => &DATA_UE,
        }
    }

    pub fn mc_rec_names(&self) -> &'static McRecNames {
        match self {
            Region::Jet => &MC_REC_JET,
            Region::Ue => &MC_REC_UE,
        }
    }
}

fn pt_axis(scale: f64) -> Axis {
    Axis::new(PT_BINS, scale * PT_MIN, scale * PT_MAX, PT_TITLE)
}

fn n_sigma_axis(title: &str) -> Axis {
    Axis::new(400, -20.0, 20.0, title)
}

fn counter_axis() -> Axis {
    Axis::new(10, 0.0, 10.0, "counter")
}

fn variation_axis() -> Axis {
    Axis::new(N_VARIATION_BINS, 0.0, N_VARIATION_BINS as f64, "systematic uncertainty")
}

fn eta_pt_map(name: &str) -> Histogram {
    Histogram::new_2d(
        name,
        name,
        Axis::new(200, 0.0, 10.0, PT_TITLE),
        Axis::new(20, -1.0, 1.0, "#it{#eta}"),
    )
}

fn spectrum(name: &str, scale: f64) -> Histogram {
    Histogram::new_1d(name, name, pt_axis(scale))
}

fn pt_n_sigma(name: &str, scale: f64, detector: &str) -> Histogram {
    Histogram::new_2d(name, name, pt_axis(scale), n_sigma_axis(&format!("n#sigma_{{{}}}", detector)))
}

/// Adds the histograms of `mode` to `registry`.
pub fn declare(mode: Mode, registry: &mut HistogramRegistry) {
    let histograms = match mode {
        Mode::Data => data_histograms(),
        Mode::Qc => qc_histograms(),
        Mode::Efficiency => efficiency_histograms(),
        Mode::JetsMcGen => jets_mc_gen_histograms(),
        Mode::JetsMcRec => jets_mc_rec_histograms(),
        Mode::SystematicsData => systematics_data_histograms(),
        Mode::SystematicsEfficiency => systematics_efficiency_histograms(),
    };
    for histogram in histograms {
        registry.add(histogram);
    }
}

/// Empty registries holding the declarations of every mode in `modes`.
pub fn registries_for(modes: &[Mode]) -> Vec<HistogramRegistry> {
    let mut registries: Vec<HistogramRegistry> = Vec::new();
    for &mode in modes {
        let name = mode.registry_name();
        let index = match registries.iter().position(|r| r.name == name) {
            Some(index) => index,
            None => {
                registries.push(HistogramRegistry::new(name));
                registries.len() - 1
            }
        };
        declare(mode, &mut registries[index]);
    }
    registries
}

fn qc_histograms() -> Vec<Histogram> {
    let n_ch = |name: &str| Histogram::new_1d(name, name, Axis::new(100, 0.0, 100.0, "#it{N}_{ch}"));
    let sum_pt = |name: &str| Histogram::new_1d(name, name, Axis::new(500, 0.0, 50.0, PT_TITLE));
    let n_jets = |name: &str| Histogram::new_1d(name, name, Axis::new(50, 0.0, 50.0, "#it{n}_{Jet}"));
    vec![
        Histogram::new_2d(
            "deltaEta_deltaPhi_jet",
            "deltaEta_deltaPhi_jet",
            Axis::new(200, -0.5, 0.5, "#Delta#eta"),
            Axis::new(200, 0.0, FRAC_PI_2, "#Delta#phi"),
        ),
        Histogram::new_2d(
            "deltaEta_deltaPhi_ue",
            "deltaEta_deltaPhi_ue",
            Axis::new(200, -0.5, 0.5, "#Delta#eta"),
            Axis::new(200, 0.0, FRAC_PI_2, "#Delta#phi"),
        ),
        Histogram::new_2d(
            "eta_phi_jet",
            "eta_phi_jet",
            Axis::new(200, -0.5, 0.5, "#eta_{jet}"),
            Axis::new(200, 0.0, TAU, "#phi_{jet}"),
        ),
        Histogram::new_2d(
            "eta_phi_ue",
            "eta_phi_ue",
            Axis::new(200, -0.5, 0.5, "#eta_{UE}"),
            Axis::new(200, 0.0, TAU, "#phi_{UE}"),
        ),
        n_ch("NchJetCone"),
        n_ch("NchJet"),
        n_ch("NchUE"),
        sum_pt("sumPtJetCone"),
        sum_pt("sumPtJet"),
        sum_pt("sumPtUE"),
        n_jets("nJetsFound"),
        n_jets("nJetsInAcceptance"),
        n_jets("nJetsSelectedHighPt"),
        Histogram::new_1d("jetEffectiveArea", "jetEffectiveArea", Axis::new(2000, 0.0, 2.0, "Area/#piR^{2}")),
        Histogram::new_1d("jetPtDifference", "jetPtDifference", Axis::new(200, -1.0, 1.0, "#Deltap_{T}^{jet}")),
    ]
}

fn data_histograms() -> Vec<Histogram> {
    let mut histograms = vec![
        Histogram::new_1d("number_of_events_data", "number of events in data", counter_axis()),
        Histogram::new_1d("number_of_rejected_events", "check on number of events rejected", counter_axis()),
    ];
    for region in Region::ALL {
        let names = region.data_names();
        histograms.extend([
            pt_n_sigma(names.antiproton_tpc, 1.0, "TPC"),
            pt_n_sigma(names.antiproton_tof, 1.0, "TOF"),
            Histogram::new_2d(
                names.antiproton_dca,
                names.antiproton_dca,
                pt_axis(1.0),
                Axis::new(200, -0.5, 0.5, "DCA_{xy} (cm)"),
            ),
            pt_n_sigma(names.antideuteron_tpc, 2.0, "TPC"),
            pt_n_sigma(names.antideuteron_tof, 2.0, "TOF"),
            pt_n_sigma(names.deuteron_tof, 2.0, "TOF"),
            pt_n_sigma(names.antihelium3_tpc, 3.0, "TPC"),
            pt_n_sigma(names.helium3_tpc, 3.0, "TPC"),
        ]);
    }
    histograms
}

fn efficiency_histograms() -> Vec<Histogram> {
    vec![
        Histogram::new_1d("number_of_events_mc", "number of events in mc", counter_axis()),
        spectrum("antiproton_incl_gen", 1.0),
        spectrum("deuteron_incl_gen", 2.0),
        spectrum("antideuteron_incl_gen", 2.0),
        spectrum("helium3_incl_gen", 3.0),
        spectrum("antihelium3_incl_gen", 3.0),
        spectrum("antiproton_incl_rec_tpc", 1.0),
        spectrum("antideuteron_incl_rec_tpc", 2.0),
        spectrum("deuteron_incl_rec_tpc", 2.0),
        spectrum("antihelium3_incl_rec_tpc", 3.0),
        spectrum("helium3_incl_rec_tpc", 3.0),
        spectrum("antiproton_incl_rec_tof", 1.0),
        spectrum("antideuteron_incl_rec_tof", 2.0),
        spectrum("deuteron_incl_rec_tof", 2.0),
        spectrum("antiproton_incl_prim", 1.0),
        spectrum("antiproton_incl_all", 1.0),
        eta_pt_map("antiproton_eta_pt_pythia"),
    ]
}

fn jets_mc_gen_histograms() -> Vec<Histogram> {
    vec![
        spectrum("antiproton_jet_gen", 1.0),
        spectrum("antiproton_ue_gen", 1.0),
        eta_pt_map("antiproton_eta_pt_jet"),
        eta_pt_map("antiproton_eta_pt_ue"),
    ]
}

fn jets_mc_rec_histograms() -> Vec<Histogram> {
    let mut histograms: Vec<Histogram> = Region::ALL
        .iter()
        .flat_map(|region| {
            let names = region.mc_rec_names();
            [names.prim, names.all, names.rec_tpc, names.rec_tof].map(|name| spectrum(name, 1.0))
        })
        .collect();
    histograms.push(Histogram::new_2d(
        "detectorResponseMatrix",
        "detectorResponseMatrix",
        Axis::new(1000, 0.0, 100.0, "#it{p}_{T}^{rec} (GeV/#it{c})"),
        Axis::new(2000, -20.0, 20.0, "#it{p}_{T}^{gen} - #it{p}_{T}^{rec} (GeV/#it{c})"),
    ));
    histograms
}

fn systematics_data_histograms() -> Vec<Histogram> {
    let with_variation = |name: &str, scale: f64, detector: &str| {
        Histogram::new_3d(
            name,
            name,
            pt_axis(scale),
            n_sigma_axis(&format!("n#sigma_{{{}}}", detector)),
            variation_axis(),
        )
    };
    vec![
        Histogram::new_1d("number_of_rejected_events_syst", "check on number of events rejected", counter_axis()),
        with_variation("antiproton_tpc_syst", 1.0, "TPC"),
        with_variation("antiproton_tof_syst", 1.0, "TOF"),
        with_variation("antideuteron_tpc_syst", 2.0, "TPC"),
        with_variation("antideuteron_tof_syst", 2.0, "TOF"),
    ]
}

fn systematics_efficiency_histograms() -> Vec<Histogram> {
    let with_variation = |name: &str, scale: f64| Histogram::new_2d(name, name, pt_axis(scale), variation_axis());
    vec![
        spectrum("antiproton_incl_gen_syst", 1.0),
        spectrum("antideuteron_incl_gen_syst", 2.0),
        with_variation("antiproton_incl_prim_syst", 1.0),
        with_variation("antiproton_incl_rec_tpc_syst", 1.0),
        with_variation("antiproton_incl_rec_tof_syst", 1.0),
        with_variation("antideuteron_incl_rec_tpc_syst", 2.0),
        with_variation("antideuteron_incl_rec_tof_syst", 2.0),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modes_share_registries() {
        let registries = registries_for(&[Mode::Data, Mode::Efficiency, Mode::JetsMcRec, Mode::SystematicsData]);
        let names: Vec<&str> = registries.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec![REGISTRY_DATA, REGISTRY_MC]);

        let data = &registries[0];
        assert!(data.contains("number_of_events_data"));
        assert!(data.contains("antiproton_tof_syst"));
        assert!(registries[1].contains("detectorResponseMatrix"));
        assert!(registries[1].contains("antiproton_ue_all"));
    }

    #[test]
    fn test_binnings() {
        let registries = registries_for(&[Mode::Data, Mode::Qc]);
        let data = &registries[0];
        let he3 = data.get("antihelium3_ue_tpc").unwrap();
        assert_eq!(he3.axes[0].nbins, 120);
        assert_eq!(he3.axes[0].max, 18.0);
        assert_eq!(he3.axes[1].nbins, 400);

        let qc = &registries[1];
        assert_eq!(qc.name, REGISTRY_QC);
        assert_eq!(qc.len(), 15);
        assert_eq!(qc.get("jetEffectiveArea").unwrap().axes[0].nbins, 2000);
    }

    #[test]
    fn test_systematics_carry_variation_axis() {
        let registries = registries_for(&[Mode::SystematicsData, Mode::SystematicsEfficiency]);
        assert_eq!(registries[0].get("antideuteron_tpc_syst").unwrap().dim(), 3);
        assert_eq!(registries[1].get("antiproton_incl_prim_syst").unwrap().dim(), 2);
        assert_eq!(registries[1].get("antideuteron_incl_gen_syst").unwrap().axes[0].max, 12.0);
    }
}
