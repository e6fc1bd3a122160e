//! Per-event processing of every execution mode.
//!
//! Each mode is an independent pass over the events: it gates the event, builds
//! its jets where needed and fills the histograms declared for it in
//! [`crate::analysis::histograms`]. Nothing here fails; events that cannot be
//! processed are skipped.

use std::f64::consts::PI;
use std::sync::Arc;

use jetcore::constants::{PDG_DEUTERON, PDG_HELIUM3, PDG_PROTON};
use jetcore::geometry::axis::delta_phi;
use jetcore::histogram::registry::HistogramSink;
use jetcore::jet::background::BackgroundEstimate;
use jetcore::jet::cluster::Jet;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::analysis::config::{AnalysisConfig, ModeConfig};
use crate::analysis::histograms::{DataNames, McRecNames, Region, REGISTRY_DATA, REGISTRY_MC, REGISTRY_QC};
use crate::analysis::jets::{accepts_generated, particle_input, track_input, JetFinder, JetSelector};
use crate::analysis::rejection::EventRejector;
use crate::analysis::ue::{UeAccumulator, UeCones};
use crate::calib::lookup::Calibrations;
use crate::data::event::Event;
use crate::data::track::{Species, Track, TrackView};
use crate::selection::filter::{passed_jet_reconstruction, NSigmaWindow, TrackCuts};
use crate::selection::pid::{classify_track, ItsPidSelector, ItsResponse};
use crate::selection::systematics::default_variations;

const PDG_ANTIPROTON: i32 = -PDG_PROTON;
const PDG_ANTIDEUTERON: i32 = -PDG_DEUTERON;
const PDG_ANTIHELIUM3: i32 = -PDG_HELIUM3;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Mode {
    Data,
    Qc,
    Efficiency,
    JetsMcGen,
    JetsMcRec,
    SystematicsData,
    SystematicsEfficiency,
}

impl Mode {
    pub const ALL: [Mode; 7] = [
        Mode::Data,
        Mode::Qc,
        Mode::Efficiency,
        Mode::JetsMcGen,
        Mode::JetsMcRec,
        Mode::SystematicsData,
        Mode::SystematicsEfficiency,
    ];

    /// Name of the switch enabling this mode.
    pub fn switch_name(&self) -> &'static str {
        match self {
            Mode::Data => "processData",
            Mode::Qc => "processQC",
            Mode::Efficiency => "processEfficiency",
            Mode::JetsMcGen => "processJetsMCgen",
            Mode::JetsMcRec => "processJetsMCrec",
            Mode::SystematicsData => "processSystematicsData",
            Mode::SystematicsEfficiency => "processSystematicsEfficiency",
        }
    }

    /// Registry the mode writes into.
    pub fn registry_name(&self) -> &'static str {
        match self {
            Mode::Data | Mode::SystematicsData => REGISTRY_DATA,
            Mode::Qc => REGISTRY_QC,
            Mode::Efficiency | Mode::JetsMcGen | Mode::JetsMcRec | Mode::SystematicsEfficiency => REGISTRY_MC,
        }
    }

    pub fn is_enabled(&self, modes: &ModeConfig) -> bool {
        match self {
            Mode::Data => modes.process_data,
            Mode::Qc => modes.process_qc,
            Mode::Efficiency => modes.process_efficiency,
            Mode::JetsMcGen => modes.process_jets_mc_gen,
            Mode::JetsMcRec => modes.process_jets_mc_rec,
            Mode::SystematicsData => modes.process_systematics_data,
            Mode::SystematicsEfficiency => modes.process_systematics_efficiency,
        }
    }

    pub fn enabled(modes: &ModeConfig) -> Vec<Mode> {
        Mode::ALL.iter().copied().filter(|mode| mode.is_enabled(modes)).collect()
    }
}

/// Reconstructed-spectrum names of one species in the efficiency pass.
struct RecoNames {
    pdg_code: i32,
    species: Species,
    tpc: &'static str,
    tof: Option<&'static str>,
}

const EFFICIENCY_RECO: [RecoNames; 5] = [
    RecoNames {
        pdg_code: PDG_ANTIPROTON,
        species: Species::Proton,
        tpc: "antiproton_incl_rec_tpc",
        tof: Some("antiproton_incl_rec_tof"),
    },
    RecoNames {
        pdg_code: PDG_ANTIDEUTERON,
        species: Species::Deuteron,
        tpc: "antideuteron_incl_rec_tpc",
        tof: Some("antideuteron_incl_rec_tof"),
    },
    RecoNames {
        pdg_code: PDG_DEUTERON,
        species: Species::Deuteron,
        tpc: "deuteron_incl_rec_tpc",
        tof: Some("deuteron_incl_rec_tof"),
    },
    RecoNames {
        pdg_code: PDG_ANTIHELIUM3,
        species: Species::Helium3,
        tpc: "antihelium3_incl_rec_tpc",
        tof: None,
    },
    RecoNames {
        pdg_code: PDG_HELIUM3,
        species: Species::Helium3,
        tpc: "helium3_incl_rec_tpc",
        tof: None,
    },
];

fn generated_spectrum(pdg_code: i32) -> Option<&'static str> {
    match pdg_code {
        PDG_ANTIPROTON => Some("antiproton_incl_gen"),
        PDG_DEUTERON => Some("deuteron_incl_gen"),
        PDG_ANTIDEUTERON => Some("antideuteron_incl_gen"),
        PDG_HELIUM3 => Some("helium3_incl_gen"),
        PDG_ANTIHELIUM3 => Some("antihelium3_incl_gen"),
        _ => None,
    }
}

/// pt at which a species is histogrammed; helium-3 tracks are reconstructed with unit charge.
fn species_pt(track: &Track, species: Species) -> f64 {
    match species {
        Species::Helium3 => 2.0 * track.pt(),
        _ => track.pt(),
    }
}

/// The analysis with its selections, calibrations and random stream.
///
/// Cheap to clone: the jet finder, the ITS response and the calibrations are shared.
#[derive(Clone)]
pub struct AnalysisTask {
    finder: Arc<JetFinder>,
    selector: JetSelector,
    cuts: TrackCuts,
    variation_cuts: Vec<TrackCuts>,
    its_selector: ItsPidSelector,
    tpc_window: NSigmaWindow,
    tof_window: NSigmaWindow,
    rejector: EventRejector,
    z_vtx: f64,
    r_jet: f64,
    its_response: Arc<dyn ItsResponse>,
    calibrations: Arc<Calibrations>,
    seed: u64,
    rng: StdRng,
}

impl AnalysisTask {
    pub fn new(config: &AnalysisConfig, calibrations: Arc<Calibrations>) -> Self {
        let seed = config.seed.unwrap_or_else(rand::random);
        let max_eta = config.tracks.max_eta;
        let variation_cuts = default_variations().iter().map(|v| config.tracks.with_variation(v)).collect();

        AnalysisTask {
            finder: Arc::new(JetFinder::new(&config.jet, max_eta)),
            selector: JetSelector::new(&config.jet, max_eta),
            cuts: config.tracks.clone(),
            variation_cuts,
            its_selector: config.pid.its_selector(),
            tpc_window: config.pid.tpc_window(),
            tof_window: config.pid.tof_window(),
            rejector: EventRejector::new(&config.events),
            z_vtx: config.jet.z_vtx,
            r_jet: config.jet.r_jet,
            its_response: Arc::new(config.pid.its_response.clone()),
            calibrations,
            seed,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Replaces the ITS response model.
    pub fn with_its_response(mut self, response: Arc<dyn ItsResponse>) -> Self {
        self.its_response = response;
        self
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Copy with its own random stream, derived from the seed and `chunk_index`.
    pub fn fork(&self, chunk_index: usize) -> Self {
        let mut forked = self.clone();
        let stream = self.seed ^ (chunk_index as u64).wrapping_add(1).wrapping_mul(0x9E37_79B9_7F4A_7C15);
        forked.rng = StdRng::seed_from_u64(stream);
        forked
    }

    pub fn process(&mut self, mode: Mode, event: &Event, sink: &mut dyn HistogramSink) {
        match mode {
            Mode::Data => self.process_data(event, sink),
            Mode::Qc => self.process_qc(event, sink),
            Mode::Efficiency => self.process_efficiency(event, sink),
            Mode::JetsMcGen => self.process_jets_mc_gen(event, sink),
            Mode::JetsMcRec => self.process_jets_mc_rec(event, sink),
            Mode::SystematicsData => self.process_systematics_data(event, sink),
            Mode::SystematicsEfficiency => self.process_systematics_efficiency(event, sink),
        }
    }

    // -----------------------------------------------------------------------
    // Shared steps
    // -----------------------------------------------------------------------

    /// Counts the event in `counter` and draws the rejection; true when the event is dropped.
    fn rejected(&mut self, counter: &str, sink: &mut dyn HistogramSink) -> bool {
        if !self.rejector.enabled {
            return false;
        }
        sink.fill(counter, &[0.5]);
        if self.rejector.should_reject(&mut self.rng) {
            log::trace!("event rejected by down-sampling");
            return true;
        }
        sink.fill(counter, &[1.5]);
        false
    }

    fn event_selected(&self, event: &Event) -> bool {
        let selected = event.collision.is_selected(self.z_vtx);
        if !selected {
            log::trace!("event fails selection (sel8 = {}, z = {:.2})", event.collision.sel8, event.collision.pos_z);
        }
        selected
    }

    /// Unfolded, background-subtracted pt of a jet in acceptance, if it passes the threshold.
    fn selected_jet_pt(&mut self, jet: &Jet, background: &BackgroundEstimate) -> Option<f64> {
        if !self.selector.in_acceptance(jet) {
            return None;
        }
        let subtracted = self.finder.subtract(jet, background);
        let pt = self.calibrations.unfolding.corrected_pt(subtracted.pt(), &mut self.rng);
        self.selector.passes_pt(pt).then_some(pt)
    }

    /// TPC window, then TOF hit and window.
    fn tpc_tof(&self, track: &Track, species: Species) -> (bool, bool) {
        let tpc = self.tpc_window.contains(track.tpc_n_sigma(species));
        let tof = tpc && track.has_tof() && self.tof_window.contains(track.tof_n_sigma(species));
        (tpc, tof)
    }

    // -----------------------------------------------------------------------
    // Data
    // -----------------------------------------------------------------------

    fn process_data(&mut self, event: &Event, sink: &mut dyn HistogramSink) {
        if self.rejected("number_of_rejected_events", sink) {
            return;
        }
        sink.fill("number_of_events_data", &[0.5]);
        if !self.event_selected(event) {
            return;
        }
        sink.fill("number_of_events_data", &[1.5]);

        let input = track_input(&event.tracks);
        let Some(clustered) = self.finder.cluster(&input) else {
            return;
        };
        sink.fill("number_of_events_data", &[2.5]);

        let mut any_selected = false;
        for jet in &clustered.jets {
            if self.selected_jet_pt(jet, &clustered.background).is_none() {
                continue;
            }
            any_selected = true;

            let names = Region::Jet.data_names();
            for track in jet.constituent_indices().filter_map(|index| event.track(index)) {
                if self.cuts.passes(track) {
                    self.fill_data_track(track, names, sink);
                }
            }

            let cones = UeCones::from_jet(jet);
            let names = Region::Ue.data_names();
            for track in &event.tracks {
                if self.cuts.passes(track) && cones.contains(track.eta(), track.phi()) {
                    self.fill_data_track(track, names, sink);
                }
            }
        }

        if any_selected {
            sink.fill("number_of_events_data", &[3.5]);
        }
    }

    /// Species fills of one selected track. The DCA control distribution is
    /// recorded before the DCA cut.
    fn fill_data_track(&self, track: &Track, names: &DataNames, sink: &mut dyn HistogramSink) {
        let pt = track.pt();
        let class = classify_track(track, &self.its_selector, self.its_response.as_ref());

        if class.high_purity_antiproton && track.dca_z().abs() < self.cuts.max_dca_z {
            sink.fill(names.antiproton_dca, &[pt, track.dca_xy()]);
        }
        if !self.cuts.passes_dca(track) {
            return;
        }

        let pid = class.pid;
        let tpc_proton = track.tpc_n_sigma(Species::Proton);
        let tpc_deuteron = track.tpc_n_sigma(Species::Deuteron);
        let tpc_helium = track.tpc_n_sigma(Species::Helium3);
        let deuteron_tof_ready = self.tpc_window.contains(tpc_deuteron) && track.has_tof();

        if track.sign() < 0 {
            if pid.proton {
                sink.fill(names.antiproton_tpc, &[pt, tpc_proton]);
                if self.tpc_window.contains(tpc_proton) && track.has_tof() {
                    sink.fill(names.antiproton_tof, &[pt, track.tof_n_sigma(Species::Proton)]);
                }
            }
            if pid.deuteron {
                sink.fill(names.antideuteron_tpc, &[pt, tpc_deuteron]);
                if deuteron_tof_ready {
                    sink.fill(names.antideuteron_tof, &[pt, track.tof_n_sigma(Species::Deuteron)]);
                }
            }
            if pid.helium {
                sink.fill(names.antihelium3_tpc, &[2.0 * pt, tpc_helium]);
            }
        } else if track.sign() > 0 {
            if pid.deuteron && deuteron_tof_ready {
                sink.fill(names.deuteron_tof, &[pt, track.tof_n_sigma(Species::Deuteron)]);
            }
            if pid.helium {
                sink.fill(names.helium3_tpc, &[2.0 * pt, tpc_helium]);
            }
        }
    }

    // -----------------------------------------------------------------------
    // QC
    // -----------------------------------------------------------------------

    fn process_qc(&mut self, event: &Event, sink: &mut dyn HistogramSink) {
        if !self.event_selected(event) {
            return;
        }
        let input = track_input(&event.tracks);
        let Some(clustered) = self.finder.cluster(&input) else {
            return;
        };

        let mut n_in_acceptance = 0usize;
        let mut n_selected = 0usize;
        for jet in &clustered.jets {
            if !self.selector.in_acceptance(jet) {
                continue;
            }
            n_in_acceptance += 1;
            sink.fill("sumPtJetCone", &[jet.pt()]);

            let subtracted = self.finder.subtract(jet, &clustered.background);
            sink.fill("jetPtDifference", &[subtracted.pt() - jet.pt()]);
            let pt = self.calibrations.unfolding.corrected_pt(subtracted.pt(), &mut self.rng);
            if !self.selector.passes_pt(pt) {
                continue;
            }
            n_selected += 1;

            sink.fill("sumPtJet", &[jet.pt()]);
            sink.fill("jetEffectiveArea", &[jet.area / (PI * self.r_jet * self.r_jet)]);
            sink.fill("NchJetCone", &[jet.n_constituents() as f64]);

            let axis = jet.axis();
            for constituent in &jet.constituents {
                let d_eta = constituent.eta() - axis.eta();
                let d_phi = delta_phi(constituent.phi(), axis.phi());
                sink.fill("deltaEta_deltaPhi_jet", &[d_eta, d_phi]);
                sink.fill("eta_phi_jet", &[constituent.eta(), constituent.phi()]);
            }

            let cones = UeCones::from_jet(jet);
            let mut ue = UeAccumulator::new();
            for track in event.tracks.iter().filter(|t| passed_jet_reconstruction(*t)) {
                let (eta, phi) = (track.eta(), track.phi());
                if !cones.contains(eta, phi) {
                    continue;
                }
                ue.add(track.pt());
                let (d1, d2) = cones.distances(eta, phi);
                for d in [d1, d2].into_iter().flatten() {
                    sink.fill("deltaEta_deltaPhi_ue", &[d.delta_eta, d.delta_phi]);
                }
                sink.fill("eta_phi_ue", &[eta, phi]);
            }

            let summary = ue.halved();
            sink.fill("NchUE", &[summary.multiplicity]);
            sink.fill("NchJet", &[jet.n_constituents() as f64 - summary.multiplicity]);
            sink.fill("sumPtUE", &[summary.sum_pt]);
        }

        sink.fill("nJetsFound", &[clustered.jets.len() as f64]);
        sink.fill("nJetsInAcceptance", &[n_in_acceptance as f64]);
        sink.fill("nJetsSelectedHighPt", &[n_selected as f64]);
    }

    // -----------------------------------------------------------------------
    // Inclusive efficiency
    // -----------------------------------------------------------------------

    fn process_efficiency(&mut self, event: &Event, sink: &mut dyn HistogramSink) {
        sink.fill("number_of_events_mc", &[0.5]);
        if !self.event_selected(event) {
            return;
        }
        sink.fill("number_of_events_mc", &[1.5]);

        for particle in event.mc_particles.iter().filter(|p| p.is_physical_primary) {
            if particle.pdg_code == PDG_ANTIPROTON {
                sink.fill("antiproton_eta_pt_pythia", &[particle.pt(), particle.eta()]);
            }
            if !self.cuts.eta_accepted(particle.eta()) {
                continue;
            }
            if let Some(name) = generated_spectrum(particle.pdg_code) {
                sink.fill(name, &[particle.pt()]);
            }
        }

        for track in &event.tracks {
            if !self.cuts.passes_all(track) {
                continue;
            }
            let Some(particle) = event.mc_particle_of(track) else {
                continue;
            };
            let pt = track.pt();
            if particle.pdg_code == PDG_ANTIPROTON {
                sink.fill("antiproton_incl_all", &[pt]);
            }
            if !particle.is_physical_primary {
                continue;
            }
            if particle.pdg_code == PDG_ANTIPROTON {
                sink.fill("antiproton_incl_prim", &[pt]);
            }

            let Some(names) = EFFICIENCY_RECO.iter().find(|n| n.pdg_code == particle.pdg_code) else {
                continue;
            };
            if !self.its_selector.passes(track, names.species, self.its_response.as_ref()) {
                continue;
            }
            let (tpc, tof) = self.tpc_tof(track, names.species);
            if tpc {
                sink.fill(names.tpc, &[species_pt(track, names.species)]);
                if let (true, Some(tof_name)) = (tof, names.tof) {
                    sink.fill(tof_name, &[pt]);
                }
            }
        }
    }

    // -----------------------------------------------------------------------
    // Generator-level jets
    // -----------------------------------------------------------------------

    fn process_jets_mc_gen(&mut self, event: &Event, sink: &mut dyn HistogramSink) {
        if !self.event_selected(event) {
            return;
        }
        let input = particle_input(&event.mc_particles, &self.cuts);
        let Some(clustered) = self.finder.cluster(&input) else {
            return;
        };
        let reweighting = &self.calibrations.reweighting;

        for jet in &clustered.jets {
            if !self.selector.in_acceptance(jet) {
                continue;
            }
            // truth jets are not unfolded
            let subtracted = self.finder.subtract(jet, &clustered.background);
            if !self.selector.passes_pt(subtracted.pt()) {
                continue;
            }

            for particle in jet.constituent_indices().filter_map(|index| event.mc_particles.get(index)) {
                if particle.pdg_code != PDG_ANTIPROTON {
                    continue;
                }
                let (pt, eta) = (particle.pt(), particle.eta());
                sink.fill_weighted("antiproton_jet_gen", &[pt], reweighting.jet_weight(pt, eta));
                sink.fill("antiproton_eta_pt_jet", &[pt, eta]);
            }

            let cones = UeCones::from_jet(jet);
            for particle in event.mc_particles.iter().filter(|p| accepts_generated(p, &self.cuts)) {
                if particle.pdg_code != PDG_ANTIPROTON || !cones.contains(particle.eta(), particle.phi()) {
                    continue;
                }
                let (pt, eta) = (particle.pt(), particle.eta());
                sink.fill_weighted("antiproton_ue_gen", &[pt], reweighting.ue_weight(pt, eta));
                sink.fill("antiproton_eta_pt_ue", &[pt, eta]);
            }
        }
    }

    // -----------------------------------------------------------------------
    // Reconstructed jets in simulation
    // -----------------------------------------------------------------------

    fn process_jets_mc_rec(&mut self, event: &Event, sink: &mut dyn HistogramSink) {
        if !self.event_selected(event) {
            return;
        }
        let input = track_input(&event.tracks);
        let Some(clustered) = self.finder.cluster(&input) else {
            return;
        };

        for jet in &clustered.jets {
            if !self.selector.in_acceptance(jet) {
                continue;
            }
            let pt_gen: f64 = jet
                .constituent_indices()
                .filter_map(|index| event.track(index))
                .filter_map(|track| event.mc_particle_of(track))
                .map(|particle| particle.pt())
                .sum();
            sink.fill("detectorResponseMatrix", &[jet.pt(), pt_gen - jet.pt()]);

            if self.selected_jet_pt(jet, &clustered.background).is_none() {
                continue;
            }

            let names = Region::Jet.mc_rec_names();
            for track in jet.constituent_indices().filter_map(|index| event.track(index)) {
                self.fill_mc_rec_track(event, track, names, sink);
            }

            let cones = UeCones::from_jet(jet);
            let names = Region::Ue.mc_rec_names();
            for track in &event.tracks {
                if cones.contains(track.eta(), track.phi()) {
                    self.fill_mc_rec_track(event, track, names, sink);
                }
            }
        }
    }

    fn fill_mc_rec_track(&self, event: &Event, track: &Track, names: &McRecNames, sink: &mut dyn HistogramSink) {
        if !self.cuts.passes_all(track) || track.sign() > 0 {
            return;
        }
        let Some(particle) = event.mc_particle_of(track) else {
            return;
        };
        if particle.pdg_code != PDG_ANTIPROTON {
            return;
        }
        let pt = track.pt();
        sink.fill(names.all, &[pt]);
        if !particle.is_physical_primary {
            return;
        }
        sink.fill(names.prim, &[pt]);

        if !self.its_selector.passes(track, Species::Proton, self.its_response.as_ref()) {
            return;
        }
        let (tpc, tof) = self.tpc_tof(track, Species::Proton);
        if tpc {
            sink.fill(names.rec_tpc, &[pt]);
            if tof {
                sink.fill(names.rec_tof, &[pt]);
            }
        }
    }

    // -----------------------------------------------------------------------
    // Systematics
    // -----------------------------------------------------------------------

    fn process_systematics_data(&mut self, event: &Event, sink: &mut dyn HistogramSink) {
        if self.rejected("number_of_rejected_events_syst", sink) {
            return;
        }
        if !self.event_selected(event) {
            return;
        }
        let input = track_input(&event.tracks);
        let Some(clustered) = self.finder.cluster(&input) else {
            return;
        };

        for jet in &clustered.jets {
            if self.selected_jet_pt(jet, &clustered.background).is_none() {
                continue;
            }
            for track in jet.constituent_indices().filter_map(|index| event.track(index)) {
                if track.sign() >= 0 {
                    continue;
                }
                let pid = self.its_selector.flags(track, self.its_response.as_ref());
                let pt = track.pt();
                let tpc_proton = track.tpc_n_sigma(Species::Proton);
                let tpc_deuteron = track.tpc_n_sigma(Species::Deuteron);

                for (i, cuts) in self.variation_cuts.iter().enumerate() {
                    if !cuts.passes_all(track) {
                        continue;
                    }
                    let variation = i as f64;
                    if pid.proton {
                        sink.fill("antiproton_tpc_syst", &[pt, tpc_proton, variation]);
                        if self.tpc_window.contains(tpc_proton) && track.has_tof() {
                            sink.fill("antiproton_tof_syst", &[pt, track.tof_n_sigma(Species::Proton), variation]);
                        }
                    }
                    if pid.deuteron {
                        sink.fill("antideuteron_tpc_syst", &[pt, tpc_deuteron, variation]);
                        if self.tpc_window.contains(tpc_deuteron) && track.has_tof() {
                            sink.fill("antideuteron_tof_syst", &[pt, track.tof_n_sigma(Species::Deuteron), variation]);
                        }
                    }
                }
            }
        }
    }

    fn process_systematics_efficiency(&mut self, event: &Event, sink: &mut dyn HistogramSink) {
        if !self.event_selected(event) {
            return;
        }

        for particle in event.mc_particles.iter().filter(|p| p.is_physical_primary) {
            if !self.cuts.eta_accepted(particle.eta()) {
                continue;
            }
            match particle.pdg_code {
                PDG_ANTIPROTON => sink.fill("antiproton_incl_gen_syst", &[particle.pt()]),
                PDG_ANTIDEUTERON => sink.fill("antideuteron_incl_gen_syst", &[particle.pt()]),
                _ => {}
            }
        }

        for track in &event.tracks {
            let Some(particle) = event.mc_particle_of(track) else {
                continue;
            };
            if !particle.is_physical_primary {
                continue;
            }
            let (prefix, species) = match particle.pdg_code {
                PDG_ANTIPROTON => ("antiproton", Species::Proton),
                PDG_ANTIDEUTERON => ("antideuteron", Species::Deuteron),
                _ => continue,
            };
            let pid = self.its_selector.passes(track, species, self.its_response.as_ref());
            let (tpc, tof) = self.tpc_tof(track, species);
            let pt = track.pt();

            for (i, cuts) in self.variation_cuts.iter().enumerate() {
                if !cuts.passes_all(track) {
                    continue;
                }
                let variation = i as f64;
                if species == Species::Proton {
                    sink.fill("antiproton_incl_prim_syst", &[pt, variation]);
                }
                if pid && tpc {
                    sink.fill(&format!("{}_incl_rec_tpc_syst", prefix), &[pt, variation]);
                    if tof {
                        sink.fill(&format!("{}_incl_rec_tof_syst", prefix), &[pt, variation]);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::histograms::registries_for;
    use crate::data::event::Collision;
    use crate::data::particle::McParticle;
    use jetcore::histogram::registry::HistogramRegistry;
    use rand::Rng;

    fn config() -> AnalysisConfig {
        let mut config = AnalysisConfig::default();
        config.jet.min_jet_pt = 1.0;
        config.calibration.apply_pt_unfolding = false;
        config.pid.apply_its_pid = false;
        config.seed = Some(42);
        config
    }

    fn task() -> AnalysisTask {
        AnalysisTask::new(&config(), Arc::new(Calibrations::none()))
    }

    fn registry(mode: Mode) -> HistogramRegistry {
        registries_for(&[mode]).remove(0)
    }

    fn antiproton(pt: f64, eta: f64, phi: f64) -> Track {
        let mut track = Track::from_pt_eta_phi(pt, eta, phi, -1);
        track.tpc_n_sigma.proton = 0.5;
        track.tpc_n_sigma.deuteron = 10.0;
        track.has_tof = true;
        track.tof_n_sigma.proton = 0.3;
        track
    }

    /// A jet of three tracks at eta = 0, phi = 1 with an antiproton among them.
    fn jet_event() -> Event {
        let tracks = vec![
            Track::from_pt_eta_phi(4.0, 0.0, 1.0, 1),
            Track::from_pt_eta_phi(3.0, 0.05, 1.05, 1),
            antiproton(1.5, -0.05, 0.95),
        ];
        Event::new(Collision::new(1.0, true), tracks, Vec::new())
    }

    #[test]
    fn test_mode_switches() {
        let mut modes = ModeConfig::default();
        assert_eq!(Mode::enabled(&modes), vec![Mode::Data]);
        modes.process_qc = true;
        modes.process_jets_mc_rec = true;
        assert_eq!(Mode::enabled(&modes), vec![Mode::Data, Mode::Qc, Mode::JetsMcRec]);
        assert_eq!(Mode::JetsMcRec.registry_name(), REGISTRY_MC);
        assert_eq!(Mode::SystematicsData.switch_name(), "processSystematicsData");
    }

    #[test]
    fn test_data_counters_and_species() {
        let mut task = task();
        let mut registry = registry(Mode::Data);
        task.process(Mode::Data, &jet_event(), &mut registry);

        let counter = registry.get("number_of_events_data").unwrap();
        for value in [0.5, 1.5, 2.5, 3.5] {
            assert_eq!(counter.content_at(&[value]), 1.0);
        }
        assert_eq!(registry.get("number_of_rejected_events").unwrap().integral(), 0.0);
        assert_eq!(registry.get("antiproton_jet_tpc").unwrap().integral(), 1.0);
        assert_eq!(registry.get("antiproton_jet_tof").unwrap().integral(), 1.0);
        assert_eq!(registry.get("antiproton_dca_jet").unwrap().integral(), 1.0);
        // ITS PID is off, so every negative track also enters the deuteron and helium maps
        assert_eq!(registry.get("antideuteron_jet_tpc").unwrap().integral(), 1.0);
        assert_eq!(registry.get("antideuteron_jet_tof").unwrap().integral(), 0.0);
        assert_eq!(registry.get("antihelium3_jet_tpc").unwrap().integral(), 1.0);
        assert_eq!(registry.get("helium3_jet_tpc").unwrap().integral(), 2.0);
    }

    #[test]
    fn test_failed_vertex_stops_after_first_counter() {
        let mut task = task();
        let mut registry = registry(Mode::Data);
        let mut event = jet_event();
        event.collision.pos_z = 12.0;
        task.process(Mode::Data, &event, &mut registry);
        assert_eq!(registry.total_entries(), 1);
        assert_eq!(registry.get("number_of_events_data").unwrap().content_at(&[0.5]), 1.0);
    }

    #[test]
    fn test_qc_counts_jets() {
        let mut task = task();
        let mut registry = registry(Mode::Qc);
        task.process(Mode::Qc, &jet_event(), &mut registry);
        assert_eq!(registry.get("nJetsFound").unwrap().content_at(&[1.0]), 1.0);
        assert_eq!(registry.get("nJetsSelectedHighPt").unwrap().content_at(&[1.0]), 1.0);
        assert_eq!(registry.get("NchJetCone").unwrap().content_at(&[3.0]), 1.0);
        assert_eq!(registry.get("eta_phi_jet").unwrap().integral(), 3.0);
        // nothing in the perpendicular cones
        assert_eq!(registry.get("NchUE").unwrap().content_at(&[0.0]), 1.0);
    }

    #[test]
    fn test_efficiency_generated_and_reconstructed() {
        let mut task = task();
        let mut registry = registry(Mode::Efficiency);
        let mut track = antiproton(1.5, 0.1, 2.0);
        track.mc_particle = Some(0);
        let particles = vec![
            McParticle::from_pt_eta_phi(1.5, 0.1, 2.0, PDG_ANTIPROTON, true),
            McParticle::from_pt_eta_phi(2.0, 0.95, 2.0, PDG_ANTIPROTON, true),
            McParticle::from_pt_eta_phi(2.0, 0.0, 2.0, PDG_ANTIDEUTERON, false),
        ];
        let event = Event::new(Collision::new(0.0, true), vec![track], particles);
        task.process(Mode::Efficiency, &event, &mut registry);

        assert_eq!(registry.get("antiproton_eta_pt_pythia").unwrap().integral(), 2.0);
        assert_eq!(registry.get("antiproton_incl_gen").unwrap().integral(), 1.0);
        assert_eq!(registry.get("antideuteron_incl_gen").unwrap().integral(), 0.0);
        for name in ["antiproton_incl_all", "antiproton_incl_prim", "antiproton_incl_rec_tpc", "antiproton_incl_rec_tof"] {
            assert_eq!(registry.get(name).unwrap().integral(), 1.0, "{}", name);
        }
    }

    #[test]
    fn test_fork_changes_stream_only() {
        let base = task();
        let a = base.fork(3);
        let b = base.fork(3);
        assert_eq!(a.seed(), base.seed());
        let mut ra = a.rng.clone();
        let mut rb = b.rng.clone();
        let mut rc = base.fork(4).rng;
        let x: u64 = ra.gen();
        assert_eq!(x, rb.gen::<u64>());
        assert_ne!(x, rc.gen::<u64>());
    }
}
