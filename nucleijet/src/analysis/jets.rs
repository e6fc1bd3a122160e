//! Jet finding and selection for one event.

use jetcore::constants::MASS_PION_CHARGED;
use jetcore::jet::area::{GhostGrid, GhostedAreaSpec};
use jetcore::jet::background::{subtract_rho_area, BackgroundEstimate, BackgroundEstimator};
use jetcore::jet::cluster::{ClusterSequence, Jet, JetDefinition};
use jetcore::jet::pseudo_jet::PseudoJet;

use crate::analysis::config::JetConfig;
use crate::data::particle::McParticle;
use crate::data::track::TrackView;
use crate::selection::filter::{passed_jet_reconstruction, TrackCuts};

/// Minimum pt of generated particles entering the truth-level jet finder.
pub const MIN_PT_GENERATED: f64 = 0.1;

/// Clustering input from reconstructed tracks: jet-reconstruction selection,
/// charged-pion mass hypothesis, user index = position in the track arena.
pub fn track_input<T: TrackView>(tracks: &[T]) -> Vec<PseudoJet> {
    tracks
        .iter()
        .enumerate()
        .filter(|(_, track)| passed_jet_reconstruction(*track))
        .map(|(index, track)| {
            PseudoJet::from_momentum_and_mass(track.px(), track.py(), track.pz(), MASS_PION_CHARGED).with_user_index(index)
        })
        .collect()
}

/// Generated primaries accepted for truth-level jets.
pub fn accepts_generated(particle: &McParticle, cuts: &TrackCuts) -> bool {
    particle.is_physical_primary && cuts.eta_accepted(particle.eta()) && particle.pt() >= MIN_PT_GENERATED
}

/// Clustering input from generated primaries, user index = position in the particle arena.
pub fn particle_input(particles: &[McParticle], cuts: &TrackCuts) -> Vec<PseudoJet> {
    particles
        .iter()
        .enumerate()
        .filter(|(_, particle)| accepts_generated(particle, cuts))
        .map(|(index, p)| PseudoJet::from_momentum_and_mass(p.px, p.py, p.pz, MASS_PION_CHARGED).with_user_index(index))
        .collect()
}

/// Jets of one event together with the event background.
#[derive(Clone, Debug)]
pub struct ClusteredEvent {
    pub jets: Vec<Jet>,
    pub background: BackgroundEstimate,
}

/// Anti-kt with active areas followed by the background estimate.
///
/// The ghost grid is generated once and reused for every event.
#[derive(Clone, Debug)]
pub struct JetFinder {
    definition: JetDefinition,
    ghosts: GhostGrid,
    estimator: BackgroundEstimator,
    use_rho_m: bool,
}

impl JetFinder {
    pub fn new(config: &JetConfig, max_eta: f64) -> Self {
        let spec = GhostedAreaSpec {
            ghost_max_rap: config.ghost_max_rap,
            ghost_area: config.ghost_area,
            ..GhostedAreaSpec::default()
        };
        JetFinder {
            definition: JetDefinition::anti_kt(config.r_jet),
            ghosts: spec.generate(),
            estimator: BackgroundEstimator {
                method: config.background_method,
                radius: config.r_jet,
                max_eta,
                n_hard_reject: config.n_hard_reject,
            },
            use_rho_m: config.use_rho_mass,
        }
    }

    /// Clusters and estimates the background; `None` for an empty input.
    pub fn cluster(&self, particles: &[PseudoJet]) -> Option<ClusteredEvent> {
        if particles.is_empty() {
            return None;
        }
        let jets = ClusterSequence::with_area(particles, &self.definition, &self.ghosts).into_inclusive_jets();
        let background = self.estimator.estimate(particles, &jets);
        log::trace!(
            "{} jets from {} particles, rho = {:.3}, rho_m = {:.3}",
            jets.len(),
            particles.len(),
            background.rho,
            background.rho_m
        );
        Some(ClusteredEvent { jets, background })
    }

    /// Background-subtracted jet momentum; the jet itself is untouched.
    pub fn subtract(&self, jet: &Jet, background: &BackgroundEstimate) -> PseudoJet {
        subtract_rho_area(jet, background, self.use_rho_m)
    }
}

/// Fiducial acceptance and pt threshold.
#[derive(Clone, Debug, PartialEq)]
pub struct JetSelector {
    pub r_jet: f64,
    pub max_eta: f64,
    pub delta_eta_edge: f64,
    pub min_jet_pt: f64,
}

impl JetSelector {
    pub fn new(config: &JetConfig, max_eta: f64) -> Self {
        JetSelector {
            r_jet: config.r_jet,
            max_eta,
            delta_eta_edge: config.delta_eta_edge,
            min_jet_pt: config.min_jet_pt,
        }
    }

    /// The whole cone lies inside the acceptance, leaving the edge margin.
    pub fn in_acceptance(&self, jet: &Jet) -> bool {
        jet.eta().abs() + self.r_jet <= self.max_eta - self.delta_eta_edge
    }

    pub fn passes_pt(&self, corrected_pt: f64) -> bool {
        corrected_pt >= self.min_jet_pt
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::track::Track;
    use proptest::prelude::*;

    #[test]
    fn test_track_input_keeps_arena_indices() {
        let tracks = vec![
            Track::from_pt_eta_phi(1.0, 0.0, 0.0, 1),
            Track::from_pt_eta_phi(0.05, 0.0, 1.0, 1),
            Track::from_pt_eta_phi(2.0, 0.3, 2.0, -1),
        ];
        let input = track_input(&tracks);
        assert_eq!(input.len(), 2);
        assert_eq!(input[0].user_index, Some(0));
        assert_eq!(input[1].user_index, Some(2));
        assert!((input[1].m() - MASS_PION_CHARGED).abs() < 1e-9);
    }

    #[test]
    fn test_particle_input_requires_primaries() {
        let cuts = TrackCuts::default();
        let particles = vec![
            McParticle::from_pt_eta_phi(1.0, 0.0, 0.0, 211, true),
            McParticle::from_pt_eta_phi(1.0, 0.0, 0.0, 211, false),
            McParticle::from_pt_eta_phi(1.0, 0.9, 0.0, 211, true),
            McParticle::from_pt_eta_phi(0.05, 0.0, 0.0, 211, true),
        ];
        let input = particle_input(&particles, &cuts);
        assert_eq!(input.len(), 1);
        assert_eq!(input[0].user_index, Some(0));
    }

    #[test]
    fn test_empty_input_gives_no_jets() {
        let finder = JetFinder::new(&JetConfig::default(), 0.8);
        assert!(finder.cluster(&[]).is_none());
    }

    fn jet_at(eta: f64, pt: f64) -> Jet {
        let momentum = PseudoJet::from_pt_y_phi(pt, eta, 1.0);
        Jet { momentum, constituents: vec![momentum], area: 0.28, area_4vector: PseudoJet::zero() }
    }

    #[test]
    fn test_acceptance_edge() {
        let selector = JetSelector::new(&JetConfig::default(), 0.8);
        assert!(selector.in_acceptance(&jet_at(0.44, 20.0)));
        assert!(!selector.in_acceptance(&jet_at(0.46, 20.0)));
        assert!(!selector.in_acceptance(&jet_at(-0.46, 20.0)));
        assert!(selector.passes_pt(10.0));
        assert!(!selector.passes_pt(9.99));
    }

    proptest! {
        #[test]
        fn jets_beyond_the_edge_are_never_accepted(eta in 0.4501f64..3.0, pt in 0.1f64..1000.0, negative in any::<bool>()) {
            let selector = JetSelector::new(&JetConfig::default(), 0.8);
            let eta = if negative { -eta } else { eta };
            prop_assert!(!selector.in_acceptance(&jet_at(eta, pt)));
        }
    }
}
