use serde::{Deserialize, Serialize};

use crate::data::particle::McParticle;
use crate::data::track::{Track, TrackView};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Collision {
    /// Longitudinal position of the primary vertex in cm.
    pub pos_z: f64,
    /// Minimum-bias event selection.
    pub sel8: bool,
}

impl Collision {
    pub fn new(pos_z: f64, sel8: bool) -> Self {
        Collision { pos_z, sel8 }
    }

    /// Event-quality gate: minimum-bias flag and vertex within `max_z`.
    pub fn is_selected(&self, max_z: f64) -> bool {
        self.sel8 && self.pos_z.abs() <= max_z
    }
}

/// One collision with its track arena and, for simulated data, its generated particles.
///
/// Tracks refer to their generated particle by index into `mc_particles`, and
/// clustering inputs refer to tracks by index into `tracks`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub collision: Collision,
    #[serde(default)]
    pub tracks: Vec<Track>,
    #[serde(default)]
    pub mc_particles: Vec<McParticle>,
}

impl Event {
    pub fn new(collision: Collision, tracks: Vec<Track>, mc_particles: Vec<McParticle>) -> Self {
        Event { collision, tracks, mc_particles }
    }

    pub fn track(&self, index: usize) -> Option<&Track> {
        self.tracks.get(index)
    }

    /// Generated particle matched to the track, if any.
    pub fn mc_particle_of<T: TrackView + ?Sized>(&self, track: &T) -> Option<&McParticle> {
        track.mc_particle_index().and_then(|index| self.mc_particles.get(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertex_gate() {
        assert!(Collision::new(-9.9, true).is_selected(10.0));
        assert!(Collision::new(10.0, true).is_selected(10.0));
        assert!(!Collision::new(10.5, true).is_selected(10.0));
        assert!(!Collision::new(0.0, false).is_selected(10.0));
    }

    #[test]
    fn test_truth_link() {
        let mut track = Track::from_pt_eta_phi(1.0, 0.0, 0.0, -1);
        track.mc_particle = Some(1);
        let event = Event::new(
            Collision::new(0.0, true),
            vec![track.clone()],
            vec![McParticle::default(), McParticle::new(1.0, 0.0, 0.0, -2212, true)],
        );
        assert_eq!(event.mc_particle_of(&track).map(|p| p.pdg_code), Some(-2212));

        track.mc_particle = Some(5);
        assert!(event.mc_particle_of(&track).is_none());
    }
}
