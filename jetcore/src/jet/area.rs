//! Active-area ghosts.
//!
//! A regular grid of infinitesimally soft "ghost" particles is clustered together
//! with the real inputs; the number of ghosts a jet captures measures its area.

use std::f64::consts::TAU;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::jet::pseudo_jet::PseudoJet;

/// Ghost grid parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GhostedAreaSpec {
    /// Ghosts cover |y| < ghost_max_rap.
    pub ghost_max_rap: f64,
    /// Nominal area of one grid cell.
    pub ghost_area: f64,
    /// Fraction of a cell by which a ghost is randomly displaced.
    pub grid_scatter: f64,
    /// Relative random spread of the ghost transverse momenta.
    pub pt_scatter: f64,
    pub mean_ghost_pt: f64,
    /// Seed of the scatter, so that areas are reproducible.
    pub seed: u64,
}

impl Default for GhostedAreaSpec {
    fn default() -> Self {
        Self {
            ghost_max_rap: 1.0,
            ghost_area: 0.01,
            grid_scatter: 1.0,
            pt_scatter: 0.1,
            mean_ghost_pt: 1e-100,
            seed: 12345,
        }
    }
}

/// One generated ghost: its four-momentum and its (rapidity, phi) position.
#[derive(Copy, Clone, Debug)]
pub struct Ghost {
    pub momentum: PseudoJet,
    pub rap: f64,
    pub phi: f64,
}

/// A realised ghost grid.
#[derive(Clone, Debug)]
pub struct GhostGrid {
    pub ghosts: Vec<Ghost>,
    /// Area represented by each ghost after the grid has been fitted to the acceptance.
    pub actual_ghost_area: f64,
}

impl GhostedAreaSpec {
    /// Number of cells along (rapidity, phi) and the cell sizes.
    fn grid_dimensions(&self) -> (usize, usize, f64, f64) {
        let cell = self.ghost_area.sqrt();
        let n_phi = (TAU / cell).ceil().max(1.0) as usize;
        let d_phi = TAU / n_phi as f64;
        let n_rap = (self.ghost_max_rap / cell).ceil().max(1.0) as usize;
        let d_rap = self.ghost_max_rap / n_rap as f64;
        (n_rap, n_phi, d_rap, d_phi)
    }

    /// Generates the ghost grid.
    ///
    /// # Examples
    ///
    /// ```
    /// use jetcore::jet::area::GhostedAreaSpec;
    ///
    /// let grid = GhostedAreaSpec::default().generate();
    /// assert_eq!(grid.ghosts.len(), 20 * 63);
    /// ```
    pub fn generate(&self) -> GhostGrid {
        let (n_rap, n_phi, d_rap, d_phi) = self.grid_dimensions();
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut ghosts = Vec::with_capacity(2 * n_rap * n_phi);

        let n_rap = n_rap as i64;
        for i_rap in -n_rap..n_rap {
            for i_phi in 0..n_phi {
                let rap = (i_rap as f64 + 0.5 + self.grid_scatter * (rng.gen::<f64>() - 0.5)) * d_rap;
                let phi = (i_phi as f64 + 0.5 + self.grid_scatter * (rng.gen::<f64>() - 0.5)) * d_phi;
                let pt = self.mean_ghost_pt * (1.0 + self.pt_scatter * (rng.gen::<f64>() - 0.5));
                ghosts.push(Ghost {
                    momentum: PseudoJet::from_pt_y_phi(pt, rap, phi),
                    rap,
                    phi,
                });
            }
        }

        GhostGrid {
            ghosts,
            actual_ghost_area: d_rap * d_phi,
        }
    }
}

impl GhostGrid {
    pub fn len(&self) -> usize {
        self.ghosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ghosts.is_empty()
    }

    /// Area four-vector contribution of one ghost: a unit-pt massless vector at the
    /// ghost position scaled by the ghost area.
    pub fn area_four_vector(&self, ghost: &Ghost) -> PseudoJet {
        PseudoJet::from_pt_y_phi(self.actual_ghost_area, ghost.rap, ghost.phi)
    }

    /// Total area covered by the grid.
    pub fn total_area(&self) -> f64 {
        self.actual_ghost_area * self.ghosts.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_grid_covers_acceptance() {
        let spec = GhostedAreaSpec::default();
        let grid = spec.generate();
        assert_relative_eq!(grid.total_area(), 2.0 * TAU, epsilon = 1e-9);
        assert!(grid.ghosts.iter().all(|g| g.rap.abs() < 1.0 + 0.05));
        assert!(grid.ghosts.iter().all(|g| g.momentum.pt() < 1e-99));
    }

    #[test]
    fn test_grid_is_reproducible() {
        let a = GhostedAreaSpec::default().generate();
        let b = GhostedAreaSpec::default().generate();
        assert_eq!(a.ghosts[17].rap, b.ghosts[17].rap);
        assert_eq!(a.ghosts[17].phi, b.ghosts[17].phi);
    }
}
