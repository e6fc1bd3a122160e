//! Sequential-recombination clustering (generalised kt family) with active areas.
//!
//! Nearest-neighbour bookkeeping follows the usual N^2 strategy: every pseudojet
//! keeps its geometric nearest neighbour, the smallest of `w_i * dR^2 / R^2` (or the
//! beam distance `w_i`) is processed, and only the neighbour lists touched by the
//! merge are rescanned.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::geometry::vector::Vector3;
use crate::jet::area::GhostGrid;
use crate::jet::pseudo_jet::{squared_distance, PseudoJet};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum JetAlgorithm {
    AntiKt,
    Kt,
    CambridgeAachen,
}

impl JetAlgorithm {
    /// Momentum weight `w` entering `d_ij = min(w_i, w_j) dR^2 / R^2` and `d_iB = w_i`.
    #[inline]
    fn weight(&self, pt2: f64) -> f64 {
        match self {
            JetAlgorithm::AntiKt => {
                if pt2 > 0.0 { 1.0 / pt2 } else { f64::MAX }
            }
            JetAlgorithm::Kt => pt2,
            JetAlgorithm::CambridgeAachen => 1.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JetDefinition {
    pub algorithm: JetAlgorithm,
    pub radius: f64,
}

impl JetDefinition {
    pub fn new(algorithm: JetAlgorithm, radius: f64) -> Self {
        JetDefinition { algorithm, radius }
    }

    pub fn anti_kt(radius: f64) -> Self {
        JetDefinition::new(JetAlgorithm::AntiKt, radius)
    }
}

/// A clustered jet.
#[derive(Clone, Debug, PartialEq)]
pub struct Jet {
    /// Sum of the real constituents (ghosts excluded).
    pub momentum: PseudoJet,
    /// Input pseudojets that ended up in this jet, with their user indices.
    pub constituents: Vec<PseudoJet>,
    /// Catchment area, zero when clustered without ghosts.
    pub area: f64,
    pub area_4vector: PseudoJet,
}

impl Jet {
    pub fn pt(&self) -> f64 {
        self.momentum.pt()
    }

    pub fn eta(&self) -> f64 {
        self.momentum.eta()
    }

    pub fn phi(&self) -> f64 {
        self.momentum.phi()
    }

    pub fn rap(&self) -> f64 {
        self.momentum.rap()
    }

    pub fn axis(&self) -> Vector3 {
        self.momentum.momentum()
    }

    pub fn n_constituents(&self) -> usize {
        self.constituents.len()
    }

    /// Back-references of the constituents into the per-event arena.
    pub fn constituent_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.constituents.iter().filter_map(|c| c.user_index)
    }
}

// ---------------------------------------------------------------------------
// Internal bookkeeping
// ---------------------------------------------------------------------------

struct Entry {
    momentum: PseudoJet,
    rap: f64,
    phi: f64,
    weight: f64,
    nn: Option<usize>,
    // geometric distance to nn, capped at R^2
    nn_dist: f64,
    real: Vec<usize>,
    n_ghosts: usize,
    area_4vector: PseudoJet,
    active: bool,
}

impl Entry {
    fn distance(&self, other: &Entry) -> f64 {
        squared_distance(self.rap, self.phi, other.rap, other.phi)
    }
}

/// Result of clustering one event.
#[derive(Clone, Debug)]
pub struct ClusterSequence {
    jets: Vec<Jet>,
}

impl ClusterSequence {
    /// Clusters without area information.
    pub fn new(particles: &[PseudoJet], definition: &JetDefinition) -> Self {
        Self::run(particles, definition, None)
    }

    /// Clusters the particles together with the ghost grid, giving every jet an area.
    ///
    /// # Examples
    ///
    /// ```
    /// use jetcore::jet::area::GhostedAreaSpec;
    /// use jetcore::jet::cluster::{ClusterSequence, JetDefinition};
    /// use jetcore::jet::pseudo_jet::PseudoJet;
    ///
    /// let grid = GhostedAreaSpec::default().generate();
    /// let particles = vec![PseudoJet::from_pt_y_phi(10.0, 0.0, 1.0).with_user_index(0)];
    /// let cs = ClusterSequence::with_area(&particles, &JetDefinition::anti_kt(0.3), &grid);
    /// let jets = cs.inclusive_jets();
    /// assert_eq!(jets.len(), 1);
    /// assert!((jets[0].area - std::f64::consts::PI * 0.09).abs() < 0.05);
    /// ```
    pub fn with_area(particles: &[PseudoJet], definition: &JetDefinition, grid: &GhostGrid) -> Self {
        Self::run(particles, definition, Some(grid))
    }

    /// Inclusive jets sorted by descending transverse momentum.
    pub fn inclusive_jets(&self) -> &[Jet] {
        &self.jets
    }

    pub fn into_inclusive_jets(self) -> Vec<Jet> {
        self.jets
    }

    fn run(particles: &[PseudoJet], definition: &JetDefinition, grid: Option<&GhostGrid>) -> Self {
        let r2 = definition.radius * definition.radius;
        let algorithm = definition.algorithm;

        let n_ghosts = grid.map(|g| g.len()).unwrap_or(0);
        let mut entries: Vec<Entry> = Vec::with_capacity(particles.len() + n_ghosts);

        for (i, p) in particles.iter().enumerate() {
            entries.push(Entry {
                momentum: *p,
                rap: p.rap(),
                phi: p.phi(),
                weight: algorithm.weight(p.pt2()),
                nn: None,
                nn_dist: r2,
                real: vec![i],
                n_ghosts: 0,
                area_4vector: PseudoJet::zero(),
                active: true,
            });
        }
        if let Some(grid) = grid {
            for ghost in &grid.ghosts {
                entries.push(Entry {
                    momentum: ghost.momentum,
                    rap: ghost.rap,
                    phi: ghost.phi,
                    weight: algorithm.weight(ghost.momentum.pt2()),
                    nn: None,
                    nn_dist: r2,
                    real: Vec::new(),
                    n_ghosts: 1,
                    area_4vector: grid.area_four_vector(ghost),
                    active: true,
                });
            }
        }

        for i in 0..entries.len() {
            rescan_neighbour(&mut entries, i, r2);
        }

        let ghost_area = grid.map(|g| g.actual_ghost_area).unwrap_or(0.0);
        let mut jets: Vec<Jet> = Vec::new();
        let mut n_active = entries.len();

        while n_active > 0 {
            // smallest distance among the active entries
            let mut best: Option<(usize, f64)> = None;
            for (i, e) in entries.iter().enumerate() {
                if !e.active {
                    continue;
                }
                let d = e.weight * (e.nn_dist / r2);
                if best.map_or(true, |(_, d_best)| d < d_best) {
                    best = Some((i, d));
                }
            }
            let Some((i, _)) = best else { break };

            match entries[i].nn {
                Some(j) => {
                    // recombine j into slot i
                    let (momentum_j, real_j, ghosts_j, area_j) = {
                        let ej = &mut entries[j];
                        ej.active = false;
                        (ej.momentum, std::mem::take(&mut ej.real), ej.n_ghosts, ej.area_4vector)
                    };
                    n_active -= 1;

                    let ei = &mut entries[i];
                    ei.momentum = ei.momentum + momentum_j;
                    ei.rap = ei.momentum.rap();
                    ei.phi = ei.momentum.phi();
                    ei.weight = algorithm.weight(ei.momentum.pt2());
                    ei.real.extend(real_j);
                    ei.n_ghosts += ghosts_j;
                    ei.area_4vector = ei.area_4vector + area_j;

                    update_after_merge(&mut entries, i, j, r2);
                }
                None => {
                    let ei = &mut entries[i];
                    ei.active = false;
                    n_active -= 1;

                    if !ei.real.is_empty() {
                        let constituents: Vec<PseudoJet> = ei.real.iter().map(|&k| particles[k]).collect();
                        let momentum = constituents
                            .iter()
                            .fold(PseudoJet::zero(), |acc, c| acc + *c);
                        jets.push(Jet {
                            momentum,
                            constituents,
                            area: ei.n_ghosts as f64 * ghost_area,
                            area_4vector: ei.area_4vector,
                        });
                    }

                    update_after_removal(&mut entries, i, r2);
                }
            }
        }

        jets.sort_by(|a, b| {
            b.momentum
                .pt2()
                .partial_cmp(&a.momentum.pt2())
                .unwrap_or(Ordering::Equal)
        });

        ClusterSequence { jets }
    }
}

fn rescan_neighbour(entries: &mut [Entry], i: usize, r2: f64) {
    let mut nn = None;
    let mut nn_dist = r2;
    for (j, other) in entries.iter().enumerate() {
        if j == i || !other.active {
            continue;
        }
        let d = entries[i].distance(other);
        if d < nn_dist {
            nn_dist = d;
            nn = Some(j);
        }
    }
    let e = &mut entries[i];
    e.nn = nn;
    e.nn_dist = nn_dist;
}

fn update_after_merge(entries: &mut [Entry], merged: usize, removed: usize, r2: f64) {
    rescan_neighbour(entries, merged, r2);
    for m in 0..entries.len() {
        if m == merged || !entries[m].active {
            continue;
        }
        if entries[m].nn == Some(merged) || entries[m].nn == Some(removed) {
            rescan_neighbour(entries, m, r2);
        } else {
            let d = entries[m].distance(&entries[merged]);
            if d < entries[m].nn_dist {
                entries[m].nn = Some(merged);
                entries[m].nn_dist = d;
            }
        }
    }
}

fn update_after_removal(entries: &mut [Entry], removed: usize, r2: f64) {
    for m in 0..entries.len() {
        if entries[m].active && entries[m].nn == Some(removed) {
            rescan_neighbour(entries, m, r2);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::MASS_PION_CHARGED;
    use crate::jet::area::GhostedAreaSpec;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    fn particle(pt: f64, rap: f64, phi: f64, index: usize) -> PseudoJet {
        PseudoJet::from_pt_y_phi_m(pt, rap, phi, MASS_PION_CHARGED).with_user_index(index)
    }

    #[test]
    fn test_anti_kt_separated_particles() {
        let particles = vec![particle(5.0, 0.0, 1.0, 0), particle(3.0, 0.0, 2.0, 1)];
        let cs = ClusterSequence::new(&particles, &JetDefinition::anti_kt(0.4));
        let jets = cs.inclusive_jets();
        assert_eq!(jets.len(), 2);
        assert_relative_eq!(jets[0].pt(), 5.0, epsilon = 1e-9);
        assert_eq!(jets[0].constituent_indices().collect::<Vec<_>>(), vec![0]);
        assert_eq!(jets[1].constituent_indices().collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn test_anti_kt_merges_close_particles() {
        let particles = vec![
            particle(5.0, 0.0, 1.0, 0),
            particle(1.0, 0.1, 1.05, 1),
            particle(0.5, -0.1, 0.95, 2),
        ];
        let jets = ClusterSequence::new(&particles, &JetDefinition::anti_kt(0.3)).into_inclusive_jets();
        assert_eq!(jets.len(), 1);
        let mut idx: Vec<usize> = jets[0].constituent_indices().collect();
        idx.sort();
        assert_eq!(idx, vec![0, 1, 2]);
    }

    #[test]
    fn test_constituents_partition_inputs() {
        let particles: Vec<PseudoJet> = (0..30)
            .map(|i| particle(0.5 + 0.1 * i as f64, -0.7 + 0.05 * i as f64, 0.21 * i as f64, i))
            .collect();
        for algorithm in [JetAlgorithm::AntiKt, JetAlgorithm::Kt, JetAlgorithm::CambridgeAachen] {
            let jets = ClusterSequence::new(&particles, &JetDefinition::new(algorithm, 0.4)).into_inclusive_jets();
            let mut all: Vec<usize> = jets.iter().flat_map(|j| j.constituent_indices()).collect();
            all.sort();
            assert_eq!(all, (0..30).collect::<Vec<_>>());
        }
    }

    #[test]
    fn test_isolated_jet_area() {
        let grid = GhostedAreaSpec::default().generate();
        let particles = vec![particle(20.0, 0.0, 3.0, 0)];
        let jets = ClusterSequence::with_area(&particles, &JetDefinition::anti_kt(0.3), &grid).into_inclusive_jets();
        assert_eq!(jets.len(), 1);
        assert!((jets[0].area / (PI * 0.09) - 1.0).abs() < 0.15);
        assert!(jets[0].area_4vector.pt() > 0.0);
        // ghosts do not leak into the jet momentum
        assert_relative_eq!(jets[0].pt(), 20.0, epsilon = 1e-9);
    }

    #[test]
    fn test_jets_sorted_by_pt() {
        let particles = vec![
            particle(1.0, 0.0, 0.5, 0),
            particle(7.0, 0.3, 2.5, 1),
            particle(3.0, -0.3, 4.5, 2),
        ];
        let jets = ClusterSequence::new(&particles, &JetDefinition::anti_kt(0.3)).into_inclusive_jets();
        assert!(jets.windows(2).all(|w| w[0].pt() >= w[1].pt()));
    }
}
