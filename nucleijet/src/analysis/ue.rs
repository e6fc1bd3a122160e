//! Underlying-event cones perpendicular in azimuth to a jet.

use jetcore::geometry::axis::{delta_phi, effective_radius, perpendicular_axis, AxisSign};
use jetcore::geometry::vector::Vector3;
use jetcore::jet::cluster::Jet;

/// (Δη, Δφ) of a direction with respect to one cone axis.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ConeDistance {
    pub delta_eta: f64,
    pub delta_phi: f64,
}

impl ConeDistance {
    pub fn delta_r(&self) -> f64 {
        self.delta_eta.hypot(self.delta_phi)
    }
}

/// The two perpendicular cones of one jet.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct UeCones {
    pub axis1: Vector3,
    pub axis2: Vector3,
    pub radius: f64,
}

impl UeCones {
    /// Axes from a jet momentum and a radius reproducing the jet area as a circle.
    pub fn new(jet_axis: &Vector3, area: f64) -> Self {
        UeCones {
            axis1: perpendicular_axis(jet_axis, AxisSign::Plus),
            axis2: perpendicular_axis(jet_axis, AxisSign::Minus),
            radius: effective_radius(area),
        }
    }

    /// Cones of a jet, built from its momentum before background subtraction.
    pub fn from_jet(jet: &Jet) -> Self {
        UeCones::new(&jet.axis(), jet.area)
    }

    /// False when neither axis could be built.
    pub fn is_valid(&self) -> bool {
        !self.axis1.is_zero() || !self.axis2.is_zero()
    }

    fn distance_to(axis: &Vector3, eta: f64, phi: f64) -> Option<ConeDistance> {
        if axis.is_zero() {
            return None;
        }
        Some(ConeDistance {
            delta_eta: eta - axis.eta(),
            delta_phi: delta_phi(phi, axis.phi()),
        })
    }

    /// Distances to both axes; `None` for an axis that does not exist.
    pub fn distances(&self, eta: f64, phi: f64) -> (Option<ConeDistance>, Option<ConeDistance>) {
        (Self::distance_to(&self.axis1, eta, phi), Self::distance_to(&self.axis2, eta, phi))
    }

    /// Inside either cone, boundary included.
    pub fn contains(&self, eta: f64, phi: f64) -> bool {
        let (d1, d2) = self.distances(eta, phi);
        [d1, d2].iter().flatten().any(|d| d.delta_r() <= self.radius)
    }
}

/// Multiplicity and summed pt pooled over both cones.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct UeAccumulator {
    n: usize,
    sum_pt: f64,
}

/// Per-cone representative of the pooled quantities.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct UeSummary {
    pub multiplicity: f64,
    pub sum_pt: f64,
}

impl UeAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, pt: f64) {
        self.n += 1;
        self.sum_pt += pt;
    }

    pub fn count(&self) -> usize {
        self.n
    }

    /// The pooled sums divided by the two cones.
    pub fn halved(&self) -> UeSummary {
        UeSummary {
            multiplicity: 0.5 * self.n as f64,
            sum_pt: 0.5 * self.sum_pt,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::{FRAC_PI_2, PI};

    #[test]
    fn test_cones_sit_at_quarter_turn() {
        let cones = UeCones::new(&Vector3::new(10.0, 0.0, 0.0), PI * 0.09);
        assert_abs_diff_eq!(cones.radius, 0.3, epsilon = 1e-12);
        assert!(cones.contains(0.0, FRAC_PI_2));
        assert!(cones.contains(0.1, 3.0 * FRAC_PI_2 + 0.1));
        assert!(!cones.contains(0.0, 0.0));
        assert!(!cones.contains(0.0, FRAC_PI_2 + 0.31));
    }

    #[test]
    fn test_zero_axis_never_contains() {
        let cones = UeCones::new(&Vector3::new(0.0, 0.0, 5.0), 0.3);
        assert!(!cones.is_valid());
        assert!(!cones.contains(0.0, 0.0));
        assert!(!cones.contains(1e11, 0.0));
    }

    #[test]
    fn test_halving_applies_once() {
        let mut acc = UeAccumulator::new();
        for pt in [1.0, 2.0, 3.0] {
            acc.add(pt);
        }
        let summary = acc.halved();
        assert_eq!(summary.multiplicity, 1.5);
        assert_eq!(summary.sum_pt, 3.0);
        assert_eq!(acc.count(), 3);
        assert_eq!(acc.halved(), summary);
    }
}
