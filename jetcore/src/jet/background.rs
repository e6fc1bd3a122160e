//! Per-event diffuse background estimation and area-based subtraction.

use std::cmp::Ordering;
use std::f64::consts::{FRAC_PI_2, PI};

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use statrs::statistics::{Data, Median};

use crate::geometry::axis::delta_phi;
use crate::jet::cluster::Jet;
use crate::jet::pseudo_jet::PseudoJet;

/// Background transverse-momentum density and its companion density of the
/// "mass" term `sqrt(m^2 + pt^2) - pt`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BackgroundEstimate {
    pub rho: f64,
    pub rho_m: f64,
}

impl BackgroundEstimate {
    pub fn new(rho: f64, rho_m: f64) -> Self {
        BackgroundEstimate { rho, rho_m }
    }

    pub fn zero() -> Self {
        BackgroundEstimate::default()
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum BackgroundMethod {
    /// Median of pt/area over the jets, hardest jets removed.
    AreaMedian,
    /// Two cones perpendicular in azimuth to the leading jet.
    PerpCone,
}

/// Background estimator configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BackgroundEstimator {
    pub method: BackgroundMethod,
    /// Jet radius, also the perpendicular-cone radius.
    pub radius: f64,
    /// Only jets with |eta| < max_eta - radius enter the median.
    pub max_eta: f64,
    /// Number of hardest jets excluded from the median.
    pub n_hard_reject: usize,
}

impl Default for BackgroundEstimator {
    fn default() -> Self {
        Self {
            method: BackgroundMethod::AreaMedian,
            radius: 0.3,
            max_eta: 0.8,
            n_hard_reject: 2,
        }
    }
}

/// `sqrt(m^2 + pt^2) - pt` of a single four-vector.
#[inline]
fn mass_term(p: &PseudoJet) -> f64 {
    let m2 = p.m2().max(0.0);
    (m2 + p.pt2()).sqrt() - p.pt()
}

impl BackgroundEstimator {
    /// Estimates the background of one event. Must be called after clustering and
    /// before any jet is subtracted.
    pub fn estimate(&self, particles: &[PseudoJet], jets: &[Jet]) -> BackgroundEstimate {
        match self.method {
            BackgroundMethod::AreaMedian => self.estimate_area_median(jets),
            BackgroundMethod::PerpCone => self.estimate_perp_cone(particles, jets),
        }
    }

    /// Jet-median estimate. Falls back to zero when no jet survives the selection.
    pub fn estimate_area_median(&self, jets: &[Jet]) -> BackgroundEstimate {
        let max_abs_eta = self.max_eta - self.radius;

        let (rho_values, rho_m_values): (Vec<f64>, Vec<f64>) = jets
            .iter()
            .filter(|j| j.eta().abs() < max_abs_eta)
            .sorted_by(|a, b| b.momentum.pt2().partial_cmp(&a.momentum.pt2()).unwrap_or(Ordering::Equal))
            .skip(self.n_hard_reject)
            .filter(|j| j.area > 0.0)
            .map(|j| {
                let m_delta: f64 = j.constituents.iter().map(mass_term).sum();
                (j.pt() / j.area, m_delta / j.area)
            })
            .unzip();

        if rho_values.is_empty() {
            log::trace!("too few jets for a median background estimate, using zero");
            return BackgroundEstimate::zero();
        }

        BackgroundEstimate {
            rho: Data::new(rho_values).median(),
            rho_m: Data::new(rho_m_values).median(),
        }
    }

    /// Perpendicular-cone estimate around the leading jet.
    pub fn estimate_perp_cone(&self, particles: &[PseudoJet], jets: &[Jet]) -> BackgroundEstimate {
        let Some(leading) = jets.iter().max_by(|a, b| {
            a.momentum.pt2().partial_cmp(&b.momentum.pt2()).unwrap_or(Ordering::Equal)
        }) else {
            return BackgroundEstimate::zero();
        };

        let r2 = self.radius * self.radius;
        let perp_phi = [leading.phi() + FRAC_PI_2, leading.phi() - FRAC_PI_2];
        let leading_eta = leading.eta();

        let mut sum_pt = 0.0;
        let mut sum_m = 0.0;
        for p in particles {
            let d_eta = leading_eta - p.eta();
            for phi in perp_phi {
                let d_phi = delta_phi(p.phi(), phi);
                if d_phi * d_phi + d_eta * d_eta <= r2 {
                    sum_pt += p.pt();
                    sum_m += mass_term(p);
                }
            }
        }

        let cone_area = 2.0 * PI * r2;
        BackgroundEstimate {
            rho: sum_pt / cone_area,
            rho_m: sum_m / cone_area,
        }
    }
}

/// Subtracts `rho * A` from the jet four-momentum, returning the corrected copy.
///
/// With `use_rho_m` the longitudinal and energy components are reduced by
/// `(rho + rho_m) * A`. Jets whose transverse momentum would turn negative come back
/// as the zero four-vector, and a negative squared mass is reset to zero at fixed
/// pt, rapidity and azimuth.
pub fn subtract_rho_area(jet: &Jet, background: &BackgroundEstimate, use_rho_m: bool) -> PseudoJet {
    let area = &jet.area_4vector;
    let rho_long = if use_rho_m { background.rho + background.rho_m } else { background.rho };
    let to_subtract = PseudoJet::new(
        background.rho * area.px,
        background.rho * area.py,
        rho_long * area.pz,
        rho_long * area.e,
    );

    if to_subtract.pt2() >= jet.momentum.pt2() && to_subtract.pt2() > 0.0 {
        return PseudoJet::zero();
    }

    let subtracted = jet.momentum - to_subtract;
    if subtracted.m2() < 0.0 {
        let mut massless = PseudoJet::from_pt_y_phi(subtracted.pt(), subtracted.rap(), subtracted.phi());
        massless.user_index = subtracted.user_index;
        return massless;
    }
    subtracted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::MASS_PION_CHARGED;
    use crate::jet::area::GhostedAreaSpec;
    use crate::jet::cluster::{ClusterSequence, JetDefinition};
    use approx::assert_relative_eq;

    fn jet_with_area(pt: f64, eta: f64, phi: f64, area: f64) -> Jet {
        let momentum = PseudoJet::from_pt_y_phi(pt, eta, phi);
        Jet {
            momentum,
            constituents: vec![momentum],
            area,
            area_4vector: PseudoJet::from_pt_y_phi(area, eta, phi),
        }
    }

    #[test]
    fn test_median_rejects_hardest_jets() {
        let jets = vec![
            jet_with_area(50.0, 0.0, 0.0, 0.25),
            jet_with_area(30.0, 0.1, 2.0, 0.25),
            jet_with_area(1.0, 0.0, 3.0, 0.25),
            jet_with_area(2.0, 0.2, 4.0, 0.25),
            jet_with_area(3.0, -0.2, 5.0, 0.25),
        ];
        let estimate = BackgroundEstimator::default().estimate(&[], &jets);
        assert_relative_eq!(estimate.rho, 8.0, epsilon = 1e-12);
        // massless constituents carry no mass term
        assert_relative_eq!(estimate.rho_m, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_median_falls_back_to_zero() {
        let jets = vec![jet_with_area(50.0, 0.0, 0.0, 0.25), jet_with_area(30.0, 0.1, 2.0, 0.25)];
        assert_eq!(BackgroundEstimator::default().estimate(&[], &jets), BackgroundEstimate::zero());
        assert_eq!(BackgroundEstimator::default().estimate(&[], &[]), BackgroundEstimate::zero());
    }

    #[test]
    fn test_perp_cone_estimate() {
        let estimator = BackgroundEstimator {
            method: BackgroundMethod::PerpCone,
            ..BackgroundEstimator::default()
        };
        let jets = vec![jet_with_area(20.0, 0.0, 1.0, 0.28)];
        let particles = vec![
            PseudoJet::from_pt_y_phi(2.0, 0.0, 1.0 + FRAC_PI_2),
            PseudoJet::from_pt_y_phi(1.0, 0.1, 1.0 - FRAC_PI_2),
            PseudoJet::from_pt_y_phi(5.0, 0.0, 1.0),
        ];
        let estimate = estimator.estimate(&particles, &jets);
        assert_relative_eq!(estimate.rho, 3.0 / (2.0 * PI * 0.09), epsilon = 1e-9);
    }

    #[test]
    fn test_zero_rho_leaves_jet_unchanged() {
        let grid = GhostedAreaSpec::default().generate();
        let particles = vec![
            PseudoJet::from_pt_y_phi_m(8.0, 0.1, 2.0, MASS_PION_CHARGED).with_user_index(0),
            PseudoJet::from_pt_y_phi_m(2.0, 0.15, 2.1, MASS_PION_CHARGED).with_user_index(1),
        ];
        let jets = ClusterSequence::with_area(&particles, &JetDefinition::anti_kt(0.3), &grid).into_inclusive_jets();
        for use_rho_m in [false, true] {
            let subtracted = subtract_rho_area(&jets[0], &BackgroundEstimate::zero(), use_rho_m);
            assert_eq!(subtracted.px, jets[0].momentum.px);
            assert_eq!(subtracted.py, jets[0].momentum.py);
            assert_eq!(subtracted.pz, jets[0].momentum.pz);
            assert_eq!(subtracted.e, jets[0].momentum.e);
        }
    }

    #[test]
    fn test_subtraction_reduces_pt() {
        let jet = jet_with_area(10.0, 0.0, 1.0, 0.3);
        let subtracted = subtract_rho_area(&jet, &BackgroundEstimate::new(5.0, 0.0), false);
        assert_relative_eq!(subtracted.pt(), 8.5, epsilon = 1e-9);

        let swamped = subtract_rho_area(&jet, &BackgroundEstimate::new(100.0, 0.0), false);
        assert_eq!(swamped.pt(), 0.0);
    }
}
