use std::cmp::Ordering;
use std::f64::consts::TAU;
use std::ops::{Add, Sub};

use serde::{Deserialize, Serialize};

use crate::constants::MAX_RAP;
use crate::geometry::vector::Vector3;

/// Four-momentum as seen by the clustering, with an optional back-reference
/// (`user_index`) into the per-event arena of tracks or truth particles.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PseudoJet {
    pub px: f64,
    pub py: f64,
    pub pz: f64,
    pub e: f64,
    pub user_index: Option<usize>,
}

impl PseudoJet {
    /// Creates a new `PseudoJet` instance.
    ///
    /// # Arguments
    ///
    /// * `px`, `py`, `pz` - momentum components in GeV/c.
    /// * `e` - energy in GeV.
    ///
    /// # Examples
    ///
    /// ```
    /// use jetcore::jet::pseudo_jet::PseudoJet;
    ///
    /// let p = PseudoJet::new(3.0, 4.0, 0.0, 5.0);
    /// assert_eq!(p.pt(), 5.0);
    /// ```
    pub fn new(px: f64, py: f64, pz: f64, e: f64) -> Self {
        PseudoJet { px, py, pz, e, user_index: None }
    }

    /// Four-momentum of a particle with 3-momentum (px, py, pz) under the given mass hypothesis.
    pub fn from_momentum_and_mass(px: f64, py: f64, pz: f64, mass: f64) -> Self {
        let e = (px * px + py * py + pz * pz + mass * mass).sqrt();
        PseudoJet::new(px, py, pz, e)
    }

    /// Massless four-momentum from transverse momentum, rapidity and azimuth.
    pub fn from_pt_y_phi(pt: f64, rap: f64, phi: f64) -> Self {
        PseudoJet::from_pt_y_phi_m(pt, rap, phi, 0.0)
    }

    pub fn from_pt_y_phi_m(pt: f64, rap: f64, phi: f64, m: f64) -> Self {
        let mt = (pt * pt + m * m).sqrt();
        PseudoJet::new(pt * phi.cos(), pt * phi.sin(), mt * rap.sinh(), mt * rap.cosh())
    }

    pub fn with_user_index(mut self, index: usize) -> Self {
        self.user_index = Some(index);
        self
    }

    pub fn zero() -> Self {
        PseudoJet::default()
    }

    pub fn pt2(&self) -> f64 {
        self.px * self.px + self.py * self.py
    }

    pub fn pt(&self) -> f64 {
        self.pt2().sqrt()
    }

    pub fn m2(&self) -> f64 {
        (self.e + self.pz) * (self.e - self.pz) - self.pt2()
    }

    /// Invariant mass, negative for space-like four-vectors.
    pub fn m(&self) -> f64 {
        let m2 = self.m2();
        if m2 < 0.0 { -(-m2).sqrt() } else { m2.sqrt() }
    }

    /// Azimuth in [0, 2pi).
    pub fn phi(&self) -> f64 {
        if self.pt2() == 0.0 {
            return 0.0;
        }
        let phi = self.py.atan2(self.px);
        if phi < 0.0 { phi + TAU } else if phi >= TAU { phi - TAU } else { phi }
    }

    /// Rapidity, numerically stable near |pz| = E; +/-MAX_RAP along the beam.
    pub fn rap(&self) -> f64 {
        let pt2 = self.pt2();
        if self.e == self.pz.abs() && pt2 == 0.0 {
            let max_rap_here = MAX_RAP + self.pz.abs();
            return if self.pz >= 0.0 { max_rap_here } else { -max_rap_here };
        }
        let effective_m2 = self.m2().max(0.0);
        let e_plus_pz = self.e + self.pz.abs();
        let rap = 0.5 * ((pt2 + effective_m2) / (e_plus_pz * e_plus_pz)).ln();
        if self.pz > 0.0 { -rap } else { rap }
    }

    pub fn eta(&self) -> f64 {
        let pt = self.pt();
        if pt == 0.0 {
            let max_rap_here = MAX_RAP + self.pz.abs();
            return if self.pz >= 0.0 { max_rap_here } else { -max_rap_here };
        }
        (self.pz / pt).asinh()
    }

    pub fn momentum(&self) -> Vector3 {
        Vector3::new(self.px, self.py, self.pz)
    }

    /// Squared distance in the (rapidity, phi) plane.
    pub fn plain_distance(&self, other: &PseudoJet) -> f64 {
        squared_distance(self.rap(), self.phi(), other.rap(), other.phi())
    }

    /// Sorts in place by descending transverse momentum.
    pub fn sort_by_pt(jets: &mut [PseudoJet]) {
        jets.sort_by(|a, b| b.pt2().partial_cmp(&a.pt2()).unwrap_or(Ordering::Equal));
    }
}

/// Squared (rapidity, phi) distance with the azimuthal difference wrapped into [0, pi].
#[inline]
pub fn squared_distance(rap1: f64, phi1: f64, rap2: f64, phi2: f64) -> f64 {
    let mut d_phi = (phi1 - phi2).abs();
    if d_phi > std::f64::consts::PI {
        d_phi = TAU - d_phi;
    }
    let d_rap = rap1 - rap2;
    d_rap * d_rap + d_phi * d_phi
}

impl Add for PseudoJet {
    type Output = PseudoJet;

    // E-scheme recombination; the sum no longer refers to a single input
    fn add(self, rhs: PseudoJet) -> PseudoJet {
        PseudoJet::new(self.px + rhs.px, self.py + rhs.py, self.pz + rhs.pz, self.e + rhs.e)
    }
}

impl Sub for PseudoJet {
    type Output = PseudoJet;

    fn sub(self, rhs: PseudoJet) -> PseudoJet {
        PseudoJet {
            px: self.px - rhs.px,
            py: self.py - rhs.py,
            pz: self.pz - rhs.pz,
            e: self.e - rhs.e,
            user_index: self.user_index,
        }
    }
}
