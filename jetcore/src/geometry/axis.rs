//! Azimuthal geometry: perpendicular axes and angular distances.

use std::f64::consts::{PI, TAU};

use crate::geometry::vector::Vector3;

/// Selects one of the two roots of the perpendicular-axis equation.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum AxisSign {
    Plus,
    Minus,
}

impl AxisSign {
    pub fn value(&self) -> f64 {
        match self {
            AxisSign::Plus => 1.0,
            AxisSign::Minus => -1.0,
        }
    }
}

/// Axis `u` with `u . p = 0` and `u.z = p.z`, i.e. perpendicular to `p` while keeping
/// its longitudinal component. The two signs give the two solutions.
///
/// Returns the zero vector when `p` has no transverse component, and (with a warning)
/// when no real solution exists, which happens for |p.z| > |p_T|.
///
/// # Examples
///
/// ```
/// use jetcore::geometry::axis::{perpendicular_axis, AxisSign};
/// use jetcore::geometry::vector::Vector3;
///
/// let u = perpendicular_axis(&Vector3::new(3.0, 4.0, 0.0), AxisSign::Plus);
/// assert!((u.x - 4.0).abs() < 1e-12 && (u.y + 3.0).abs() < 1e-12);
/// ```
pub fn perpendicular_axis(p: &Vector3, sign: AxisSign) -> Vector3 {
    let (px, py, pz) = (p.x, p.y, p.z);
    let s = sign.value();

    let px2 = px * px;
    let py2 = py * py;
    let pz2 = pz * pz;
    let pz4 = pz2 * pz2;

    if px == 0.0 && py == 0.0 {
        return Vector3::zero();
    }

    if px == 0.0 {
        let radicand = py2 - pz4 / py2;
        if radicand < 0.0 {
            log::warn!("invalid input in perpendicular_axis: px = 0, radicand = {}", radicand);
            return Vector3::zero();
        }
        return Vector3::new(s * radicand.sqrt(), -pz2 / py, pz);
    }

    if py == 0.0 {
        let radicand = px2 - pz4 / px2;
        if radicand < 0.0 {
            log::warn!("invalid input in perpendicular_axis: py = 0, radicand = {}", radicand);
            return Vector3::zero();
        }
        return Vector3::new(-pz2 / px, s * radicand.sqrt(), pz);
    }

    // a * ux^2 + b * ux + c = 0
    let a = px2 + py2;
    let b = 2.0 * px * pz2;
    let c = pz4 - py2 * py2 - px2 * py2;
    let delta = b * b - 4.0 * a * c;

    if delta < 0.0 || a == 0.0 {
        log::warn!("invalid input in perpendicular_axis: delta = {}, a = {}", delta, a);
        return Vector3::zero();
    }

    let ux = (-b + s * delta.sqrt()) / (2.0 * a);
    let uy = (-pz2 - px * ux) / py;
    Vector3::new(ux, uy, pz)
}

/// Maps an angle into [0, 2pi).
#[inline]
pub fn phi_0_2pi(phi: f64) -> f64 {
    let wrapped = phi.rem_euclid(TAU);
    // rem_euclid can round up to exactly 2pi for tiny negative inputs
    if wrapped >= TAU { 0.0 } else { wrapped }
}

/// Azimuthal distance in [0, pi].
#[inline]
pub fn delta_phi(phi1: f64, phi2: f64) -> f64 {
    let diff = (phi_0_2pi(phi1) - phi_0_2pi(phi2)).abs();
    if diff > PI { TAU - diff } else { diff }
}

/// Angular distance in the (eta, phi) plane.
#[inline]
pub fn delta_r(eta1: f64, phi1: f64, eta2: f64, phi2: f64) -> f64 {
    let d_eta = eta1 - eta2;
    let d_phi = delta_phi(phi1, phi2);
    (d_eta * d_eta + d_phi * d_phi).sqrt()
}

/// Radius of the circle with the same area as the jet catchment area.
#[inline]
pub fn effective_radius(area: f64) -> f64 {
    (area.max(0.0) / PI).sqrt()
}
