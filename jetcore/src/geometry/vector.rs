use std::fmt;
use std::fmt::{Display, Formatter};
use std::ops::{Add, Mul, Neg, Sub};

use serde::{Deserialize, Serialize};

/// Cartesian 3-vector used for jet and cone axes.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    /// Creates a new `Vector3` instance.
    ///
    /// # Arguments
    ///
    /// * `x` - x component.
    /// * `y` - y component.
    /// * `z` - z component, along the beam.
    ///
    /// # Examples
    ///
    /// ```
    /// use jetcore::geometry::vector::Vector3;
    ///
    /// let v = Vector3::new(3.0, 4.0, 0.0);
    /// assert_eq!(v.perp(), 5.0);
    /// ```
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Vector3 { x, y, z }
    }

    pub fn zero() -> Self {
        Vector3::default()
    }

    pub fn is_zero(&self) -> bool {
        self.x == 0.0 && self.y == 0.0 && self.z == 0.0
    }

    pub fn dot(&self, other: &Vector3) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn mag2(&self) -> f64 {
        self.dot(self)
    }

    pub fn mag(&self) -> f64 {
        self.mag2().sqrt()
    }

    pub fn perp2(&self) -> f64 {
        self.x * self.x + self.y * self.y
    }

    /// Transverse component, i.e. the length of the projection onto the x-y plane.
    pub fn perp(&self) -> f64 {
        self.perp2().sqrt()
    }

    /// Azimuth in (-pi, pi], zero for the null vector.
    pub fn phi(&self) -> f64 {
        if self.x == 0.0 && self.y == 0.0 {
            0.0
        } else {
            self.y.atan2(self.x)
        }
    }

    /// Pseudorapidity.
    ///
    /// A vector without transverse component has pseudorapidity 0 when it has no
    /// longitudinal component either, and +/-1e11 otherwise.
    pub fn eta(&self) -> f64 {
        let pt = self.perp();
        if pt > 0.0 {
            return (self.z / pt).asinh();
        }
        if self.z == 0.0 {
            0.0
        } else if self.z > 0.0 {
            1e11
        } else {
            -1e11
        }
    }
}

impl Add for Vector3 {
    type Output = Vector3;

    fn add(self, rhs: Vector3) -> Vector3 {
        Vector3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vector3 {
    type Output = Vector3;

    fn sub(self, rhs: Vector3) -> Vector3 {
        Vector3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Neg for Vector3 {
    type Output = Vector3;

    fn neg(self) -> Vector3 {
        Vector3::new(-self.x, -self.y, -self.z)
    }
}

impl Mul<f64> for Vector3 {
    type Output = Vector3;

    fn mul(self, rhs: f64) -> Vector3 {
        Vector3::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl Display for Vector3 {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "({:.4}, {:.4}, {:.4})", self.x, self.y, self.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_eta_phi() {
        let v = Vector3::new(1.0, 1.0, 0.0);
        assert_relative_eq!(v.phi(), std::f64::consts::FRAC_PI_4);
        assert_eq!(v.eta(), 0.0);

        let w = Vector3::new(1.0, 0.0, 1.0_f64.sinh());
        assert_relative_eq!(w.eta(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_degenerate_eta() {
        assert_eq!(Vector3::zero().eta(), 0.0);
        assert_eq!(Vector3::zero().phi(), 0.0);
        assert!(Vector3::new(0.0, 0.0, 2.0).eta() > 1e10);
        assert!(Vector3::new(0.0, 0.0, -2.0).eta() < -1e10);
    }
}
