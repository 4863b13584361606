//! Directions on the sphere as (co-latitude, longitude) pairs.
//!
//! A [`Pointing`] is the angular counterpart of a unit [`Vector3`]. Pixel
//! queries accept pointings, and pixel centres are returned as pointings.

use crate::constants::{PI, TWOPI};
use crate::math::vincenty_angular_separation;
use crate::utils::normalize_angle_to_positive;
use crate::vector3::Vector3;
use std::fmt;

/// A direction given by co-latitude `theta` ∈ [0, π] and longitude `phi` ∈ [0, 2π).
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Pointing {
    pub theta: f64,
    pub phi: f64,
}

impl Pointing {
    #[inline]
    pub fn new(theta: f64, phi: f64) -> Self {
        Self { theta, phi }
    }

    /// Builds a pointing from a vector of any non-zero length.
    pub fn from_vector(v: &Vector3) -> Self {
        let (theta, phi) = v.to_angles();
        Self { theta, phi }
    }

    pub fn to_vector(&self) -> Vector3 {
        Vector3::from_angles(self.theta, self.phi)
    }

    /// Brings `theta` into [0, π] and `phi` into [0, 2π).
    ///
    /// A co-latitude past a pole is reflected back and the longitude rotated by π,
    /// so the result describes the same direction.
    pub fn normalize(&self) -> Self {
        let mut theta = self.theta % TWOPI;
        if theta < 0.0 {
            theta += TWOPI;
        }
        let mut phi = self.phi;
        if theta > PI {
            theta = TWOPI - theta;
            phi += PI;
        }
        Self {
            theta,
            phi: normalize_angle_to_positive(phi),
        }
    }

    /// `true` when `theta` lies in [0, π] and both angles are finite.
    pub fn is_valid(&self) -> bool {
        self.theta.is_finite() && self.phi.is_finite() && (0.0..=PI).contains(&self.theta)
    }

    /// Great-circle distance to another pointing, in radians.
    pub fn angular_distance(&self, other: &Self) -> f64 {
        // co-latitude θ corresponds to latitude π/2 − θ, so sin/cos swap
        let (cos_lat1, sin_lat1) = libm::sincos(self.theta);
        let (cos_lat2, sin_lat2) = libm::sincos(other.theta);
        vincenty_angular_separation(sin_lat1, cos_lat1, sin_lat2, cos_lat2, other.phi - self.phi)
    }
}

impl From<Vector3> for Pointing {
    fn from(v: Vector3) -> Self {
        Self::from_vector(&v)
    }
}

impl From<Pointing> for Vector3 {
    fn from(p: Pointing) -> Self {
        p.to_vector()
    }
}

impl fmt::Display for Pointing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(theta={:.12}, phi={:.12})", self.theta, self.phi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::HALF_PI;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_vector_round_trip() {
        let p = Pointing::new(1.1, 4.2);
        let q = Pointing::from_vector(&p.to_vector());
        assert_abs_diff_eq!(p.theta, q.theta, epsilon = 1e-14);
        assert_abs_diff_eq!(p.phi, q.phi, epsilon = 1e-14);
    }

    #[test]
    fn test_normalize_reflects_past_pole() {
        let p = Pointing::new(PI + 0.25, 0.5).normalize();
        assert_abs_diff_eq!(p.theta, PI - 0.25, epsilon = 1e-14);
        assert_abs_diff_eq!(p.phi, 0.5 + PI, epsilon = 1e-14);

        let v1 = Pointing::new(PI + 0.25, 0.5).to_vector();
        let v2 = p.to_vector();
        assert_abs_diff_eq!(v1.angle_between(&v2), 0.0, epsilon = 1e-14);
    }

    #[test]
    fn test_normalize_negative_phi() {
        let p = Pointing::new(0.5, -HALF_PI).normalize();
        assert_abs_diff_eq!(p.phi, 3.0 * HALF_PI, epsilon = 1e-14);
        assert!(p.is_valid());
    }

    #[test]
    fn test_is_valid() {
        assert!(Pointing::new(0.0, 0.0).is_valid());
        assert!(Pointing::new(PI, 6.0).is_valid());
        assert!(!Pointing::new(-0.1, 0.0).is_valid());
        assert!(!Pointing::new(f64::NAN, 0.0).is_valid());
    }

    #[test]
    fn test_angular_distance() {
        let north = Pointing::new(0.0, 0.0);
        let equator = Pointing::new(HALF_PI, 2.0);
        assert_abs_diff_eq!(north.angular_distance(&equator), HALF_PI, epsilon = 1e-14);

        let a = Pointing::new(HALF_PI, 0.0);
        let b = Pointing::new(HALF_PI, 0.3);
        assert_abs_diff_eq!(a.angular_distance(&b), 0.3, epsilon = 1e-14);
    }
}
