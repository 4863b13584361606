//! 3D Cartesian vectors for directions on the unit sphere.
//!
//! Pixel geometry is easiest to reason about in Cartesian form: disc queries
//! compare dot products, neighbour tests measure separations, and pixel
//! centres are reported as unit vectors.
//!
//! # Coordinate Conventions
//!
//! This module uses the physics convention of the pixelization code:
//! - **θ (theta)**: co-latitude, measured from +Z, in `[0, π]`
//! - **φ (phi)**: longitude, measured from +X toward +Y, in `[0, 2π)`
//!
//! ```
//! use celestial_core::Vector3;
//! use std::f64::consts::FRAC_PI_2;
//!
//! // θ = π/2, φ = 0 lies on the equator along +X
//! let v = Vector3::from_angles(FRAC_PI_2, 0.0);
//! assert!((v.x - 1.0).abs() < 1e-15);
//!
//! let (theta, phi) = v.to_angles();
//! assert!((theta - FRAC_PI_2).abs() < 1e-15);
//! assert_eq!(phi, 0.0);
//! ```
use crate::constants::TWOPI;
use std::fmt;

/// A 3D Cartesian vector.
///
/// Components are public for direct access when performance matters.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    /// Creates a new vector from x, y, z components.
    #[inline]
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Returns the zero vector `[0, 0, 0]`.
    #[inline]
    pub fn zeros() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    #[inline]
    pub fn magnitude(&self) -> f64 {
        libm::sqrt(self.dot(self))
    }

    /// Returns a unit vector pointing in the same direction.
    ///
    /// If the vector has zero length, returns the zero vector unchanged (avoids NaN).
    pub fn normalize(&self) -> Self {
        let mag = self.magnitude();
        if mag == 0.0 {
            *self
        } else {
            Self::new(self.x / mag, self.y / mag, self.z / mag)
        }
    }

    /// Computes the dot product with another vector.
    #[inline]
    pub fn dot(&self, other: &Self) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    /// Computes the cross product with another vector.
    pub fn cross(&self, other: &Self) -> Self {
        Self::new(
            self.y * other.z - self.z * other.y,
            self.z * other.x - self.x * other.z,
            self.x * other.y - self.y * other.x,
        )
    }

    /// Angle between two directions, in radians.
    ///
    /// Uses `atan2(|a×b|, a·b)`, which stays accurate for nearly parallel and
    /// nearly antiparallel vectors where `acos` of the dot product loses
    /// precision. Neither input needs to be normalized.
    pub fn angle_between(&self, other: &Self) -> f64 {
        libm::atan2(self.cross(other).magnitude(), self.dot(other))
    }

    /// Creates a unit vector from co-latitude `theta` and longitude `phi` (radians).
    pub fn from_angles(theta: f64, phi: f64) -> Self {
        let (sin_theta, cos_theta) = libm::sincos(theta);
        let (sin_phi, cos_phi) = libm::sincos(phi);
        Self::new(sin_theta * cos_phi, sin_theta * sin_phi, cos_theta)
    }

    /// Creates a unit vector from `z = cos θ` and longitude `phi`.
    pub fn from_z_phi(z: f64, phi: f64) -> Self {
        let sin_theta = libm::sqrt((1.0 - z) * (1.0 + z));
        let (sin_phi, cos_phi) = libm::sincos(phi);
        Self::new(sin_theta * cos_phi, sin_theta * sin_phi, z)
    }

    /// Converts the vector to `(theta, phi)`.
    ///
    /// The vector does not need to be normalized. `phi` is in `[0, 2π)`; on the
    /// polar axis it is reported as 0.
    pub fn to_angles(&self) -> (f64, f64) {
        let rho = libm::sqrt(self.x * self.x + self.y * self.y);
        let theta = libm::atan2(rho, self.z);
        let mut phi = if rho == 0.0 {
            0.0
        } else {
            libm::atan2(self.y, self.x)
        };
        if phi < 0.0 {
            phi += TWOPI;
        }
        if phi >= TWOPI {
            phi = 0.0;
        }
        (theta, phi)
    }
}

impl std::ops::Neg for Vector3 {
    type Output = Self;

    fn neg(self) -> Self {
        Self::new(-self.x, -self.y, -self.z)
    }
}

impl fmt::Display for Vector3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:.12}, {:.12}, {:.12}]", self.x, self.y, self.z)
    }
}
