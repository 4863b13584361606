//! Angle normalization.

use crate::constants::TWOPI;

/// Wraps a longitude in radians into [0, 2π).
///
/// Inputs a hair below zero would round up to exactly 2π after the shift; those
/// are folded back onto 0.
#[inline]
pub fn normalize_angle_to_positive(angle: f64) -> f64 {
    let mut a = angle % TWOPI;
    if a < 0.0 {
        a += TWOPI;
    }
    if a >= TWOPI {
        a = 0.0;
    }
    a
}
