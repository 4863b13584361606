//! Scalar helpers shared by the pixel scheme and the transform code.

/// Floored modulo: the result always has the sign of `y`.
///
/// `fmodulo(-0.5, 4.0)` is `3.5`, unlike `%` which returns `-0.5`.
#[inline]
pub fn fmodulo(x: f64, y: f64) -> f64 {
    if x >= 0.0 {
        if x < y {
            x
        } else {
            libm::fmod(x, y)
        }
    } else {
        let r = libm::fmod(x, y) + y;
        if r == y {
            0.0
        } else {
            r
        }
    }
}

/// Largest integer `r` with `r*r <= n`.
///
/// Starts from the floating-point estimate and corrects the last step, which is
/// exact for every `u64` input.
#[inline]
pub fn isqrt(n: u64) -> u64 {
    if n == 0 {
        return 0;
    }
    let mut r = libm::sqrt(n as f64) as u64;
    while r > 0 && r.checked_mul(r).is_none_or(|sq| sq > n) {
        r -= 1;
    }
    while (r + 1).checked_mul(r + 1).is_some_and(|sq| sq <= n) {
        r += 1;
    }
    r
}

#[inline]
pub fn vincenty_angular_separation(
    sin_lat1: f64,
    cos_lat1: f64,
    sin_lat2: f64,
    cos_lat2: f64,
    delta_lon: f64,
) -> f64 {
    let (sin_delta_lon, cos_delta_lon) = libm::sincos(delta_lon);

    let num = libm::sqrt(
        (cos_lat2 * sin_delta_lon).powi(2)
            + (cos_lat1 * sin_lat2 - sin_lat1 * cos_lat2 * cos_delta_lon).powi(2),
    );
    let den = sin_lat1 * sin_lat2 + cos_lat1 * cos_lat2 * cos_delta_lon;

    libm::atan2(num, den)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::PI;

    #[test]
    fn test_isqrt_small() {
        let expected = [0, 1, 1, 1, 2, 2, 2, 2, 2, 3, 3];
        for (n, &r) in expected.iter().enumerate() {
            assert_eq!(isqrt(n as u64), r, "isqrt({n})");
        }
    }

    #[test]
    fn test_isqrt_large() {
        let n: u64 = (1 << 31) - 1;
        assert_eq!(isqrt(n * n), n);
        assert_eq!(isqrt(n * n - 1), n - 1);
        assert_eq!(isqrt(n * n + 1), n);
        assert_eq!(isqrt(u64::MAX), 4_294_967_295);
    }

    #[test]
    fn test_fmodulo_negative() {
        assert_eq!(fmodulo(-0.5, 4.0), 3.5);
        assert_eq!(fmodulo(4.5, 4.0), 0.5);
        assert_eq!(fmodulo(1.25, 4.0), 1.25);
        assert_eq!(fmodulo(-4.0, 4.0), 0.0);
        let r = fmodulo(-1e-18, 4.0);
        assert!((0.0..4.0).contains(&r));
    }

    #[test]
    fn test_vincenty_quarter_circle() {
        let sep = vincenty_angular_separation(0.0, 1.0, 0.0, 1.0, PI / 2.0);
        assert!((sep - PI / 2.0).abs() < 1e-15);
    }
}
