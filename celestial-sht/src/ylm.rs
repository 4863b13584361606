//! Normalized associated Legendre functions by three-term recurrence.
//!
//! For each order `m` the values `λ_lm(θ)` (orthonormal, Condon-Shortley phase,
//! so that `Y_lm = λ_lm(θ)·e^{imφ}`) are generated for `l = m..=lmax`:
//!
//! ```text
//! λ_mm     = (−1)^m · √(1/4π) · Π_{k=1..m} √((2k+1)/2k) · sin^m θ
//! λ_l      = a_l · cos θ · λ_{l−1} − b_l · λ_{l−2}
//! a_l      = 1/ε_{l,m},   b_l = ε_{l−1,m}/ε_{l,m},   ε_{l,m} = √((l²−m²)/(4l²−1))
//! ```
//!
//! `sin^m θ` underflows long before `λ_lm` becomes significant for large `m`, so
//! values carry an integer exponent in units of `2^800`. A value whose exponent
//! is still negative is below `2^−400` and treated as exactly zero.

use celestial_core::constants::FOURPI;
use celestial_core::{SphereError, SphereResult};

/// `2^800`, built from its bit pattern.
const FBIG: f64 = f64::from_bits((1023 + 800) << 52);
/// `2^−800`.
const FSMALL: f64 = f64::from_bits((1023 - 800) << 52);
/// Rescale when a magnitude leaves `[2^−400, 2^400]`.
const FTOL_HIGH: f64 = f64::from_bits((1023 + 400) << 52);
const FTOL_LOW: f64 = f64::from_bits((1023 - 400) << 52);

/// Brings `v` back into `[2^−400, 2^400]`, adjusting `scale` in units of `2^800`.
#[inline]
fn normalize(v: &mut f64, scale: &mut i32) {
    if *v == 0.0 || !v.is_finite() {
        return;
    }
    while v.abs() > FTOL_HIGH {
        *v *= FSMALL;
        *scale += 1;
    }
    while v.abs() < FTOL_LOW {
        *v *= FBIG;
        *scale -= 1;
    }
}

/// `base^exp` as a scaled pair, by repeated squaring.
fn scaled_pow(base: f64, exp: usize) -> (f64, i32) {
    let (mut result, mut rscale) = (1.0, 0);
    let (mut b, mut bscale) = (base, 0);
    normalize(&mut b, &mut bscale);
    let mut e = exp;
    while e > 0 {
        if e & 1 == 1 {
            result *= b;
            rscale += bscale;
            normalize(&mut result, &mut rscale);
        }
        e >>= 1;
        if e > 0 {
            b *= b;
            bscale *= 2;
            normalize(&mut b, &mut bscale);
        }
    }
    (result, rscale)
}

/// Precomputed starting factors for every order up to `mmax`.
#[derive(Debug, Clone)]
pub struct YlmGenerator {
    lmax: usize,
    mmax: usize,
    /// `(−1)^m · √(1/4π) · Π_{k≤m} √((2k+1)/2k)`
    mfac: Vec<f64>,
}

impl YlmGenerator {
    pub fn new(lmax: usize, mmax: usize) -> SphereResult<Self> {
        if mmax > lmax {
            return Err(SphereError::invalid_parameter(
                "mmax",
                format!("mmax ({mmax}) must not exceed lmax ({lmax})"),
            ));
        }
        let mut mfac = Vec::with_capacity(mmax + 1);
        let mut acc = libm::sqrt(1.0 / FOURPI);
        mfac.push(acc);
        for k in 1..=mmax {
            acc *= libm::sqrt((2 * k + 1) as f64 / (2 * k) as f64);
            mfac.push(if k % 2 == 1 { -acc } else { acc });
        }
        Ok(Self { lmax, mmax, mfac })
    }

    #[inline]
    pub fn lmax(&self) -> usize {
        self.lmax
    }

    #[inline]
    pub fn mmax(&self) -> usize {
        self.mmax
    }

    /// Recurrence coefficients for order `m`. Callers guarantee `m ≤ mmax`.
    pub fn coefficients(&self, m: usize) -> RecurrenceCoeffs {
        let eps = |l: usize| -> f64 {
            let (l, m) = (l as f64, m as f64);
            libm::sqrt((l * l - m * m) / (4.0 * l * l - 1.0))
        };
        let count = self.lmax.saturating_sub(m);
        let mut alpha = Vec::with_capacity(count);
        let mut beta = Vec::with_capacity(count);
        for l in (m + 1)..=self.lmax {
            let e = eps(l);
            alpha.push(1.0 / e);
            beta.push(eps(l - 1) / e);
        }
        RecurrenceCoeffs {
            m,
            lmax: self.lmax,
            start: self.mfac[m],
            alpha,
            beta,
        }
    }

    /// `λ_lm(θ)` for `l = m..=lmax`, given `cos θ` and `sin θ`.
    ///
    /// # Errors
    /// `InvalidParameter` for `m > mmax`; `NumericalInstability` if a value is not finite.
    pub fn evaluate(&self, m: usize, cth: f64, sth: f64) -> SphereResult<Vec<f64>> {
        if m > self.mmax {
            return Err(SphereError::invalid_parameter(
                "m",
                format!("{m} exceeds mmax {}", self.mmax),
            ));
        }
        let coeffs = self.coefficients(m);
        let mut state = coeffs.start(cth, sth);
        let mut out = Vec::with_capacity(self.lmax + 1 - m);
        loop {
            let v = state.value();
            if !v.is_finite() {
                return Err(SphereError::numerical_instability(
                    "Legendre recurrence",
                    format!("non-finite value at l={}, m={m}, cos(theta)={cth}", state.l()),
                ));
            }
            out.push(v);
            if state.l() == self.lmax {
                break;
            }
            state.advance(&coeffs);
        }
        Ok(out)
    }
}

/// Recurrence coefficients for one order `m`, detached from the generator so
/// they can be moved into worker tasks.
#[derive(Debug, Clone)]
pub struct RecurrenceCoeffs {
    m: usize,
    lmax: usize,
    start: f64,
    /// `a_l` for `l = m+1..=lmax`.
    alpha: Vec<f64>,
    /// `b_l` for `l = m+1..=lmax`.
    beta: Vec<f64>,
}

impl RecurrenceCoeffs {
    #[inline]
    pub fn m(&self) -> usize {
        self.m
    }

    #[inline]
    pub fn lmax(&self) -> usize {
        self.lmax
    }

    /// State at `l = m` for the co-latitude with the given cosine and sine.
    pub fn start(&self, cth: f64, sth: f64) -> LegendreState {
        let (pow, scale) = scaled_pow(sth, self.m);
        let mut curr = self.start * pow;
        let mut scale = scale;
        normalize(&mut curr, &mut scale);
        LegendreState {
            l: self.m,
            x: cth,
            prev: 0.0,
            curr,
            scale,
        }
    }
}

/// Position in the recurrence: `λ_l` and `λ_{l−1}` sharing one scale exponent.
#[derive(Debug, Clone, Copy)]
pub struct LegendreState {
    l: usize,
    x: f64,
    prev: f64,
    curr: f64,
    scale: i32,
}

impl LegendreState {
    #[inline]
    pub fn l(&self) -> usize {
        self.l
    }

    /// `λ_l`, or exactly zero while the value is below the numerical floor.
    #[inline]
    pub fn value(&self) -> f64 {
        match self.scale {
            0 => self.curr,
            s if s < 0 => 0.0,
            s => self.curr * libm::pow(FBIG, s as f64),
        }
    }

    /// `true` while the value is too small to contribute.
    #[inline]
    pub fn is_negligible(&self) -> bool {
        self.scale < 0
    }

    /// Steps from `l` to `l + 1`. Callers stop at `lmax`.
    #[inline]
    pub fn advance(&mut self, coeffs: &RecurrenceCoeffs) {
        let idx = self.l - coeffs.m;
        let next = coeffs.alpha[idx] * self.x * self.curr - coeffs.beta[idx] * self.prev;
        self.prev = self.curr;
        self.curr = next;
        self.l += 1;
        if self.curr.abs() > FTOL_HIGH {
            self.prev *= FSMALL;
            self.curr *= FSMALL;
            self.scale += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use celestial_core::constants::PI;

    fn lambdas(lmax: usize, m: usize, theta: f64) -> Vec<f64> {
        let gen = YlmGenerator::new(lmax, lmax).unwrap();
        gen.evaluate(m, libm::cos(theta), libm::sin(theta)).unwrap()
    }

    #[test]
    fn test_scale_constants() {
        assert_eq!(FBIG, 2f64.powi(800));
        assert_eq!(FSMALL * FBIG, 1.0);
        assert_eq!(FTOL_HIGH * FTOL_LOW, 1.0);
    }

    #[test]
    fn test_closed_forms() {
        for &theta in &[0.1, 0.7, 1.3, 2.0, 3.0] {
            let (s, c) = (libm::sin(theta), libm::cos(theta));
            let m0 = lambdas(3, 0, theta);
            assert_abs_diff_eq!(m0[0], libm::sqrt(1.0 / (4.0 * PI)), epsilon = 1e-15);
            assert_abs_diff_eq!(m0[1], libm::sqrt(3.0 / (4.0 * PI)) * c, epsilon = 1e-14);
            assert_abs_diff_eq!(
                m0[2],
                libm::sqrt(5.0 / (4.0 * PI)) * 0.5 * (3.0 * c * c - 1.0),
                epsilon = 1e-14
            );
            let m1 = lambdas(3, 1, theta);
            assert_abs_diff_eq!(m1[0], -libm::sqrt(3.0 / (8.0 * PI)) * s, epsilon = 1e-14);
            assert_abs_diff_eq!(m1[1], -libm::sqrt(15.0 / (8.0 * PI)) * s * c, epsilon = 1e-14);
            let m2 = lambdas(3, 2, theta);
            assert_abs_diff_eq!(m2[0], 0.25 * libm::sqrt(15.0 / (2.0 * PI)) * s * s, epsilon = 1e-14);
        }
    }

    #[test]
    fn test_parity_under_reflection() {
        let theta = 0.4;
        for m in [0usize, 3, 7] {
            let north = lambdas(12, m, theta);
            let south = lambdas(12, m, PI - theta);
            for (i, (n, s)) in north.iter().zip(&south).enumerate() {
                let sign = if i % 2 == 0 { 1.0 } else { -1.0 };
                assert_abs_diff_eq!(*s, sign * n, epsilon = 1e-13);
            }
        }
    }

    #[test]
    fn test_orthonormality_by_quadrature() {
        // ∫ λ_lm λ_l'm sinθ dθ · 2π = δ_ll' using a fine midpoint rule
        let lmax = 10;
        let m = 2;
        let n = 4000;
        let gen = YlmGenerator::new(lmax, lmax).unwrap();
        let mut gram = vec![vec![0.0; lmax + 1 - m]; lmax + 1 - m];
        for i in 0..n {
            let theta = PI * (i as f64 + 0.5) / n as f64;
            let v = gen.evaluate(m, libm::cos(theta), libm::sin(theta)).unwrap();
            let w = 2.0 * PI * libm::sin(theta) * PI / n as f64;
            for a in 0..v.len() {
                for b in 0..v.len() {
                    gram[a][b] += w * v[a] * v[b];
                }
            }
        }
        for (a, row) in gram.iter().enumerate() {
            for (b, &g) in row.iter().enumerate() {
                let expected = if a == b { 1.0 } else { 0.0 };
                assert_abs_diff_eq!(g, expected, epsilon = 1e-5);
            }
        }
    }

    #[test]
    fn test_high_order_underflow_is_zero_not_nan() {
        let lmax = 3000;
        let gen = YlmGenerator::new(lmax, lmax).unwrap();
        let theta: f64 = 0.01;
        let values = gen.evaluate(2500, theta.cos(), theta.sin()).unwrap();
        assert!(values.iter().all(|v| v.is_finite()));
        assert!(values.iter().all(|&v| v == 0.0));

        // near the equator the same order is representable and bounded
        let values = gen.evaluate(2500, 0.0, 1.0).unwrap();
        assert!(values.iter().any(|&v| v != 0.0));
        assert!(values.iter().all(|v| v.abs() < 10.0));
    }

    #[test]
    fn test_scaled_pow() {
        // 2^-3000 = 2^200 · (2^800)^-4
        let (v, s) = scaled_pow(0.5, 3000);
        assert_eq!(s, -4);
        assert_eq!(v, 2f64.powi(200));
        let (v, s) = scaled_pow(0.3, 0);
        assert_eq!((v, s), (1.0, 0));
    }

    #[test]
    fn test_invalid_order() {
        let gen = YlmGenerator::new(4, 2).unwrap();
        assert!(gen.evaluate(3, 0.0, 1.0).is_err());
        assert!(YlmGenerator::new(2, 4).is_err());
    }
}
