//! Complex FFT plans.
//!
//! Lengths are split into radix-4 and radix-2 stages first, then odd prime
//! stages handled by a generic butterfly. A length whose largest prime factor
//! exceeds [`MAX_GENERIC_RADIX`] is computed with Bluestein's algorithm instead,
//! on a padded length that only has factors 2, 3 and 5.
//!
//! All transforms are unnormalized:
//!
//! - forward: `X_k = Σ_j x_j · e^{-2πi·jk/n}`
//! - backward: `x_j = Σ_k X_k · e^{+2πi·jk/n}`
//!
//! so a forward/backward pair scales the data by `n`.

use crate::bluestein::Bluestein;
use crate::complex::Complex;
use celestial_core::constants::TWOPI;
use celestial_core::{SphereError, SphereResult};

type C64 = Complex<f64>;

/// Largest prime handled by the generic butterfly before switching to Bluestein.
pub const MAX_GENERIC_RADIX: usize = 64;

/// Sign of the exponent in the transform kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// `e^{-2πi·jk/n}`
    Forward,
    /// `e^{+2πi·jk/n}`
    Backward,
}

/// Splits `n` into radix factors: all 4s, then a 2 if left over, then odd
/// primes in ascending order.
pub fn factorize(n: usize) -> Vec<usize> {
    let mut factors = Vec::new();
    let mut rem = n;
    while rem % 4 == 0 && rem > 1 {
        factors.push(4);
        rem /= 4;
    }
    while rem % 2 == 0 && rem > 1 {
        factors.push(2);
        rem /= 2;
    }
    let mut p = 3;
    while p * p <= rem {
        while rem % p == 0 {
            factors.push(p);
            rem /= p;
        }
        p += 2;
    }
    if rem > 1 {
        factors.push(rem);
    }
    factors
}

/// Smallest length `≥ n` whose only prime factors are 2, 3 and 5.
pub fn good_size(n: usize) -> usize {
    if n <= 6 {
        return n.max(1);
    }
    let mut best = usize::MAX;
    let mut f5 = 1usize;
    while f5 < best {
        let mut f35 = f5;
        while f35 < best {
            let mut candidate = f35;
            while candidate < n {
                candidate *= 2;
            }
            best = best.min(candidate);
            f35 *= 3;
        }
        f5 *= 5;
    }
    best
}

/// Recursive decimation-in-time transform over precomputed stages.
#[derive(Debug, Clone)]
pub(crate) struct MixedRadix {
    n: usize,
    /// `(radix, remaining length)` per stage.
    stages: Vec<(usize, usize)>,
    twiddles: Vec<C64>,
}

impl MixedRadix {
    pub(crate) fn new(n: usize, factors: &[usize]) -> Self {
        let mut stages = Vec::with_capacity(factors.len());
        let mut m = n;
        for &p in factors {
            m /= p;
            stages.push((p, m));
        }
        let twiddles = (0..n)
            .map(|k| C64::cis(-TWOPI * k as f64 / n as f64))
            .collect();
        Self {
            n,
            stages,
            twiddles,
        }
    }

    /// Forward transform in place.
    pub(crate) fn forward(&self, data: &mut [C64]) {
        if self.n <= 1 {
            return;
        }
        let input = data.to_vec();
        self.work(data, &input, 0, 1, 0);
    }

    fn work(&self, out: &mut [C64], input: &[C64], offset: usize, fstride: usize, stage: usize) {
        let (p, m) = self.stages[stage];
        if m == 1 {
            for (i, o) in out.iter_mut().enumerate() {
                *o = input[offset + i * fstride];
            }
        } else {
            for (q, chunk) in out.chunks_mut(m).enumerate() {
                self.work(chunk, input, offset + q * fstride, fstride * p, stage + 1);
            }
        }
        match p {
            2 => self.butterfly2(out, fstride, m),
            4 => self.butterfly4(out, fstride, m),
            _ => self.butterfly_generic(out, fstride, m, p),
        }
    }

    fn butterfly2(&self, out: &mut [C64], fstride: usize, m: usize) {
        let (lo, hi) = out.split_at_mut(m);
        for (k, (a, b)) in lo.iter_mut().zip(hi.iter_mut()).enumerate() {
            let t = *b * self.twiddles[k * fstride];
            *b = *a - t;
            *a += t;
        }
    }

    fn butterfly4(&self, out: &mut [C64], fstride: usize, m: usize) {
        for k in 0..m {
            let s0 = out[k + m] * self.twiddles[k * fstride];
            let s1 = out[k + 2 * m] * self.twiddles[2 * k * fstride];
            let s2 = out[k + 3 * m] * self.twiddles[3 * k * fstride];
            let s5 = out[k] - s1;
            let f0 = out[k] + s1;
            let s3 = s0 + s2;
            let s4 = s0 - s2;
            out[k] = f0 + s3;
            out[k + 2 * m] = f0 - s3;
            // s5 ∓ i·s4
            out[k + m] = C64::new(s5.re + s4.im, s5.im - s4.re);
            out[k + 3 * m] = C64::new(s5.re - s4.im, s5.im + s4.re);
        }
    }

    fn butterfly_generic(&self, out: &mut [C64], fstride: usize, m: usize, p: usize) {
        let n = self.n;
        let mut scratch = vec![C64::ZERO; p];
        for u in 0..m {
            for (q, s) in scratch.iter_mut().enumerate() {
                *s = out[u + q * m];
            }
            for q1 in 0..p {
                let k = u + q1 * m;
                let mut twidx = 0usize;
                let mut acc = scratch[0];
                for s in &scratch[1..] {
                    twidx += fstride * k;
                    twidx %= n;
                    acc += *s * self.twiddles[twidx];
                }
                out[k] = acc;
            }
        }
    }
}

#[derive(Debug, Clone)]
enum Algorithm {
    MixedRadix(MixedRadix),
    Bluestein(Box<Bluestein>),
}

/// A reusable complex FFT of fixed length.
///
/// Plans are immutable once built and can be shared across threads; use
/// [`crate::plan_complex`] to get a cached instance.
#[derive(Debug, Clone)]
pub struct ComplexFft {
    n: usize,
    algorithm: Algorithm,
}

impl ComplexFft {
    pub fn new(n: usize) -> SphereResult<Self> {
        if n == 0 {
            return Err(SphereError::invalid_parameter(
                "n",
                "FFT length must be positive",
            ));
        }
        let factors = factorize(n);
        let largest = factors.iter().copied().max().unwrap_or(1);
        let algorithm = if largest > MAX_GENERIC_RADIX {
            Algorithm::Bluestein(Box::new(Bluestein::new(n)))
        } else {
            Algorithm::MixedRadix(MixedRadix::new(n, &factors))
        };
        tracing::debug!(
            n,
            ?factors,
            bluestein = matches!(algorithm, Algorithm::Bluestein(_)),
            "built complex FFT plan"
        );
        Ok(Self { n, algorithm })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.n
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    /// `true` when this length is computed through the chirp-z path.
    pub fn uses_bluestein(&self) -> bool {
        matches!(self.algorithm, Algorithm::Bluestein(_))
    }

    /// Transforms `data` in place.
    ///
    /// # Errors
    /// `SizeMismatch` if `data.len()` differs from the plan length.
    pub fn process(&self, data: &mut [C64], direction: Direction) -> SphereResult<()> {
        if data.len() != self.n {
            return Err(SphereError::size_mismatch("complex FFT", self.n, data.len()));
        }
        match direction {
            Direction::Forward => self.forward_unchecked(data),
            Direction::Backward => {
                // backward(x) = conj(forward(conj(x)))
                for z in data.iter_mut() {
                    *z = z.conj();
                }
                self.forward_unchecked(data);
                for z in data.iter_mut() {
                    *z = z.conj();
                }
            }
        }
        Ok(())
    }

    pub fn forward(&self, data: &mut [C64]) -> SphereResult<()> {
        self.process(data, Direction::Forward)
    }

    pub fn backward(&self, data: &mut [C64]) -> SphereResult<()> {
        self.process(data, Direction::Backward)
    }

    fn forward_unchecked(&self, data: &mut [C64]) {
        match &self.algorithm {
            Algorithm::MixedRadix(plan) => plan.forward(data),
            Algorithm::Bluestein(plan) => plan.forward(data),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factorize_order() {
        assert_eq!(factorize(1), Vec::<usize>::new());
        assert_eq!(factorize(2), vec![2]);
        assert_eq!(factorize(8), vec![4, 2]);
        assert_eq!(factorize(48), vec![4, 4, 3]);
        assert_eq!(factorize(90), vec![2, 3, 3, 5]);
        assert_eq!(factorize(404), vec![4, 101]);
    }

    #[test]
    fn test_good_size() {
        assert_eq!(good_size(1), 1);
        assert_eq!(good_size(7), 8);
        assert_eq!(good_size(11), 12);
        assert_eq!(good_size(201), 216);
        assert_eq!(good_size(1025), 1080);
        for n in 1..500 {
            let g = good_size(n);
            assert!(g >= n);
            assert!(factorize(g).iter().all(|&f| f <= 5), "{g}");
        }
    }

    #[test]
    fn test_zero_length_rejected() {
        assert!(ComplexFft::new(0).is_err());
    }

    #[test]
    fn test_wrong_buffer_length() {
        let plan = ComplexFft::new(8).unwrap();
        let mut data = vec![C64::ZERO; 7];
        assert!(matches!(
            plan.forward(&mut data),
            Err(SphereError::SizeMismatch { expected: 8, actual: 7, .. })
        ));
    }

    #[test]
    fn test_bluestein_selection() {
        assert!(!ComplexFft::new(61).unwrap().uses_bluestein());
        assert!(ComplexFft::new(67).unwrap().uses_bluestein());
        assert!(ComplexFft::new(4 * 101).unwrap().uses_bluestein());
    }

    #[test]
    fn test_length_one_is_identity() {
        let plan = ComplexFft::new(1).unwrap();
        let mut data = vec![C64::new(3.0, -2.0)];
        plan.forward(&mut data).unwrap();
        assert_eq!(data[0], C64::new(3.0, -2.0));
    }
}
