//! Real-input FFT producing the non-redundant half spectrum.
//!
//! For even `n` the signal is packed into a complex sequence of length `n/2`
//! (even samples as real parts, odd samples as imaginary parts), transformed,
//! and unpacked with one twiddle per bin. Odd lengths go through the full
//! complex transform.

use crate::cache::plan_complex;
use crate::complex::Complex;
use crate::plan::{ComplexFft, Direction};
use celestial_core::constants::TWOPI;
use celestial_core::{SphereError, SphereResult};
use std::sync::Arc;

type C64 = Complex<f64>;

/// A reusable real FFT of fixed length `n`, mapping `n` samples to `n/2 + 1` bins.
///
/// Unnormalized like [`ComplexFft`]: `backward(forward(x)) == n·x`. The
/// imaginary parts of bin 0 (and of bin `n/2` for even `n`) are ignored on
/// the way back.
#[derive(Debug, Clone)]
pub struct RealFft {
    n: usize,
    inner: Arc<ComplexFft>,
    /// `e^{-2πi·k/n}` for `k ≤ n/2`; empty for odd `n`.
    twiddles: Vec<C64>,
}

impl RealFft {
    pub fn new(n: usize) -> SphereResult<Self> {
        if n == 0 {
            return Err(SphereError::invalid_parameter(
                "n",
                "FFT length must be positive",
            ));
        }
        let (inner, twiddles) = if n % 2 == 0 {
            let half = n / 2;
            let twiddles = (0..=half)
                .map(|k| C64::cis(-TWOPI * k as f64 / n as f64))
                .collect();
            (plan_complex(half)?, twiddles)
        } else {
            (plan_complex(n)?, Vec::new())
        };
        Ok(Self {
            n,
            inner,
            twiddles,
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.n
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    /// Number of spectrum bins, `n/2 + 1`.
    #[inline]
    pub fn spectrum_len(&self) -> usize {
        self.n / 2 + 1
    }

    pub fn forward(&self, input: &[f64]) -> SphereResult<Vec<C64>> {
        let mut out = vec![C64::ZERO; self.spectrum_len()];
        self.forward_into(input, &mut out)?;
        Ok(out)
    }

    pub fn backward(&self, spectrum: &[C64]) -> SphereResult<Vec<f64>> {
        let mut out = vec![0.0; self.n];
        self.backward_into(spectrum, &mut out)?;
        Ok(out)
    }

    /// Forward transform of `input` (length `n`) into `output` (length `n/2 + 1`).
    pub fn forward_into(&self, input: &[f64], output: &mut [C64]) -> SphereResult<()> {
        if input.len() != self.n {
            return Err(SphereError::size_mismatch("real FFT input", self.n, input.len()));
        }
        if output.len() != self.spectrum_len() {
            return Err(SphereError::size_mismatch(
                "real FFT spectrum",
                self.spectrum_len(),
                output.len(),
            ));
        }

        if self.n % 2 == 1 {
            let mut full: Vec<C64> = input.iter().map(|&x| C64::new(x, 0.0)).collect();
            self.inner.process(&mut full, Direction::Forward)?;
            output.copy_from_slice(&full[..self.spectrum_len()]);
            return Ok(());
        }

        let half = self.n / 2;
        let mut packed: Vec<C64> = input
            .chunks_exact(2)
            .map(|pair| C64::new(pair[0], pair[1]))
            .collect();
        self.inner.process(&mut packed, Direction::Forward)?;

        for (k, out) in output.iter_mut().enumerate() {
            let zk = packed[k % half];
            let zc = packed[(half - k % half) % half].conj();
            let even = (zk + zc).scale(0.5);
            // (zk - zc) / 2i
            let odd = C64::new(0.5 * (zk.im - zc.im), -0.5 * (zk.re - zc.re));
            *out = even + self.twiddles[k] * odd;
        }
        Ok(())
    }

    /// Backward transform of `spectrum` (length `n/2 + 1`) into `output` (length `n`).
    ///
    /// Computes `x_j = H_0 + 2·Re Σ_{0<k<n/2} H_k·e^{2πi·jk/n} + H_{n/2}·(−1)^j`,
    /// the last term only for even `n`.
    pub fn backward_into(&self, spectrum: &[C64], output: &mut [f64]) -> SphereResult<()> {
        if spectrum.len() != self.spectrum_len() {
            return Err(SphereError::size_mismatch(
                "real FFT spectrum",
                self.spectrum_len(),
                spectrum.len(),
            ));
        }
        if output.len() != self.n {
            return Err(SphereError::size_mismatch("real FFT output", self.n, output.len()));
        }

        if self.n % 2 == 1 {
            let mut full = vec![C64::ZERO; self.n];
            full[0] = C64::new(spectrum[0].re, 0.0);
            for k in 1..self.spectrum_len() {
                full[k] = spectrum[k];
                full[self.n - k] = spectrum[k].conj();
            }
            self.inner.process(&mut full, Direction::Backward)?;
            for (o, z) in output.iter_mut().zip(full.iter()) {
                *o = z.re;
            }
            return Ok(());
        }

        let half = self.n / 2;
        let bin = |k: usize| -> C64 {
            if k == 0 || k == half {
                C64::new(spectrum[k].re, 0.0)
            } else {
                spectrum[k]
            }
        };
        let mut packed: Vec<C64> = (0..half)
            .map(|k| {
                let a = bin(k);
                let b = bin(half - k).conj();
                // twiddles hold e^{-2πik/n}; the unpacking needs e^{+2πik/n}
                (a + b) + ((a - b) * self.twiddles[k].conj()).mul_i()
            })
            .collect();
        self.inner.process(&mut packed, Direction::Backward)?;

        for (pair, z) in output.chunks_exact_mut(2).zip(packed.iter()) {
            pair[0] = z.re;
            pair[1] = z.im;
        }
        Ok(())
    }
}
