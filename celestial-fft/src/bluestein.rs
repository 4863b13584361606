//! Chirp-z transform for lengths with a large prime factor.
//!
//! With `w_k = e^{-πi·k²/n}` the DFT becomes a convolution,
//! `X_k = w_k · Σ_j (x_j·w_j)·conj(w_{k−j})`, evaluated with FFTs of a padded
//! length that is cheap to factor.

use crate::complex::Complex;
use crate::plan::{factorize, good_size, MixedRadix};
use celestial_core::constants::PI;

type C64 = Complex<f64>;

#[derive(Debug, Clone)]
pub(crate) struct Bluestein {
    n: usize,
    n2: usize,
    inner: MixedRadix,
    /// `w_k` for `k < n`.
    chirp: Vec<C64>,
    /// Forward transform of the padded conjugate chirp.
    kernel: Vec<C64>,
}

impl Bluestein {
    pub(crate) fn new(n: usize) -> Self {
        let n2 = good_size(2 * n - 1);
        let inner = MixedRadix::new(n2, &factorize(n2));

        // k² mod 2n keeps the phase argument small and exact
        let two_n = 2 * n as u64;
        let chirp: Vec<C64> = (0..n as u64)
            .map(|k| C64::cis(-PI * ((k * k) % two_n) as f64 / n as f64))
            .collect();

        let mut kernel = vec![C64::ZERO; n2];
        kernel[0] = chirp[0].conj();
        for k in 1..n {
            kernel[k] = chirp[k].conj();
            kernel[n2 - k] = chirp[k].conj();
        }
        inner.forward(&mut kernel);

        Self {
            n,
            n2,
            inner,
            chirp,
            kernel,
        }
    }

    pub(crate) fn forward(&self, data: &mut [C64]) {
        let mut buf = vec![C64::ZERO; self.n2];
        for ((b, &x), &w) in buf.iter_mut().zip(data.iter()).zip(self.chirp.iter()) {
            *b = x * w;
        }
        self.inner.forward(&mut buf);
        // pointwise product, then an inverse transform through conjugation
        for (b, &k) in buf.iter_mut().zip(self.kernel.iter()) {
            *b = (*b * k).conj();
        }
        self.inner.forward(&mut buf);

        let norm = 1.0 / self.n2 as f64;
        for ((x, b), &w) in data.iter_mut().zip(buf.iter()).zip(self.chirp.iter()) {
            *x = w * b.conj().scale(norm);
        }
        debug_assert_eq!(data.len(), self.n);
    }
}
