//! Fast Fourier transforms for iso-latitude ring data.
//!
//! | Item | Purpose |
//! |------|---------|
//! | [`Complex`] | Complex numbers in `f32` or `f64` storage |
//! | [`ComplexFft`] | Mixed-radix complex FFT with a Bluestein fallback |
//! | [`RealFft`] | Real signal ↔ half spectrum |
//! | [`plan_complex`], [`plan_real`] | Cached, shareable plans |
//!
//! ```
//! use celestial_fft::plan_real;
//!
//! let fft = plan_real(8).unwrap();
//! let signal: Vec<f64> = (0..8).map(|j| (j as f64).cos()).collect();
//! let spectrum = fft.forward(&signal).unwrap();
//! let back = fft.backward(&spectrum).unwrap();
//! assert!((back[3] / 8.0 - signal[3]).abs() < 1e-12);
//! ```

mod bluestein;
mod cache;
mod complex;
mod plan;
mod real;

pub use cache::{plan_complex, plan_real};
pub use complex::Complex;
pub use plan::{factorize, good_size, ComplexFft, Direction, MAX_GENERIC_RADIX};
pub use real::RealFft;
