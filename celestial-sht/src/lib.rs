//! Spherical harmonic transforms on iso-latitude grids.
//!
//! Synthesis turns coefficients `a_lm` into map samples,
//! `f(θ, φ) = Σ a_lm Y_lm(θ, φ)`; analysis approximates the inverse by
//! quadrature over the map's rings. Both run in `O(lmax³)` via a Legendre
//! recurrence per order and an FFT per ring.
//!
//! | Module | Contents |
//! |--------|----------|
//! | `geometry` | [`GeomInfo`]: rings, mirror pairs, HEALPix and quadrature grids |
//! | `alm` | [`AlmInfo`]: coefficient layout |
//! | `ylm` | [`YlmGenerator`]: scaled Legendre recurrence |
//! | `pool` | [`ThreadPool`], [`TaskBatch`] |
//! | `transform` | [`ShtEngine`]: `alm2map`, `map2alm`, iterative analysis |
//! | `config` | [`TransformConfig`] from JSON |
//!
//! # Example
//!
//! ```
//! use celestial_fft::Complex;
//! use celestial_sht::{AlmInfo, GeomInfo, ShtEngine, Threads};
//!
//! let engine = ShtEngine::new(Threads::Count(2)).unwrap();
//! let info = AlmInfo::new(16, 16).unwrap();
//! let geom = GeomInfo::gauss_legendre(17, 33).unwrap();
//!
//! let mut alm = vec![Complex::new(0.0f64, 0.0); info.size()];
//! alm[info.offset(10, 3)] = Complex::new(0.5, -0.25);
//!
//! let map = engine.alm2map(&alm, &info, &geom).unwrap();
//! let back = engine.map2alm(&map, &geom, &info).unwrap();
//! let i = info.offset(10, 3);
//! assert!((back[i].re - 0.5).abs() < 1e-10 && (back[i].im + 0.25).abs() < 1e-10);
//! ```

mod alm;
mod config;
mod geometry;
mod pool;
mod transform;
mod ylm;

pub use alm::{num_alm, AlmInfo, AlmOrdering};
pub use config::{Precision, TransformConfig};
pub use geometry::{GeomInfo, RingInfo, RingPair};
pub use pool::{TaskBatch, ThreadPool, Threads};
pub use transform::{ShtEngine, ShtFloat};
pub use ylm::{LegendreState, RecurrenceCoeffs, YlmGenerator};
