//! Shared building blocks for sphere pixelization and harmonic transforms.
//!
//! Everything here is small and dependency-light so the pixel scheme, the FFT
//! engine and the transform core can all depend on it.
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`constants`] | π multiples, degree/radian factors, HEALPix boundary constants |
//! | [`errors`] | [`SphereError`] and the [`SphereResult`] alias |
//! | [`math`] | Integer square root, floored modulo, Vincenty separation |
//! | [`utils`] | Angle normalization helpers |
//! | [`vector3`] | [`Vector3`] Cartesian directions |
//! | [`pointing`] | [`Pointing`] co-latitude/longitude pairs |

pub mod constants;
pub mod errors;
pub mod math;
pub mod pointing;
pub mod utils;
pub mod vector3;

pub use errors::{SphereError, SphereResult};
pub use pointing::Pointing;
pub use vector3::Vector3;
