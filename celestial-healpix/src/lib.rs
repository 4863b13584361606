//! HEALPix pixelization of the sphere.
//!
//! Hierarchical, equal-area, iso-latitude: every pixel covers `4π/npix`
//! steradians and pixel centres sit on `4·nside − 1` rings of constant
//! latitude, which is what makes fast spherical harmonic transforms possible.
//!
//! | Module | Contents |
//! |--------|----------|
//! | `healpix` | [`Healpix`], position ↔ pixel conversion, RING ↔ NESTED, ring helpers |
//! | `neighbors` | Eight-neighbourhood of a pixel |
//! | `query` | Disc queries |
//! | `interpolate` | Bilinear interpolation weights |
//! | `reorder` | Whole-map reordering, NESTED parent/children |
//!
//! # Example
//!
//! ```
//! use celestial_core::Pointing;
//! use celestial_healpix::{Healpix, Scheme};
//!
//! let hp = Healpix::new(16, Scheme::Nested).unwrap();
//! let pix = hp.ang2pix(&Pointing::new(1.0, 2.0)).unwrap();
//! let ring = hp.nest2ring(pix).unwrap();
//! assert_eq!(hp.ring2nest(ring).unwrap(), pix);
//! ```

mod healpix;
mod interpolate;
mod neighbors;
mod query;
mod reorder;
mod scheme;
mod tables;

pub use healpix::{npix, npix2nside, nside2order, Healpix, RingSpan, NSIDE_MAX, ORDER_MAX};
pub use scheme::Scheme;
