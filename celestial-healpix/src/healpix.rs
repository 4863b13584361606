//! Core HEALPix indexing: construction, pixel ↔ position and scheme conversion.
//!
//! The sphere is split into 12 base faces, each subdivided into `nside × nside`
//! pixels of equal area. Pixel centres lie on `4·nside − 1` iso-latitude rings:
//! the polar caps hold rings with `4i` pixels, the equatorial belt holds rings
//! with `4·nside` pixels each.
//!
//! Positions are handled internally as `(z, φ)` with `z = cos θ`. Close to the
//! poles `z` alone loses precision, so `sin θ` travels alongside it when
//! available.

use crate::scheme::Scheme;
use crate::tables::{compress_bits, spread_bits, JPLL, JRLL};
use celestial_core::constants::{FOURPI, HALF_PI, INV_HALFPI, PI, TWOTHIRD};
use celestial_core::math::{fmodulo, isqrt};
use celestial_core::{Pointing, SphereError, SphereResult, Vector3};

/// Largest supported resolution order.
pub const ORDER_MAX: u32 = 29;

/// Largest supported `nside`.
pub const NSIDE_MAX: u64 = 1 << ORDER_MAX;

/// Number of pixels for a given `nside`.
///
/// # Errors
/// `InvalidParameter` if `nside` is zero or larger than [`NSIDE_MAX`].
pub fn npix(nside: u64) -> SphereResult<u64> {
    if nside == 0 || nside > NSIDE_MAX {
        return Err(SphereError::invalid_parameter(
            "nside",
            format!("{nside} outside 1..={NSIDE_MAX}"),
        ));
    }
    Ok(12 * nside * nside)
}

/// Resolution order of a power-of-two `nside`.
pub fn nside2order(nside: u64) -> SphereResult<u32> {
    if nside == 0 || !nside.is_power_of_two() {
        return Err(SphereError::invalid_parameter(
            "nside",
            format!("{nside} is not a positive power of two"),
        ));
    }
    Ok(nside.trailing_zeros())
}

/// Recovers `nside` from a pixel count, failing unless `npix == 12·nside²`.
pub fn npix2nside(npix: u64) -> SphereResult<u64> {
    let nside = isqrt(npix / 12);
    if nside == 0 || 12 * nside * nside != npix {
        return Err(SphereError::invalid_parameter(
            "npix",
            format!("{npix} is not of the form 12*nside^2"),
        ));
    }
    Ok(nside)
}

/// Location of a ring: where it starts in RING order and how it is laid out.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RingSpan {
    /// RING index of the first pixel on the ring.
    pub first_pixel: u64,
    /// Number of pixels on the ring.
    pub npix: u64,
    /// Co-latitude of the ring.
    pub theta: f64,
    /// `true` when the first pixel centre sits half a pixel east of φ = 0.
    pub shifted: bool,
}

/// Position on the sphere as `z = cos θ`, longitude, and `sin θ` where it was
/// computed directly.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Loc {
    pub z: f64,
    pub phi: f64,
    pub sth: Option<f64>,
}

impl Loc {
    fn theta(&self) -> f64 {
        match self.sth {
            Some(sth) => libm::atan2(sth, self.z),
            None => libm::acos(self.z),
        }
    }

    fn to_vector(self) -> Vector3 {
        match self.sth {
            Some(sth) => {
                let (sin_phi, cos_phi) = libm::sincos(self.phi);
                Vector3::new(sth * cos_phi, sth * sin_phi, self.z)
            }
            None => Vector3::from_z_phi(self.z, self.phi),
        }
    }
}

/// A HEALPix pixelization at a fixed resolution and ordering.
///
/// Cheap to clone and immutable after construction; share it freely between
/// threads.
///
/// ```
/// use celestial_healpix::{Healpix, Scheme};
///
/// let hp = Healpix::new(4, Scheme::Ring).unwrap();
/// assert_eq!(hp.npix(), 192);
/// let centre = hp.pix2ang(0).unwrap();
/// assert_eq!(hp.ang2pix(&centre).unwrap(), 0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Healpix {
    order: Option<u32>,
    nside: i64,
    npface: i64,
    ncap: i64,
    npix: i64,
    fact1: f64,
    fact2: f64,
    scheme: Scheme,
}

impl Healpix {
    /// Creates a pixelization with the given `nside`.
    ///
    /// # Errors
    /// `InvalidParameter` if `nside` is zero, larger than [`NSIDE_MAX`], or not a
    /// power of two while `scheme` is [`Scheme::Nested`].
    pub fn new(nside: u64, scheme: Scheme) -> SphereResult<Self> {
        if nside == 0 {
            return Err(SphereError::invalid_parameter("nside", "must be positive"));
        }
        if nside > NSIDE_MAX {
            return Err(SphereError::invalid_parameter(
                "nside",
                format!("{nside} exceeds the maximum of {NSIDE_MAX}"),
            ));
        }
        let order = nside.is_power_of_two().then(|| nside.trailing_zeros());
        if scheme == Scheme::Nested && order.is_none() {
            return Err(SphereError::invalid_parameter(
                "nside",
                format!("NESTED ordering requires a power of two, got {nside}"),
            ));
        }

        let nside = nside as i64;
        let npface = nside * nside;
        let npix = 12 * npface;
        let fact2 = 4.0 / npix as f64;
        Ok(Self {
            order,
            nside,
            npface,
            ncap: 2 * nside * (nside - 1),
            npix,
            fact1: (2 * nside) as f64 * fact2,
            fact2,
            scheme,
        })
    }

    /// Creates a pixelization with `nside = 2^order`.
    pub fn from_order(order: u32, scheme: Scheme) -> SphereResult<Self> {
        if order > ORDER_MAX {
            return Err(SphereError::invalid_parameter(
                "order",
                format!("{order} exceeds the maximum of {ORDER_MAX}"),
            ));
        }
        Self::new(1u64 << order, scheme)
    }

    /// Same resolution in a different ordering.
    pub fn with_scheme(&self, scheme: Scheme) -> SphereResult<Self> {
        Self::new(self.nside as u64, scheme)
    }

    #[inline]
    pub fn nside(&self) -> u64 {
        self.nside as u64
    }

    /// Resolution order, or `None` for a non-power-of-two `nside`.
    #[inline]
    pub fn order(&self) -> Option<u32> {
        self.order
    }

    #[inline]
    pub fn npix(&self) -> u64 {
        self.npix as u64
    }

    #[inline]
    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    /// Number of iso-latitude rings, `4·nside − 1`.
    #[inline]
    pub fn nrings(&self) -> u64 {
        (4 * self.nside - 1) as u64
    }

    /// Solid angle of one pixel in steradians.
    #[inline]
    pub fn pixel_area(&self) -> f64 {
        FOURPI / self.npix as f64
    }

    /// Typical angular size of a pixel, `√(4π/npix)` radians.
    #[inline]
    pub fn nside_resolution(&self) -> f64 {
        libm::sqrt(self.pixel_area())
    }

    /// Upper bound on the angular distance between any pixel centre and its corners.
    pub fn max_pixrad(&self) -> f64 {
        let va = Vector3::from_z_phi(TWOTHIRD, PI / (4 * self.nside) as f64);
        let t1 = 1.0 - 1.0 / self.nside as f64;
        let vb = Vector3::from_z_phi(1.0 - t1 * t1 / 3.0, 0.0);
        va.angle_between(&vb)
    }

    /// Pixel containing the direction `ptg`.
    ///
    /// # Errors
    /// `InvalidParameter` if `theta` is outside [0, π] or either angle is not finite.
    pub fn ang2pix(&self, ptg: &Pointing) -> SphereResult<u64> {
        self.ang2pix_theta_phi(ptg.theta, ptg.phi)
    }

    pub fn ang2pix_theta_phi(&self, theta: f64, phi: f64) -> SphereResult<u64> {
        if !Pointing::new(theta, phi).is_valid() {
            return Err(SphereError::invalid_parameter(
                "theta",
                format!("({theta}, {phi}) is not a valid direction; theta must lie in [0, pi]"),
            ));
        }
        let (sin_theta, cos_theta) = libm::sincos(theta);
        let sth = (theta < 0.01 || theta > PI - 0.01).then_some(sin_theta);
        Ok(self.loc2pix(&Loc {
            z: cos_theta,
            phi,
            sth,
        }) as u64)
    }

    /// Pixel containing the direction of `v`, which need not be normalized.
    pub fn vec2pix(&self, v: &Vector3) -> SphereResult<u64> {
        let len = v.magnitude();
        if len == 0.0 || !len.is_finite() {
            return Err(SphereError::invalid_parameter(
                "vector",
                "direction vector must be finite and non-zero",
            ));
        }
        let inv_len = 1.0 / len;
        let z = v.z * inv_len;
        let phi = if v.x == 0.0 && v.y == 0.0 {
            0.0
        } else {
            libm::atan2(v.y, v.x)
        };
        let sth = (z.abs() > 0.99).then(|| libm::sqrt(v.x * v.x + v.y * v.y) * inv_len);
        Ok(self.loc2pix(&Loc { z, phi, sth }) as u64)
    }

    /// Centre of pixel `pix`.
    pub fn pix2ang(&self, pix: u64) -> SphereResult<Pointing> {
        let loc = self.pix2loc(self.check_pixel(pix)?);
        Ok(Pointing::new(loc.theta(), loc.phi))
    }

    /// Centre of pixel `pix` as a unit vector.
    pub fn pix2vec(&self, pix: u64) -> SphereResult<Vector3> {
        Ok(self.pix2loc(self.check_pixel(pix)?).to_vector())
    }

    /// Centre of pixel `pix` as `(cos θ, φ)`.
    pub fn pix2zphi(&self, pix: u64) -> SphereResult<(f64, f64)> {
        let loc = self.pix2loc(self.check_pixel(pix)?);
        Ok((loc.z, loc.phi))
    }

    /// Converts a RING index to the NESTED index of the same pixel.
    ///
    /// # Errors
    /// `UnsupportedScheme` when `nside` is not a power of two.
    pub fn ring2nest(&self, pix: u64) -> SphereResult<u64> {
        let order = self.require_order("ring2nest")?;
        let pix = self.check_pixel(pix)?;
        let (x, y, face) = self.ring2xyf(pix);
        Ok(self.xyf2nest(x, y, face, order) as u64)
    }

    /// Converts a NESTED index to the RING index of the same pixel.
    pub fn nest2ring(&self, pix: u64) -> SphereResult<u64> {
        let order = self.require_order("nest2ring")?;
        let pix = self.check_pixel(pix)?;
        let (x, y, face) = self.nest2xyf(pix, order);
        Ok(self.xyf2ring(x, y, face) as u64)
    }

    /// Face-local coordinates `(ix, iy, face)` of a pixel in the active scheme.
    pub fn pix2xyf(&self, pix: u64) -> SphereResult<(u64, u64, u32)> {
        let (x, y, face) = self.pix2xyf_raw(self.check_pixel(pix)?);
        Ok((x as u64, y as u64, face as u32))
    }

    /// Pixel index in the active scheme from face-local coordinates.
    pub fn xyf2pix(&self, ix: u64, iy: u64, face: u32) -> SphereResult<u64> {
        let n = self.nside as u64;
        if ix >= n || iy >= n {
            return Err(SphereError::invalid_parameter(
                "ix/iy",
                format!("({ix}, {iy}) outside the {n}x{n} face grid"),
            ));
        }
        if face >= 12 {
            return Err(SphereError::invalid_parameter(
                "face",
                format!("{face} is not a base face (0..12)"),
            ));
        }
        Ok(self.xyf2pix_raw(ix as i64, iy as i64, face as usize) as u64)
    }

    /// Index of the ring with the smallest `z` still above (north of) `z`.
    ///
    /// Returns 0 when `z` lies north of the first ring and `4·nside − 1` when it
    /// lies south of the last one.
    pub fn ring_above(&self, z: f64) -> u64 {
        let az = z.abs();
        if az <= TWOTHIRD {
            return (self.nside as f64 * (2.0 - 1.5 * z)) as u64;
        }
        let iring = (self.nside as f64 * libm::sqrt(3.0 * (1.0 - az))) as i64;
        if z > 0.0 {
            iring as u64
        } else {
            (4 * self.nside - iring - 1) as u64
        }
    }

    /// Start pixel, pixel count, co-latitude and shift of ring `ring` (1-based).
    pub fn ring_info(&self, ring: u64) -> SphereResult<RingSpan> {
        if ring == 0 || ring > self.nrings() {
            return Err(SphereError::invalid_parameter(
                "ring",
                format!("{ring} outside [1, {}]", self.nrings()),
            ));
        }
        let ring = ring as i64;
        let northring = if ring > 2 * self.nside {
            4 * self.nside - ring
        } else {
            ring
        };

        let (mut theta, ringpix, shifted, mut startpix) = if northring < self.nside {
            let tmp = (northring * northring) as f64 * self.fact2;
            let costheta = 1.0 - tmp;
            let sintheta = libm::sqrt(tmp * (2.0 - tmp));
            (
                libm::atan2(sintheta, costheta),
                4 * northring,
                true,
                2 * northring * (northring - 1),
            )
        } else {
            let ringpix = 4 * self.nside;
            (
                libm::acos((2 * self.nside - northring) as f64 * self.fact1),
                ringpix,
                ((northring - self.nside) & 1) == 0,
                self.ncap + (northring - self.nside) * ringpix,
            )
        };
        if northring != ring {
            theta = PI - theta;
            startpix = self.npix - startpix - ringpix;
        }
        Ok(RingSpan {
            first_pixel: startpix as u64,
            npix: ringpix as u64,
            theta,
            shifted,
        })
    }

    /// Ring (1-based, north to south) on which pixel `pix` lies.
    pub fn pix2ring(&self, pix: u64) -> SphereResult<u64> {
        let pix = self.check_pixel(pix)?;
        let ring = match (self.scheme, self.order) {
            (Scheme::Nested, Some(order)) => {
                let (x, y, face) = self.nest2xyf(pix, order);
                (JRLL[face] << order) - x - y - 1
            }
            _ => {
                if pix < self.ncap {
                    (1 + isqrt((1 + 2 * pix) as u64) as i64) >> 1
                } else if pix < self.npix - self.ncap {
                    (pix - self.ncap) / (4 * self.nside) + self.nside
                } else {
                    4 * self.nside - ((1 + isqrt((2 * (self.npix - pix) - 1) as u64) as i64) >> 1)
                }
            }
        };
        Ok(ring as u64)
    }

    pub(crate) fn check_pixel(&self, pix: u64) -> SphereResult<i64> {
        if pix >= self.npix as u64 {
            return Err(SphereError::invalid_parameter(
                "pixel",
                format!("{pix} outside [0, {})", self.npix),
            ));
        }
        Ok(pix as i64)
    }

    pub(crate) fn require_order(&self, operation: &str) -> SphereResult<u32> {
        self.order.ok_or_else(|| {
            SphereError::unsupported_scheme(
                operation,
                format!("nside {} is not a power of two", self.nside),
            )
        })
    }

    #[inline]
    pub(crate) fn nside_i64(&self) -> i64 {
        self.nside
    }

    #[inline]
    pub(crate) fn npix_i64(&self) -> i64 {
        self.npix
    }

    /// First pixel, pixel count and shift of a ring, without the co-latitude.
    pub(crate) fn ring_info_small(&self, ring: i64) -> (i64, i64, bool) {
        let n = self.nside;
        if ring < n {
            (2 * ring * (ring - 1), 4 * ring, true)
        } else if ring < 3 * n {
            (self.ncap + (ring - n) * 4 * n, 4 * n, ((ring - n) & 1) == 0)
        } else {
            let nr = 4 * n - ring;
            (self.npix - 2 * nr * (nr + 1), 4 * nr, true)
        }
    }

    /// `cos θ` of ring `ring`.
    pub(crate) fn ring2z(&self, ring: i64) -> f64 {
        if ring < self.nside {
            1.0 - (ring * ring) as f64 * self.fact2
        } else if ring <= 3 * self.nside {
            (2 * self.nside - ring) as f64 * self.fact1
        } else {
            let ring = 4 * self.nside - ring;
            (ring * ring) as f64 * self.fact2 - 1.0
        }
    }

    pub(crate) fn pix2xyf_raw(&self, pix: i64) -> (i64, i64, usize) {
        match (self.scheme, self.order) {
            (Scheme::Nested, Some(order)) => self.nest2xyf(pix, order),
            _ => self.ring2xyf(pix),
        }
    }

    pub(crate) fn xyf2pix_raw(&self, x: i64, y: i64, face: usize) -> i64 {
        match (self.scheme, self.order) {
            (Scheme::Nested, Some(order)) => self.xyf2nest(x, y, face, order),
            _ => self.xyf2ring(x, y, face),
        }
    }

    pub(crate) fn nest2xyf(&self, pix: i64, order: u32) -> (i64, i64, usize) {
        let face = (pix >> (2 * order)) as usize;
        let local = (pix & (self.npface - 1)) as u64;
        (
            compress_bits(local) as i64,
            compress_bits(local >> 1) as i64,
            face,
        )
    }

    pub(crate) fn xyf2nest(&self, x: i64, y: i64, face: usize, order: u32) -> i64 {
        ((face as i64) << (2 * order))
            + spread_bits(x as u32) as i64
            + ((spread_bits(y as u32) as i64) << 1)
    }

    pub(crate) fn ring2xyf(&self, pix: i64) -> (i64, i64, usize) {
        let n = self.nside;
        let nl2 = 2 * n;

        let (iring, iphi, kshift, nr, face) = if pix < self.ncap {
            let iring = (1 + isqrt((1 + 2 * pix) as u64) as i64) >> 1;
            let iphi = (pix + 1) - 2 * iring * (iring - 1);
            (iring, iphi, 0, iring, ((iphi - 1) / iring) as usize)
        } else if pix < self.npix - self.ncap {
            let ip = pix - self.ncap;
            let tmp = ip / (4 * n);
            let iring = tmp + n;
            let iphi = ip - tmp * 4 * n + 1;
            let kshift = (iring + n) & 1;
            let ire = tmp + 1;
            let irm = nl2 + 1 - tmp;
            let ifm = (iphi - (ire >> 1) + n - 1) / n;
            let ifp = (iphi - (irm >> 1) + n - 1) / n;
            let face = if ifp == ifm {
                ifp | 4
            } else if ifp < ifm {
                ifp
            } else {
                ifm + 8
            };
            (iring, iphi, kshift, n, face as usize)
        } else {
            let ip = self.npix - pix;
            let ring_south = (1 + isqrt((2 * ip - 1) as u64) as i64) >> 1;
            let iphi = 4 * ring_south + 1 - (ip - 2 * ring_south * (ring_south - 1));
            (
                2 * nl2 - ring_south,
                iphi,
                0,
                ring_south,
                ((iphi - 1) / ring_south + 8) as usize,
            )
        };

        let irt = iring - (2 + (face as i64 >> 2)) * n + 1;
        let mut ipt = 2 * iphi - JPLL[face] * nr - kshift - 1;
        if ipt >= nl2 {
            ipt -= 8 * n;
        }
        ((ipt - irt) >> 1, (-ipt - irt) >> 1, face)
    }

    pub(crate) fn xyf2ring(&self, x: i64, y: i64, face: usize) -> i64 {
        let nl4 = 4 * self.nside;
        let jr = JRLL[face] * self.nside - x - y - 1;
        let (first, ringpix, shifted) = self.ring_info_small(jr);
        let nr = ringpix >> 2;
        let kshift = if shifted { 0 } else { 1 };
        let mut jp = (JPLL[face] * nr + x - y + 1 + kshift).div_euclid(2);
        if jp < 1 {
            jp += nl4;
        }
        first + jp - 1
    }

    pub(crate) fn pix2loc(&self, pix: i64) -> Loc {
        let n = self.nside;
        if let (Scheme::Nested, Some(order)) = (self.scheme, self.order) {
            let (x, y, face) = self.nest2xyf(pix, order);
            let jr = (JRLL[face] << order) - x - y - 1;
            let (nr, z, sth) = if jr < n {
                let tmp = (jr * jr) as f64 * self.fact2;
                let z = 1.0 - tmp;
                (jr, z, (z > 0.99).then(|| libm::sqrt(tmp * (2.0 - tmp))))
            } else if jr > 3 * n {
                let nr = 4 * n - jr;
                let tmp = (nr * nr) as f64 * self.fact2;
                let z = tmp - 1.0;
                (nr, z, (z < -0.99).then(|| libm::sqrt(tmp * (2.0 - tmp))))
            } else {
                (n, (2 * n - jr) as f64 * self.fact1, None)
            };
            let mut tmp = JPLL[face] * nr + x - y;
            if tmp < 0 {
                tmp += 8 * nr;
            }
            let phi = if nr == n {
                0.75 * HALF_PI * tmp as f64 * self.fact1
            } else {
                0.5 * HALF_PI * tmp as f64 / nr as f64
            };
            return Loc { z, phi, sth };
        }

        if pix < self.ncap {
            let iring = (1 + isqrt((1 + 2 * pix) as u64) as i64) >> 1;
            let iphi = (pix + 1) - 2 * iring * (iring - 1);
            let tmp = (iring * iring) as f64 * self.fact2;
            let z = 1.0 - tmp;
            Loc {
                z,
                phi: (iphi as f64 - 0.5) * HALF_PI / iring as f64,
                sth: (z > 0.99).then(|| libm::sqrt(tmp * (2.0 - tmp))),
            }
        } else if pix < self.npix - self.ncap {
            let nl4 = 4 * n;
            let ip = pix - self.ncap;
            let tmp = ip / nl4;
            let iring = tmp + n;
            let iphi = ip - nl4 * tmp + 1;
            let fodd = if (iring + n) & 1 == 1 { 1.0 } else { 0.5 };
            Loc {
                z: (2 * n - iring) as f64 * self.fact1,
                phi: (iphi as f64 - fodd) * PI * 0.75 * self.fact1,
                sth: None,
            }
        } else {
            let ip = self.npix - pix;
            let iring = (1 + isqrt((2 * ip - 1) as u64) as i64) >> 1;
            let iphi = 4 * iring + 1 - (ip - 2 * iring * (iring - 1));
            let tmp = (iring * iring) as f64 * self.fact2;
            let z = tmp - 1.0;
            Loc {
                z,
                phi: (iphi as f64 - 0.5) * HALF_PI / iring as f64,
                sth: (z < -0.99).then(|| libm::sqrt(tmp * (2.0 - tmp))),
            }
        }
    }

    pub(crate) fn loc2pix(&self, loc: &Loc) -> i64 {
        let n = self.nside;
        let nf = n as f64;
        let z = loc.z;
        let za = z.abs();
        let tt = fmodulo(loc.phi * INV_HALFPI, 4.0);

        let polar_scale = || match loc.sth {
            Some(sth) if za >= 0.99 => nf * sth / libm::sqrt((1.0 + za) / 3.0),
            _ => nf * libm::sqrt(3.0 * (1.0 - za)),
        };

        match (self.scheme, self.order) {
            (Scheme::Nested, Some(order)) => {
                if za <= TWOTHIRD {
                    let temp1 = nf * (0.5 + tt);
                    let temp2 = nf * (z * 0.75);
                    let jp = (temp1 - temp2) as i64;
                    let jm = (temp1 + temp2) as i64;
                    let ifp = jp >> order;
                    let ifm = jm >> order;
                    let face = if ifp == ifm {
                        ifp | 4
                    } else if ifp < ifm {
                        ifp
                    } else {
                        ifm + 8
                    };
                    let ix = jm & (n - 1);
                    let iy = n - (jp & (n - 1)) - 1;
                    self.xyf2nest(ix, iy, face as usize, order)
                } else {
                    let ntt = (tt as i64).min(3);
                    let tp = tt - ntt as f64;
                    let tmp = polar_scale();
                    let jp = ((tp * tmp) as i64).min(n - 1);
                    let jm = (((1.0 - tp) * tmp) as i64).min(n - 1);
                    if z > 0.0 {
                        self.xyf2nest(n - jm - 1, n - jp - 1, ntt as usize, order)
                    } else {
                        self.xyf2nest(jp, jm, (ntt + 8) as usize, order)
                    }
                }
            }
            _ => {
                if za <= TWOTHIRD {
                    let nl4 = 4 * n;
                    let temp1 = nf * (0.5 + tt);
                    let temp2 = nf * z * 0.75;
                    let jp = (temp1 - temp2) as i64;
                    let jm = (temp1 + temp2) as i64;
                    let ir = n + 1 + jp - jm;
                    let kshift = 1 - (ir & 1);
                    let t1 = jp + jm - n + kshift + 1 + nl4 + nl4;
                    let ip = (t1 >> 1) % nl4;
                    self.ncap + (ir - 1) * nl4 + ip
                } else {
                    let tp = tt - (tt as i64) as f64;
                    let tmp = polar_scale();
                    let jp = (tp * tmp) as i64;
                    let jm = ((1.0 - tp) * tmp) as i64;
                    let ir = jp + jm + 1;
                    let ip = ((tt * ir as f64) as i64).min(4 * ir - 1);
                    if z > 0.0 {
                        2 * ir * (ir - 1) + ip
                    } else {
                        self.npix - 2 * ir * (ir + 1) + ip
                    }
                }
            }
        }
    }
}
