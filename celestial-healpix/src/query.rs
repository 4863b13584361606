//! Disc queries.
//!
//! Works ring by ring: for every ring crossing the disc, the longitude range
//! inside the disc follows from the spherical law of cosines, and the pixels in
//! that range are emitted as a contiguous run of RING indices. NESTED results are
//! converted and re-sorted at the end.

use crate::healpix::Healpix;
use crate::scheme::Scheme;
use celestial_core::constants::{INV_TWOPI, PI};
use celestial_core::utils::normalize_angle_to_positive;
use celestial_core::{Pointing, SphereError, SphereResult};

impl Healpix {
    /// Pixels whose centres lie within `radius` radians of `center`, sorted ascending.
    ///
    /// A radius of π or more returns every pixel.
    ///
    /// # Errors
    /// `InvalidParameter` for an invalid centre or a negative or non-finite radius.
    pub fn query_disc(&self, center: &Pointing, radius: f64) -> SphereResult<Vec<u64>> {
        self.query_disc_impl(center, radius, "query_disc")
    }

    /// Conservative variant of [`Healpix::query_disc`]: every pixel overlapping
    /// the disc is returned, along with a few that only come close.
    pub fn query_disc_inclusive(&self, center: &Pointing, radius: f64) -> SphereResult<Vec<u64>> {
        self.validate_disc(center, radius)?;
        self.query_disc_impl(center, radius + self.max_pixrad(), "query_disc_inclusive")
    }

    fn validate_disc(&self, center: &Pointing, radius: f64) -> SphereResult<()> {
        if !center.is_valid() {
            return Err(SphereError::invalid_parameter(
                "center",
                format!("{center} is not a valid direction"),
            ));
        }
        if !radius.is_finite() || radius < 0.0 {
            return Err(SphereError::invalid_parameter(
                "radius",
                format!("must be finite and non-negative, got {radius}"),
            ));
        }
        Ok(())
    }

    fn query_disc_impl(
        &self,
        center: &Pointing,
        radius: f64,
        operation: &str,
    ) -> SphereResult<Vec<u64>> {
        self.validate_disc(center, radius)?;
        if radius >= PI {
            return Ok((0..self.npix()).collect());
        }

        let phi = normalize_angle_to_positive(center.phi);
        let mut pixels = self.ring_pixels_in_disc(center.theta, phi, radius);

        if self.scheme() == Scheme::Nested {
            let order = self.require_order(operation)?;
            for p in pixels.iter_mut() {
                let (x, y, face) = self.ring2xyf(*p as i64);
                *p = self.xyf2nest(x, y, face, order) as u64;
            }
            pixels.sort_unstable();
        }
        tracing::trace!(
            operation,
            radius,
            count = pixels.len(),
            "disc query complete"
        );
        Ok(pixels)
    }

    /// RING indices of all pixel centres within `radius` of `(theta, phi)`, ascending.
    fn ring_pixels_in_disc(&self, theta: f64, phi: f64, radius: f64) -> Vec<u64> {
        let n = self.nside_i64();
        let nrings = 4 * n - 1;
        let mut out: Vec<u64> = Vec::new();
        let mut push_range = |lo: i64, hi_exclusive: i64| {
            out.extend((lo as u64)..(hi_exclusive as u64));
        };

        let cosang = libm::cos(radius);
        let z0 = libm::cos(theta);
        // infinite at the poles; rings then fall through the ysq <= 0 branch
        let xa = 1.0 / libm::sqrt((1.0 - z0) * (1.0 + z0));

        let rlat1 = theta - radius;
        let zmax = libm::cos(rlat1);
        let irmin = self.ring_above(zmax) as i64 + 1;
        if rlat1 <= 0.0 && irmin > 1 {
            // north pole inside the disc: the whole cap down to irmin-1
            let (sp, rp, _) = self.ring_info_small(irmin - 1);
            push_range(0, sp + rp);
        }

        let rlat2 = theta + radius;
        let zmin = libm::cos(rlat2);
        let irmax = self.ring_above(zmin) as i64;

        for iz in irmin..=irmax.min(nrings) {
            let z = self.ring2z(iz);
            let x = (cosang - z * z0) * xa;
            let ysq = 1.0 - z * z - x * x;
            let dphi = if ysq <= 0.0 {
                0.0
            } else {
                libm::atan2(libm::sqrt(ysq), x)
            };
            if dphi.is_nan() || dphi <= 0.0 {
                continue;
            }

            let (ipix1, nr, shifted) = self.ring_info_small(iz);
            let shift = if shifted { 0.5 } else { 0.0 };
            let ipix2 = ipix1 + nr - 1;
            let nrf = nr as f64;
            let mut ip_lo = libm::floor(nrf * INV_TWOPI * (phi - dphi) - shift) as i64 + 1;
            let mut ip_hi = libm::floor(nrf * INV_TWOPI * (phi + dphi) - shift) as i64;
            if ip_lo > ip_hi {
                continue;
            }
            if ip_hi >= nr {
                ip_lo -= nr;
                ip_hi -= nr;
            }
            if ip_lo < 0 {
                push_range(ipix1, ipix1 + ip_hi + 1);
                push_range(ipix1 + ip_lo + nr, ipix2 + 1);
            } else {
                push_range(ipix1 + ip_lo, ipix1 + ip_hi + 1);
            }
        }

        if rlat2 >= PI && irmax + 1 < 4 * n {
            // south pole inside the disc
            let (sp, _, _) = self.ring_info_small(irmax + 1);
            push_range(sp, self.npix_i64());
        }

        // runs wrapping across phi = 0 are emitted high part last
        out.sort_unstable();
        out
    }
}
