//! Bilinear interpolation between the four pixel centres around a direction.

use crate::healpix::Healpix;
use crate::scheme::Scheme;
use celestial_core::constants::{PI, TWOPI};
use celestial_core::utils::normalize_angle_to_positive;
use celestial_core::{Pointing, SphereError, SphereResult};

impl Healpix {
    /// Four pixels surrounding `ptg` and their bilinear weights.
    ///
    /// Pixels 0/1 lie on the ring above `ptg`, pixels 2/3 on the ring below.
    /// Next to a pole the missing ring is replaced by the four pixels around
    /// the pole. The weights are non-negative and sum to one.
    pub fn interpolation_weights(&self, ptg: &Pointing) -> SphereResult<([u64; 4], [f64; 4])> {
        if !ptg.is_valid() {
            return Err(SphereError::invalid_parameter(
                "pointing",
                format!("{ptg} is not a valid direction"),
            ));
        }
        let theta = ptg.theta;
        let phi = normalize_angle_to_positive(ptg.phi);
        let nrings = self.nrings() as i64;
        let npix = self.npix_i64();

        let ir1 = self.ring_above(libm::cos(theta)) as i64;
        let ir2 = ir1 + 1;

        let mut pix = [0i64; 4];
        let mut wgt = [0.0f64; 4];
        let mut theta1 = 0.0;
        let mut theta2 = 0.0;

        if ir1 > 0 {
            let (sp, nr, t, w1, i1, i2) = self.ring_bracket(ir1, phi);
            theta1 = t;
            pix[0] = sp + i1;
            pix[1] = sp + i2;
            wgt[0] = 1.0 - w1;
            wgt[1] = w1;
            debug_assert!(i1 < nr && i2 < nr);
        }
        if ir2 <= nrings {
            let (sp, nr, t, w1, i1, i2) = self.ring_bracket(ir2, phi);
            theta2 = t;
            pix[2] = sp + i1;
            pix[3] = sp + i2;
            wgt[2] = 1.0 - w1;
            wgt[3] = w1;
            debug_assert!(i1 < nr && i2 < nr);
        }

        if ir1 == 0 {
            let wtheta = theta / theta2;
            wgt[2] *= wtheta;
            wgt[3] *= wtheta;
            let fac = (1.0 - wtheta) * 0.25;
            wgt[0] = fac;
            wgt[1] = fac;
            wgt[2] += fac;
            wgt[3] += fac;
            pix[0] = (pix[2] + 2) & 3;
            pix[1] = (pix[3] + 2) & 3;
        } else if ir2 > nrings {
            let wtheta = (theta - theta1) / (PI - theta1);
            wgt[0] *= 1.0 - wtheta;
            wgt[1] *= 1.0 - wtheta;
            let fac = wtheta * 0.25;
            wgt[0] += fac;
            wgt[1] += fac;
            wgt[2] = fac;
            wgt[3] = fac;
            pix[2] = ((pix[0] + 2) & 3) + npix - 4;
            pix[3] = ((pix[1] + 2) & 3) + npix - 4;
        } else {
            let wtheta = (theta - theta1) / (theta2 - theta1);
            wgt[0] *= 1.0 - wtheta;
            wgt[1] *= 1.0 - wtheta;
            wgt[2] *= wtheta;
            wgt[3] *= wtheta;
        }

        let mut pixels = pix.map(|p| p as u64);
        if self.scheme() == Scheme::Nested {
            let order = self.require_order("interpolation_weights")?;
            for p in pixels.iter_mut() {
                let (x, y, face) = self.ring2xyf(*p as i64);
                *p = self.xyf2nest(x, y, face, order) as u64;
            }
        }
        Ok((pixels, wgt))
    }

    /// Interpolated value of `map` at `ptg`.
    ///
    /// # Errors
    /// `SizeMismatch` if `map` does not hold exactly `npix` values.
    pub fn interpolate(&self, map: &[f64], ptg: &Pointing) -> SphereResult<f64> {
        if map.len() as u64 != self.npix() {
            return Err(SphereError::size_mismatch(
                "interpolate",
                self.npix() as usize,
                map.len(),
            ));
        }
        let (pixels, weights) = self.interpolation_weights(ptg)?;
        Ok(pixels
            .iter()
            .zip(weights.iter())
            .map(|(&p, &w)| map[p as usize] * w)
            .sum())
    }

    /// Start pixel, pixel count, co-latitude, and the two pixels on `ring`
    /// bracketing `phi` together with the weight of the eastern one.
    fn ring_bracket(&self, ring: i64, phi: f64) -> (i64, i64, f64, f64, i64, i64) {
        let (sp, nr, shifted) = self.ring_info_small(ring);
        let theta = libm::acos(self.ring2z(ring));
        let shift = if shifted { 0.5 } else { 0.0 };
        let dphi = TWOPI / nr as f64;
        let tmp = phi / dphi - shift;
        let mut i1 = if tmp < 0.0 { tmp as i64 - 1 } else { tmp as i64 };
        let w1 = (phi - (i1 as f64 + shift) * dphi) / dphi;
        let mut i2 = i1 + 1;
        if i1 < 0 {
            i1 += nr;
        }
        if i2 >= nr {
            i2 -= nr;
        }
        (sp, nr, theta, w1, i1, i2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_weights_sum_to_one() {
        for scheme in [Scheme::Ring, Scheme::Nested] {
            let hp = Healpix::new(8, scheme).unwrap();
            for &(theta, phi) in &[(0.0, 0.0), (0.05, 1.0), (1.0, 2.0), (PI - 0.02, 5.0), (PI, 0.0), (1.5, -0.3)] {
                let (pixels, weights) = hp.interpolation_weights(&Pointing::new(theta, phi)).unwrap();
                assert_abs_diff_eq!(weights.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
                assert!(weights.iter().all(|&w| w >= -1e-12));
                assert!(pixels.iter().all(|&p| p < hp.npix()));
            }
        }
    }

    #[test]
    fn test_interpolation_at_pixel_centre() {
        let hp = Healpix::new(4, Scheme::Ring).unwrap();
        let map: Vec<f64> = (0..hp.npix()).map(|p| p as f64).collect();
        for p in [20u64, 77, 100] {
            let centre = hp.pix2ang(p).unwrap();
            assert_abs_diff_eq!(hp.interpolate(&map, &centre).unwrap(), p as f64, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_constant_map_is_reproduced() {
        let hp = Healpix::new(4, Scheme::Nested).unwrap();
        let map = vec![2.5; hp.npix() as usize];
        let value = hp.interpolate(&map, &Pointing::new(2.2, 4.4)).unwrap();
        assert_abs_diff_eq!(value, 2.5, epsilon = 1e-12);
        assert!(hp.interpolate(&map[1..], &Pointing::new(2.2, 4.4)).is_err());
    }
}
