//! Adjacent pixels.
//!
//! Neighbours are found in face coordinates: step `(ix, iy)` by one of the eight
//! offsets, and when the step leaves the face, look up the face on the other
//! side and fold the coordinates into its frame.

use crate::healpix::Healpix;
use crate::tables::{FACEARRAY, SWAPARRAY, XOFFSET, YOFFSET};
use celestial_core::SphereResult;

impl Healpix {
    /// The eight neighbours of `pix` in the order SW, W, NW, N, NE, E, SE, S.
    ///
    /// Entries are `None` where the pixel touches one of the corners shared by
    /// only three base faces.
    ///
    /// ```
    /// use celestial_healpix::{Healpix, Scheme};
    ///
    /// let hp = Healpix::new(1, Scheme::Ring).unwrap();
    /// let n = hp.neighbors(4).unwrap();
    /// assert_eq!(n, [Some(11), Some(7), Some(3), None, Some(0), Some(5), Some(8), None]);
    /// ```
    pub fn neighbors(&self, pix: u64) -> SphereResult<[Option<u64>; 8]> {
        let pix = self.check_pixel(pix)?;
        let n = self.nside_i64();
        let (x0, y0, face) = self.pix2xyf_raw(pix);

        let mut result = [None; 8];
        for (slot, (dx, dy)) in result.iter_mut().zip(XOFFSET.iter().zip(YOFFSET.iter())) {
            let mut x = x0 + dx;
            let mut y = y0 + dy;

            // row/column of the 3x3 crossing table, 4 is "same face"
            let mut nbnum = 4usize;
            if x < 0 {
                x += n;
                nbnum -= 1;
            } else if x >= n {
                x -= n;
                nbnum += 1;
            }
            if y < 0 {
                y += n;
                nbnum -= 3;
            } else if y >= n {
                y -= n;
                nbnum += 3;
            }

            let target = FACEARRAY[nbnum][face];
            if target < 0 {
                continue;
            }
            let bits = SWAPARRAY[nbnum][face >> 2];
            if bits & 1 != 0 {
                x = n - x - 1;
            }
            if bits & 2 != 0 {
                y = n - y - 1;
            }
            if bits & 4 != 0 {
                std::mem::swap(&mut x, &mut y);
            }
            *slot = Some(self.xyf2pix_raw(x, y, target as usize) as u64);
        }
        Ok(result)
    }

    /// Neighbours of `pix` that exist, in the same order as [`Healpix::neighbors`].
    pub fn neighbor_list(&self, pix: u64) -> SphereResult<Vec<u64>> {
        Ok(self.neighbors(pix)?.into_iter().flatten().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Scheme;

    #[test]
    fn test_known_neighbors_nside4() {
        let ring = Healpix::new(4, Scheme::Ring).unwrap();
        let expected = [4, 11, 3, 2, 1, 6, 5, 13].map(Some);
        assert_eq!(ring.neighbors(0).unwrap(), expected);

        let nest = Healpix::new(4, Scheme::Nested).unwrap();
        let expected = [69, 71, 2, 3, 1, 91, 90, 143].map(Some);
        assert_eq!(nest.neighbors(0).unwrap(), expected);
    }

    #[test]
    fn test_missing_neighbor_count() {
        for nside in [1u64, 2, 4, 8] {
            let hp = Healpix::new(nside, Scheme::Nested).unwrap();
            let missing: usize = (0..hp.npix())
                .map(|p| hp.neighbors(p).unwrap().iter().filter(|n| n.is_none()).count())
                .sum();
            // 8 vertices where only three faces meet, 3 pixels each missing one neighbour
            assert_eq!(missing, 24, "nside {nside}");
        }
    }

    #[test]
    fn test_neighbor_list_skips_missing() {
        let hp = Healpix::new(1, Scheme::Ring).unwrap();
        assert_eq!(hp.neighbor_list(4).unwrap(), vec![11, 7, 3, 0, 5, 8]);
    }
}
