//! Layout of spherical harmonic coefficient arrays.
//!
//! Only `m ≥ 0` is stored; for a real field `a_{l,−m} = (−1)^m·conj(a_{l,m})`.

use celestial_core::math::isqrt;
use celestial_core::{SphereError, SphereResult};
use serde::{Deserialize, Serialize};

/// Order in which `(l, m)` pairs are laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlmOrdering {
    /// All `l` for `m = 0`, then all `l` for `m = 1`, ... (healpy layout).
    #[default]
    MMajor,
    /// All `m ≤ min(l, mmax)` for `l = 0`, then for `l = 1`, ...
    LMajor,
}

/// Number of coefficients with `0 ≤ m ≤ mmax`, `m ≤ l ≤ lmax`.
pub fn num_alm(lmax: usize, mmax: usize) -> usize {
    let mmax = mmax.min(lmax);
    (mmax + 1) * (lmax + 1) - mmax * (mmax + 1) / 2
}

/// Maps `(l, m)` to positions in a flat coefficient array.
///
/// ```
/// use celestial_sht::AlmInfo;
///
/// let info = AlmInfo::new(3, 3).unwrap();
/// assert_eq!(info.size(), 10);
/// assert_eq!(info.offset(2, 1), 5);
/// assert_eq!(info.lm_of(5), Some((2, 1)));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlmInfo {
    lmax: usize,
    mmax: usize,
    ordering: AlmOrdering,
    /// For `MMajor`: offset such that `mstart[m] + l` indexes `(l, m)`.
    mstart: Vec<usize>,
}

impl AlmInfo {
    /// M-major layout.
    ///
    /// # Errors
    /// `InvalidParameter` if `mmax > lmax`.
    pub fn new(lmax: usize, mmax: usize) -> SphereResult<Self> {
        Self::with_ordering(lmax, mmax, AlmOrdering::MMajor)
    }

    pub fn with_ordering(lmax: usize, mmax: usize, ordering: AlmOrdering) -> SphereResult<Self> {
        if mmax > lmax {
            return Err(SphereError::invalid_parameter(
                "mmax",
                format!("mmax ({mmax}) must not exceed lmax ({lmax})"),
            ));
        }
        let mstart = (0..=mmax)
            .map(|m| m * (2 * lmax + 1 - m) / 2)
            .collect();
        Ok(Self {
            lmax,
            mmax,
            ordering,
            mstart,
        })
    }

    #[inline]
    pub fn lmax(&self) -> usize {
        self.lmax
    }

    #[inline]
    pub fn mmax(&self) -> usize {
        self.mmax
    }

    #[inline]
    pub fn ordering(&self) -> AlmOrdering {
        self.ordering
    }

    /// Total number of stored coefficients.
    #[inline]
    pub fn size(&self) -> usize {
        num_alm(self.lmax, self.mmax)
    }

    /// Stored orders `0..=mmax`.
    #[inline]
    pub fn m_range(&self) -> std::ops::RangeInclusive<usize> {
        0..=self.mmax
    }

    /// Index of `(l, m)`. Callers guarantee `m ≤ mmax` and `m ≤ l ≤ lmax`.
    #[inline]
    pub fn offset(&self, l: usize, m: usize) -> usize {
        debug_assert!(m <= self.mmax && m <= l && l <= self.lmax);
        match self.ordering {
            AlmOrdering::MMajor => self.mstart[m] + l,
            AlmOrdering::LMajor => {
                if l <= self.mmax {
                    l * (l + 1) / 2 + m
                } else {
                    (self.mmax + 1) * (self.mmax + 2) / 2 + (l - self.mmax - 1) * (self.mmax + 1) + m
                }
            }
        }
    }

    /// Checked variant of [`AlmInfo::offset`].
    pub fn try_offset(&self, l: usize, m: usize) -> SphereResult<usize> {
        if m > self.mmax || m > l || l > self.lmax {
            return Err(SphereError::invalid_parameter(
                "(l, m)",
                format!(
                    "({l}, {m}) outside lmax={}, mmax={}",
                    self.lmax, self.mmax
                ),
            ));
        }
        Ok(self.offset(l, m))
    }

    /// Inverse of [`AlmInfo::offset`].
    pub fn lm_of(&self, index: usize) -> Option<(usize, usize)> {
        if index >= self.size() {
            return None;
        }
        match self.ordering {
            AlmOrdering::MMajor => {
                // last m whose first stored index mstart[m] + m is <= index
                let (mut lo, mut hi) = (0, self.mmax);
                while lo < hi {
                    let mid = (lo + hi + 1) / 2;
                    if self.mstart[mid] + mid <= index {
                        lo = mid;
                    } else {
                        hi = mid - 1;
                    }
                }
                Some((index - self.mstart[lo], lo))
            }
            AlmOrdering::LMajor => {
                let triangle = (self.mmax + 1) * (self.mmax + 2) / 2;
                if index < triangle {
                    let l = ((isqrt(8 * index as u64 + 1) - 1) / 2) as usize;
                    Some((l, index - l * (l + 1) / 2))
                } else {
                    let rest = index - triangle;
                    let width = self.mmax + 1;
                    Some((self.mmax + 1 + rest / width, rest % width))
                }
            }
        }
    }

    /// Iterates over all stored `(l, m)` in storage order.
    pub fn iter_lm(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        let (lmax, mmax) = (self.lmax, self.mmax);
        let mmajor = self.ordering == AlmOrdering::MMajor;
        let outer = if mmajor { mmax } else { lmax };
        (0..=outer).flat_map(move |k| {
            let (lo, hi) = if mmajor { (k, lmax) } else { (0, k.min(mmax)) };
            (lo..=hi).map(move |j| if mmajor { (j, k) } else { (k, j) })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sizes() {
        assert_eq!(num_alm(0, 0), 1);
        assert_eq!(num_alm(8, 8), 45);
        assert_eq!(num_alm(8, 2), 9 + 8 + 7);
        assert_eq!(AlmInfo::new(10, 4).unwrap().size(), num_alm(10, 4));
    }

    #[test]
    fn test_mmajor_matches_healpy() {
        let info = AlmInfo::new(4, 4).unwrap();
        assert_eq!(info.offset(0, 0), 0);
        assert_eq!(info.offset(4, 0), 4);
        assert_eq!(info.offset(1, 1), 5);
        assert_eq!(info.offset(4, 4), 14);
        // healpy: idx = m*(2*lmax+1-m)/2 + l
        assert_eq!(info.offset(3, 2), 2 * 7 / 2 + 3);
    }

    #[test]
    fn test_layouts_are_bijective() {
        for ordering in [AlmOrdering::MMajor, AlmOrdering::LMajor] {
            for (lmax, mmax) in [(0, 0), (5, 5), (7, 3), (12, 0)] {
                let info = AlmInfo::with_ordering(lmax, mmax, ordering).unwrap();
                let mut seen = vec![false; info.size()];
                for m in 0..=mmax {
                    for l in m..=lmax {
                        let idx = info.offset(l, m);
                        assert!(!seen[idx], "{ordering:?} duplicate ({l}, {m})");
                        seen[idx] = true;
                        assert_eq!(info.lm_of(idx), Some((l, m)));
                    }
                }
                assert!(seen.iter().all(|&s| s));
                assert_eq!(info.lm_of(info.size()), None);
            }
        }
    }

    #[test]
    fn test_lmajor_order() {
        let info = AlmInfo::with_ordering(3, 1, AlmOrdering::LMajor).unwrap();
        let order: Vec<_> = info.iter_lm().collect();
        assert_eq!(
            order,
            vec![(0, 0), (1, 0), (1, 1), (2, 0), (2, 1), (3, 0), (3, 1)]
        );
    }

    #[test]
    fn test_iter_lm_follows_storage_order() {
        for ordering in [AlmOrdering::MMajor, AlmOrdering::LMajor] {
            for (lmax, mmax) in [(0, 0), (9, 4), (300, 300), (2048, 64)] {
                let info = AlmInfo::with_ordering(lmax, mmax, ordering).unwrap();
                let mut count = 0;
                for (i, (l, m)) in info.iter_lm().enumerate() {
                    assert_eq!(info.offset(l, m), i, "{ordering:?} ({l}, {m})");
                    count += 1;
                }
                assert_eq!(count, info.size());
                for idx in [0, info.size() / 3, info.size() - 1] {
                    let (l, m) = info.lm_of(idx).unwrap();
                    assert_eq!(info.offset(l, m), idx);
                }
            }
        }
    }

    #[test]
    fn test_invalid() {
        assert!(AlmInfo::new(3, 4).is_err());
        let info = AlmInfo::new(3, 2).unwrap();
        assert!(info.try_offset(2, 3).is_err());
        assert!(info.try_offset(4, 0).is_err());
        assert!(info.try_offset(1, 2).is_err());
        assert_eq!(info.try_offset(3, 2).unwrap(), info.offset(3, 2));
    }
}
