//! Iso-latitude ring layouts for spherical harmonic transforms.
//!
//! A map is a flat buffer of samples on rings of constant co-latitude. Each
//! [`RingInfo`] says where its samples live in the buffer (`ofs`, plus the
//! geometry-wide `stride` between consecutive samples), where they sit on the
//! sphere (`theta`, `phi0`, `nph` equally spaced in longitude) and how much
//! solid angle each represents (`weight`).
//!
//! Rings mirrored about the equator are grouped into [`RingPair`]s, so the
//! Legendre recurrence runs once for both.

use celestial_core::constants::{FOURPI, PI, TWOPI};
use celestial_core::{SphereError, SphereResult};
use celestial_healpix::{Healpix, Scheme};

/// Two rings are mirrors of each other when their `cos θ` sum below this.
const PAIR_TOLERANCE: f64 = 1e-12;

/// Newton iteration limit for Gauss-Legendre nodes.
const GAUSS_MAX_ITER: usize = 100;

/// One iso-latitude ring.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RingInfo {
    pub theta: f64,
    pub cth: f64,
    pub sth: f64,
    /// Number of samples on the ring.
    pub nph: usize,
    /// Longitude of the first sample.
    pub phi0: f64,
    /// Quadrature weight applied to every sample of the ring.
    pub weight: f64,
    /// Buffer index of the first sample.
    pub ofs: usize,
}

impl RingInfo {
    /// Ring at co-latitude `theta`; `cos θ` and `sin θ` are derived from it.
    pub fn new(theta: f64, nph: usize, phi0: f64, weight: f64, ofs: usize) -> Self {
        let (sth, cth) = libm::sincos(theta);
        Self {
            theta,
            cth,
            sth: sth.abs(),
            nph,
            phi0,
            weight,
            ofs,
        }
    }

    fn validate(&self) -> SphereResult<()> {
        if !(0.0..=PI).contains(&self.theta) {
            return Err(SphereError::invalid_parameter(
                "theta",
                format!("ring co-latitude {} outside [0, π]", self.theta),
            ));
        }
        if self.nph == 0 {
            return Err(SphereError::invalid_parameter(
                "nph",
                "a ring needs at least one sample",
            ));
        }
        if !self.weight.is_finite() || !self.phi0.is_finite() {
            return Err(SphereError::invalid_parameter(
                "weight",
                format!(
                    "ring at theta={} has non-finite weight or phi0",
                    self.theta
                ),
            ));
        }
        Ok(())
    }
}

/// A northern ring and, when present, its mirror image in the south.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RingPair {
    pub north: RingInfo,
    pub south: Option<RingInfo>,
}

impl RingPair {
    /// Rings in the pair, north first.
    pub fn rings(&self) -> impl Iterator<Item = &RingInfo> {
        std::iter::once(&self.north).chain(self.south.as_ref())
    }
}

/// An immutable collection of rings describing a map layout.
#[derive(Debug, Clone, PartialEq)]
pub struct GeomInfo {
    rings: Vec<RingInfo>,
    pairs: Vec<RingPair>,
    stride: usize,
    map_len: usize,
}

impl GeomInfo {
    /// Builds a geometry from arbitrary rings.
    ///
    /// # Arguments
    /// * `rings` - rings in storage order
    /// * `stride` - buffer distance between neighbouring samples of a ring
    ///
    /// # Errors
    /// `InvalidParameter` for an empty ring list, a zero stride, a ring with
    /// `theta` outside `[0, π]`, no samples or a non-finite weight, and (for
    /// stride 1) rings whose buffer ranges overlap.
    pub fn new(rings: Vec<RingInfo>, stride: usize) -> SphereResult<Self> {
        if rings.is_empty() {
            return Err(SphereError::invalid_parameter(
                "rings",
                "geometry needs at least one ring",
            ));
        }
        if stride == 0 {
            return Err(SphereError::invalid_parameter(
                "stride",
                "stride must be positive",
            ));
        }
        for ring in &rings {
            ring.validate()?;
        }
        if stride == 1 {
            check_disjoint(&rings)?;
        }
        let map_len = rings
            .iter()
            .map(|r| r.ofs + (r.nph - 1) * stride + 1)
            .max()
            .unwrap_or(0);
        let pairs = pair_rings(&rings);
        tracing::debug!(
            nrings = rings.len(),
            npairs = pairs.len(),
            stride,
            map_len,
            "built ring geometry"
        );
        Ok(Self {
            rings,
            pairs,
            stride,
            map_len,
        })
    }

    /// RING-ordered HEALPix map with `nside`.
    pub fn healpix(nside: u64) -> SphereResult<Self> {
        Self::from_healpix(&Healpix::new(nside, Scheme::Ring)?)
    }

    /// Ring layout of an existing HEALPix pixelization.
    ///
    /// Every pixel carries the weight `4π/npix`.
    ///
    /// # Errors
    /// `UnsupportedScheme` for NESTED ordering, whose rings are not contiguous.
    pub fn from_healpix(hp: &Healpix) -> SphereResult<Self> {
        if hp.scheme() != Scheme::Ring {
            return Err(SphereError::unsupported_scheme(
                "ring geometry",
                "transforms need a RING-ordered map; reorder NESTED maps first",
            ));
        }
        let weight = FOURPI / hp.npix() as f64;
        let rings = (1..=hp.nrings())
            .map(|ring| {
                let span = hp.ring_info(ring)?;
                let nph = span.npix as usize;
                let phi0 = if span.shifted { PI / nph as f64 } else { 0.0 };
                Ok(RingInfo::new(
                    span.theta,
                    nph,
                    phi0,
                    weight,
                    span.first_pixel as usize,
                ))
            })
            .collect::<SphereResult<Vec<_>>>()?;
        Self::new(rings, 1)
    }

    /// Gauss-Legendre grid: `nrings` rings at the Legendre roots, `nph`
    /// samples each, starting at `φ = 0`.
    ///
    /// Exact for band limits with `lmax < nrings` and `2·mmax < nph`.
    pub fn gauss_legendre(nrings: usize, nph: usize) -> SphereResult<Self> {
        check_grid(nrings, nph, 1)?;
        let (nodes, weights) = gauss_legendre_nodes(nrings)?;
        let rings = nodes
            .iter()
            .zip(&weights)
            .enumerate()
            .map(|(i, (&x, &w))| {
                let sth = libm::sqrt((1.0 - x) * (1.0 + x));
                RingInfo {
                    theta: libm::atan2(sth, x),
                    cth: x,
                    sth,
                    nph,
                    phi0: 0.0,
                    weight: w * TWOPI / nph as f64,
                    ofs: i * nph,
                }
            })
            .collect();
        Self::new(rings, 1)
    }

    /// Clenshaw-Curtis grid: `nrings ≥ 2` rings equally spaced in θ including
    /// both poles.
    pub fn clenshaw_curtis(nrings: usize, nph: usize) -> SphereResult<Self> {
        check_grid(nrings, nph, 2)?;
        let n = nrings - 1;
        let rings = (0..nrings)
            .map(|i| {
                let theta = PI * i as f64 / n as f64;
                let sum: f64 = (1..=n / 2)
                    .map(|k| {
                        let b = if 2 * k == n { 1.0 } else { 2.0 };
                        b / (4.0 * (k * k) as f64 - 1.0) * libm::cos(2.0 * k as f64 * theta)
                    })
                    .sum();
                let c = if i == 0 || i == n { 1.0 } else { 2.0 };
                let w = c / n as f64 * (1.0 - sum);
                ring_on_grid(theta, i, nph, w)
            })
            .collect();
        Self::new(rings, 1)
    }

    /// Fejér's first rule: `nrings` rings at `θ = π(i + ½)/nrings`, poles excluded.
    pub fn fejer1(nrings: usize, nph: usize) -> SphereResult<Self> {
        check_grid(nrings, nph, 1)?;
        let n = nrings as f64;
        let rings = (0..nrings)
            .map(|i| {
                let theta = PI * (i as f64 + 0.5) / n;
                let sum: f64 = (1..=nrings / 2)
                    .map(|k| libm::cos(2.0 * k as f64 * theta) / (4.0 * (k * k) as f64 - 1.0))
                    .sum();
                let w = 2.0 / n * (1.0 - 2.0 * sum);
                ring_on_grid(theta, i, nph, w)
            })
            .collect();
        Self::new(rings, 1)
    }

    #[inline]
    pub fn nrings(&self) -> usize {
        self.rings.len()
    }

    #[inline]
    pub fn npairs(&self) -> usize {
        self.pairs.len()
    }

    /// Ring pairs ordered north to south.
    #[inline]
    pub fn pairs(&self) -> &[RingPair] {
        &self.pairs
    }

    /// Rings in the order they were supplied.
    #[inline]
    pub fn rings(&self) -> &[RingInfo] {
        &self.rings
    }

    #[inline]
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Minimum buffer length holding every sample.
    #[inline]
    pub fn map_len(&self) -> usize {
        self.map_len
    }

    /// Largest ring size.
    pub fn nph_max(&self) -> usize {
        self.rings.iter().map(|r| r.nph).max().unwrap_or(0)
    }

    /// Number of samples over all rings.
    pub fn total_pixels(&self) -> usize {
        self.rings.iter().map(|r| r.nph).sum()
    }
}

fn check_grid(nrings: usize, nph: usize, min_rings: usize) -> SphereResult<()> {
    if nrings < min_rings {
        return Err(SphereError::invalid_parameter(
            "nrings",
            format!("need at least {min_rings} ring(s), got {nrings}"),
        ));
    }
    if nph == 0 {
        return Err(SphereError::invalid_parameter(
            "nph",
            "rings need at least one sample",
        ));
    }
    Ok(())
}

/// Ring `i` of a grid with `nph` samples per ring and a θ-quadrature weight
/// `w` normalized to `∫ d(cos θ) = 2`.
fn ring_on_grid(theta: f64, i: usize, nph: usize, w: f64) -> RingInfo {
    RingInfo::new(theta, nph, 0.0, w * TWOPI / nph as f64, i * nph)
}

fn check_disjoint(rings: &[RingInfo]) -> SphereResult<()> {
    let mut spans: Vec<(usize, usize)> = rings.iter().map(|r| (r.ofs, r.ofs + r.nph)).collect();
    spans.sort_unstable();
    for w in spans.windows(2) {
        if w[1].0 < w[0].1 {
            return Err(SphereError::invalid_parameter(
                "ofs",
                format!(
                    "ring storage [{}, {}) overlaps [{}, {})",
                    w[0].0, w[0].1, w[1].0, w[1].1
                ),
            ));
        }
    }
    Ok(())
}

/// Groups mirror-image rings. Rings without a mirror form a pair of one.
fn pair_rings(rings: &[RingInfo]) -> Vec<RingPair> {
    let mut order: Vec<&RingInfo> = rings.iter().collect();
    order.sort_by(|a, b| b.cth.total_cmp(&a.cth));

    let mut pairs = Vec::with_capacity(rings.len().div_ceil(2));
    let (mut lo, mut hi) = (0usize, order.len());
    while lo < hi {
        let north = order[lo];
        if hi - lo == 1 {
            pairs.push(RingPair { north: *north, south: None });
            break;
        }
        let south = order[hi - 1];
        let sum = north.cth + south.cth;
        if sum.abs() < PAIR_TOLERANCE {
            pairs.push(RingPair {
                north: *north,
                south: Some(*south),
            });
            lo += 1;
            hi -= 1;
        } else if sum > 0.0 {
            // the northern ring is closer to its pole than anything left in the south
            pairs.push(RingPair { north: *north, south: None });
            lo += 1;
        } else {
            pairs.push(RingPair { north: *south, south: None });
            hi -= 1;
        }
    }
    pairs.sort_by(|a, b| b.north.cth.total_cmp(&a.north.cth));
    pairs
}

/// Roots of `P_n` in decreasing order with their Gauss weights.
fn gauss_legendre_nodes(n: usize) -> SphereResult<(Vec<f64>, Vec<f64>)> {
    let mut nodes = vec![0.0; n];
    let mut weights = vec![0.0; n];
    let nf = n as f64;
    for i in 1..=n.div_ceil(2) {
        let mut x = libm::cos(PI * (i as f64 - 0.25) / (nf + 0.5));
        let mut dp = 0.0;
        let mut converged = false;
        for _ in 0..GAUSS_MAX_ITER {
            let (p, p_prev) = legendre_pair(n, x);
            dp = nf * (x * p - p_prev) / (x * x - 1.0);
            let dx = p / dp;
            x -= dx;
            if dx.abs() < 1e-15 {
                converged = true;
                break;
            }
        }
        if !converged || !x.is_finite() {
            return Err(SphereError::numerical_instability(
                "Gauss-Legendre nodes",
                format!("Newton iteration for root {i} of P_{n} did not converge"),
            ));
        }
        let w = 2.0 / ((1.0 - x * x) * dp * dp);
        nodes[i - 1] = x;
        nodes[n - i] = -x;
        weights[i - 1] = w;
        weights[n - i] = w;
    }
    Ok((nodes, weights))
}

/// `(P_n(x), P_{n−1}(x))` by the Bonnet recurrence.
fn legendre_pair(n: usize, x: f64) -> (f64, f64) {
    let (mut p, mut p_prev) = (1.0, 0.0);
    for j in 1..=n {
        let jf = j as f64;
        let next = ((2.0 * jf - 1.0) * x * p - (jf - 1.0) * p_prev) / jf;
        p_prev = p;
        p = next;
    }
    (p, p_prev)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn total_weight(geom: &GeomInfo) -> f64 {
        geom.rings().iter().map(|r| r.weight * r.nph as f64).sum()
    }

    #[test]
    fn test_healpix_layout() {
        let geom = GeomInfo::healpix(4).unwrap();
        assert_eq!(geom.nrings(), 15);
        assert_eq!(geom.npairs(), 8);
        assert_eq!(geom.map_len(), 192);
        assert_eq!(geom.total_pixels(), 192);
        assert_eq!(geom.nph_max(), 16);
        assert_eq!(geom.stride(), 1);
        assert_abs_diff_eq!(total_weight(&geom), FOURPI, epsilon = 1e-12);

        let first = geom.rings()[0];
        assert_eq!(first.nph, 4);
        assert_eq!(first.ofs, 0);
        assert_abs_diff_eq!(first.phi0, PI / 4.0, epsilon = 1e-15);
        assert_abs_diff_eq!(first.cth, 1.0 - 1.0 / 48.0, epsilon = 1e-14);

        let equator = geom.pairs().last().unwrap();
        assert!(equator.south.is_none());
        assert_abs_diff_eq!(equator.north.cth, 0.0, epsilon = 1e-15);
    }

    #[test]
    fn test_healpix_pairs_mirror() {
        let geom = GeomInfo::healpix(8).unwrap();
        for pair in geom.pairs() {
            if let Some(south) = pair.south {
                assert_abs_diff_eq!(pair.north.cth, -south.cth, epsilon = 1e-12);
                assert_eq!(pair.north.nph, south.nph);
                assert!(pair.north.cth > 0.0);
            }
        }
        let cths: Vec<f64> = geom.pairs().iter().map(|p| p.north.cth).collect();
        assert!(cths.windows(2).all(|w| w[0] > w[1]));
    }

    #[test]
    fn test_nested_rejected() {
        let hp = Healpix::new(4, Scheme::Nested).unwrap();
        assert!(matches!(
            GeomInfo::from_healpix(&hp),
            Err(SphereError::UnsupportedScheme { .. })
        ));
    }

    #[test]
    fn test_gauss_legendre_nodes() {
        let (x, w) = gauss_legendre_nodes(3).unwrap();
        assert_abs_diff_eq!(x[0], libm::sqrt(0.6), epsilon = 1e-15);
        assert_abs_diff_eq!(x[1], 0.0, epsilon = 1e-15);
        assert_abs_diff_eq!(x[2], -libm::sqrt(0.6), epsilon = 1e-15);
        assert_abs_diff_eq!(w[0], 5.0 / 9.0, epsilon = 1e-14);
        assert_abs_diff_eq!(w[1], 8.0 / 9.0, epsilon = 1e-14);

        let (x, w) = gauss_legendre_nodes(40).unwrap();
        assert_abs_diff_eq!(w.iter().sum::<f64>(), 2.0, epsilon = 1e-13);
        assert!(x.windows(2).all(|p| p[0] > p[1]));
        // exact for x^10
        let integral: f64 = x.iter().zip(&w).map(|(&x, &w)| w * x.powi(10)).sum();
        assert_abs_diff_eq!(integral, 2.0 / 11.0, epsilon = 1e-14);
    }

    #[test]
    fn test_quadrature_weights_sum_to_sphere() {
        for geom in [
            GeomInfo::gauss_legendre(9, 17).unwrap(),
            GeomInfo::clenshaw_curtis(10, 12).unwrap(),
            GeomInfo::fejer1(11, 8).unwrap(),
        ] {
            assert_abs_diff_eq!(total_weight(&geom), FOURPI, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_clenshaw_curtis_includes_poles() {
        let geom = GeomInfo::clenshaw_curtis(5, 6).unwrap();
        assert_eq!(geom.npairs(), 3);
        assert_abs_diff_eq!(geom.rings()[0].theta, 0.0);
        assert_abs_diff_eq!(geom.rings()[4].theta, PI);
        assert_eq!(geom.rings()[0].sth, 0.0);
        assert!(GeomInfo::clenshaw_curtis(1, 6).is_err());
    }

    #[test]
    fn test_custom_rings_validation() {
        let ring = |theta: f64, ofs: usize| RingInfo::new(theta, 4, 0.0, 1.0, ofs);
        assert!(GeomInfo::new(vec![], 1).is_err());
        assert!(GeomInfo::new(vec![ring(1.0, 0)], 0).is_err());
        assert!(GeomInfo::new(vec![ring(-0.1, 0)], 1).is_err());
        assert!(GeomInfo::new(vec![ring(1.0, 0), ring(2.0, 2)], 1).is_err());
        assert!(GeomInfo::new(vec![RingInfo::new(1.0, 0, 0.0, 1.0, 0)], 1).is_err());
        assert!(GeomInfo::new(vec![RingInfo::new(1.0, 4, 0.0, f64::NAN, 0)], 1).is_err());

        // interleaved storage is fine with a larger stride
        let geom = GeomInfo::new(vec![ring(1.0, 0), ring(2.0, 1)], 2).unwrap();
        assert_eq!(geom.map_len(), 8);
    }

    #[test]
    fn test_unmatched_rings_stay_single() {
        let rings = vec![
            RingInfo::new(0.3, 4, 0.0, 1.0, 0),
            RingInfo::new(PI - 0.3, 4, 0.0, 1.0, 4),
            RingInfo::new(2.0, 4, 0.0, 1.0, 8),
        ];
        let geom = GeomInfo::new(rings, 1).unwrap();
        assert_eq!(geom.npairs(), 2);
        assert!(geom.pairs()[0].south.is_some());
        assert_abs_diff_eq!(geom.pairs()[1].north.theta, 2.0);
        assert_eq!(geom.pairs().iter().flat_map(|p| p.rings()).count(), 3);
    }
}
