//! Spherical harmonic synthesis (`alm2map`) and analysis (`map2alm`).
//!
//! Every call runs through the same phases:
//!
//! 1. **Validate** buffer lengths against the descriptors, before any work.
//! 2. **Partition** the ring pairs into chunks so the Fourier buffer stays bounded.
//! 3. **Compute** each chunk in two parallel stages, one over orders `m`
//!    (Legendre) and one over rings (FFT).
//! 4. **Merge** the per-m accumulators into the caller's coefficient layout,
//!    or scatter strided ring samples into the map.
//!
//! Internally everything is `f64`; `f32` buffers are converted on the way in
//! and out.

use crate::alm::AlmInfo;
use crate::config::TransformConfig;
use crate::geometry::{GeomInfo, RingInfo, RingPair};
use crate::pool::{TaskBatch, ThreadPool, Threads};
use crate::ylm::{RecurrenceCoeffs, YlmGenerator};
use celestial_core::{SphereError, SphereResult};
use celestial_fft::{plan_real, Complex};
use celestial_healpix::{Healpix, Scheme};
use std::collections::HashMap;
use std::fmt;

type C64 = Complex<f64>;

/// Ring pairs processed per chunk.
const CHUNK_PAIRS: usize = 128;

mod private {
    pub trait Sealed {}
    impl Sealed for f32 {}
    impl Sealed for f64 {}
}

/// Sample precision of map and coefficient buffers.
pub trait ShtFloat: Copy + Default + Send + Sync + fmt::Debug + 'static + private::Sealed {
    /// `"single"` or `"double"`.
    const PRECISION: &'static str;

    fn to_f64(self) -> f64;
    fn from_f64(value: f64) -> Self;
}

impl ShtFloat for f32 {
    const PRECISION: &'static str = "single";

    #[inline]
    fn to_f64(self) -> f64 {
        self as f64
    }

    #[inline]
    fn from_f64(value: f64) -> Self {
        value as f32
    }
}

impl ShtFloat for f64 {
    const PRECISION: &'static str = "double";

    #[inline]
    fn to_f64(self) -> f64 {
        self
    }

    #[inline]
    fn from_f64(value: f64) -> Self {
        value
    }
}

#[inline]
fn widen<T: ShtFloat>(c: Complex<T>) -> C64 {
    C64::new(c.re.to_f64(), c.im.to_f64())
}

#[inline]
fn narrow<T: ShtFloat>(c: C64) -> Complex<T> {
    Complex::new(T::from_f64(c.re), T::from_f64(c.im))
}

/// Transform driver owning the worker pool.
///
/// Descriptors and buffers are borrowed per call and never retained.
///
/// ```
/// use celestial_fft::Complex;
/// use celestial_sht::{AlmInfo, GeomInfo, ShtEngine};
///
/// let engine = ShtEngine::sequential();
/// let info = AlmInfo::new(4, 4).unwrap();
/// let geom = GeomInfo::gauss_legendre(5, 9).unwrap();
///
/// let mut alm = vec![Complex::new(0.0f64, 0.0); info.size()];
/// alm[info.offset(0, 0)] = Complex::new(1.0, 0.0);
/// let map = engine.alm2map(&alm, &info, &geom).unwrap();
/// // Y_00 is constant
/// assert!(map.iter().all(|v| (v - 0.5 / std::f64::consts::PI.sqrt()).abs() < 1e-14));
///
/// let back = engine.map2alm(&map, &geom, &info).unwrap();
/// assert!((back[0].re - 1.0).abs() < 1e-12);
/// ```
#[derive(Debug)]
pub struct ShtEngine {
    pool: ThreadPool,
}

impl ShtEngine {
    /// # Errors
    /// `InvalidParameter` for `Threads::Count(0)`.
    pub fn new(threads: Threads) -> SphereResult<Self> {
        Ok(Self {
            pool: ThreadPool::new(threads)?,
        })
    }

    /// Engine that runs every stage on the calling thread.
    pub fn sequential() -> Self {
        Self {
            pool: ThreadPool::sequential(),
        }
    }

    /// Engine sized by `config.nthreads`, after validating the whole configuration.
    pub fn from_config(config: &TransformConfig) -> SphereResult<Self> {
        config.validate()?;
        Self::new(config.nthreads)
    }

    pub fn with_pool(pool: ThreadPool) -> Self {
        Self { pool }
    }

    #[inline]
    pub fn nthreads(&self) -> usize {
        self.pool.nthreads()
    }

    /// Synthesizes a map from coefficients.
    ///
    /// # Errors
    /// See [`ShtEngine::alm2map_into`].
    pub fn alm2map<T: ShtFloat>(
        &self,
        alm: &[Complex<T>],
        info: &AlmInfo,
        geom: &GeomInfo,
    ) -> SphereResult<Vec<T>> {
        check_len("alm", info.size(), alm.len())?;
        let mut map = vec![T::default(); geom.map_len()];
        self.alm2map_into(alm, info, geom, &mut map)?;
        Ok(map)
    }

    /// Synthesizes into an existing map. Buffer positions not covered by any
    /// ring are left untouched.
    ///
    /// # Errors
    /// `SizeMismatch` if `alm.len() != info.size()` or
    /// `map.len() != geom.map_len()`; `NumericalInstability` if a ring
    /// spectrum becomes non-finite.
    pub fn alm2map_into<T: ShtFloat>(
        &self,
        alm: &[Complex<T>],
        info: &AlmInfo,
        geom: &GeomInfo,
        map: &mut [T],
    ) -> SphereResult<()> {
        check_len("alm", info.size(), alm.len())?;
        check_len("map", geom.map_len(), map.len())?;

        let gen = YlmGenerator::new(info.lmax(), info.mmax())?;
        let ncoef = info.mmax() + 1;
        let stride = geom.stride();
        tracing::debug!(
            lmax = info.lmax(),
            mmax = info.mmax(),
            nrings = geom.nrings(),
            nthreads = self.nthreads(),
            precision = T::PRECISION,
            "alm2map"
        );

        let mut sinks = if stride == 1 {
            split_rings(map, geom.rings())
        } else {
            HashMap::new()
        };
        let mut strided: Vec<(RingInfo, Vec<f64>)> = Vec::new();

        for chunk in geom.pairs().chunks(CHUNK_PAIRS) {
            let rings = chunk_rings(chunk);
            let nr = rings.len();

            // Legendre stage: one row of ring phases per m
            let mut phases = vec![C64::ZERO; ncoef * nr];
            let mut batch = TaskBatch::with_capacity(ncoef);
            for (m, row) in phases.chunks_mut(nr).enumerate() {
                let gen = &gen;
                batch.submit(move || {
                    let coeffs = gen.coefficients(m);
                    legendre_synthesis(&coeffs, alm, info, chunk, row)
                });
            }
            self.pool.run_all_and_wait(batch)?;

            // FFT stage: one task per ring
            let phases = &phases;
            if stride == 1 {
                let mut batch = TaskBatch::with_capacity(nr);
                for (slot, ring) in rings.iter().enumerate() {
                    let sink = sinks.remove(&ring.ofs).ok_or_else(|| {
                        SphereError::invalid_parameter(
                            "ofs",
                            format!("ring storage at {} claimed twice", ring.ofs),
                        )
                    })?;
                    batch.submit(move || {
                        let values = synthesize_ring(phases, nr, slot, ring, ncoef)?;
                        for (dst, v) in sink.iter_mut().zip(values) {
                            *dst = T::from_f64(v);
                        }
                        Ok(())
                    });
                }
                self.pool.run_all_and_wait(batch)?;
            } else {
                let mut outputs: Vec<(RingInfo, Vec<f64>)> =
                    rings.iter().map(|r| (*r, Vec::new())).collect();
                let mut batch = TaskBatch::with_capacity(nr);
                for (slot, (ring, out)) in outputs.iter_mut().enumerate() {
                    let ring = *ring;
                    batch.submit(move || {
                        *out = synthesize_ring(phases, nr, slot, &ring, ncoef)?;
                        Ok(())
                    });
                }
                self.pool.run_all_and_wait(batch)?;
                strided.append(&mut outputs);
            }
        }

        drop(sinks);
        for (ring, values) in strided {
            for (j, v) in values.into_iter().enumerate() {
                map[ring.ofs + j * stride] = T::from_f64(v);
            }
        }
        Ok(())
    }

    /// Analyses a map into coefficients using the geometry's quadrature weights.
    ///
    /// # Errors
    /// See [`ShtEngine::map2alm_into`].
    pub fn map2alm<T: ShtFloat>(
        &self,
        map: &[T],
        geom: &GeomInfo,
        info: &AlmInfo,
    ) -> SphereResult<Vec<Complex<T>>> {
        check_len("map", geom.map_len(), map.len())?;
        let mut alm = vec![Complex::new(T::default(), T::default()); info.size()];
        self.map2alm_into(map, geom, info, &mut alm)?;
        Ok(alm)
    }

    /// Analyses into an existing coefficient buffer, overwriting it.
    ///
    /// # Errors
    /// `SizeMismatch` if `map.len() != geom.map_len()` or
    /// `alm.len() != info.size()`; `NumericalInstability` if a ring
    /// spectrum becomes non-finite.
    pub fn map2alm_into<T: ShtFloat>(
        &self,
        map: &[T],
        geom: &GeomInfo,
        info: &AlmInfo,
        alm: &mut [Complex<T>],
    ) -> SphereResult<()> {
        check_len("map", geom.map_len(), map.len())?;
        check_len("alm", info.size(), alm.len())?;

        let acc = self.analyse(map, geom, info)?;
        for (m, values) in acc.into_iter().enumerate() {
            for (i, value) in values.into_iter().enumerate() {
                alm[info.offset(m + i, m)] = narrow(value);
            }
        }
        Ok(())
    }

    /// Analysis refined by `niter` Jacobi steps `a ← a + map2alm(f − alm2map(a))`.
    ///
    /// Reduces the quadrature error of grids without exact weights (HEALPix).
    /// `niter = 0` is plain [`ShtEngine::map2alm`].
    pub fn map2alm_iter<T: ShtFloat>(
        &self,
        map: &[T],
        geom: &GeomInfo,
        info: &AlmInfo,
        niter: usize,
    ) -> SphereResult<Vec<Complex<T>>> {
        check_len("map", geom.map_len(), map.len())?;

        let target: Vec<f64> = map.iter().map(|v| v.to_f64()).collect();
        let mut alm = self.map2alm(&target, geom, info)?;
        let mut synth = vec![0.0; target.len()];
        let mut residual = vec![0.0; target.len()];
        for iter in 1..=niter {
            self.alm2map_into(&alm, info, geom, &mut synth)?;
            for ((r, t), s) in residual.iter_mut().zip(&target).zip(&synth) {
                *r = t - s;
            }
            let correction = self.map2alm(&residual, geom, info)?;
            for (a, c) in alm.iter_mut().zip(correction) {
                *a += c;
            }
            tracing::debug!(
                iter,
                residual_rms = rms(&residual),
                "map2alm refinement step"
            );
        }
        Ok(alm.into_iter().map(narrow).collect())
    }

    /// Synthesizes a HEALPix map in the ordering of `hp`.
    ///
    /// NESTED maps are synthesized on the RING grid and permuted afterwards.
    ///
    /// # Errors
    /// `SizeMismatch` if `alm.len() != info.size()`; `UnsupportedScheme` for a
    /// NESTED pixelization whose nside is not a power of two.
    pub fn alm2map_healpix<T: ShtFloat>(
        &self,
        alm: &[Complex<T>],
        info: &AlmInfo,
        hp: &Healpix,
    ) -> SphereResult<Vec<T>> {
        check_len("alm", info.size(), alm.len())?;
        let geom = GeomInfo::healpix(hp.nside())?;
        let map = self.alm2map(alm, info, &geom)?;
        match hp.scheme() {
            Scheme::Ring => Ok(map),
            Scheme::Nested => hp.reorder_ring_to_nest(&map),
        }
    }

    /// Analyses a HEALPix map given in the ordering of `hp`, with `niter`
    /// refinement steps as in [`ShtEngine::map2alm_iter`].
    ///
    /// # Errors
    /// `SizeMismatch` if `map.len() != hp.npix()`.
    pub fn map2alm_healpix<T: ShtFloat>(
        &self,
        map: &[T],
        hp: &Healpix,
        info: &AlmInfo,
        niter: usize,
    ) -> SphereResult<Vec<Complex<T>>> {
        check_len("map", hp.npix() as usize, map.len())?;
        let geom = GeomInfo::healpix(hp.nside())?;
        match hp.scheme() {
            Scheme::Ring => self.map2alm_iter(map, &geom, info, niter),
            Scheme::Nested => {
                let ring_map = hp.reorder_nest_to_ring(map)?;
                self.map2alm_iter(&ring_map, &geom, info, niter)
            }
        }
    }

    /// Per-m accumulators `a_{l,m}` for `l = m..=lmax`.
    fn analyse<T: ShtFloat>(
        &self,
        map: &[T],
        geom: &GeomInfo,
        info: &AlmInfo,
    ) -> SphereResult<Vec<Vec<C64>>> {
        let gen = YlmGenerator::new(info.lmax(), info.mmax())?;
        let ncoef = info.mmax() + 1;
        let stride = geom.stride();
        tracing::debug!(
            lmax = info.lmax(),
            mmax = info.mmax(),
            nrings = geom.nrings(),
            nthreads = self.nthreads(),
            precision = T::PRECISION,
            "map2alm"
        );

        let mut acc: Vec<Vec<C64>> = info
            .m_range()
            .map(|m| vec![C64::ZERO; info.lmax() + 1 - m])
            .collect();

        for chunk in geom.pairs().chunks(CHUNK_PAIRS) {
            let rings = chunk_rings(chunk);

            // FFT stage: one row of weighted phases per ring
            let mut phases = vec![C64::ZERO; rings.len() * ncoef];
            let mut batch = TaskBatch::with_capacity(rings.len());
            for (ring, row) in rings.iter().zip(phases.chunks_mut(ncoef)) {
                batch.submit(move || ring_phases(map, stride, ring, row));
            }
            self.pool.run_all_and_wait(batch)?;

            // Legendre stage: one task per m
            let phases = &phases;
            let mut batch = TaskBatch::with_capacity(ncoef);
            for (m, values) in acc.iter_mut().enumerate() {
                let gen = &gen;
                batch.submit(move || {
                    let coeffs = gen.coefficients(m);
                    legendre_analysis(&coeffs, chunk, phases, ncoef, values);
                    Ok(())
                });
            }
            self.pool.run_all_and_wait(batch)?;
        }
        Ok(acc)
    }
}

fn check_len(context: &str, expected: usize, actual: usize) -> SphereResult<()> {
    if expected != actual {
        return Err(SphereError::size_mismatch(context, expected, actual));
    }
    Ok(())
}

fn rms(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    libm::sqrt(values.iter().map(|v| v * v).sum::<f64>() / values.len() as f64)
}

/// Rings of a chunk, each pair contributing north then south.
fn chunk_rings(chunk: &[RingPair]) -> Vec<RingInfo> {
    chunk.iter().flat_map(|p| p.rings().copied()).collect()
}

/// Carves `map` into one slice per ring, keyed by ring offset. Requires
/// non-overlapping unit-stride rings, which [`GeomInfo::new`] enforces.
fn split_rings<'m, T>(map: &'m mut [T], rings: &[RingInfo]) -> HashMap<usize, &'m mut [T]> {
    let mut order: Vec<&RingInfo> = rings.iter().collect();
    order.sort_unstable_by_key(|r| r.ofs);

    let mut sinks = HashMap::with_capacity(rings.len());
    let mut rest = map;
    let mut cursor = 0;
    for ring in order {
        let (_, tail) = std::mem::take(&mut rest).split_at_mut(ring.ofs - cursor);
        let (slot, tail) = tail.split_at_mut(ring.nph);
        sinks.insert(ring.ofs, slot);
        rest = tail;
        cursor = ring.ofs + ring.nph;
    }
    sinks
}

/// `Σ_l a_lm λ_lm` at the northern ring of a pair, split by the parity of
/// `l − m`. The southern ring sees `even − odd`.
fn parity_sums(coeffs: &RecurrenceCoeffs, ring: &RingInfo, a: &[C64]) -> (C64, C64) {
    let mut state = coeffs.start(ring.cth, ring.sth);
    let (mut even, mut odd) = (C64::ZERO, C64::ZERO);
    for (i, &alm) in a.iter().enumerate() {
        if i > 0 {
            state.advance(coeffs);
        }
        if state.is_negligible() {
            continue;
        }
        let term = alm.scale(state.value());
        if i % 2 == 0 {
            even += term;
        } else {
            odd += term;
        }
    }
    (even, odd)
}

fn legendre_synthesis<T: ShtFloat>(
    coeffs: &RecurrenceCoeffs,
    alm: &[Complex<T>],
    info: &AlmInfo,
    pairs: &[RingPair],
    row: &mut [C64],
) -> SphereResult<()> {
    let m = coeffs.m();
    let a: Vec<C64> = (m..=info.lmax())
        .map(|l| widen(alm[info.offset(l, m)]))
        .collect();

    let mut slot = 0;
    for pair in pairs {
        let (even, odd) = parity_sums(coeffs, &pair.north, &a);
        let north = even + odd;
        if !north.is_finite() || !odd.is_finite() {
            return Err(SphereError::numerical_instability(
                "alm2map",
                format!(
                    "non-finite Legendre sum for m={m} at theta={}",
                    pair.north.theta
                ),
            ));
        }
        row[slot] = north;
        slot += 1;
        if pair.south.is_some() {
            row[slot] = even - odd;
            slot += 1;
        }
    }
    Ok(())
}

fn legendre_analysis(
    coeffs: &RecurrenceCoeffs,
    pairs: &[RingPair],
    phases: &[C64],
    ncoef: usize,
    acc: &mut [C64],
) {
    let m = coeffs.m();
    let mut slot = 0;
    for pair in pairs {
        let north = phases[slot * ncoef + m];
        slot += 1;
        let (even, odd) = if pair.south.is_some() {
            let south = phases[slot * ncoef + m];
            slot += 1;
            (north + south, north - south)
        } else {
            (north, north)
        };

        let mut state = coeffs.start(pair.north.cth, pair.north.sth);
        for (i, a) in acc.iter_mut().enumerate() {
            if i > 0 {
                state.advance(coeffs);
            }
            if state.is_negligible() {
                continue;
            }
            let g = if i % 2 == 0 { even } else { odd };
            *a += g.scale(state.value());
        }
    }
}

/// Folds `F_m·e^{imφ₀}` for `m = 0..ncoef` into the `nph/2 + 1` bins of a
/// real inverse FFT, aliasing orders at or above the ring's Nyquist limit.
fn ring_spectrum(phases: &[C64], nr: usize, slot: usize, ring: &RingInfo, ncoef: usize) -> Vec<C64> {
    let n = ring.nph;
    let mut bins = vec![C64::ZERO; n / 2 + 1];
    for m in 0..ncoef {
        let c = phases[m * nr + slot] * C64::cis(m as f64 * ring.phi0);
        let k = m % n;
        if m == 0 {
            bins[0].re += c.re;
        } else if k == 0 {
            bins[0].re += 2.0 * c.re;
        } else if 2 * k == n {
            bins[k].re += 2.0 * c.re;
        } else if 2 * k < n {
            bins[k] += c;
        } else {
            bins[n - k] += c.conj();
        }
    }
    bins
}

fn synthesize_ring(
    phases: &[C64],
    nr: usize,
    slot: usize,
    ring: &RingInfo,
    ncoef: usize,
) -> SphereResult<Vec<f64>> {
    let bins = ring_spectrum(phases, nr, slot, ring, ncoef);
    plan_real(ring.nph)?.backward(&bins)
}

/// `G_m = w·e^{−imφ₀}·Σ_j f_j e^{−2πi·mj/nph}` for `m = 0..row.len()`.
fn ring_phases<T: ShtFloat>(
    map: &[T],
    stride: usize,
    ring: &RingInfo,
    row: &mut [C64],
) -> SphereResult<()> {
    let n = ring.nph;
    let values: Vec<f64> = (0..n).map(|j| map[ring.ofs + j * stride].to_f64()).collect();
    let spectrum = plan_real(n)?.forward(&values)?;
    for (m, g) in row.iter_mut().enumerate() {
        let k = m % n;
        let x = if 2 * k <= n {
            spectrum[k]
        } else {
            spectrum[n - k].conj()
        };
        *g = (x * C64::cis(-(m as f64) * ring.phi0)).scale(ring.weight);
    }
    if let Some(bad) = row.iter().position(|g| !g.is_finite()) {
        return Err(SphereError::numerical_instability(
            "map2alm",
            format!(
                "non-finite ring phase for m={bad} at theta={}",
                ring.theta
            ),
        ));
    }
    Ok(())
}
