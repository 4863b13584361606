use approx::assert_abs_diff_eq;
use celestial_core::constants::{FOURPI, PI};
use celestial_core::SphereError;
use celestial_fft::Complex;
use celestial_healpix::{Healpix, Scheme};
use celestial_sht::{AlmInfo, AlmOrdering, GeomInfo, ShtEngine, ShtFloat, Threads, YlmGenerator};

type C64 = Complex<f64>;

/// Deterministic coefficients in [-1, 1); `m = 0` terms are real.
fn random_alm(info: &AlmInfo, seed: u64) -> Vec<C64> {
    let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
    let mut next = move || {
        state = state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        ((state >> 11) as f64 / (1u64 << 53) as f64) * 2.0 - 1.0
    };
    let mut alm = vec![C64::ZERO; info.size()];
    for (l, m) in info.iter_lm() {
        let re = next();
        let im = if m == 0 { 0.0 } else { next() };
        alm[info.offset(l, m)] = C64::new(re, im);
    }
    alm
}

fn max_alm_error(a: &[C64], b: &[C64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (*x - *y).norm()).fold(0.0, f64::max)
}

/// `Σ a_lm Y_lm(θ, φ)` summed directly for a real field.
fn direct_synthesis(alm: &[C64], info: &AlmInfo, theta: f64, phi: f64) -> f64 {
    let gen = YlmGenerator::new(info.lmax(), info.mmax()).unwrap();
    let (sth, cth) = (libm::sin(theta), libm::cos(theta));
    let mut total = 0.0;
    for m in info.m_range() {
        let lambda = gen.evaluate(m, cth, sth).unwrap();
        let rot = C64::cis(m as f64 * phi);
        for (i, v) in lambda.iter().enumerate() {
            let term = (alm[info.offset(m + i, m)] * rot).re * v;
            total += if m == 0 { term } else { 2.0 * term };
        }
    }
    total
}

fn y20_setup() -> (ShtEngine, AlmInfo, GeomInfo, Vec<C64>, Vec<f64>) {
    let engine = ShtEngine::sequential();
    let info = AlmInfo::new(8, 8).unwrap();
    let geom = GeomInfo::healpix(4).unwrap();
    let mut alm = vec![C64::ZERO; info.size()];
    alm[info.offset(2, 0)] = C64::ONE;
    let map = engine.alm2map(&alm, &info, &geom).unwrap();
    (engine, info, geom, alm, map)
}

#[test]
fn test_y20_synthesis_matches_closed_form() {
    let (_, _, _, _, map) = y20_setup();
    let hp = Healpix::new(4, Scheme::Ring).unwrap();
    assert_eq!(map.len(), 192);
    for (pix, value) in map.iter().enumerate() {
        let z = libm::cos(hp.pix2ang(pix as u64).unwrap().theta);
        let expected = libm::sqrt(5.0 / (4.0 * PI)) * 0.5 * (3.0 * z * z - 1.0);
        assert_abs_diff_eq!(*value, expected, epsilon = 1e-13);
    }
}

#[test]
fn test_y20_energy() {
    let (_, _, _, _, map) = y20_setup();
    let energy: f64 = map.iter().map(|v| v * v).sum::<f64>() * FOURPI / map.len() as f64;
    assert_abs_diff_eq!(energy, 1.0, epsilon = 0.05);
}

#[test]
fn test_energy_identity_on_exact_grid() {
    let engine = ShtEngine::new(Threads::Count(2)).unwrap();
    for (lmax, mmax) in [(64, 64), (40, 17)] {
        let info = AlmInfo::new(lmax, mmax).unwrap();
        let geom = GeomInfo::gauss_legendre(lmax + 1, 2 * mmax + 1).unwrap();
        let alm = random_alm(&info, 31 + lmax as u64);
        let map = engine.alm2map(&alm, &info, &geom).unwrap();

        let mut map_energy = 0.0;
        for ring in geom.rings() {
            for j in 0..ring.nph {
                let v = map[ring.ofs + j * geom.stride()];
                map_energy += ring.weight * v * v;
            }
        }
        let alm_energy: f64 = info
            .iter_lm()
            .map(|(l, m)| {
                let power = alm[info.offset(l, m)].norm_sqr();
                if m == 0 {
                    power
                } else {
                    2.0 * power
                }
            })
            .sum();
        let rel = (map_energy - alm_energy).abs() / alm_energy;
        assert!(rel < 1e-12, "lmax={lmax} mmax={mmax}: relative error {rel}");
    }
}

#[test]
fn test_y20_analysis_converges_with_iteration() {
    let (engine, info, geom, alm, map) = y20_setup();

    let plain = engine.map2alm(&map, &geom, &info).unwrap();
    let e0 = max_alm_error(&plain, &alm);
    assert!(e0 < 0.05, "plain error {e0}");

    let e3 = max_alm_error(&engine.map2alm_iter(&map, &geom, &info, 3).unwrap(), &alm);
    assert!(e3 < 1e-3, "3 iterations: {e3}");

    let e5 = max_alm_error(&engine.map2alm_iter(&map, &geom, &info, 5).unwrap(), &alm);
    assert!(e5 < 1e-4, "5 iterations: {e5}");
    assert!(e5 < e3 && e3 < e0);

    let e_zero = max_alm_error(&engine.map2alm_iter(&map, &geom, &info, 0).unwrap(), &alm);
    assert_eq!(e_zero, e0);
}

#[test]
fn test_gauss_legendre_round_trip() {
    let engine = ShtEngine::new(Threads::Count(4)).unwrap();
    for (lmax, mmax) in [(0, 0), (1, 1), (20, 20), (31, 12)] {
        let info = AlmInfo::new(lmax, mmax).unwrap();
        let geom = GeomInfo::gauss_legendre(lmax + 1, 2 * mmax + 1).unwrap();
        let alm = random_alm(&info, 17 + lmax as u64);
        let map = engine.alm2map(&alm, &info, &geom).unwrap();
        let back = engine.map2alm(&map, &geom, &info).unwrap();
        let err = max_alm_error(&back, &alm);
        assert!(err < 1e-10, "lmax={lmax} mmax={mmax}: {err}");
    }
}

#[test]
fn test_equiangular_round_trips() {
    let engine = ShtEngine::sequential();
    let lmax = 12;
    let info = AlmInfo::new(lmax, lmax).unwrap();
    let alm = random_alm(&info, 5);
    for geom in [
        GeomInfo::clenshaw_curtis(2 * lmax + 2, 2 * lmax + 2).unwrap(),
        GeomInfo::fejer1(2 * lmax + 2, 2 * lmax + 2).unwrap(),
    ] {
        let map = engine.alm2map(&alm, &info, &geom).unwrap();
        let back = engine.map2alm(&map, &geom, &info).unwrap();
        assert!(max_alm_error(&back, &alm) < 1e-10);
    }
}

#[test]
fn test_lmajor_layout_gives_same_map() {
    let engine = ShtEngine::sequential();
    let mmajor = AlmInfo::new(10, 6).unwrap();
    let lmajor = AlmInfo::with_ordering(10, 6, AlmOrdering::LMajor).unwrap();
    let alm = random_alm(&mmajor, 3);
    let mut reordered = vec![C64::ZERO; lmajor.size()];
    for (l, m) in mmajor.iter_lm() {
        reordered[lmajor.offset(l, m)] = alm[mmajor.offset(l, m)];
    }
    let geom = GeomInfo::healpix(4).unwrap();
    let a = engine.alm2map(&alm, &mmajor, &geom).unwrap();
    let b = engine.alm2map(&reordered, &lmajor, &geom).unwrap();
    assert_eq!(a, b);

    let back = engine.map2alm(&b, &geom, &lmajor).unwrap();
    let expected = engine.map2alm(&a, &geom, &mmajor).unwrap();
    for (l, m) in mmajor.iter_lm() {
        assert_eq!(back[lmajor.offset(l, m)], expected[mmajor.offset(l, m)]);
    }
}

#[test]
fn test_many_chunks_match_direct_sum() {
    // 160 ring pairs, more than one chunk
    let nside = 80;
    let engine = ShtEngine::new(Threads::Count(3)).unwrap();
    let info = AlmInfo::new(24, 10).unwrap();
    let geom = GeomInfo::healpix(nside).unwrap();
    assert_eq!(geom.npairs(), 160);
    let hp = Healpix::new(nside, Scheme::Ring).unwrap();

    let alm = random_alm(&info, 11);
    let map = engine.alm2map(&alm, &info, &geom).unwrap();
    for pix in (0..hp.npix()).step_by(997).chain([hp.npix() - 1]) {
        let ptg = hp.pix2ang(pix).unwrap();
        let expected = direct_synthesis(&alm, &info, ptg.theta, ptg.phi);
        assert_abs_diff_eq!(map[pix as usize], expected, epsilon = 1e-11);
    }
}

#[test]
fn test_parallel_matches_sequential() {
    let info = AlmInfo::new(40, 40).unwrap();
    let geom = GeomInfo::healpix(16).unwrap();
    let alm = random_alm(&info, 23);
    let seq = ShtEngine::sequential();
    let par = ShtEngine::new(Threads::Count(4)).unwrap();

    let map_seq = seq.alm2map(&alm, &info, &geom).unwrap();
    let map_par = par.alm2map(&alm, &info, &geom).unwrap();
    assert_eq!(map_seq, map_par);
    assert_eq!(
        seq.map2alm(&map_seq, &geom, &info).unwrap(),
        par.map2alm(&map_par, &geom, &info).unwrap()
    );
}

#[test]
fn test_single_precision_buffers() {
    let engine = ShtEngine::sequential();
    let info = AlmInfo::new(16, 16).unwrap();
    let geom = GeomInfo::gauss_legendre(17, 33).unwrap();
    let alm64 = random_alm(&info, 9);
    let alm32: Vec<Complex<f32>> = alm64
        .iter()
        .map(|c| Complex::new(f32::from_f64(c.re), f32::from_f64(c.im)))
        .collect();

    let map32 = engine.alm2map(&alm32, &info, &geom).unwrap();
    let map64 = engine.alm2map(&alm64, &info, &geom).unwrap();
    for (a, b) in map32.iter().zip(&map64) {
        assert_abs_diff_eq!(a.to_f64(), *b, epsilon = 1e-4);
    }

    let back32 = engine.map2alm(&map32, &geom, &info).unwrap();
    for (a, b) in back32.iter().zip(&alm64) {
        assert_abs_diff_eq!(a.re.to_f64(), b.re, epsilon = 1e-4);
        assert_abs_diff_eq!(a.im.to_f64(), b.im, epsilon = 1e-4);
    }
}

#[test]
fn test_into_variants_reuse_buffers() {
    let engine = ShtEngine::sequential();
    let info = AlmInfo::new(6, 6).unwrap();
    let geom = GeomInfo::gauss_legendre(7, 14).unwrap();
    let alm = random_alm(&info, 2);

    let mut map = vec![f64::NAN; geom.map_len()];
    engine.alm2map_into(&alm, &info, &geom, &mut map).unwrap();
    assert!(map.iter().all(|v| v.is_finite()));

    let mut back = vec![C64::new(9.0, 9.0); info.size()];
    engine.map2alm_into(&map, &geom, &info, &mut back).unwrap();
    assert!(max_alm_error(&back, &alm) < 1e-12);
}

#[test]
fn test_mismatched_buffers_rejected() {
    let engine = ShtEngine::sequential();
    let info = AlmInfo::new(8, 8).unwrap();
    let geom = GeomInfo::healpix(4).unwrap();
    let alm = vec![C64::ZERO; info.size()];

    let mut short_map = vec![0.0f64; 191];
    assert!(matches!(
        engine.alm2map_into(&alm, &info, &geom, &mut short_map),
        Err(SphereError::SizeMismatch { expected: 192, actual: 191, .. })
    ));
    assert!(matches!(
        engine.map2alm_iter(&short_map, &geom, &info, 2),
        Err(SphereError::SizeMismatch { .. })
    ));
    let long_alm = vec![C64::ZERO; info.size() + 1];
    assert!(matches!(
        engine.alm2map(&long_alm, &info, &geom),
        Err(SphereError::SizeMismatch { .. })
    ));
}

#[test]
fn test_nested_map_needs_reordering() {
    let nested = Healpix::new(4, Scheme::Nested).unwrap();
    assert!(matches!(
        GeomInfo::from_healpix(&nested),
        Err(SphereError::UnsupportedScheme { .. })
    ));

    // after reordering a NESTED map transforms like its RING twin
    let engine = ShtEngine::sequential();
    let info = AlmInfo::new(6, 6).unwrap();
    let geom = GeomInfo::from_healpix(&nested.with_scheme(Scheme::Ring).unwrap()).unwrap();
    let ring_map = engine.alm2map(&random_alm(&info, 4), &info, &geom).unwrap();
    let nest_map = nested.reorder_ring_to_nest(&ring_map).unwrap();
    let restored = nested.reorder_nest_to_ring(&nest_map).unwrap();
    assert_eq!(
        engine.map2alm(&restored, &geom, &info).unwrap(),
        engine.map2alm(&ring_map, &geom, &info).unwrap()
    );
}
