//! alm → map → alm round trip on deterministic coefficients

use crate::cli::{Grid, RoundtripArgs};
use anyhow::Context;
use celestial_fft::Complex;
use celestial_healpix::Healpix;
use celestial_sht::{AlmInfo, GeomInfo, Precision, ShtEngine, ShtFloat, TransformConfig};
use std::fs;
use std::time::Instant;

const DEFAULT_NSIDE: u64 = 16;

struct Report {
    max_error: f64,
    rms_error: f64,
    synthesis_ms: f64,
    analysis_ms: f64,
}

/// Where the samples live: a HEALPix map in its configured ordering, or a
/// quadrature grid.
enum Target {
    Pixels(Healpix),
    Rings(GeomInfo),
}

pub fn run(args: &RoundtripArgs) -> anyhow::Result<()> {
    let config = load_config(args)?;
    let info = config.alm_info()?;
    let target = match args.grid {
        Grid::Healpix => Target::Pixels(config.healpix()?),
        Grid::Gauss => Target::Rings(GeomInfo::gauss_legendre(
            config.lmax + 1,
            2 * config.mmax() + 2,
        )?),
    };
    let engine = config.engine()?;

    let (layout, rings, pixels) = match &target {
        Target::Pixels(hp) => (
            hp.scheme().to_string(),
            hp.nrings() as usize,
            hp.npix() as usize,
        ),
        Target::Rings(geom) => ("rings".to_string(), geom.nrings(), geom.total_pixels()),
    };
    println!(
        "grid: {:?} ({})  nside: {}  lmax: {}  mmax: {}  rings: {}  pixels: {}",
        args.grid,
        layout,
        config.nside,
        config.lmax,
        config.mmax(),
        rings,
        pixels
    );
    println!(
        "threads: {}  precision: {}  iterations: {}",
        engine.nthreads(),
        config.precision,
        args.iter
    );

    let report = match config.precision {
        Precision::Single => round_trip::<f32>(&engine, &info, &target, args),
        Precision::Double => round_trip::<f64>(&engine, &info, &target, args),
    }?;

    println!("alm2map:   {:.3} ms", report.synthesis_ms);
    println!("map2alm:   {:.3} ms", report.analysis_ms);
    println!("max error: {:.3e}", report.max_error);
    println!("rms error: {:.3e}", report.rms_error);
    Ok(())
}

fn load_config(args: &RoundtripArgs) -> anyhow::Result<TransformConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {:?}", path))?;
            TransformConfig::from_json(&text)
                .with_context(|| format!("Invalid config {:?}", path))?
        }
        None => {
            let nside = args.nside.unwrap_or(DEFAULT_NSIDE);
            TransformConfig::new(nside, (2 * nside) as usize)
        }
    };
    if let Some(nside) = args.nside {
        config.nside = nside;
    }
    if let Some(lmax) = args.lmax {
        config.lmax = lmax;
        config.mmax = config.mmax.map(|m| m.min(lmax));
    }
    config.validate()?;
    Ok(config)
}

fn round_trip<T: ShtFloat>(
    engine: &ShtEngine,
    info: &AlmInfo,
    target: &Target,
    args: &RoundtripArgs,
) -> anyhow::Result<Report> {
    let alm: Vec<Complex<T>> = random_alm(info, args.seed);

    let start = Instant::now();
    let map = match target {
        Target::Pixels(hp) => engine.alm2map_healpix(&alm, info, hp)?,
        Target::Rings(geom) => engine.alm2map(&alm, info, geom)?,
    };
    let synthesis_ms = start.elapsed().as_secs_f64() * 1e3;

    let start = Instant::now();
    let back = match target {
        Target::Pixels(hp) => engine.map2alm_healpix(&map, hp, info, args.iter)?,
        Target::Rings(geom) => engine.map2alm_iter(&map, geom, info, args.iter)?,
    };
    let analysis_ms = start.elapsed().as_secs_f64() * 1e3;

    let mut max_error: f64 = 0.0;
    let mut sum_sq = 0.0;
    for (a, b) in alm.iter().zip(&back) {
        let dre = a.re.to_f64() - b.re.to_f64();
        let dim = a.im.to_f64() - b.im.to_f64();
        let err = (dre * dre + dim * dim).sqrt();
        max_error = max_error.max(err);
        sum_sq += err * err;
    }
    Ok(Report {
        max_error,
        rms_error: (sum_sq / alm.len() as f64).sqrt(),
        synthesis_ms,
        analysis_ms,
    })
}

/// Uniform values in [-1, 1) from a 64-bit LCG; `m = 0` terms are real.
fn random_alm<T: ShtFloat>(info: &AlmInfo, seed: u64) -> Vec<Complex<T>> {
    let mut state = seed
        .wrapping_mul(6364136223846793005)
        .wrapping_add(1442695040888963407);
    let mut next = move || {
        state = state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        ((state >> 11) as f64 / (1u64 << 53) as f64) * 2.0 - 1.0
    };
    let mut alm = vec![Complex::new(T::default(), T::default()); info.size()];
    for (l, m) in info.iter_lm() {
        let re = next();
        let im = if m == 0 { 0.0 } else { next() };
        alm[info.offset(l, m)] = Complex::new(T::from_f64(re), T::from_f64(im));
    }
    alm
}
