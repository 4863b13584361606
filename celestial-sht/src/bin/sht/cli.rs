//! CLI argument definitions for sht

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "sht")]
#[command(about = "HEALPix pixel lookups and spherical harmonic transform round trips")]
#[command(version)]
pub struct Cli {
    /// Enable verbose output (debug-level logging)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print pixel counts and resolution for a HEALPix nside
    Info(InfoArgs),

    /// Locate the pixel containing a direction and list its neighbours
    Pixel(PixelArgs),

    /// Synthesize a test map from random coefficients and analyse it back
    Roundtrip(RoundtripArgs),
}

#[derive(Parser)]
pub struct InfoArgs {
    /// HEALPix resolution parameter
    #[arg(long)]
    pub nside: u64,
}

#[derive(Parser)]
pub struct PixelArgs {
    /// HEALPix resolution parameter
    #[arg(long)]
    pub nside: u64,

    /// Co-latitude, 0 at the north pole
    #[arg(long, allow_hyphen_values = true)]
    pub theta: f64,

    /// Longitude
    #[arg(long, allow_hyphen_values = true)]
    pub phi: f64,

    /// Read theta and phi in degrees instead of radians
    #[arg(long)]
    pub degrees: bool,

    /// Use NESTED numbering instead of RING
    #[arg(long)]
    pub nested: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Grid {
    /// HEALPix rings with equal pixel weights
    Healpix,
    /// Gauss-Legendre rings with lmax + 1 rings, exact quadrature
    Gauss,
}

#[derive(Parser)]
pub struct RoundtripArgs {
    /// JSON transform configuration; flags below override it
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// HEALPix resolution parameter (default 16)
    #[arg(long)]
    pub nside: Option<u64>,

    /// Band limit (default 2 * nside)
    #[arg(long)]
    pub lmax: Option<usize>,

    /// Sampling grid
    #[arg(long, value_enum, default_value = "healpix")]
    pub grid: Grid,

    /// Jacobi refinement steps for the analysis
    #[arg(long, default_value = "0")]
    pub iter: usize,

    /// Seed for the random coefficients
    #[arg(long, default_value = "1")]
    pub seed: u64,
}
