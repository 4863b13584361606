//! sht: HEALPix and spherical harmonic transform CLI
//!
//! Inspects pixelizations and exercises the transform engine on
//! deterministic test data.

mod cli;
mod info;
mod pixel;
mod roundtrip;

use clap::Parser;
use cli::{Cli, Commands};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match &cli.command {
        Commands::Info(args) => info::run(args),
        Commands::Pixel(args) => pixel::run(args),
        Commands::Roundtrip(args) => roundtrip::run(args),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "sht=debug,celestial_sht=debug,celestial_fft=debug,celestial_healpix=debug"
    } else {
        "warn"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
