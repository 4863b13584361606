//! Resolution summary for one nside

use crate::cli::InfoArgs;
use celestial_core::constants::RAD_TO_DEG;
use celestial_healpix::{Healpix, Scheme};

pub fn run(args: &InfoArgs) -> anyhow::Result<()> {
    let hp = Healpix::new(args.nside, Scheme::Ring)?;
    let arcmin = RAD_TO_DEG * 60.0;

    println!("nside:          {}", hp.nside());
    match hp.order() {
        Some(order) => println!("order:          {order}"),
        None => println!("order:          - (RING only)"),
    }
    println!("npix:           {}", hp.npix());
    println!("rings:          {}", hp.nrings());
    println!("pixel area:     {:.6e} sr", hp.pixel_area());
    println!("resolution:     {:.4} arcmin", hp.nside_resolution() * arcmin);
    println!("max pixrad:     {:.4} arcmin", hp.max_pixrad() * arcmin);
    println!("suggested lmax: {}", 3 * hp.nside() - 1);
    Ok(())
}
