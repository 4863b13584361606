//! Pixel lookup for a single direction

use crate::cli::PixelArgs;
use celestial_core::constants::DEG_TO_RAD;
use celestial_core::Pointing;
use celestial_healpix::{Healpix, Scheme};

const DIRECTIONS: [&str; 8] = ["SW", "W", "NW", "N", "NE", "E", "SE", "S"];

pub fn run(args: &PixelArgs) -> anyhow::Result<()> {
    let scheme = if args.nested {
        Scheme::Nested
    } else {
        Scheme::Ring
    };
    let hp = Healpix::new(args.nside, scheme)?;
    let ptg = if args.degrees {
        Pointing::new(args.theta * DEG_TO_RAD, args.phi * DEG_TO_RAD)
    } else {
        Pointing::new(args.theta, args.phi)
    };
    let pix = hp.ang2pix(&ptg)?;
    let centre = hp.pix2ang(pix)?;

    println!("scheme:  {scheme}");
    println!("pixel:   {pix}");
    println!("ring:    {}", hp.pix2ring(pix)?);
    println!("centre:  theta={:.9} phi={:.9}", centre.theta, centre.phi);
    println!("offset:  {:.6e} rad", ptg.angular_distance(&centre));

    let neighbours = hp.neighbors(pix)?;
    for (name, neighbour) in DIRECTIONS.iter().zip(neighbours) {
        match neighbour {
            Some(p) => println!("  {name:>2}: {p}"),
            None => println!("  {name:>2}: -"),
        }
    }
    Ok(())
}
