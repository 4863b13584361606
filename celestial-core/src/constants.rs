#[allow(clippy::excessive_precision)]
#[allow(clippy::approx_constant)]
pub const PI: f64 = 3.141592653589793238462643;

#[allow(clippy::excessive_precision)]
#[allow(clippy::approx_constant)]
pub const HALF_PI: f64 = 1.5707963267948966192313216;

#[allow(clippy::excessive_precision)]
#[allow(clippy::approx_constant)]
pub const TWOPI: f64 = 6.283185307179586476925287;

#[allow(clippy::excessive_precision)]
pub const FOURPI: f64 = 12.56637061435917295385057;

#[allow(clippy::excessive_precision)]
#[allow(clippy::approx_constant)]
pub const INV_TWOPI: f64 = 0.1591549430918953357688837;

/// 2/π, maps a longitude onto the four HEALPix quadrants.
#[allow(clippy::excessive_precision)]
#[allow(clippy::approx_constant)]
pub const INV_HALFPI: f64 = 0.6366197723675813430755351;

/// |z| boundary between the HEALPix polar caps and the equatorial belt.
pub const TWOTHIRD: f64 = 2.0 / 3.0;

#[allow(clippy::excessive_precision)]
pub const DEG_TO_RAD: f64 = 1.745329251994329576923691e-2;

#[allow(clippy::excessive_precision)]
pub const RAD_TO_DEG: f64 = 57.29577951308232087679815;
