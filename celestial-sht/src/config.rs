//! Transform settings loaded from JSON.
//!
//! ```json
//! { "scheme": "ring", "nside": 64, "lmax": 191, "nthreads": "auto", "precision": "double" }
//! ```
//!
//! `nside` must be a power of two whatever the scheme, so a configured map can
//! always be reordered. `mmax` defaults to `lmax`, `scheme` to `ring`,
//! `nthreads` to `auto` and `precision` to `double`.

use crate::alm::AlmInfo;
use crate::geometry::GeomInfo;
use crate::pool::Threads;
use crate::transform::ShtEngine;
use celestial_core::{SphereError, SphereResult};
use celestial_healpix::{Healpix, Scheme};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Floating-point width of map and coefficient buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Precision {
    Single,
    #[default]
    Double,
}

impl fmt::Display for Precision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Precision::Single => f.write_str("single"),
            Precision::Double => f.write_str("double"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransformConfig {
    #[serde(default)]
    pub scheme: Scheme,
    pub nside: u64,
    pub lmax: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mmax: Option<usize>,
    #[serde(default)]
    pub nthreads: Threads,
    #[serde(default)]
    pub precision: Precision,
}

impl TransformConfig {
    /// RING map, `mmax = lmax`, automatic threads, double precision.
    pub fn new(nside: u64, lmax: usize) -> Self {
        Self {
            scheme: Scheme::Ring,
            nside,
            lmax,
            mmax: None,
            nthreads: Threads::Auto,
            precision: Precision::Double,
        }
    }

    /// Parses and validates a JSON document.
    ///
    /// # Errors
    /// `InvalidParameter` for malformed JSON, unknown keys, wrongly typed values
    /// or settings rejected by [`TransformConfig::validate`].
    pub fn from_json(text: &str) -> SphereResult<Self> {
        let config: Self = serde_json::from_str(text)
            .map_err(|e| SphereError::invalid_parameter("config", e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> SphereResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| SphereError::invalid_parameter("config", e.to_string()))
    }

    /// Effective `mmax`.
    #[inline]
    pub fn mmax(&self) -> usize {
        self.mmax.unwrap_or(self.lmax)
    }

    /// Checks resolution, band limit and worker count.
    pub fn validate(&self) -> SphereResult<()> {
        if !self.nside.is_power_of_two() {
            return Err(SphereError::invalid_parameter(
                "nside",
                format!("{} is not a positive power of two", self.nside),
            ));
        }
        Healpix::new(self.nside, self.scheme)?;
        if self.mmax() > self.lmax {
            return Err(SphereError::invalid_parameter(
                "mmax",
                format!("mmax ({}) must not exceed lmax ({})", self.mmax(), self.lmax),
            ));
        }
        self.nthreads.resolve()?;
        Ok(())
    }

    pub fn healpix(&self) -> SphereResult<Healpix> {
        Healpix::new(self.nside, self.scheme)
    }

    pub fn alm_info(&self) -> SphereResult<AlmInfo> {
        AlmInfo::new(self.lmax, self.mmax())
    }

    /// Ring geometry of the configured map.
    ///
    /// NESTED maps have no ring layout of their own; transform them with
    /// [`ShtEngine::alm2map_healpix`] and [`ShtEngine::map2alm_healpix`] on
    /// [`TransformConfig::healpix`], which reorder through the RING grid.
    ///
    /// # Errors
    /// `UnsupportedScheme` when `scheme` is NESTED.
    pub fn geometry(&self) -> SphereResult<GeomInfo> {
        GeomInfo::from_healpix(&self.healpix()?)
    }

    pub fn engine(&self) -> SphereResult<ShtEngine> {
        ShtEngine::from_config(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_err(text: &str) -> SphereError {
        TransformConfig::from_json(text).unwrap_err()
    }

    #[test]
    fn test_defaults() {
        let config = TransformConfig::from_json(r#"{"nside": 8, "lmax": 16}"#).unwrap();
        assert_eq!(config, TransformConfig::new(8, 16));
        assert_eq!(config.mmax(), 16);
        assert_eq!(config.alm_info().unwrap().size(), 153);
        assert_eq!(config.geometry().unwrap().map_len(), 768);
    }

    #[test]
    fn test_full_document() {
        let config = TransformConfig::from_json(
            r#"{"scheme": "nested", "nside": 4, "lmax": 8, "mmax": 4,
                "nthreads": 2, "precision": "single"}"#,
        )
        .unwrap();
        assert_eq!(config.scheme, Scheme::Nested);
        assert_eq!(config.mmax(), 4);
        assert_eq!(config.nthreads, Threads::Count(2));
        assert_eq!(config.precision, Precision::Single);
        assert!(matches!(
            config.geometry(),
            Err(SphereError::UnsupportedScheme { .. })
        ));
    }

    #[test]
    fn test_round_trip_json() {
        let mut config = TransformConfig::new(16, 40);
        config.nthreads = Threads::Count(3);
        let text = config.to_json().unwrap();
        assert_eq!(TransformConfig::from_json(&text).unwrap(), config);
    }

    #[test]
    fn test_parse_errors() {
        for text in [
            "",
            "{",
            r#"{"lmax": 8}"#,
            r#"{"nside": 4}"#,
            r#"{"nside": -4, "lmax": 8}"#,
            r#"{"nside": 4, "lmax": 8, "colour": "red"}"#,
            r#"{"nside": 4, "lmax": 8, "precision": "quad"}"#,
            r#"{"nside": 4, "lmax": 8, "nthreads": 0}"#,
            r#"{"nside": 4, "lmax": 8, "nthreads": "many"}"#,
            r#"{"nside": 4, "lmax": 8, "scheme": "spiral"}"#,
        ] {
            assert!(
                matches!(parse_err(text), SphereError::InvalidParameter { .. }),
                "accepted {text:?}"
            );
        }
    }

    #[test]
    fn test_semantic_errors() {
        assert!(matches!(
            parse_err(r#"{"nside": 0, "lmax": 8}"#),
            SphereError::InvalidParameter { .. }
        ));
        assert!(matches!(
            parse_err(r#"{"nside": 4, "lmax": 8, "mmax": 9}"#),
            SphereError::InvalidParameter { .. }
        ));
        for text in [
            r#"{"scheme": "nested", "nside": 6, "lmax": 8}"#,
            r#"{"scheme": "ring", "nside": 6, "lmax": 8}"#,
        ] {
            assert!(matches!(parse_err(text), SphereError::InvalidParameter { .. }));
        }
    }

    #[test]
    fn test_nested_config_transforms() {
        let config =
            TransformConfig::from_json(r#"{"scheme": "nested", "nside": 4, "lmax": 8}"#).unwrap();
        let engine = config.engine().unwrap();
        let info = config.alm_info().unwrap();
        let nested = config.healpix().unwrap();
        let ring = nested.with_scheme(Scheme::Ring).unwrap();

        let mut alm = vec![celestial_fft::Complex::new(0.0f64, 0.0); info.size()];
        alm[info.offset(3, 2)] = celestial_fft::Complex::new(0.4, 0.1);
        alm[info.offset(5, 0)] = celestial_fft::Complex::new(-0.7, 0.0);

        let nest_map = engine.alm2map_healpix(&alm, &info, &nested).unwrap();
        let ring_map = engine.alm2map_healpix(&alm, &info, &ring).unwrap();
        assert_eq!(nest_map.len(), 192);
        assert_eq!(nest_map, nested.reorder_ring_to_nest(&ring_map).unwrap());

        assert_eq!(
            engine.map2alm_healpix(&nest_map, &nested, &info, 2).unwrap(),
            engine.map2alm_healpix(&ring_map, &ring, &info, 2).unwrap()
        );
        assert!(matches!(
            engine.map2alm_healpix(&nest_map[1..], &nested, &info, 0),
            Err(SphereError::SizeMismatch { expected: 192, actual: 191, .. })
        ));
    }

    #[test]
    fn test_engine_from_config() {
        let mut config = TransformConfig::new(2, 4);
        config.nthreads = Threads::Count(2);
        let engine = config.engine().unwrap();
        assert!(engine.nthreads() >= 1);
        config.nthreads = Threads::Count(0);
        assert!(config.engine().is_err());
    }
}
