use celestial_core::{SphereError, SphereResult};
use std::fmt;
use std::str::FromStr;

/// Pixel numbering scheme.
///
/// `Ring` numbers pixels along iso-latitude rings from north to south, which is
/// what the harmonic transforms need. `Nested` numbers them hierarchically inside
/// each of the 12 base faces, so that pixel `p` at one order contains pixels
/// `4p..4p+3` at the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Scheme {
    #[default]
    Ring,
    Nested,
}

impl Scheme {
    pub fn name(&self) -> &'static str {
        match self {
            Scheme::Ring => "RING",
            Scheme::Nested => "NESTED",
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Scheme {
    type Err = SphereError;

    fn from_str(s: &str) -> SphereResult<Self> {
        match s.to_ascii_lowercase().as_str() {
            "ring" => Ok(Scheme::Ring),
            "nest" | "nested" => Ok(Scheme::Nested),
            other => Err(SphereError::invalid_parameter(
                "scheme",
                format!("expected 'ring' or 'nested', got '{other}'"),
            )),
        }
    }
}
