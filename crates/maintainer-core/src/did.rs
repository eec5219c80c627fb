//! Identity method variants.

use crate::error::Error;
use std::str::FromStr;

/// The closed set of DID methods a maintainer can sign with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DidMethod {
    /// Veres One (`did:v1`), signs through the method's own proof routine.
    V1,
    /// `did:key`, signs with a generic linked data suite.
    #[default]
    Key,
}

impl DidMethod {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::V1 => "v1",
            Self::Key => "key",
        }
    }
}

impl std::fmt::Display for DidMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DidMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "v1" => Ok(Self::V1),
            "key" => Ok(Self::Key),
            _ => Err(Error::UnknownDidMethod(s.to_string())),
        }
    }
}
