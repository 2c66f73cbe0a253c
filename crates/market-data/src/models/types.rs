use serde::{Deserialize, Serialize};
use std::fmt;

/// Source identifier.
///
/// Examples: "amfi"
///
/// Identifies a registered data source plugin. Unique within a registry and
/// stable across runs, since it is part of every persisted cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceId(String);

impl SourceId {
    pub const AMFI: &'static str = "amfi";

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn amfi() -> Self {
        Self(Self::AMFI.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for SourceId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SourceId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for SourceId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
