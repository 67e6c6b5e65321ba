use std::fmt;

use uuid::Uuid;

use crate::error::{ModelError, Result};

/// Identity of an extended action.
///
/// Callers may supply their own id (list-objects paging, batched reads) so
/// that repeated requests land on the same backing job; otherwise the
/// registry generates one.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct XactId(String);

impl XactId {
    /// Wraps a caller-supplied id, rejecting blank values.
    pub fn parse(raw: impl Into<String>) -> Result<Self> {
        let raw = raw.into();
        if raw.trim().is_empty() || raw.chars().any(char::is_whitespace) {
            return Err(ModelError::InvalidId(raw));
        }
        Ok(Self(raw))
    }

    pub fn generate() -> Self {
        Self(Uuid::now_v7().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for XactId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for XactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Rebalance identifier derived from the cluster metadata version that
/// triggered a bucket rename.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RebId(pub i64);

impl RebId {
    pub fn from_version(version: i64) -> Self {
        RebId(version)
    }

    pub fn is_valid(&self) -> bool {
        self.0 > 0
    }
}

impl fmt::Display for RebId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "g{}", self.0)
    }
}
