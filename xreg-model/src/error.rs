use std::fmt::{self, Display};

use crate::kind::XactKind;

/// Errors produced by argument constructors and validation routines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    /// Payload variant does not belong to the requested kind.
    KindMismatch {
        kind: XactKind,
        payload: &'static str,
    },
    /// Payload fields are present but malformed.
    InvalidArgs { kind: XactKind, reason: String },
    /// Identifier failed validation (empty, whitespace).
    InvalidId(String),
}

impl ModelError {
    pub fn invalid(kind: XactKind, reason: impl Into<String>) -> Self {
        ModelError::InvalidArgs {
            kind,
            reason: reason.into(),
        }
    }
}

impl Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelError::KindMismatch { kind, payload } => {
                write!(f, "{payload} arguments cannot drive a {kind} xaction")
            }
            ModelError::InvalidArgs { kind, reason } => {
                write!(f, "invalid {kind} arguments: {reason}")
            }
            ModelError::InvalidId(raw) => {
                write!(f, "invalid xaction id: {raw:?}")
            }
        }
    }
}

impl std::error::Error for ModelError {}

pub type Result<T> = std::result::Result<T, ModelError>;
