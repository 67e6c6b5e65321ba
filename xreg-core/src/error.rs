use thiserror::Error;
use xreg_model::{ModelError, RenewMode, XactId, XactKind, XactScope};

#[derive(Error, Debug)]
pub enum XactError {
    #[error("Invalid arguments: {0}")]
    InvalidArgs(#[from] ModelError),

    #[error("Failed to construct {kind} xaction: {reason}")]
    Construction { kind: XactKind, reason: String },

    #[error("Xaction kind {0} is already registered")]
    DuplicateKind(XactKind),

    #[error("Xaction kind {kind} declares {scope:?} scope; the bucket registry only serves bucket-scoped kinds")]
    UnsupportedScope { kind: XactKind, scope: XactScope },

    #[error("Xaction kind {kind} cannot be renewed by {mode:?}")]
    UnsupportedRenewal { kind: XactKind, mode: RenewMode },

    #[error("Xaction {id} aborted: {reason}")]
    Aborted { id: XactId, reason: String },

    #[error("Execution failed: {0}")]
    Execution(String),
}

impl XactError {
    pub fn construction(kind: XactKind, reason: impl Into<String>) -> Self {
        XactError::Construction {
            kind,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, XactError>;
