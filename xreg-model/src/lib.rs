//! Data model shared by the xreg crates: bucket references, job kinds and
//! their conflict scopes, per-kind argument payloads, and the bucket
//! metadata snapshot consumed by the fan-out driver.
#![allow(missing_docs)]

pub mod args;
pub mod bmd;
pub mod bucket;
pub mod error;
pub mod ids;
pub mod kind;

// Intentionally curated re-exports for downstream consumers.
pub use args::{
    ActionPhase, BckRenameArgs, CopyBckMsg, CustomArgs, DsortArgs,
    EcEncodeArgs, GetBatchArgs, LsoArgs, LsoMsg, MAX_LIST_PAGE_SIZE,
    MAX_MIRROR_COPIES, MncArgs, PromoteArgs, PutMirrorArgs, TcbArgs,
    XactArgs,
};
pub use bmd::{BucketMetadata, BucketRecord};
pub use bucket::{
    Bck, BucketProps, MirrorConf, Namespace, ObjectRef, Provider,
};
pub use error::{ModelError, Result as ModelResult};
pub use ids::{RebId, XactId};
pub use kind::{RenewMode, XactKind, XactScope};
