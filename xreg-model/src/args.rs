//! Per-kind argument payloads carried opaquely through the registry.

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::bucket::{Bck, ObjectRef};
use crate::error::{ModelError, Result};
use crate::ids::{RebId, XactId};
use crate::kind::XactKind;

/// Upper bound for `make-n-copies`.
pub const MAX_MIRROR_COPIES: u32 = 32;

/// Upper bound for a single list-objects page.
pub const MAX_LIST_PAGE_SIZE: u32 = 10_000;

/// Two-phase transaction step a job is started under.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ActionPhase {
    Begin,
    Commit,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EcEncodeArgs {
    pub phase: ActionPhase,
    /// Check existing slices and recover missing ones.
    pub recover: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MncArgs {
    pub tag: String,
    pub copies: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PromoteArgs {
    /// File or directory to promote.
    pub src_fqn: PathBuf,
    /// Destination object name (or name prefix for directories).
    pub obj_name: String,
    pub recursive: bool,
    pub overwrite_dst: bool,
    pub delete_src: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PutMirrorArgs {
    pub object: ObjectRef,
}

/// Options of a bucket-to-bucket copy or transform.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CopyBckMsg {
    pub prefix: String,
    /// Prepended to every destination object name.
    pub prepend: String,
    pub dry_run: bool,
    pub force: bool,
    /// Transform to apply; required for `etl-bck`, forbidden for `copy-bck`.
    pub transform: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TcbArgs {
    pub bck_from: Bck,
    pub bck_to: Bck,
    #[cfg_attr(feature = "serde", serde(default))]
    pub msg: CopyBckMsg,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DsortArgs {
    pub bck_from: Bck,
    pub bck_to: Bck,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BckRenameArgs {
    pub phase: ActionPhase,
    pub reb_id: RebId,
    pub bck_from: Bck,
    pub bck_to: Bck,
}

/// List-objects request as received from the client.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct LsoMsg {
    pub prefix: String,
    /// Zero selects the backend default.
    pub page_size: u32,
    pub continuation_token: String,
    /// Object properties to include in each entry.
    pub props: Vec<String>,
    pub flags: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LsoArgs {
    pub msg: LsoMsg,
    /// Request headers, lower-cased names.
    #[cfg_attr(feature = "serde", serde(default))]
    pub hdr: BTreeMap<String, String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GetBatchArgs {
    /// This node assembles the batch (as opposed to only contributing).
    pub designated: bool,
}

/// Closed per-kind payload.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "type", content = "args"))]
pub enum CustomArgs {
    /// Kinds without custom arguments (load-lom-cache).
    None,
    EcEncode(EcEncodeArgs),
    MakeNCopies(MncArgs),
    Promote(PromoteArgs),
    PutMirror(PutMirrorArgs),
    Tcb(TcbArgs),
    Dsort(DsortArgs),
    BckRename(BckRenameArgs),
    Lso(LsoArgs),
    GetBatch(GetBatchArgs),
}

impl CustomArgs {
    pub fn type_name(&self) -> &'static str {
        match self {
            CustomArgs::None => "empty",
            CustomArgs::EcEncode(_) => "ec-encode",
            CustomArgs::MakeNCopies(_) => "make-n-copies",
            CustomArgs::Promote(_) => "promote",
            CustomArgs::PutMirror(_) => "put-mirror",
            CustomArgs::Tcb(_) => "transform/copy",
            CustomArgs::Dsort(_) => "dsort",
            CustomArgs::BckRename(_) => "bucket-rename",
            CustomArgs::Lso(_) => "list-objects",
            CustomArgs::GetBatch(_) => "get-batch",
        }
    }

    /// Checks that the payload belongs to `kind` and that its fields are
    /// well formed.
    pub fn validate_for(&self, kind: XactKind) -> Result<()> {
        let mismatch = || ModelError::KindMismatch {
            kind,
            payload: self.type_name(),
        };

        match (kind, self) {
            (XactKind::LoadLomCache, CustomArgs::None) => Ok(()),
            (XactKind::EcEncode, CustomArgs::EcEncode(_)) => Ok(()),
            (XactKind::MakeNCopies, CustomArgs::MakeNCopies(args)) => {
                if args.copies == 0 || args.copies > MAX_MIRROR_COPIES {
                    return Err(ModelError::invalid(
                        kind,
                        format!(
                            "copies must be within 1..={MAX_MIRROR_COPIES}, got {}",
                            args.copies
                        ),
                    ));
                }
                Ok(())
            }
            (XactKind::Promote, CustomArgs::Promote(args)) => {
                if args.src_fqn.as_os_str().is_empty() {
                    return Err(ModelError::invalid(kind, "empty source path"));
                }
                Ok(())
            }
            (XactKind::PutCopies, CustomArgs::PutMirror(args)) => {
                if args.object.name.is_empty() {
                    return Err(ModelError::invalid(kind, "empty object name"));
                }
                Ok(())
            }
            (XactKind::CopyBck | XactKind::EtlBck, CustomArgs::Tcb(args)) => {
                if args.bck_from == args.bck_to {
                    return Err(ModelError::invalid(
                        kind,
                        format!("cannot copy {} onto itself", args.bck_from),
                    ));
                }
                let has_transform = args
                    .msg
                    .transform
                    .as_deref()
                    .is_some_and(|name| !name.trim().is_empty());
                match (kind, has_transform) {
                    (XactKind::EtlBck, false) => Err(ModelError::invalid(
                        kind,
                        "transform name is required",
                    )),
                    (XactKind::CopyBck, true) => Err(ModelError::invalid(
                        kind,
                        "plain copy does not take a transform",
                    )),
                    _ => Ok(()),
                }
            }
            (XactKind::Dsort, CustomArgs::Dsort(_)) => Ok(()),
            (XactKind::MoveBck, CustomArgs::BckRename(args)) => {
                if args.bck_from == args.bck_to {
                    return Err(ModelError::invalid(
                        kind,
                        format!("cannot rename {} to itself", args.bck_from),
                    ));
                }
                if !args.reb_id.is_valid() {
                    return Err(ModelError::invalid(
                        kind,
                        format!("invalid rebalance id {}", args.reb_id),
                    ));
                }
                Ok(())
            }
            (XactKind::List, CustomArgs::Lso(args)) => {
                if args.msg.page_size > MAX_LIST_PAGE_SIZE {
                    return Err(ModelError::invalid(
                        kind,
                        format!(
                            "page size {} exceeds {MAX_LIST_PAGE_SIZE}",
                            args.msg.page_size
                        ),
                    ));
                }
                Ok(())
            }
            (XactKind::GetBatch, CustomArgs::GetBatch(_)) => Ok(()),
            _ => Err(mismatch()),
        }
    }
}

/// Arguments handed to a factory: optional caller id plus the payload.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct XactArgs {
    #[cfg_attr(feature = "serde", serde(default))]
    pub uuid: Option<XactId>,
    pub custom: CustomArgs,
}

impl XactArgs {
    pub fn new(uuid: Option<XactId>, custom: CustomArgs) -> Self {
        Self { uuid, custom }
    }

    pub fn empty(uuid: Option<XactId>) -> Self {
        Self::new(uuid, CustomArgs::None)
    }
}
