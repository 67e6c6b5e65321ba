//! Per-kind renewal entry points.
//!
//! Each driver builds the kind's payload, picks primary and related buckets
//! per the kind's scope rule and hands the candidate to the registry core.

use std::collections::BTreeMap;

use xreg_model::{
    ActionPhase, Bck, BckRenameArgs, CustomArgs, DsortArgs, EcEncodeArgs,
    GetBatchArgs, LsoArgs, LsoMsg, MncArgs, ModelError, ObjectRef,
    PromoteArgs, PutMirrorArgs, RebId, RenewMode, TcbArgs, XactArgs, XactId,
    XactKind,
};

use crate::error::XactError;
use crate::registry::{Registry, RenewResult};

impl Registry {
    /// Scope-dedup renewal of any bucket-scoped kind.
    ///
    /// A construction failure returns before the live index is touched.
    /// Kinds that only renew by id are rejected up front.
    pub fn renew_bucket_xact(
        &self,
        kind: XactKind,
        bck: &Bck,
        args: XactArgs,
        related: &[Bck],
    ) -> RenewResult {
        if !kind.supports(RenewMode::Scope) {
            return Err(XactError::UnsupportedRenewal {
                kind,
                mode: RenewMode::Scope,
            });
        }
        let candidate = self.new_candidate(kind, args, bck)?;
        self.renew_by_scope(candidate, bck, related)
    }

    fn renew_bucket_by_id(
        &self,
        kind: XactKind,
        bck: &Bck,
        args: XactArgs,
    ) -> RenewResult {
        let candidate = self.new_candidate(kind, args, bck)?;
        self.renew_by_id(candidate)
    }

    pub fn renew_ec_encode(
        &self,
        bck: &Bck,
        uuid: Option<XactId>,
        phase: ActionPhase,
        recover: bool,
    ) -> RenewResult {
        let args = XactArgs::new(
            uuid,
            CustomArgs::EcEncode(EcEncodeArgs { phase, recover }),
        );
        self.renew_bucket_xact(XactKind::EcEncode, bck, args, &[])
    }

    pub fn renew_bck_make_n_copies(
        &self,
        bck: &Bck,
        uuid: Option<XactId>,
        tag: impl Into<String>,
        copies: u32,
    ) -> RenewResult {
        let args = XactArgs::new(
            uuid,
            CustomArgs::MakeNCopies(MncArgs {
                tag: tag.into(),
                copies,
            }),
        );
        self.renew_bucket_xact(XactKind::MakeNCopies, bck, args, &[])
    }

    pub fn renew_promote(
        &self,
        uuid: Option<XactId>,
        bck: &Bck,
        promote: PromoteArgs,
    ) -> RenewResult {
        let args = XactArgs::new(uuid, CustomArgs::Promote(promote));
        self.renew_bucket_xact(XactKind::Promote, bck, args, &[])
    }

    pub fn renew_bck_load_lom_cache(
        &self,
        uuid: Option<XactId>,
        bck: &Bck,
    ) -> RenewResult {
        self.renew_bucket_xact(
            XactKind::LoadLomCache,
            bck,
            XactArgs::empty(uuid),
            &[],
        )
    }

    /// Replicates one freshly written object; the object's bucket is the
    /// scope, so puts into the same bucket share one mirroring job.
    pub fn renew_put_mirror(&self, object: &ObjectRef) -> RenewResult {
        let bck = object.bck.clone();
        let args = XactArgs::new(
            None,
            CustomArgs::PutMirror(PutMirrorArgs {
                object: object.clone(),
            }),
        );
        self.renew_bucket_xact(XactKind::PutCopies, &bck, args, &[])
    }

    /// Bucket-to-bucket copy (`copy-bck`) or transform (`etl-bck`).
    ///
    /// The destination is the primary bucket and both buckets join the
    /// conflict set: two copies into one destination never run together,
    /// whatever their sources.
    pub fn renew_tcb(
        &self,
        uuid: Option<XactId>,
        kind: XactKind,
        tcb: TcbArgs,
    ) -> RenewResult {
        if !kind.is_transform_or_copy() {
            return Err(ModelError::KindMismatch {
                kind,
                payload: CustomArgs::Tcb(tcb).type_name(),
            }
            .into());
        }
        let bck_to = tcb.bck_to.clone();
        let related = [tcb.bck_from.clone(), tcb.bck_to.clone()];
        let args = XactArgs::new(uuid, CustomArgs::Tcb(tcb));
        self.renew_bucket_xact(kind, &bck_to, args, &related)
    }

    /// Distributed sort: source is primary, both buckets conflict.
    pub fn renew_dsort(&self, id: XactId, dsort: DsortArgs) -> RenewResult {
        let bck_from = dsort.bck_from.clone();
        let related = [dsort.bck_from.clone(), dsort.bck_to.clone()];
        let args = XactArgs::new(Some(id), CustomArgs::Dsort(dsort));
        self.renew_bucket_xact(XactKind::Dsort, &bck_from, args, &related)
    }

    /// Bucket rename keyed on the destination. The source is abandoned once
    /// the rename commits and takes no part in conflicts.
    pub fn renew_bck_rename(
        &self,
        bck_from: &Bck,
        bck_to: &Bck,
        uuid: Option<XactId>,
        rmd_version: i64,
        phase: ActionPhase,
    ) -> RenewResult {
        let args = XactArgs::new(
            uuid,
            CustomArgs::BckRename(BckRenameArgs {
                phase,
                reb_id: RebId::from_version(rmd_version),
                bck_from: bck_from.clone(),
                bck_to: bck_to.clone(),
            }),
        );
        self.renew_bucket_xact(
            XactKind::MoveBck,
            bck_to,
            args,
            std::slice::from_ref(bck_to),
        )
    }

    /// Paginated listing. Every page of one listing carries the same id and
    /// lands on the same job; independent listings of a bucket run side by
    /// side.
    pub fn renew_lso(
        &self,
        bck: &Bck,
        uuid: XactId,
        msg: LsoMsg,
        hdr: BTreeMap<String, String>,
    ) -> RenewResult {
        let args =
            XactArgs::new(Some(uuid), CustomArgs::Lso(LsoArgs { msg, hdr }));
        self.renew_bucket_by_id(XactKind::List, bck, args)
    }

    /// Listing without a resumable request id: one listing per bucket, and
    /// a second caller on the same bucket joins the running one.
    pub fn renew_lso_scoped(
        &self,
        bck: &Bck,
        uuid: Option<XactId>,
        msg: LsoMsg,
        hdr: BTreeMap<String, String>,
    ) -> RenewResult {
        let args = XactArgs::new(uuid, CustomArgs::Lso(LsoArgs { msg, hdr }));
        self.renew_bucket_xact(XactKind::List, bck, args, &[])
    }

    pub fn renew_get_batch(
        &self,
        bck: &Bck,
        uuid: XactId,
        designated: bool,
    ) -> RenewResult {
        let args = XactArgs::new(
            Some(uuid),
            CustomArgs::GetBatch(GetBatchArgs { designated }),
        );
        self.renew_bucket_by_id(XactKind::GetBatch, bck, args)
    }
}
