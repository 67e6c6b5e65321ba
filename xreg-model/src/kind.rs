use std::fmt;

/// Extended-action kinds handled by the bucket registry.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum XactKind {
    /// Erasure-code every object of a bucket.
    EcEncode,
    /// Bring every object of a bucket to the configured number of copies.
    MakeNCopies,
    /// Promote files from a local or shared filesystem into a bucket.
    Promote,
    /// Warm the object-metadata cache of a bucket.
    LoadLomCache,
    /// Replicate a single freshly written object.
    PutCopies,
    /// Bucket-to-bucket copy.
    CopyBck,
    /// Bucket-to-bucket transform.
    EtlBck,
    /// Distributed sort (shuffle) from one bucket into another.
    Dsort,
    /// Bucket rename.
    MoveBck,
    /// Paginated object listing.
    List,
    /// Batched multi-object read.
    GetBatch,
}

/// Buckets that decide whether two jobs of the same kind collide.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum XactScope {
    /// The job touches one bucket.
    Bucket,
    /// The job reads one bucket and writes another.
    BucketPair,
    /// Cluster-wide singleton; never served by the bucket registry.
    Global,
}

/// Which dedup protocol routes renewals of a kind.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RenewMode {
    /// Join any live job of the same kind with an overlapping bucket set.
    Scope,
    /// Join the live job carrying the same caller-supplied id.
    Id,
}

impl XactKind {
    pub const ALL: [XactKind; 11] = [
        XactKind::EcEncode,
        XactKind::MakeNCopies,
        XactKind::Promote,
        XactKind::LoadLomCache,
        XactKind::PutCopies,
        XactKind::CopyBck,
        XactKind::EtlBck,
        XactKind::Dsort,
        XactKind::MoveBck,
        XactKind::List,
        XactKind::GetBatch,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            XactKind::EcEncode => "ec-encode",
            XactKind::MakeNCopies => "make-n-copies",
            XactKind::Promote => "promote",
            XactKind::LoadLomCache => "load-lom-cache",
            XactKind::PutCopies => "put-copies",
            XactKind::CopyBck => "copy-bck",
            XactKind::EtlBck => "etl-bck",
            XactKind::Dsort => "dsort",
            XactKind::MoveBck => "move-bck",
            XactKind::List => "list",
            XactKind::GetBatch => "get-batch",
        }
    }

    pub const fn scope(&self) -> XactScope {
        match self {
            XactKind::EcEncode
            | XactKind::MakeNCopies
            | XactKind::Promote
            | XactKind::LoadLomCache
            | XactKind::PutCopies
            | XactKind::MoveBck
            | XactKind::List
            | XactKind::GetBatch => XactScope::Bucket,
            XactKind::CopyBck | XactKind::EtlBck | XactKind::Dsort => {
                XactScope::BucketPair
            }
        }
    }

    /// Default protocol for renewals of this kind.
    pub const fn renew_mode(&self) -> RenewMode {
        match self {
            XactKind::List | XactKind::GetBatch => RenewMode::Id,
            _ => RenewMode::Scope,
        }
    }

    /// Whether renewals of this kind may go through `mode`. Listing also
    /// runs scope-renewed, one listing per bucket, when the caller has no
    /// request id to resume by.
    pub const fn supports(&self, mode: RenewMode) -> bool {
        match (self, mode) {
            (XactKind::List, _) => true,
            (XactKind::GetBatch, mode) => matches!(mode, RenewMode::Id),
            (_, mode) => matches!(mode, RenewMode::Scope),
        }
    }

    pub const fn is_transform_or_copy(&self) -> bool {
        matches!(self, XactKind::CopyBck | XactKind::EtlBck)
    }
}

impl fmt::Display for XactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_identified_kinds_route_by_id() {
        for kind in XactKind::ALL {
            let expected = matches!(kind, XactKind::List | XactKind::GetBatch);
            assert_eq!(kind.renew_mode() == RenewMode::Id, expected, "{kind}");
        }
    }

    #[test]
    fn only_listing_accepts_both_protocols() {
        assert!(XactKind::List.supports(RenewMode::Scope));
        assert!(XactKind::List.supports(RenewMode::Id));
        assert!(!XactKind::GetBatch.supports(RenewMode::Scope));
        assert!(!XactKind::EcEncode.supports(RenewMode::Id));
        assert!(XactKind::EcEncode.supports(RenewMode::Scope));
    }

    #[test]
    fn no_bucket_kind_is_global() {
        assert!(XactKind::ALL.iter().all(|k| k.scope() != XactScope::Global));
        assert_eq!(XactKind::CopyBck.scope(), XactScope::BucketPair);
        assert_eq!(XactKind::MoveBck.scope(), XactScope::Bucket);
    }
}
