//! Read-only bucket metadata snapshot.

use crate::bucket::{Bck, BucketProps, Namespace, Provider};

/// One bucket and the properties the registry cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BucketRecord {
    pub bck: Bck,
    #[cfg_attr(feature = "serde", serde(default))]
    pub props: BucketProps,
}

impl BucketRecord {
    pub fn new(bck: Bck, props: BucketProps) -> Self {
        Self { bck, props }
    }

    pub fn mirror_enabled(&self) -> bool {
        self.props.mirror.enabled
    }
}

/// Versioned snapshot of cluster bucket metadata.
///
/// Replication and versioning belong to the metadata owner; the registry
/// only ever reads a snapshot it was handed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct BucketMetadata {
    pub version: i64,
    pub buckets: Vec<BucketRecord>,
}

impl BucketMetadata {
    pub fn new(version: i64, buckets: Vec<BucketRecord>) -> Self {
        Self { version, buckets }
    }

    /// Buckets matching the provider and namespace filters, in snapshot
    /// order. `None` matches everything.
    pub fn range<'a>(
        &'a self,
        provider: Option<Provider>,
        ns: Option<&'a Namespace>,
    ) -> impl Iterator<Item = &'a BucketRecord> + 'a {
        self.buckets
            .iter()
            .filter(move |record| record.bck.matches(provider, ns))
    }

    pub fn get(&self, bck: &Bck) -> Option<&BucketRecord> {
        self.buckets.iter().find(|record| record.bck == *bck)
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}
