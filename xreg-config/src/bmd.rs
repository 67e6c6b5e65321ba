use anyhow::{Context, bail};
use std::{fs, path::Path};
use tracing::debug;
use xreg_model::BucketMetadata;

/// Reads a JSON bucket-metadata snapshot, e.g. one exported by the metadata
/// owner for an offline sweep.
pub fn load_bucket_metadata(path: &Path) -> anyhow::Result<BucketMetadata> {
    let contents = fs::read_to_string(path).with_context(|| {
        format!("failed to read bucket metadata from {}", path.display())
    })?;
    let bmd: BucketMetadata = serde_json::from_str(&contents)
        .with_context(|| format!("invalid bucket metadata {}", path.display()))?;

    if bmd.version < 0 {
        bail!(
            "bucket metadata {} has negative version {}",
            path.display(),
            bmd.version
        );
    }

    debug!(
        target: "xreg::config",
        path = %path.display(),
        version = bmd.version,
        buckets = bmd.len(),
        "loaded bucket metadata"
    );
    Ok(bmd)
}
