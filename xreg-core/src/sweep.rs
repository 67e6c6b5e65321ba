//! Make-N-copies fan-out: (re)start mirroring on every bucket whose
//! metadata asks for it.

use std::{
    fmt,
    sync::{Arc, PoisonError, RwLock},
    time::Duration,
};

use serde::Serialize;
use tokio::{
    task::JoinHandle,
    time::{MissedTickBehavior, interval},
};
use tracing::{debug, info, warn};
use xreg_model::{
    BucketMetadata, BucketRecord, Namespace, Provider, XactId,
};

use crate::registry::{Registry, RenewOutcome};

/// Supplies the bucket metadata the periodic sweeper walks. Implementations
/// hand out a snapshot; the sweep never sees metadata change under it.
pub trait BucketMetadataSource: Send + Sync {
    fn snapshot(&self) -> Arc<BucketMetadata>;
}

/// Metadata source backed by a replaceable in-memory snapshot.
pub struct StaticBucketMetadata {
    current: RwLock<Arc<BucketMetadata>>,
}

impl fmt::Debug for StaticBucketMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let current = self.snapshot();
        f.debug_struct("StaticBucketMetadata")
            .field("version", &current.version)
            .field("buckets", &current.len())
            .finish()
    }
}

impl StaticBucketMetadata {
    pub fn new(bmd: BucketMetadata) -> Self {
        Self {
            current: RwLock::new(Arc::new(bmd)),
        }
    }

    pub fn replace(&self, bmd: BucketMetadata) {
        let mut current =
            self.current.write().unwrap_or_else(PoisonError::into_inner);
        *current = Arc::new(bmd);
    }
}

impl BucketMetadataSource for StaticBucketMetadata {
    fn snapshot(&self) -> Arc<BucketMetadata> {
        let current =
            self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&current)
    }
}

/// Outcome counters of one sweep.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub admitted: usize,
    pub joined: usize,
    pub failed: usize,
}

impl SweepReport {
    pub fn visited(&self) -> usize {
        self.admitted + self.joined + self.failed
    }
}

impl Registry {
    /// Renews a make-N-copies job for every mirror-enabled bucket: local
    /// buckets in any namespace first, then each configured remote backend
    /// within its namespace.
    ///
    /// Per-bucket failures are logged and counted; they never stop the
    /// sweep. Repeating the sweep is harmless: buckets already mirroring are
    /// joined, not restarted.
    pub fn renew_make_n_copies(
        &self,
        bmd: &BucketMetadata,
        uuid: Option<&XactId>,
        tag: &str,
    ) -> SweepReport {
        let mut report = SweepReport::default();

        self.sweep_range(bmd, Provider::Ais, None, uuid, tag, &mut report);
        for (provider, ns) in &self.config().backends.providers {
            if !provider.is_remote_backend() {
                continue;
            }
            self.sweep_range(bmd, *provider, Some(ns), uuid, tag, &mut report);
        }

        debug!(
            target: "xreg::sweep",
            bmd_version = bmd.version,
            admitted = report.admitted,
            joined = report.joined,
            failed = report.failed,
            "make-n-copies sweep done"
        );
        report
    }

    fn sweep_range(
        &self,
        bmd: &BucketMetadata,
        provider: Provider,
        ns: Option<&Namespace>,
        uuid: Option<&XactId>,
        tag: &str,
        report: &mut SweepReport,
    ) {
        let mirrored = bmd
            .range(Some(provider), ns)
            .filter(|record| record.mirror_enabled());
        for record in mirrored {
            self.sweep_bucket(record, uuid, tag, report);
        }
    }

    fn sweep_bucket(
        &self,
        record: &BucketRecord,
        uuid: Option<&XactId>,
        tag: &str,
        report: &mut SweepReport,
    ) {
        let renewal = self.renew_bck_make_n_copies(
            &record.bck,
            uuid.cloned(),
            tag,
            record.props.mirror.copies,
        );
        match renewal {
            Ok(renewal) => match renewal.outcome {
                RenewOutcome::Admitted => report.admitted += 1,
                RenewOutcome::Joined => report.joined += 1,
            },
            Err(err) => {
                report.failed += 1;
                warn!(
                    target: "xreg::sweep",
                    bucket = %record.bck,
                    error = %err,
                    "skipping bucket in make-n-copies sweep"
                );
            }
        }
    }

    /// Runs the make-N-copies sweep every `sweep.interval_ms` until the
    /// registry shuts down or is dropped. Returns `None` when sweeping is
    /// disabled.
    pub fn spawn_sweeper(
        self: &Arc<Self>,
        source: Arc<dyn BucketMetadataSource>,
    ) -> Option<JoinHandle<()>> {
        let sweep = self.config().sweep.clone();
        if !sweep.enabled {
            info!(target: "xreg::sweep", "periodic make-n-copies sweep disabled");
            return None;
        }

        let registry = Arc::downgrade(self);
        let shutdown = self.shutdown_token();
        let period = Duration::from_millis(sweep.interval_ms.max(1));

        Some(tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        let Some(registry) = registry.upgrade() else {
                            break;
                        };
                        let bmd = source.snapshot();
                        registry.renew_make_n_copies(&bmd, None, &sweep.tag);
                    }
                }
            }
            debug!(target: "xreg::sweep", "periodic make-n-copies sweep stopped");
        }))
    }
}
