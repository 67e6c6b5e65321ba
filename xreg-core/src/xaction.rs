//! Job handle, lifecycle state machine, and the execution-body contract.
//!
//! A handle moves `Admitted -> Running -> {Finished | Aborted}`. The terminal
//! transition is a single compare-and-set on the status channel, so it
//! happens exactly once no matter how many parties race to finish or abort;
//! the winner releases the handle from the live index and publishes the
//! terminal event.

use std::{
    fmt,
    panic::AssertUnwindSafe,
    sync::{Arc, OnceLock, Weak},
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::FutureExt;
use tokio::sync::watch;
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};
use tracing::{Instrument, debug, info, info_span, warn};
use xreg_model::{Bck, XactArgs, XactId, XactKind};

use crate::error::{Result, XactError};
use crate::registry::Tracker;

/// Lifecycle state of an extended action.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum XactStatus {
    Admitted,
    Running,
    Finished,
    Aborted { reason: String },
}

impl XactStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, XactStatus::Finished | XactStatus::Aborted { .. })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            XactStatus::Admitted => "admitted",
            XactStatus::Running => "running",
            XactStatus::Finished => "finished",
            XactStatus::Aborted { .. } => "aborted",
        }
    }
}

impl fmt::Display for XactStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            XactStatus::Aborted { reason } => write!(f, "aborted: {reason}"),
            other => f.write_str(other.as_str()),
        }
    }
}

/// Execution body of one job kind. Returning `Ok` finishes the job, an error
/// aborts it with the error text as the reason. Bodies should watch
/// [`XactContext::cancelled`]; a cancelled body is dropped at its next await.
#[async_trait]
pub trait XactBody: Send + 'static {
    async fn run(self: Box<Self>, ctx: XactContext) -> Result<()>;
}

/// What a running body sees of its own job.
#[derive(Clone, Debug)]
pub struct XactContext {
    xact: XactHandle,
    token: CancellationToken,
}

impl XactContext {
    pub fn xact(&self) -> &XactHandle {
        &self.xact
    }

    pub fn args(&self) -> &XactArgs {
        self.xact.args()
    }

    pub fn bck(&self) -> &Bck {
        self.xact.bck()
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.token.cancelled()
    }
}

pub type XactHandle = Arc<Xact>;

/// A live (or finished) extended action.
pub struct Xact {
    kind: XactKind,
    id: XactId,
    bck: Bck,
    /// Primary bucket first, then related buckets; no duplicates.
    buckets: Vec<Bck>,
    args: Arc<XactArgs>,
    status: watch::Sender<XactStatus>,
    cancel: CancellationToken,
    created_at: DateTime<Utc>,
    ended_at: OnceLock<DateTime<Utc>>,
    tracker: Weak<Tracker>,
}

impl fmt::Debug for Xact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Xact")
            .field("kind", &self.kind)
            .field("id", &self.id)
            .field("bck", &self.bck)
            .field("buckets", &self.buckets)
            .field("status", &*self.status.borrow())
            .field("created_at", &self.created_at)
            .field("ended_at", &self.ended_at.get())
            .finish()
    }
}

impl Xact {
    pub(crate) fn new(
        kind: XactKind,
        id: XactId,
        bck: Bck,
        buckets: Vec<Bck>,
        args: Arc<XactArgs>,
        cancel: CancellationToken,
        tracker: Weak<Tracker>,
    ) -> Self {
        let (status, _) = watch::channel(XactStatus::Admitted);
        Self {
            kind,
            id,
            bck,
            buckets,
            args,
            status,
            cancel,
            created_at: Utc::now(),
            ended_at: OnceLock::new(),
            tracker,
        }
    }

    pub fn kind(&self) -> XactKind {
        self.kind
    }

    pub fn id(&self) -> &XactId {
        &self.id
    }

    pub fn bck(&self) -> &Bck {
        &self.bck
    }

    /// Conflict set: primary bucket plus related buckets.
    pub fn buckets(&self) -> &[Bck] {
        &self.buckets
    }

    pub fn args(&self) -> &XactArgs {
        &self.args
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.ended_at.get().copied()
    }

    pub fn status(&self) -> XactStatus {
        self.status.borrow().clone()
    }

    /// True until the job reaches a terminal state.
    pub fn is_running(&self) -> bool {
        !self.status.borrow().is_terminal()
    }

    pub fn touches(&self, bck: &Bck) -> bool {
        self.buckets.contains(bck)
    }

    pub fn conflicts_with(&self, buckets: &[Bck]) -> bool {
        buckets.iter().any(|bck| self.touches(bck))
    }

    /// Resolves once the job is finished or aborted.
    pub async fn wait(&self) -> XactStatus {
        let mut rx = self.status.subscribe();
        match rx.wait_for(XactStatus::is_terminal).await {
            Ok(status) => status.clone(),
            // sender lives in `self`; unreachable while we hold `&self`
            Err(_) => self.status(),
        }
    }

    /// Like [`Xact::wait`], mapping an abort to an error.
    pub async fn result(&self) -> Result<()> {
        match self.wait().await {
            XactStatus::Aborted { reason } => Err(XactError::Aborted {
                id: self.id.clone(),
                reason,
            }),
            _ => Ok(()),
        }
    }

    /// Aborts the job. Returns false when it had already terminated.
    pub fn abort(&self, reason: impl Into<String>) -> bool {
        self.terminate(XactStatus::Aborted {
            reason: reason.into(),
        })
    }

    pub(crate) fn finish(&self) -> bool {
        self.terminate(XactStatus::Finished)
    }

    /// `Admitted -> Running`; fails when the job was aborted before start.
    pub(crate) fn mark_running(&self) -> bool {
        self.status.send_if_modified(|status| {
            if *status == XactStatus::Admitted {
                *status = XactStatus::Running;
                return true;
            }
            false
        })
    }

    fn terminate(&self, next: XactStatus) -> bool {
        let terminal = next.clone();
        let changed = self.status.send_if_modified(|status| {
            if status.is_terminal() {
                return false;
            }
            // set before waiters wake on the new status
            let _ = self.ended_at.set(Utc::now());
            *status = next;
            true
        });
        if !changed {
            return false;
        }

        self.cancel.cancel();

        match &terminal {
            XactStatus::Aborted { reason } => warn!(
                target: "xreg::xact",
                kind = %self.kind,
                xact_id = %self.id,
                bucket = %self.bck,
                %reason,
                "xaction aborted"
            ),
            _ => info!(
                target: "xreg::xact",
                kind = %self.kind,
                xact_id = %self.id,
                bucket = %self.bck,
                "xaction finished"
            ),
        }

        if let Some(tracker) = self.tracker.upgrade() {
            tracker.release(self, &terminal);
        }
        true
    }
}

/// Starts the body on its own task. Does nothing when the job was aborted
/// between admission and start.
pub(crate) fn spawn(xact: &XactHandle, body: Box<dyn XactBody>) {
    if !xact.mark_running() {
        debug!(
            target: "xreg::xact",
            kind = %xact.kind(),
            xact_id = %xact.id(),
            "xaction terminated before start; dropping body"
        );
        return;
    }

    let xact = Arc::clone(xact);
    let token = xact.cancel.clone();
    let ctx = XactContext {
        xact: Arc::clone(&xact),
        token: token.clone(),
    };
    let span = info_span!("xact", kind = %xact.kind(), xact_id = %xact.id());

    tokio::spawn(
        async move {
            let run = AssertUnwindSafe(body.run(ctx)).catch_unwind();
            let outcome = tokio::select! {
                biased;
                _ = token.cancelled() => None,
                res = run => Some(res),
            };
            match outcome {
                None => {
                    xact.abort("cancelled");
                }
                Some(Ok(Ok(()))) => {
                    xact.finish();
                }
                Some(Ok(Err(err))) => {
                    xact.abort(err.to_string());
                }
                Some(Err(_)) => {
                    xact.abort("execution body panicked");
                }
            }
        }
        .instrument(span),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detached(kind: XactKind, bck: Bck) -> Xact {
        Xact::new(
            kind,
            XactId::generate(),
            bck.clone(),
            vec![bck],
            Arc::new(XactArgs::empty(None)),
            CancellationToken::new(),
            Weak::new(),
        )
    }

    #[test]
    fn terminal_transition_happens_once() {
        let xact = detached(XactKind::LoadLomCache, Bck::ais("b1"));
        assert!(xact.mark_running());
        assert!(xact.finish());
        assert!(!xact.finish());
        assert!(!xact.abort("late"));
        assert_eq!(xact.status(), XactStatus::Finished);
        assert!(xact.ended_at().is_some());
        assert!(xact.cancel.is_cancelled());
    }

    #[test]
    fn aborted_before_start_never_runs() {
        let xact = detached(XactKind::LoadLomCache, Bck::ais("b1"));
        assert!(xact.abort("bucket deleted"));
        assert!(!xact.mark_running());
        assert!(!xact.is_running());
        assert_eq!(xact.status().to_string(), "aborted: bucket deleted");
    }

    #[test]
    fn conflict_is_any_shared_bucket() {
        let mut xact = detached(XactKind::CopyBck, Bck::ais("dst"));
        xact.buckets = vec![Bck::ais("dst"), Bck::ais("src")];
        assert!(xact.conflicts_with(&[Bck::ais("other"), Bck::ais("dst")]));
        assert!(xact.conflicts_with(&[Bck::ais("src")]));
        assert!(!xact.conflicts_with(&[Bck::ais("other")]));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn woken_waiter_sees_end_time() {
        for _ in 0..64 {
            let xact =
                Arc::new(detached(XactKind::LoadLomCache, Bck::ais("b1")));
            xact.mark_running();
            let waiter = {
                let xact = Arc::clone(&xact);
                tokio::spawn(async move {
                    let status = xact.wait().await;
                    (status, xact.ended_at())
                })
            };
            tokio::task::yield_now().await;
            xact.finish();
            let (status, ended_at) = waiter.await.expect("waiter joined");
            assert_eq!(status, XactStatus::Finished);
            assert!(ended_at.is_some());
        }
    }

    #[tokio::test]
    async fn wait_resolves_with_terminal_status() {
        let xact = Arc::new(detached(XactKind::LoadLomCache, Bck::ais("b1")));
        let waiter = {
            let xact = Arc::clone(&xact);
            tokio::spawn(async move { xact.wait().await })
        };
        xact.mark_running();
        xact.abort("disk gone");
        let status = waiter.await.expect("waiter joined");
        assert_eq!(
            status,
            XactStatus::Aborted {
                reason: "disk gone".into()
            }
        );
        assert!(xact.result().await.is_err());
    }
}
