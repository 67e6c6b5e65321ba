//! Registry core: the live-job index and the two renewal protocols.
//!
//! Scope renewals serialize per kind on the `by_kind` entry, ID renewals per
//! id on the `by_id` entry. In both cases check-conflict and insert happen
//! under one shard lock, so two racing renewals can never both admit.
//! Neither path holds a lock while a handle transitions, and removal takes
//! the two maps one after the other, never nested.

use std::{
    collections::HashMap,
    fmt, ptr,
    sync::Arc,
};

use chrono::{DateTime, Utc};
use dashmap::{DashMap, mapref::entry::Entry};
use serde::Serialize;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use xreg_model::{Bck, RenewMode, XactArgs, XactId, XactKind, XactScope};

use crate::config::RegistryConfig;
use crate::error::{Result, XactError};
use crate::events::{XactEvent, XactEventBus, XactEventPayload};
use crate::factory::{Candidate, Renewable};
use crate::xaction::{self, Xact, XactHandle, XactStatus};

/// How a renewal was resolved.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RenewOutcome {
    /// The candidate was registered and started.
    Admitted,
    /// An equivalent job was already running; the candidate was dropped.
    Joined,
}

/// Result of a successful renewal: the resolved handle and how it was
/// resolved.
#[derive(Clone, Debug)]
pub struct Renewal {
    pub xact: XactHandle,
    pub outcome: RenewOutcome,
}

impl Renewal {
    pub fn is_admitted(&self) -> bool {
        self.outcome == RenewOutcome::Admitted
    }

    pub fn is_joined(&self) -> bool {
        self.outcome == RenewOutcome::Joined
    }

    pub fn is_running(&self) -> bool {
        self.xact.is_running()
    }

    pub fn into_xact(self) -> XactHandle {
        self.xact
    }
}

pub type RenewResult = Result<Renewal>;

#[derive(Debug, Default)]
struct LiveIndex {
    /// Scope-renewed jobs, per kind.
    by_kind: DashMap<XactKind, Vec<XactHandle>>,
    /// ID-renewed jobs.
    by_id: DashMap<XactId, XactHandle>,
}

impl LiveIndex {
    fn remove(&self, xact: &Xact) {
        if let Some(mut live) = self.by_kind.get_mut(&xact.kind()) {
            live.retain(|other| !ptr::eq(Arc::as_ptr(other), xact));
        }
        self.by_id
            .remove_if(xact.id(), |_, other| ptr::eq(Arc::as_ptr(other), xact));
    }

    /// Running handles, cloned out so callers never act under a shard lock.
    fn running(&self) -> Vec<XactHandle> {
        let mut out: Vec<XactHandle> = self
            .by_kind
            .iter()
            .flat_map(|entry| {
                entry
                    .value()
                    .iter()
                    .filter(|xact| xact.is_running())
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .collect();
        out.extend(
            self.by_id
                .iter()
                .filter(|entry| entry.value().is_running())
                .map(|entry| Arc::clone(entry.value())),
        );
        out
    }
}

/// State shared between the registry and its handles: handles release
/// themselves through a weak reference on terminal transition.
#[derive(Debug)]
pub(crate) struct Tracker {
    index: LiveIndex,
    events: XactEventBus,
}

impl Tracker {
    pub(crate) fn release(&self, xact: &Xact, terminal: &XactStatus) {
        self.index.remove(xact);
        let payload = match terminal {
            XactStatus::Aborted { reason } => XactEventPayload::Aborted {
                reason: reason.clone(),
            },
            _ => XactEventPayload::Finished,
        };
        self.events.publish(XactEvent::from_xact(xact, payload));
    }
}

/// Bootstrap phase: registers one factory per kind, then seals the map.
pub struct RegistryBuilder {
    config: RegistryConfig,
    factories: HashMap<XactKind, Arc<dyn Renewable>>,
}

impl fmt::Debug for RegistryBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<_> = self.factories.keys().copied().collect();
        kinds.sort();
        f.debug_struct("RegistryBuilder")
            .field("config", &self.config)
            .field("kinds", &kinds)
            .finish()
    }
}

impl RegistryBuilder {
    pub fn new(config: RegistryConfig) -> Self {
        Self {
            config,
            factories: HashMap::new(),
        }
    }

    /// Registers the factory for its kind. Each kind registers once, and
    /// only bucket-scoped kinds are accepted.
    pub fn register(&mut self, factory: Arc<dyn Renewable>) -> Result<()> {
        let kind = factory.kind();
        let scope = factory.scope();
        if scope == XactScope::Global {
            return Err(XactError::UnsupportedScope { kind, scope });
        }
        if self.factories.contains_key(&kind) {
            return Err(XactError::DuplicateKind(kind));
        }
        self.factories.insert(kind, factory);
        Ok(())
    }

    pub fn with(mut self, factory: Arc<dyn Renewable>) -> Result<Self> {
        self.register(factory)?;
        Ok(self)
    }

    /// Seals the factory map. The builder is consumed, so nothing can be
    /// registered once the registry serves renewals.
    pub fn build(self) -> Arc<Registry> {
        let missing: Vec<_> = XactKind::ALL
            .iter()
            .filter(|kind| !self.factories.contains_key(kind))
            .map(XactKind::as_str)
            .collect();
        if !missing.is_empty() {
            debug!(
                target: "xreg::registry",
                ?missing,
                "registry sealed without factories for some kinds"
            );
        }

        let tracker = Arc::new(Tracker {
            index: LiveIndex::default(),
            events: XactEventBus::new(self.config.event_capacity),
        });
        Arc::new(Registry {
            config: self.config,
            factories: self.factories,
            tracker,
            shutdown: CancellationToken::new(),
        })
    }
}

/// Per-kind counters sampled from the live index.
#[derive(Clone, Debug, Serialize)]
pub struct RegistrySnapshot {
    pub sampled_at: DateTime<Utc>,
    pub running: HashMap<XactKind, usize>,
}

impl RegistrySnapshot {
    pub fn total(&self) -> usize {
        self.running.values().sum()
    }

    pub fn count(&self, kind: XactKind) -> usize {
        self.running.get(&kind).copied().unwrap_or_default()
    }
}

/// Process-lifetime coordination object. Build it once with
/// [`Registry::builder`] and share the returned `Arc`.
///
/// Renewals spawn job bodies with `tokio::spawn` and must therefore be
/// called from within a Tokio runtime.
pub struct Registry {
    config: RegistryConfig,
    factories: HashMap<XactKind, Arc<dyn Renewable>>,
    tracker: Arc<Tracker>,
    shutdown: CancellationToken,
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<_> = self.factories.keys().copied().collect();
        kinds.sort();
        f.debug_struct("Registry")
            .field("config", &self.config)
            .field("kinds", &kinds)
            .field("index", &self.tracker.index)
            .field("shutdown", &self.shutdown.is_cancelled())
            .finish()
    }
}

impl Registry {
    pub fn builder(config: RegistryConfig) -> RegistryBuilder {
        RegistryBuilder::new(config)
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Factory for `kind`.
    ///
    /// # Panics
    ///
    /// When no factory was registered for `kind`. Kinds are registered
    /// exhaustively at bootstrap, so a miss is a wiring bug.
    pub fn factory(&self, kind: XactKind) -> &Arc<dyn Renewable> {
        match self.factories.get(&kind) {
            Some(factory) => factory,
            None => panic!(
                "no factory registered for xaction kind {kind}; \
                 every kind must be registered at bootstrap"
            ),
        }
    }

    pub fn new_candidate(
        &self,
        kind: XactKind,
        args: XactArgs,
        bck: &Bck,
    ) -> Result<Candidate> {
        let candidate = self.factory(kind).new_candidate(args, bck);
        if let Err(err) = &candidate {
            warn!(
                target: "xreg::registry",
                %kind,
                bucket = %bck,
                error = %err,
                "failed to construct xaction"
            );
        }
        candidate
    }

    /// Admits `candidate` unless a running job of the same kind touches any
    /// bucket of `{bck} ∪ related`, in which case that job is joined.
    pub fn renew_by_scope(
        &self,
        candidate: Candidate,
        bck: &Bck,
        related: &[Bck],
    ) -> RenewResult {
        let kind = candidate.kind();
        if !kind.supports(RenewMode::Scope) {
            return Err(XactError::UnsupportedRenewal {
                kind,
                mode: RenewMode::Scope,
            });
        }

        let mut buckets = Vec::with_capacity(1 + related.len());
        buckets.push(bck.clone());
        for other in related {
            if !buckets.contains(other) {
                buckets.push(other.clone());
            }
        }
        let (xact, body) = candidate.into_xact(
            buckets,
            self.shutdown.child_token(),
            Arc::downgrade(&self.tracker),
        );

        let existing = {
            let mut live = self.tracker.index.by_kind.entry(kind).or_default();
            live.retain(|other| other.is_running());
            match live.iter().find(|other| other.conflicts_with(xact.buckets()))
            {
                Some(other) => Some(Arc::clone(other)),
                None => {
                    live.push(Arc::clone(&xact));
                    self.publish_admitted(&xact);
                    None
                }
            }
        };

        match existing {
            Some(other) => Ok(self.join(other)),
            None => Ok(self.start(xact, body)),
        }
    }

    /// Admits `candidate` unless a running ID-renewed job carries the same
    /// id, in which case that job is joined. Bucket and kind play no part.
    pub fn renew_by_id(&self, candidate: Candidate) -> RenewResult {
        let kind = candidate.kind();
        if !kind.supports(RenewMode::Id) {
            return Err(XactError::UnsupportedRenewal {
                kind,
                mode: RenewMode::Id,
            });
        }

        let bck = candidate.bck().clone();
        let (xact, body) = candidate.into_xact(
            vec![bck],
            self.shutdown.child_token(),
            Arc::downgrade(&self.tracker),
        );

        let existing = match self.tracker.index.by_id.entry(xact.id().clone())
        {
            Entry::Occupied(mut entry) if !entry.get().is_running() => {
                // terminal but not yet released: treat as absent
                entry.insert(Arc::clone(&xact));
                self.publish_admitted(&xact);
                None
            }
            Entry::Occupied(entry) => Some(Arc::clone(entry.get())),
            Entry::Vacant(entry) => {
                entry.insert(Arc::clone(&xact));
                self.publish_admitted(&xact);
                None
            }
        };

        match existing {
            Some(other) => Ok(self.join(other)),
            None => Ok(self.start(xact, body)),
        }
    }

    /// Runs under the index entry lock, so no join, abort or terminal event
    /// of this job can be published ahead of it.
    fn publish_admitted(&self, xact: &Xact) {
        self.tracker
            .events
            .publish(XactEvent::from_xact(xact, XactEventPayload::Admitted));
    }

    fn start(
        &self,
        xact: XactHandle,
        body: Box<dyn xaction::XactBody>,
    ) -> Renewal {
        debug!(
            target: "xreg::registry",
            kind = %xact.kind(),
            xact_id = %xact.id(),
            bucket = %xact.bck(),
            "admitted xaction"
        );
        xaction::spawn(&xact, body);
        Renewal {
            xact,
            outcome: RenewOutcome::Admitted,
        }
    }

    fn join(&self, xact: XactHandle) -> Renewal {
        debug!(
            target: "xreg::registry",
            kind = %xact.kind(),
            xact_id = %xact.id(),
            bucket = %xact.bck(),
            "joined running xaction"
        );
        self.tracker
            .events
            .publish(XactEvent::from_xact(&xact, XactEventPayload::Joined));
        Renewal {
            xact,
            outcome: RenewOutcome::Joined,
        }
    }

    /// Running job with the given id.
    pub fn get(&self, id: &XactId) -> Option<XactHandle> {
        if let Some(xact) = self.tracker.index.by_id.get(id)
            && xact.is_running()
        {
            return Some(Arc::clone(xact.value()));
        }
        self.tracker
            .index
            .running()
            .into_iter()
            .find(|xact| xact.id() == id)
    }

    /// Running jobs, optionally narrowed to a kind and to jobs touching a
    /// bucket.
    pub fn find_running(
        &self,
        kind: Option<XactKind>,
        bck: Option<&Bck>,
    ) -> Vec<XactHandle> {
        self.tracker
            .index
            .running()
            .into_iter()
            .filter(|xact| kind.is_none_or(|kind| xact.kind() == kind))
            .filter(|xact| bck.is_none_or(|bck| xact.touches(bck)))
            .collect()
    }

    pub fn is_running(&self, kind: XactKind, bck: &Bck) -> bool {
        !self.find_running(Some(kind), Some(bck)).is_empty()
    }

    /// Aborts every running job carrying `id`. Scope-renewed jobs may share
    /// an id (one sweep id covers all the buckets it mirrors), so this can
    /// hit more than one job. Returns how many jobs this call aborted.
    pub fn abort(&self, id: &XactId, reason: &str) -> usize {
        self.tracker
            .index
            .running()
            .into_iter()
            .filter(|xact| xact.id() == id)
            .filter(|xact| xact.abort(reason))
            .count()
    }

    /// Aborts every running job touching `bck` (e.g. the bucket is being
    /// destroyed). Returns how many jobs this call aborted.
    pub fn abort_by_bucket(&self, bck: &Bck, reason: &str) -> usize {
        let aborted = self
            .find_running(None, Some(bck))
            .into_iter()
            .filter(|xact| xact.abort(reason))
            .count();
        if aborted > 0 {
            info!(target: "xreg::registry", bucket = %bck, aborted, %reason, "aborted xactions");
        }
        aborted
    }

    pub fn abort_all(&self, reason: &str) -> usize {
        self.tracker
            .index
            .running()
            .into_iter()
            .filter(|xact| xact.abort(reason))
            .count()
    }

    /// Aborts everything and cancels background loops such as the sweeper.
    pub fn shutdown(&self) {
        let aborted = self.abort_all("registry shutdown");
        self.shutdown.cancel();
        info!(target: "xreg::registry", aborted, "registry shut down");
    }

    pub(crate) fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<XactEvent> {
        self.tracker.events.subscribe()
    }

    pub fn snapshot(&self) -> RegistrySnapshot {
        let mut running: HashMap<XactKind, usize> = HashMap::new();
        for xact in self.tracker.index.running() {
            *running.entry(xact.kind()).or_default() += 1;
        }
        RegistrySnapshot {
            sampled_at: Utc::now(),
            running,
        }
    }
}
