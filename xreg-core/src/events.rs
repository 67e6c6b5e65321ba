use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use xreg_model::{Bck, XactId, XactKind};

use crate::xaction::Xact;

/// Metadata envelope attached to every lifecycle event.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EventMeta {
    pub xact_id: XactId,
    pub kind: XactKind,
    pub bck: Bck,
    pub at: DateTime<Utc>,
}

/// Lifecycle transitions published by the registry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum XactEventPayload {
    Admitted,
    /// A renewal attached to this already-running job.
    Joined,
    Finished,
    Aborted {
        reason: String,
    },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct XactEvent {
    pub meta: EventMeta,
    pub payload: XactEventPayload,
}

impl XactEvent {
    pub fn from_xact(xact: &Xact, payload: XactEventPayload) -> Self {
        Self {
            meta: EventMeta {
                xact_id: xact.id().clone(),
                kind: xact.kind(),
                bck: xact.bck().clone(),
                at: Utc::now(),
            },
            payload,
        }
    }
}

/// In-process fan-out of lifecycle events. Publishing never blocks and never
/// fails; events without subscribers are dropped.
#[derive(Debug)]
pub struct XactEventBus {
    sender: broadcast::Sender<XactEvent>,
}

impl XactEventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<XactEvent> {
        self.sender.subscribe()
    }

    pub fn publish(&self, event: XactEvent) {
        let _ = self.sender.send(event);
    }
}
