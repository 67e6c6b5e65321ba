#![allow(dead_code)]

use std::{sync::Arc, time::Duration};

use tokio::sync::watch;
use xreg_core::{
    BodyFactory, Registry, RegistryConfig, Result, XactBody, XactContext,
    XactError, XactHandle, XactStatus,
};
use xreg_model::{Bck, XactKind};

/// Runs until the gate opens or the job is cancelled.
pub struct GateBody {
    open: watch::Receiver<bool>,
}

#[async_trait::async_trait]
impl XactBody for GateBody {
    async fn run(mut self: Box<Self>, ctx: XactContext) -> Result<()> {
        tokio::select! {
            _ = ctx.cancelled() => Ok(()),
            _ = self.open.wait_for(|open| *open) => Ok(()),
        }
    }
}

pub struct FailingBody;

#[async_trait::async_trait]
impl XactBody for FailingBody {
    async fn run(self: Box<Self>, _ctx: XactContext) -> Result<()> {
        Err(XactError::Execution("mountpath offline".into()))
    }
}

pub struct PanickingBody;

#[async_trait::async_trait]
impl XactBody for PanickingBody {
    async fn run(self: Box<Self>, _ctx: XactContext) -> Result<()> {
        panic!("slice index out of range")
    }
}

/// Opens and closes every gated body built by [`gated_registry`].
#[derive(Clone)]
pub struct Gate {
    tx: Arc<watch::Sender<bool>>,
}

impl Gate {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn open(&self) {
        self.tx.send_replace(true);
    }

    pub fn close(&self) {
        self.tx.send_replace(false);
    }

    pub fn body(&self) -> Box<dyn XactBody> {
        Box::new(GateBody {
            open: self.tx.subscribe(),
        })
    }
}

/// Registry serving every kind with a gated body.
pub fn gated_registry(config: RegistryConfig) -> (Arc<Registry>, Gate) {
    let gate = Gate::new();
    let mut builder = Registry::builder(config);
    for kind in XactKind::ALL {
        let gate = gate.clone();
        builder
            .register(Arc::new(BodyFactory::new(kind, move |_, _| {
                Ok(gate.body())
            })))
            .expect("each kind registers once");
    }
    (builder.build(), gate)
}

/// Registry serving only `kind`, with bodies produced by `make`.
pub fn registry_for<F>(kind: XactKind, make: F) -> Arc<Registry>
where
    F: Fn() -> Box<dyn XactBody> + Send + Sync + 'static,
{
    Registry::builder(RegistryConfig::default())
        .with(Arc::new(BodyFactory::new(kind, move |_, _| Ok(make()))))
        .expect("single registration")
        .build()
}

pub async fn terminal(xact: &XactHandle) -> XactStatus {
    tokio::time::timeout(Duration::from_secs(5), xact.wait())
        .await
        .expect("xaction reached a terminal state")
}

/// Polls `cond` until it holds, failing the test after five seconds.
pub async fn eventually(mut cond: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !cond() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not reached in time"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

pub fn ais(name: &str) -> Bck {
    Bck::ais(name)
}
