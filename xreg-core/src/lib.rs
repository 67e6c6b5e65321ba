//! # xreg core
//!
//! Registry of extended actions ("xactions"): long-running background jobs
//! attached to one or two buckets of a clustered object store.
//!
//! ## Overview
//!
//! Every request or internal driver that wants a job calls a *renewal*. The
//! registry answers one question under concurrent pressure: is an equivalent
//! job already running? If so, the caller joins it; otherwise the caller's
//! candidate is admitted and started on its own task.
//!
//! - **Scope renewal** ([`Registry::renew_by_scope`]): same kind and any
//!   shared bucket in the conflict sets means join.
//! - **ID renewal** ([`Registry::renew_by_id`]): same caller-supplied id
//!   means join, whatever the kind or bucket. Used by paginated listing and
//!   batched reads.
//!
//! ## Architecture
//!
//! - [`factory`]: one [`Renewable`] per kind, building [`Candidate`]s
//! - [`registry`]: the live index and both renewal protocols
//! - [`xaction`]: job handles, lifecycle and the [`XactBody`] contract
//! - [`drivers`]: per-kind entry points
//! - [`sweep`]: the make-N-copies fan-out and its periodic runner
//! - [`events`]: lifecycle event broadcast
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use xreg_core::{BodyFactory, Registry, RegistryConfig, XactBody, XactContext};
//! use xreg_model::{ActionPhase, Bck, XactKind};
//!
//! struct Encode;
//!
//! #[async_trait::async_trait]
//! impl XactBody for Encode {
//!     async fn run(self: Box<Self>, ctx: XactContext) -> xreg_core::Result<()> {
//!         ctx.cancelled().await;
//!         Ok(())
//!     }
//! }
//!
//! # async fn demo() -> xreg_core::Result<()> {
//! let registry = Registry::builder(RegistryConfig::default())
//!     .with(Arc::new(BodyFactory::new(XactKind::EcEncode, |_, _| {
//!         Ok(Box::new(Encode) as Box<dyn XactBody>)
//!     })))?
//!     .build();
//!
//! let first = registry.renew_ec_encode(&Bck::ais("b1"), None, ActionPhase::Begin, false)?;
//! let again = registry.renew_ec_encode(&Bck::ais("b1"), None, ActionPhase::Begin, false)?;
//! assert!(first.is_admitted() && again.is_joined());
//! # Ok(())
//! # }
//! ```
#![allow(missing_docs)]

pub mod config;
pub mod drivers;
pub mod error;
pub mod events;
pub mod factory;
pub mod registry;
pub mod sweep;
pub mod xaction;

pub use config::{BackendConfig, RegistryConfig, SweepConfig};
pub use error::{Result, XactError};
pub use events::{EventMeta, XactEvent, XactEventBus, XactEventPayload};
pub use factory::{BodyFactory, Candidate, Renewable};
pub use registry::{
    Registry, RegistryBuilder, RegistrySnapshot, RenewOutcome, RenewResult,
    Renewal,
};
pub use sweep::{BucketMetadataSource, StaticBucketMetadata, SweepReport};
pub use xaction::{Xact, XactBody, XactContext, XactHandle, XactStatus};
