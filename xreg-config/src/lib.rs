//! Configuration loading for processes embedding the xreg registry.
//!
//! Resolves [`XregConfig`] from the environment or default files, reads
//! bucket-metadata snapshots for the make-N-copies sweep and installs the
//! tracing subscriber.
#![allow(missing_docs)]

pub mod bmd;
pub mod models;
pub mod telemetry;

pub use bmd::load_bucket_metadata;
pub use models::{
    CONFIG_JSON_VAR, CONFIG_PATH_VAR, ConfigSource, LogConfig, XregConfig,
};
pub use telemetry::init_tracing;
