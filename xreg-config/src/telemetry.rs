use tracing_subscriber::{
    EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt,
};

use crate::models::LogConfig;

/// Installs the global subscriber: `RUST_LOG` if set, else the configured
/// directive. Returns false when a subscriber was already installed.
pub fn init_tracing(log: &LogConfig) -> bool {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&log.default_directive)),
        )
        .with(fmt::layer())
        .try_init()
        .is_ok()
}
