use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use xreg_model::{Namespace, Provider};

/// Knobs for the registry and its fan-out driver.
///
/// All fields carry defaults so a partial configuration payload is enough.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Capacity of the lifecycle event broadcast channel. Slow subscribers
    /// past this many events observe a lag error instead of blocking renewals.
    pub event_capacity: usize,
    /// Periodic make-N-copies sweep.
    pub sweep: SweepConfig,
    /// Remote backends walked by the sweep after the local provider.
    pub backends: BackendConfig,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            event_capacity: 256,
            sweep: SweepConfig::default(),
            backends: BackendConfig::default(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    pub enabled: bool,
    /// Interval between two sweeps (milliseconds).
    pub interval_ms: u64,
    /// Tag attached to every mirroring job the sweep starts.
    pub tag: String,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_ms: 60_000,
            tag: "mirror-sweep".to_string(),
        }
    }
}

/// Configured remote backends, each with the namespace its buckets live in.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub providers: BTreeMap<Provider, Namespace>,
}

impl BackendConfig {
    pub fn with_provider(mut self, provider: Provider, ns: Namespace) -> Self {
        self.providers.insert(provider, ns);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_payload_falls_back_to_defaults() {
        let cfg: RegistryConfig = serde_json::from_str(
            r#"{ "sweep": { "interval_ms": 500 }, "backends": { "providers": { "aws": { "name": "eu" } } } }"#,
        )
        .expect("valid config");

        assert_eq!(cfg.event_capacity, 256);
        assert_eq!(cfg.sweep.interval_ms, 500);
        assert!(cfg.sweep.enabled);
        assert_eq!(cfg.sweep.tag, "mirror-sweep");
        assert_eq!(
            cfg.backends.providers.get(&Provider::Aws),
            Some(&Namespace::new("", "eu"))
        );
    }
}
