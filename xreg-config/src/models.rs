use anyhow::{Context, anyhow, bail};
use serde::{Deserialize, Serialize};
use std::{
    env, fs,
    path::{Path, PathBuf},
};
use xreg_core::RegistryConfig;

pub const CONFIG_PATH_VAR: &str = "XREG_CONFIG_PATH";
pub const CONFIG_JSON_VAR: &str = "XREG_CONFIG_JSON";

const DEFAULT_CANDIDATES: &[&str] = &[
    "xreg.toml",
    "xreg.json",
    "config/xreg.toml",
    "config/xreg.json",
];

/// Source that produced the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConfigSource {
    #[default]
    Default,
    EnvPath(PathBuf),
    EnvInline,
    File(PathBuf),
}

/// Logging defaults. `RUST_LOG` always wins over the directive here.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LogConfig {
    pub default_directive: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            default_directive: "info,xreg::registry=info,xreg::sweep=info"
                .into(),
        }
    }
}

/// Top-level settings of a process embedding the registry.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct XregConfig {
    /// Event channel size, periodic sweep and remote backends walked by the
    /// make-N-copies sweep.
    pub registry: RegistryConfig,
    pub log: LogConfig,
}

impl XregConfig {
    /// Load configuration using environment variables.
    /// Evaluation order:
    /// 1) `$XREG_CONFIG_PATH` (TOML or JSON file),
    /// 2) `$XREG_CONFIG_JSON` (inline JSON),
    /// 3) the first existing default file (`xreg.toml`, `xreg.json`,
    ///    `config/xreg.toml`, `config/xreg.json`),
    /// 4) defaults.
    pub fn load_from_env() -> anyhow::Result<(Self, ConfigSource)> {
        Self::load_with(|key| env::var(key).ok(), Path::new(""))
    }

    /// Same as [`XregConfig::load_from_env`] with an explicit variable
    /// lookup and a directory the default candidates are resolved against.
    pub fn load_with(
        lookup: impl Fn(&str) -> Option<String>,
        base_dir: &Path,
    ) -> anyhow::Result<(Self, ConfigSource)> {
        if let Some(path_str) = lookup(CONFIG_PATH_VAR)
            && !path_str.trim().is_empty()
        {
            let path = PathBuf::from(path_str);
            let config = Self::load_from_file(&path)?;
            return Ok((config, ConfigSource::EnvPath(path)));
        }

        if let Some(raw) = lookup(CONFIG_JSON_VAR)
            && !raw.trim().is_empty()
        {
            let parsed = Self::parse_json(&raw)
                .context("failed to parse XREG_CONFIG_JSON")?;
            parsed.validate()?;
            return Ok((parsed, ConfigSource::EnvInline));
        }

        if let Some(path) = Self::find_default_file(base_dir) {
            let config = Self::load_from_file(&path)?;
            return Ok((config, ConfigSource::File(path)));
        }

        Ok((Self::default(), ConfigSource::Default))
    }

    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path).with_context(|| {
            format!("failed to read xreg config from {}", path.display())
        })?;

        let config = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::parse_json(&contents).with_context(|| {
                format!("invalid xreg config {}", path.display())
            })?,
            Some("toml") | Some("tml") => {
                toml::from_str(&contents).map_err(|err| {
                    anyhow!("invalid xreg config {}: {}", path.display(), err)
                })?
            }
            _ => Self::parse_from_str(&contents, &path.display().to_string())?,
        };
        config.validate().with_context(|| {
            format!("rejected xreg config {}", path.display())
        })?;
        Ok(config)
    }

    pub fn parse_from_str(
        contents: &str,
        origin: &str,
    ) -> anyhow::Result<Self> {
        // TOML first, then JSON.
        toml::from_str(contents).or_else(|toml_err| {
            serde_json::from_str(contents).map_err(|json_err| {
                anyhow!(
                    "failed to parse xreg config {}: toml error: {}; json error: {}",
                    origin,
                    toml_err,
                    json_err
                )
            })
        })
    }

    pub fn parse_json(raw: &str) -> anyhow::Result<Self> {
        serde_json::from_str(raw)
            .map_err(|err| anyhow!("invalid xreg config json: {err}"))
    }

    /// Rejects settings the registry cannot run with.
    pub fn validate(&self) -> anyhow::Result<()> {
        let registry = &self.registry;
        if registry.event_capacity == 0 {
            bail!("registry.event_capacity must be positive");
        }
        if registry.sweep.enabled && registry.sweep.interval_ms == 0 {
            bail!("registry.sweep.interval_ms must be positive when sweeping");
        }
        if registry.sweep.tag.trim().is_empty() {
            bail!("registry.sweep.tag must not be empty");
        }
        if let Some(provider) = registry
            .backends
            .providers
            .keys()
            .find(|provider| !provider.is_remote_backend())
        {
            bail!(
                "registry.backends lists {provider}, which is not a remote backend"
            );
        }
        Ok(())
    }

    fn find_default_file(base_dir: &Path) -> Option<PathBuf> {
        DEFAULT_CANDIDATES
            .iter()
            .map(|candidate| base_dir.join(candidate))
            .find(|path| path.exists())
    }
}
