use crate::extract::{CompletionIdOrder, DEFAULT_VENDOR};
use crate::heartbeat::HeartbeatConfig;
use crate::redaction::ContentPolicy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Default configuration file, looked up relative to the working directory
pub const DEFAULT_CONFIG_FILE: &str = "llm-monitor.toml";

/// Environment variable prefix (`NEW_RELIC_LICENSE_KEY`, ...)
pub const ENV_PREFIX: &str = "NEW_RELIC";

/// Prefix of the supportability metric name; the library version is appended
pub const DEFAULT_SUPPORTABILITY_PREFIX: &str = "Supportability/Python/ML/LiteLLM";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// `NEW_RELIC_LICENSE_KEY`
    pub license_key: Option<String>,
    /// `NEW_RELIC_APP_NAME`
    pub app_name: Option<String>,
    /// `NEW_RELIC_AI_MONITORING_RECORD_CONTENT_ENABLED`, kept raw so only
    /// a case-insensitive "true" enables recording
    pub ai_monitoring_record_content_enabled: Option<String>,
    pub adapter: AdapterConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdapterConfig {
    /// Explicit override; takes priority over the environment default
    pub turn_off_message_logging: Option<bool>,
    pub vendor_fallback: String,
    pub completion_id_order: CompletionIdOrder,
    /// Reported in the supportability metric; defaults to this crate's version
    pub library_version: Option<String>,
    pub supportability_prefix: String,
    pub heartbeat: HeartbeatConfig,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            turn_off_message_logging: None,
            vendor_fallback: DEFAULT_VENDOR.to_string(),
            completion_id_order: CompletionIdOrder::default(),
            library_version: None,
            supportability_prefix: DEFAULT_SUPPORTABILITY_PREFIX.to_string(),
            heartbeat: HeartbeatConfig::default(),
        }
    }
}

impl MonitorConfig {
    /// Whether both credentials required to enable monitoring are present
    pub fn has_credentials(&self) -> bool {
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        present(&self.license_key) && present(&self.app_name)
    }

    pub fn content_policy(&self) -> ContentPolicy {
        ContentPolicy::resolve(
            self.adapter.turn_off_message_logging,
            self.ai_monitoring_record_content_enabled.as_deref(),
        )
    }

    pub fn library_version(&self) -> &str {
        self.adapter
            .library_version
            .as_deref()
            .unwrap_or(env!("CARGO_PKG_VERSION"))
    }

    /// Full supportability metric name, e.g. `Supportability/Python/ML/LiteLLM/0.3.0`
    pub fn supportability_metric_name(&self) -> String {
        format!(
            "{}/{}",
            self.adapter.supportability_prefix.trim_end_matches('/'),
            self.library_version()
        )
    }
}

/// Load configuration from `path` (optional) and the process environment
pub fn load_config(path: &Path) -> anyhow::Result<MonitorConfig> {
    build_config(path, None)
}

/// Load configuration from `path` (optional) and an explicit environment map
pub fn load_config_from_map(path: &Path, env: HashMap<String, String>) -> anyhow::Result<MonitorConfig> {
    build_config(path, Some(env))
}

fn build_config(path: &Path, env: Option<HashMap<String, String>>) -> anyhow::Result<MonitorConfig> {
    let config = config::Config::builder()
        .add_source(config::File::from(path).required(false))
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .source(env),
        )
        .build()?;

    let cfg: MonitorConfig = config.try_deserialize()?;
    validate_config(&cfg)?;

    Ok(cfg)
}

pub fn validate_config(cfg: &MonitorConfig) -> anyhow::Result<()> {
    let adapter = &cfg.adapter;

    if adapter.vendor_fallback.trim().is_empty() {
        anyhow::bail!("adapter.vendor_fallback cannot be empty");
    }

    if adapter.supportability_prefix.trim_matches('/').is_empty() {
        anyhow::bail!("adapter.supportability_prefix cannot be empty");
    }

    if adapter.heartbeat.emission_interval_seconds == 0 {
        anyhow::bail!("adapter.heartbeat.emission_interval_seconds must be greater than 0");
    }

    if adapter.heartbeat.check_interval_seconds > adapter.heartbeat.emission_interval_seconds {
        anyhow::bail!(
            "adapter.heartbeat.check_interval_seconds ({}) cannot exceed emission_interval_seconds ({})",
            adapter.heartbeat.check_interval_seconds,
            adapter.heartbeat.emission_interval_seconds
        );
    }

    Ok(())
}
