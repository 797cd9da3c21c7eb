//! Node configuration with TOML file support.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use cairn_types::LedgerParams;

use crate::logging::LogFormat;
use crate::NodeError;

/// Configuration for a Cairn node.
///
/// Can be loaded from a TOML file via [`NodeConfig::from_toml_file`] or
/// built programmatically (e.g. for tests). Consensus constants live in the
/// `[ledger]` table.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Seconds between unconfirmed-pool sweeps.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,

    /// How long a network submission waits for the blockchain lock.
    #[serde(default = "default_submit_timeout_ms")]
    pub submit_timeout_ms: u64,

    /// Threads for nonce generation.
    #[serde(default = "default_work_threads")]
    pub work_threads: usize,

    /// Whether to keep and report Prometheus metrics.
    #[serde(default)]
    pub enable_metrics: bool,

    #[serde(default)]
    pub ledger: LedgerParams,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_log_format() -> String {
    "human".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_sweep_interval_secs() -> u64 {
    60
}

fn default_submit_timeout_ms() -> u64 {
    5_000
}

fn default_work_threads() -> usize {
    1
}

// ── Impl ───────────────────────────────────────────────────────────────

impl NodeConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, NodeError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| NodeError::Config(format!("{}: {e}", path.as_ref().display())))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, NodeError> {
        let config: Self = toml::from_str(s).map_err(|e| NodeError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, NodeError> {
        toml::to_string_pretty(self).map_err(|e| NodeError::Config(e.to_string()))
    }

    pub fn log_format(&self) -> Result<LogFormat, NodeError> {
        self.log_format.parse()
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn submit_timeout(&self) -> Duration {
        Duration::from_millis(self.submit_timeout_ms)
    }

    fn validate(&self) -> Result<(), NodeError> {
        self.log_format()?;
        if self.sweep_interval_secs == 0 {
            return Err(NodeError::Config("sweep_interval_secs must be positive".into()));
        }
        let pow = &self.ledger.pow;
        if pow.buffer_bytes < 8 || pow.buffer_bytes % 8 != 0 {
            return Err(NodeError::Config(format!(
                "ledger.pow.buffer_bytes must be a positive multiple of 8, got {}",
                pow.buffer_bytes
            )));
        }
        if self.ledger.max_bytes_per_unit_fee == 0 {
            return Err(NodeError::Config(
                "ledger.max_bytes_per_unit_fee must be positive".into(),
            ));
        }
        Ok(())
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            log_format: default_log_format(),
            log_level: default_log_level(),
            sweep_interval_secs: default_sweep_interval_secs(),
            submit_timeout_ms: default_submit_timeout_ms(),
            work_threads: default_work_threads(),
            enable_metrics: false,
            ledger: LedgerParams::default(),
        }
    }
}
