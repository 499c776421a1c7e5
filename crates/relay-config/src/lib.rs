//! Shared configuration for the relay client.
//!
//! Configuration is layered by `ortho_config`: built-in defaults, then a TOML
//! file (`--config-path` or `RELAY_CONFIG_PATH`), then `RELAY_*` environment
//! variables, then command-line flags. The loaded [`Config`] is deliberately
//! permissive; [`ClientSettings`] and [`RuntimeSettings`] validate it once at
//! startup into the immutable values the client runs on.

use camino::Utf8PathBuf;
use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

mod defaults;
mod endpoint;
mod modes;
mod settings;

pub use defaults::{
    DEFAULT_ATTEMPTS_PER_ENDPOINT, DEFAULT_LOG_FILTER, DEFAULT_RECONNECT_DELAY_MS,
    DEFAULT_STATS_PATH, DEFAULT_TIMEOUT_MS, default_log_filter, default_log_filter_string,
    default_log_format, default_source_mode, default_stats_path,
};
pub use endpoint::{Endpoint, EndpointParseError};
pub use modes::{LogFormat, ModeParseError, SourceMode};
pub use settings::{
    ClientSettings, ConfigError, ReconnectPolicy, RuntimeSettings, SourceSelection,
};

/// Layered configuration for the relay client.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "RELAY")]
pub struct Config {
    /// Ordered replica addresses (`host:port` or `tcp://host:port`).
    #[serde(default)]
    pub addresses: Vec<String>,
    /// Per-dispatch timeout in milliseconds.
    #[ortho_config(default = DEFAULT_TIMEOUT_MS)]
    pub timeout_ms: u64,
    /// Connection attempts per endpoint before moving to the next one.
    #[ortho_config(default = DEFAULT_ATTEMPTS_PER_ENDPOINT)]
    pub attempts_per_endpoint: u32,
    /// Pause between failed reconnect sweeps in milliseconds.
    #[ortho_config(default = DEFAULT_RECONNECT_DELAY_MS)]
    pub reconnect_delay_ms: u64,
    /// Optional bound on failed sweeps per reconnect. Unset retries forever.
    pub max_reconnect_sweeps: Option<u32>,
    /// Unique numeric identity of this client. Required.
    pub client_id: Option<u32>,
    /// File receiving one latency record per delivered command.
    #[ortho_config(default = default_stats_path())]
    pub stats_path: Utf8PathBuf,
    /// Command source.
    #[ortho_config(default = default_source_mode())]
    pub mode: SourceMode,
    /// Workload description used when `mode` is `workload`.
    pub workload_path: Option<Utf8PathBuf>,
    /// Tracing filter expression.
    #[ortho_config(default = default_log_filter_string())]
    pub log_filter: String,
    /// Log output format.
    #[ortho_config(default = default_log_format())]
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            addresses: Vec::new(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            attempts_per_endpoint: DEFAULT_ATTEMPTS_PER_ENDPOINT,
            reconnect_delay_ms: DEFAULT_RECONNECT_DELAY_MS,
            max_reconnect_sweeps: None,
            client_id: None,
            stats_path: default_stats_path(),
            mode: default_source_mode(),
            workload_path: None,
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
        }
    }
}

impl Config {
    /// Tracing filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Log output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }
}
