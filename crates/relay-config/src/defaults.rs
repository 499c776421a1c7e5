use camino::Utf8PathBuf;

use crate::modes::{LogFormat, SourceMode};

/// Default per-dispatch timeout in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 1_000;

/// Default number of connection attempts made against each endpoint per sweep.
pub const DEFAULT_ATTEMPTS_PER_ENDPOINT: u32 = 3;

/// Default pause between two failed reconnect sweeps, in milliseconds.
pub const DEFAULT_RECONNECT_DELAY_MS: u64 = 1_000;

/// Default file receiving per-request latency records.
pub const DEFAULT_STATS_PATH: &str = "latency.csv";

/// Default log filter expression used by the binary.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Default log filter expression used by the binary.
pub fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format for the binary.
pub fn default_log_format() -> LogFormat {
    LogFormat::Compact
}

/// Default command source.
pub fn default_source_mode() -> SourceMode {
    SourceMode::Interactive
}

/// Default latency stats path.
pub fn default_stats_path() -> Utf8PathBuf {
    Utf8PathBuf::from(DEFAULT_STATS_PATH)
}
