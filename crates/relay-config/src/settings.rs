//! Validated, immutable client settings derived from [`Config`].
//!
//! Loading is layered and permissive; validation happens once here so the
//! request loop and connector receive a value that cannot be half-configured.

use std::time::Duration;

use camino::Utf8PathBuf;
use thiserror::Error;

use crate::endpoint::{Endpoint, EndpointParseError};
use crate::{Config, SourceMode};

/// How the request loop behaves while it cannot reach any replica.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Connection attempts made against each endpoint within one sweep.
    pub attempts_per_endpoint: u32,
    /// Pause between two failed sweeps.
    pub delay: Duration,
    /// Upper bound on failed sweeps per reconnect; `None` retries forever.
    pub max_sweeps: Option<u32>,
}

/// Settings consumed by the dispatch engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    /// Identity stamped on every request.
    pub client_id: u32,
    /// Ordered replica endpoints.
    pub endpoints: Vec<Endpoint>,
    /// Deadline for a single dispatch attempt.
    pub timeout: Duration,
    /// Reconnect behaviour.
    pub reconnect: ReconnectPolicy,
}

/// Settings for the binary's collaborators (source, stats file).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeSettings {
    /// Dispatch engine settings.
    pub client: ClientSettings,
    /// Where latency records are appended.
    pub stats_path: Utf8PathBuf,
    /// Command source selection.
    pub source: SourceSelection,
}

/// Resolved command source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceSelection {
    /// Terminal input.
    Interactive,
    /// Workload described by the given file.
    Workload {
        /// Path of the workload TOML file.
        path: Utf8PathBuf,
    },
}

/// Errors raised while validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No client identity was supplied.
    #[error("a unique client id must be provided (--client-id or RELAY_CLIENT_ID)")]
    MissingClientId,
    /// The endpoint list was empty.
    #[error("at least one replica address must be configured")]
    NoAddresses,
    /// An address could not be parsed.
    #[error("invalid replica address '{address}': {source}")]
    InvalidAddress {
        /// The offending address.
        address: String,
        /// Parse failure.
        #[source]
        source: EndpointParseError,
    },
    /// A zero dispatch timeout would fail every request.
    #[error("timeout_ms must be greater than zero")]
    ZeroTimeout,
    /// Workload mode was chosen without a workload file.
    #[error("workload mode requires workload_path")]
    MissingWorkloadPath,
}

impl TryFrom<&Config> for ClientSettings {
    type Error = ConfigError;

    fn try_from(config: &Config) -> Result<Self, Self::Error> {
        let client_id = config.client_id.ok_or(ConfigError::MissingClientId)?;
        if config.addresses.is_empty() {
            return Err(ConfigError::NoAddresses);
        }
        let endpoints = config
            .addresses
            .iter()
            .map(|address| {
                address
                    .parse::<Endpoint>()
                    .map_err(|source| ConfigError::InvalidAddress {
                        address: address.clone(),
                        source,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        if config.timeout_ms == 0 {
            return Err(ConfigError::ZeroTimeout);
        }

        Ok(Self {
            client_id,
            endpoints,
            timeout: Duration::from_millis(config.timeout_ms),
            reconnect: ReconnectPolicy {
                attempts_per_endpoint: config.attempts_per_endpoint.max(1),
                delay: Duration::from_millis(config.reconnect_delay_ms),
                max_sweeps: config.max_reconnect_sweeps,
            },
        })
    }
}

impl TryFrom<&Config> for RuntimeSettings {
    type Error = ConfigError;

    fn try_from(config: &Config) -> Result<Self, Self::Error> {
        let client = ClientSettings::try_from(config)?;
        let source = match config.mode {
            SourceMode::Interactive => SourceSelection::Interactive,
            SourceMode::Workload => SourceSelection::Workload {
                path: config
                    .workload_path
                    .clone()
                    .ok_or(ConfigError::MissingWorkloadPath)?,
            },
        };
        Ok(Self {
            client,
            stats_path: config.stats_path.clone(),
            source,
        })
    }
}
