//! Scripted and generated workloads.
//!
//! A workload file is TOML. With a `script`, the listed commands are replayed
//! in order `repeat` times. Without one, `commands` operations are generated
//! over `keys` keys, `set_pct` percent of them `update` writes and the rest
//! `get` reads, from a seeded RNG so runs are reproducible.
//!
//! ```toml
//! commands = 1000
//! keys = 16
//! set_pct = 30
//! seed = 42
//! interval_ms = 5
//! ```

use std::fs;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;
use thiserror::Error;
use tokio::time;
use tracing::{debug, info};

use super::{Command, CommandSource, SourceError};

pub(crate) const WORKLOAD_TARGET: &str = "relay::workload";

/// Parsed workload description.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorkloadSpec {
    /// Commands replayed verbatim, in order.
    #[serde(default)]
    pub script: Vec<String>,
    /// Number of passes over `script`.
    #[serde(default = "default_repeat")]
    pub repeat: u32,
    /// Number of generated operations when no script is given.
    #[serde(default)]
    pub commands: u64,
    /// Size of the generated key space.
    #[serde(default = "default_keys")]
    pub keys: u32,
    /// Percentage of generated operations that are writes.
    #[serde(default = "default_set_pct")]
    pub set_pct: u8,
    /// RNG seed; zero picks a random seed.
    #[serde(default)]
    pub seed: u64,
    /// Prefix applied to generated key names.
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
    /// Pause between consecutive commands, in milliseconds.
    #[serde(default)]
    pub interval_ms: u64,
}

const fn default_repeat() -> u32 {
    1
}

const fn default_keys() -> u32 {
    10
}

const fn default_set_pct() -> u8 {
    50
}

fn default_key_prefix() -> String {
    String::from("key")
}

impl WorkloadSpec {
    /// Reads and validates a workload file.
    pub fn load(path: &Utf8Path) -> Result<Self, WorkloadError> {
        let text = fs::read_to_string(path).map_err(|source| WorkloadError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text).map_err(|error| match error {
            WorkloadError::Parse { source, .. } => WorkloadError::Parse {
                origin: path.to_string(),
                source,
            },
            other => other,
        })
    }

    /// Parses and validates workload TOML.
    pub fn parse(text: &str) -> Result<Self, WorkloadError> {
        let spec: Self = toml::from_str(text).map_err(|source| WorkloadError::Parse {
            origin: String::from("<inline>"),
            source,
        })?;
        spec.validate()?;
        Ok(spec)
    }

    fn validate(&self) -> Result<(), WorkloadError> {
        if self.set_pct > 100 {
            return Err(WorkloadError::SetPercentage(self.set_pct));
        }
        if self.script.is_empty() && self.keys == 0 {
            return Err(WorkloadError::EmptyKeySpace);
        }
        Ok(())
    }
}

/// Errors raised while loading a workload.
#[derive(Debug, Error)]
pub enum WorkloadError {
    /// The file could not be read.
    #[error("failed to read workload {path}: {source}")]
    Read {
        /// Workload path.
        path: Utf8PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// The file was not valid workload TOML.
    #[error("failed to parse workload {origin}: {source}")]
    Parse {
        /// Workload path, or `<inline>` for parsed text.
        origin: String,
        /// Underlying error.
        #[source]
        source: toml::de::Error,
    },
    /// `set_pct` exceeded 100.
    #[error("set_pct must be at most 100, got {0}")]
    SetPercentage(u8),
    /// A generated workload had no keys.
    #[error("keys must be greater than zero for generated workloads")]
    EmptyKeySpace,
}

#[derive(Debug)]
enum Plan {
    Script {
        commands: Vec<String>,
        remaining_rounds: u32,
        position: usize,
    },
    Generated {
        remaining: u64,
        keys: u32,
        set_pct: u8,
        key_prefix: String,
        rng: SmallRng,
    },
}

/// Command source backed by a [`WorkloadSpec`].
#[derive(Debug)]
pub struct WorkloadSource {
    plan: Plan,
    interval: Duration,
    issued: u64,
    delivered: u64,
}

impl WorkloadSource {
    /// Builds a source from a parsed workload description.
    #[must_use]
    pub fn new(spec: WorkloadSpec) -> Self {
        let interval = Duration::from_millis(spec.interval_ms);
        let plan = if spec.script.is_empty() {
            let seed = if spec.seed == 0 {
                rand::thread_rng().r#gen()
            } else {
                spec.seed
            };
            info!(target: WORKLOAD_TARGET, seed, commands = spec.commands, "generating workload");
            Plan::Generated {
                remaining: spec.commands,
                keys: spec.keys,
                set_pct: spec.set_pct,
                key_prefix: spec.key_prefix,
                rng: SmallRng::seed_from_u64(seed),
            }
        } else {
            info!(
                target: WORKLOAD_TARGET,
                commands = spec.script.len(),
                repeat = spec.repeat,
                "replaying workload script"
            );
            Plan::Script {
                commands: spec.script,
                remaining_rounds: spec.repeat,
                position: 0,
            }
        };
        Self {
            plan,
            interval,
            issued: 0,
            delivered: 0,
        }
    }

    /// Loads a workload file and builds a source from it.
    pub fn from_path(path: &Utf8Path) -> Result<Self, WorkloadError> {
        WorkloadSpec::load(path).map(Self::new)
    }

    /// Number of results handed back so far.
    #[must_use]
    pub const fn delivered(&self) -> u64 {
        self.delivered
    }

    fn next_command(&mut self) -> Option<Command> {
        match &mut self.plan {
            Plan::Script {
                commands,
                remaining_rounds,
                position,
            } => {
                if *position >= commands.len() {
                    *position = 0;
                    *remaining_rounds = remaining_rounds.saturating_sub(1);
                }
                if *remaining_rounds == 0 {
                    return None;
                }
                let command = commands.get(*position).cloned().map(Command::classify);
                *position += 1;
                command
            }
            Plan::Generated {
                remaining,
                keys,
                set_pct,
                key_prefix,
                rng,
            } => {
                if *remaining == 0 {
                    return None;
                }
                *remaining -= 1;
                let key = format!("{key_prefix}{}", rng.gen_range(0..*keys));
                if rng.gen_range(0..100u8) < *set_pct {
                    let value = format!("v{}", self.issued + 1);
                    Some(Command::new(format!("update {key} {value}"), true))
                } else {
                    Some(Command::new(format!("get {key}"), false))
                }
            }
        }
    }
}

impl CommandSource for WorkloadSource {
    async fn next(&mut self) -> Result<Option<Command>, SourceError> {
        if self.issued > 0 && !self.interval.is_zero() {
            time::sleep(self.interval).await;
        }
        let command = self.next_command();
        if command.is_some() {
            self.issued += 1;
        } else {
            info!(target: WORKLOAD_TARGET, issued = self.issued, "workload complete");
        }
        Ok(command)
    }

    async fn deliver(&mut self, result: &str) -> Result<(), SourceError> {
        self.delivered += 1;
        debug!(target: WORKLOAD_TARGET, delivered = self.delivered, result, "result delivered");
        Ok(())
    }
}
