//! String-selectable operating modes.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// How log events are rendered on stderr.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LogFormat {
    /// One JSON object per event.
    Json,
    /// Terse single-line text.
    #[default]
    Compact,
}

/// Where the client draws its commands from.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum SourceMode {
    /// Commands typed at the terminal, results printed back.
    #[default]
    Interactive,
    /// Commands replayed or generated from a workload file.
    Workload,
}

/// Error returned when a mode name is not recognised.
pub type ModeParseError = strum::ParseError;
