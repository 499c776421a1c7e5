//! Command sources feeding the request loop.
//!
//! A source yields commands one at a time and receives each command's result
//! once it has been delivered. The loop never asks for a new command before
//! the previous result has been handed back.

use std::future::Future;
use std::io;

use thiserror::Error;

mod console;
mod workload;

pub use console::ConsoleSource;
pub use workload::{WorkloadError, WorkloadSource, WorkloadSpec};

/// One command drawn from a source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// Opaque command text.
    pub text: String,
    /// Whether the command must be replicated before it is answered.
    pub replicate: bool,
}

impl Command {
    /// Builds a command with an explicit replication flag.
    #[must_use]
    pub fn new(text: impl Into<String>, replicate: bool) -> Self {
        Self {
            text: text.into(),
            replicate,
        }
    }

    /// Builds a command, treating `get` commands as read-only.
    ///
    /// Every other verb mutates state and is replicated.
    #[must_use]
    pub fn classify(text: impl Into<String>) -> Self {
        let text = text.into();
        let read_only = text
            .split_whitespace()
            .next()
            .is_some_and(|verb| verb.eq_ignore_ascii_case("get"));
        Self {
            text,
            replicate: !read_only,
        }
    }
}

/// Supplies commands to the request loop and receives their results.
pub trait CommandSource {
    /// Returns the next command, or `None` once the source is exhausted.
    fn next(&mut self) -> impl Future<Output = Result<Option<Command>, SourceError>> + Send;

    /// Hands back the result of the most recent command.
    fn deliver(&mut self, result: &str) -> impl Future<Output = Result<(), SourceError>> + Send;
}

/// I/O failures raised by command sources.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Reading the next command failed.
    #[error("failed to read command: {0}")]
    Input(#[source] io::Error),
    /// Writing a result failed.
    #[error("failed to write result: {0}")]
    Output(#[source] io::Error),
}

/// The sources the binary can be configured with.
#[derive(Debug)]
pub enum AnySource {
    /// Terminal input and output.
    Console(ConsoleSource<tokio::io::BufReader<tokio::io::Stdin>, tokio::io::Stdout>),
    /// Workload replay or generation.
    Workload(WorkloadSource),
}

impl CommandSource for AnySource {
    async fn next(&mut self) -> Result<Option<Command>, SourceError> {
        match self {
            Self::Console(source) => source.next().await,
            Self::Workload(source) => source.next().await,
        }
    }

    async fn deliver(&mut self, result: &str) -> Result<(), SourceError> {
        match self {
            Self::Console(source) => source.deliver(result).await,
            Self::Workload(source) => source.deliver(result).await,
        }
    }
}
