//! In-memory collaborators for driving the request loop.

use std::collections::VecDeque;
use std::thread;

use crate::shutdown::{ShutdownError, ShutdownSignal};
use crate::source::{Command, CommandSource, SourceError};
use crate::stats::{LatencyRecord, StatsError, StatsSink};

/// Replays fixed commands and keeps every delivered result.
#[derive(Debug, Default)]
pub struct ScriptedSource {
    pending: VecDeque<Command>,
    delivered: Vec<String>,
}

impl ScriptedSource {
    /// Source yielding `commands`, classified the way the console does.
    pub fn new<I>(commands: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        Self {
            pending: commands.into_iter().map(Command::classify).collect(),
            delivered: Vec::new(),
        }
    }

    /// Results delivered so far.
    pub fn delivered(&self) -> &[String] {
        &self.delivered
    }
}

impl CommandSource for ScriptedSource {
    async fn next(&mut self) -> Result<Option<Command>, SourceError> {
        Ok(self.pending.pop_front())
    }

    async fn deliver(&mut self, result: &str) -> Result<(), SourceError> {
        self.delivered.push(result.to_owned());
        Ok(())
    }
}

/// Keeps every latency record in memory.
#[derive(Debug, Default)]
pub struct RecordingStats {
    records: Vec<LatencyRecord>,
    flushes: usize,
}

impl RecordingStats {
    /// Records received so far.
    pub fn records(&self) -> &[LatencyRecord] {
        &self.records
    }

    /// Number of explicit flushes.
    pub fn flushes(&self) -> usize {
        self.flushes
    }
}

impl StatsSink for RecordingStats {
    fn record(&mut self, record: &LatencyRecord) -> Result<(), StatsError> {
        self.records.push(*record);
        Ok(())
    }

    fn flush(&mut self) -> Result<(), StatsError> {
        self.flushes += 1;
        Ok(())
    }
}

/// Shutdown signal that never fires.
#[derive(Debug, Default, Clone, Copy)]
pub struct NeverShutdown;

impl ShutdownSignal for NeverShutdown {
    fn wait(&self) -> Result<(), ShutdownError> {
        loop {
            thread::park();
        }
    }
}
