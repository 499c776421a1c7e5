//! Per-command latency records.
//!
//! Every delivered command produces one CSV line:
//! `timestamp,request_id,latency_ns,attempts`, where the timestamp is RFC 3339
//! UTC at the first send and the latency spans first dispatch to validated reply,
//! reconnects included.

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use relay_wire::RequestId;
use thiserror::Error;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

/// Latency of one delivered command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatencyRecord {
    /// Time the request was first sent.
    pub timestamp: OffsetDateTime,
    /// Sequence number of the delivered request.
    pub request_id: RequestId,
    /// Time from first dispatch to validated reply.
    pub latency: Duration,
    /// Dispatch attempts the command needed.
    pub attempts: u32,
}

/// Destination for latency records.
pub trait StatsSink {
    /// Stores one record.
    fn record(&mut self, record: &LatencyRecord) -> Result<(), StatsError>;

    /// Pushes buffered records to durable storage.
    fn flush(&mut self) -> Result<(), StatsError>;
}

/// Errors raised by stats sinks.
#[derive(Debug, Error)]
pub enum StatsError {
    /// The stats file could not be opened.
    #[error("failed to open stats file {path}: {source}")]
    Open {
        /// File path.
        path: Utf8PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
    /// Writing a record failed.
    #[error("failed to write stats record: {0}")]
    Write(#[from] io::Error),
    /// The timestamp could not be formatted.
    #[error("failed to format stats timestamp: {0}")]
    Timestamp(#[from] time::error::Format),
}

/// Appends CSV records to a writer.
#[derive(Debug)]
pub struct CsvStatsSink<W: Write> {
    writer: W,
}

impl CsvStatsSink<BufWriter<File>> {
    /// Opens `path` for appending, creating it if needed.
    pub fn open(path: &Utf8Path) -> Result<Self, StatsError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|source| StatsError::Open {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> CsvStatsSink<W> {
    /// Wraps an arbitrary writer.
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Consumes the sink, returning the writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> StatsSink for CsvStatsSink<W> {
    fn record(&mut self, record: &LatencyRecord) -> Result<(), StatsError> {
        let timestamp = record.timestamp.format(&Rfc3339)?;
        writeln!(
            self.writer,
            "{timestamp},{},{},{}",
            record.request_id,
            record.latency.as_nanos(),
            record.attempts
        )?;
        self.writer.flush()?;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), StatsError> {
        self.writer.flush().map_err(StatsError::from)
    }
}
