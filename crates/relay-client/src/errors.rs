//! Error types for the dispatch engine and the binary runtime.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use relay_config::ConfigError;
use relay_wire::{ClientId, CodecError, RequestId};
use thiserror::Error;

use crate::shutdown::ShutdownError;
use crate::source::{SourceError, WorkloadError};
use crate::stats::StatsError;
use crate::telemetry::TelemetryError;

/// Failures reported by a single connector sweep.
#[derive(Debug, Error)]
pub enum ConnectError {
    /// The endpoint list was empty.
    #[error("no replica endpoints configured")]
    NoEndpoints,
    /// Every endpoint refused or timed out.
    #[error("failed to reach any replica after {attempts} attempts: {source}")]
    Exhausted {
        /// Connection attempts made during the sweep.
        attempts: u32,
        /// Error reported by the last attempt.
        #[source]
        source: io::Error,
    },
}

/// Outcome of a dispatch that produced no reply.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The deadline fired before a reply arrived.
    #[error("no reply within {} ms", timeout.as_millis())]
    Timeout {
        /// The deadline that elapsed.
        timeout: Duration,
    },
    /// Writing the request or reading the reply failed.
    #[error("connection failed: {source}")]
    Io {
        /// Underlying transport error.
        #[source]
        source: io::Error,
    },
    /// The replica closed the stream before replying.
    #[error("replica closed the connection")]
    Closed,
    /// The reply exceeded the maximum frame length.
    #[error("reply exceeded the maximum frame length")]
    FrameTooLong,
}

/// A reply that cannot belong to the outstanding request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolViolation {
    /// The reply decoded to the empty default record.
    #[error("response is empty")]
    EmptyResponse,
    /// The reply names another client.
    #[error("response has wrong client id: expected {expected}, received {received}")]
    ClientIdMismatch {
        /// Identity of this client.
        expected: ClientId,
        /// Identity carried by the reply.
        received: ClientId,
    },
    /// The reply answers another request.
    #[error("response has wrong request id: expected {expected}, received {received}")]
    RequestIdMismatch {
        /// Sequence number of the outstanding request.
        expected: RequestId,
        /// Sequence number carried by the reply.
        received: RequestId,
    },
}

/// Fatal conditions that stop the request loop.
#[derive(Debug, Error)]
pub enum ClientError {
    /// A reply failed correlation checks.
    #[error("protocol violation: {0}")]
    Protocol(#[from] ProtocolViolation),
    /// The configured reconnect bound was reached.
    #[error("gave up reconnecting after {sweeps} failed sweeps: {source}")]
    ConnectivityExhausted {
        /// Failed sweeps before giving up.
        sweeps: u32,
        /// Error reported by the last sweep.
        #[source]
        source: ConnectError,
    },
    /// The endpoint list was empty.
    #[error("no replica endpoints configured")]
    NoEndpoints,
    /// A request could not be encoded.
    #[error("failed to encode request: {0}")]
    Encode(#[source] CodecError),
    /// The command source failed.
    #[error("command source failed: {0}")]
    Source(#[from] SourceError),
    /// The stats sink failed.
    #[error("failed to record latency: {0}")]
    Stats(#[from] StatsError),
}

/// Errors surfaced by the binary runtime.
#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("failed to load configuration: {0}")]
    LoadConfiguration(Arc<ortho_config::OrthoError>),
    #[error("invalid configuration: {0}")]
    Settings(#[from] ConfigError),
    #[error("failed to initialise telemetry: {0}")]
    Telemetry(#[from] TelemetryError),
    #[error("failed to open stats file: {0}")]
    OpenStats(#[source] StatsError),
    #[error("failed to load workload: {0}")]
    Workload(#[from] WorkloadError),
    #[error("failed to start async runtime: {0}")]
    Runtime(#[source] io::Error),
    #[error("shutdown listener failed: {0}")]
    Shutdown(#[from] ShutdownError),
    #[error("{0}")]
    Client(#[from] ClientError),
}
