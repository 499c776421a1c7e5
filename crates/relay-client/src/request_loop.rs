//! The sequencing loop that turns commands into validated replies.
//!
//! One [`RequestLoop`] owns the live connection, the leader hint and the next
//! request identifier. Commands are strictly serialised: command N+1 is not
//! drawn from the source until command N has been delivered. Transport faults
//! are absorbed by reconnecting and resending the same request; a reply that
//! fails correlation is fatal.

use std::time::Instant;

use relay_config::ClientSettings;
use relay_wire::{ClientRequest, ClientResponse, RequestId, decode_response, encode_request};
use ::time::OffsetDateTime;
use tokio::time;
use tracing::{debug, info, warn};

use crate::connector::{Connection, connect};
use crate::dispatcher::dispatch;
use crate::errors::{ClientError, ConnectError, ProtocolViolation};
use crate::source::{Command, CommandSource};
use crate::stats::{LatencyRecord, StatsError, StatsSink};

pub(crate) const REQUEST_LOOP_TARGET: &str = "relay::request_loop";

/// First identifier assigned by a fresh loop.
pub const FIRST_REQUEST_ID: RequestId = 1;

/// Totals reported when the source runs dry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Commands whose results were delivered.
    pub delivered: u64,
    /// Identifier the next command would have used.
    pub next_request_id: RequestId,
}

/// Drives commands from `S` through the replicas, recording latency in `T`.
#[derive(Debug)]
pub struct RequestLoop<S, T> {
    settings: ClientSettings,
    source: S,
    stats: T,
    connection: Option<Connection>,
    hint: Option<usize>,
    next_request_id: RequestId,
    delivered: u64,
}

impl<S, T> RequestLoop<S, T>
where
    S: CommandSource,
    T: StatsSink,
{
    /// Builds an idle loop; no connection is opened until the first command.
    pub fn new(settings: ClientSettings, source: S, stats: T) -> Self {
        Self {
            settings,
            source,
            stats,
            connection: None,
            hint: None,
            next_request_id: FIRST_REQUEST_ID,
            delivered: 0,
        }
    }

    /// Processes commands until the source is exhausted.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Protocol`] when a reply does not belong to the
    /// outstanding request, [`ClientError::ConnectivityExhausted`] when a
    /// configured reconnect bound is reached, and source or stats failures as
    /// they occur. Transport failures are retried and never returned.
    pub async fn run(&mut self) -> Result<RunSummary, ClientError> {
        if self.settings.endpoints.is_empty() {
            return Err(ClientError::NoEndpoints);
        }
        info!(
            target: REQUEST_LOOP_TARGET,
            client_id = self.settings.client_id,
            endpoints = self.settings.endpoints.len(),
            "request loop started"
        );
        while let Some(command) = self.source.next().await? {
            self.process(command).await?;
        }
        let summary = self.summary();
        info!(
            target: REQUEST_LOOP_TARGET,
            delivered = summary.delivered,
            "command source exhausted"
        );
        Ok(summary)
    }

    async fn process(&mut self, command: Command) -> Result<(), ClientError> {
        let request = ClientRequest {
            client_id: self.settings.client_id,
            request_id: self.next_request_id,
            replicate: command.replicate,
            command: command.text,
        };
        let line = encode_request(&request).map_err(ClientError::Encode)?;
        let sent_at = OffsetDateTime::now_utc();
        let started = Instant::now();
        let mut attempts = 0u32;

        let response = loop {
            let mut connection = match self.connection.take() {
                Some(connection) => connection,
                None => self.establish().await?,
            };
            attempts += 1;
            debug!(
                target: REQUEST_LOOP_TARGET,
                request_id = request.request_id,
                attempt = attempts,
                endpoint = %connection.endpoint(),
                "dispatching request"
            );
            match dispatch(&line, &mut connection, self.settings.timeout).await {
                Ok(reply) => match decode_response(&reply) {
                    Ok(response) => {
                        self.connection = Some(connection);
                        break response;
                    }
                    Err(error) => warn!(
                        target: REQUEST_LOOP_TARGET,
                        request_id = request.request_id,
                        endpoint = %connection.endpoint(),
                        %error,
                        "undecodable reply; reconnecting"
                    ),
                },
                Err(error) => warn!(
                    target: REQUEST_LOOP_TARGET,
                    request_id = request.request_id,
                    endpoint = %connection.endpoint(),
                    %error,
                    "dispatch failed; reconnecting"
                ),
            }
        };

        validate(&request, &response)?;

        self.stats.record(&LatencyRecord {
            timestamp: sent_at,
            request_id: request.request_id,
            latency: started.elapsed(),
            attempts,
        })?;
        self.next_request_id += 1;
        self.delivered += 1;
        self.source.deliver(&response.response).await?;
        Ok(())
    }

    /// Opens a replacement connection, sweeping until one endpoint accepts.
    ///
    /// The first connection starts at endpoint 0; later ones start just past
    /// the endpoint that last worked.
    async fn establish(&mut self) -> Result<Connection, ClientError> {
        let endpoints = &self.settings.endpoints;
        let policy = self.settings.reconnect;
        let start = self.hint.map_or(0, |hint| (hint + 1) % endpoints.len());
        let mut failed_sweeps = 0u32;

        loop {
            match connect(endpoints, policy.attempts_per_endpoint, start).await {
                Ok((connection, index)) => {
                    if self.hint != Some(index) {
                        info!(target: REQUEST_LOOP_TARGET, index, "leader hint updated");
                    }
                    self.hint = Some(index);
                    return Ok(connection);
                }
                Err(ConnectError::NoEndpoints) => return Err(ClientError::NoEndpoints),
                Err(error) => {
                    failed_sweeps += 1;
                    if policy.max_sweeps.is_some_and(|max| failed_sweeps >= max) {
                        return Err(ClientError::ConnectivityExhausted {
                            sweeps: failed_sweeps,
                            source: error,
                        });
                    }
                    warn!(
                        target: REQUEST_LOOP_TARGET,
                        failed_sweeps,
                        delay_ms = policy.delay.as_millis(),
                        %error,
                        "no replica reachable; retrying"
                    );
                    time::sleep(policy.delay).await;
                }
            }
        }
    }

    fn summary(&self) -> RunSummary {
        RunSummary {
            delivered: self.delivered,
            next_request_id: self.next_request_id,
        }
    }

    /// Identifier the next command will carry.
    pub const fn next_request_id(&self) -> RequestId {
        self.next_request_id
    }

    /// Index of the endpoint that last accepted a connection.
    pub const fn leader_hint(&self) -> Option<usize> {
        self.hint
    }

    /// The command source.
    pub const fn source(&self) -> &S {
        &self.source
    }

    /// The stats sink.
    pub const fn stats(&self) -> &T {
        &self.stats
    }

    /// Flushes the stats sink.
    pub fn flush_stats(&mut self) -> Result<(), StatsError> {
        self.stats.flush()
    }
}

/// Checks that `response` answers `request`.
fn validate(request: &ClientRequest, response: &ClientResponse) -> Result<(), ProtocolViolation> {
    if response.is_empty() {
        return Err(ProtocolViolation::EmptyResponse);
    }
    if response.answers(request) {
        return Ok(());
    }
    if response.client_id != request.client_id {
        return Err(ProtocolViolation::ClientIdMismatch {
            expected: request.client_id,
            received: response.client_id,
        });
    }
    Err(ProtocolViolation::RequestIdMismatch {
        expected: request.request_id,
        received: response.request_id,
    })
}
