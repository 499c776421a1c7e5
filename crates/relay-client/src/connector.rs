//! Replica connection establishment.
//!
//! [`connect`] performs one sweep: the hinted endpoint gets a single fast-path
//! attempt, then every endpoint is tried in order. Retry policy across sweeps
//! belongs to the request loop.

use std::io;
use std::time::Duration;

use relay_config::Endpoint;
use tokio::net::TcpStream;
use tokio::time;
use tokio_util::codec::{Framed, LinesCodec};
use tracing::{debug, info, warn};

use crate::errors::ConnectError;

pub(crate) const CONNECTOR_TARGET: &str = "relay::connector";

/// Upper bound on a single TCP connection attempt.
pub(crate) const CONNECTION_TIMEOUT: Duration = Duration::from_secs(5);

/// Longest reply line accepted from a replica, in bytes.
pub(crate) const MAX_FRAME_LENGTH: usize = 1024 * 1024;

/// An open, newline-framed session with one replica.
#[derive(Debug)]
pub struct Connection {
    endpoint: Endpoint,
    index: usize,
    framed: Framed<TcpStream, LinesCodec>,
}

impl Connection {
    fn new(endpoint: &Endpoint, index: usize, stream: TcpStream) -> Self {
        Self {
            endpoint: endpoint.clone(),
            index,
            framed: Framed::new(stream, LinesCodec::new_with_max_length(MAX_FRAME_LENGTH)),
        }
    }

    /// Endpoint this session is bound to.
    #[must_use]
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Position of the endpoint in the configured list.
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    pub(crate) fn framed_mut(&mut self) -> &mut Framed<TcpStream, LinesCodec> {
        &mut self.framed
    }
}

/// Opens a connection to one of `endpoints`, preferring `hint`.
///
/// The endpoint at `hint` (reduced modulo the list length) is tried exactly
/// once. If that fails, every endpoint is tried in list order, each up to
/// `attempts_per_endpoint` times. Returns the connection together with the
/// index of the endpoint that accepted it.
pub async fn connect(
    endpoints: &[Endpoint],
    attempts_per_endpoint: u32,
    hint: usize,
) -> Result<(Connection, usize), ConnectError> {
    if endpoints.is_empty() {
        return Err(ConnectError::NoEndpoints);
    }
    let hint = hint % endpoints.len();

    let mut attempts = 0u32;
    let mut last_error = io::Error::new(io::ErrorKind::NotConnected, "no connection attempted");

    let candidates = endpoints
        .get(hint)
        .map(|endpoint| (hint, endpoint))
        .into_iter()
        .chain(endpoints.iter().enumerate().flat_map(|(index, endpoint)| {
            (0..attempts_per_endpoint.max(1)).map(move |_| (index, endpoint))
        }));

    for (index, endpoint) in candidates {
        attempts += 1;
        info!(target: CONNECTOR_TARGET, endpoint = %endpoint, index, "trying to connect");
        match open_stream(endpoint).await {
            Ok(stream) => {
                info!(target: CONNECTOR_TARGET, endpoint = %endpoint, index, "connection established");
                return Ok((Connection::new(endpoint, index, stream), index));
            }
            Err(error) => {
                warn!(target: CONNECTOR_TARGET, endpoint = %endpoint, index, %error, "connection attempt failed");
                last_error = error;
            }
        }
    }

    Err(ConnectError::Exhausted {
        attempts,
        source: last_error,
    })
}

async fn open_stream(endpoint: &Endpoint) -> io::Result<TcpStream> {
    let stream = time::timeout(
        CONNECTION_TIMEOUT,
        TcpStream::connect((endpoint.host(), endpoint.port())),
    )
    .await
    .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "connection attempt timed out"))??;
    if let Err(error) = stream.set_nodelay(true) {
        debug!(target: CONNECTOR_TARGET, endpoint = %endpoint, %error, "failed to disable Nagle");
    }
    Ok(stream)
}
