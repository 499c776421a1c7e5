//! One bounded request/reply exchange on an established connection.

use std::io;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::time;
use tokio_util::codec::LinesCodecError;
use tracing::debug;

use crate::connector::Connection;
use crate::errors::DispatchError;

pub(crate) const DISPATCH_TARGET: &str = "relay::dispatch";

/// Sends `request` as one line and waits for one reply line.
///
/// The exchange races a timer set to `timeout`; whichever finishes first
/// decides the outcome. A losing exchange is dropped, which cancels its
/// pending write or read, so a late reply is never delivered to anyone. The
/// connection should be discarded after any error because a cancelled read may
/// have consumed part of a frame.
pub async fn dispatch(
    request: &str,
    connection: &mut Connection,
    timeout: Duration,
) -> Result<String, DispatchError> {
    time::timeout(timeout, exchange(request, connection))
        .await
        .unwrap_or(Err(DispatchError::Timeout { timeout }))
}

async fn exchange(request: &str, connection: &mut Connection) -> Result<String, DispatchError> {
    let framed = connection.framed_mut();
    framed.send(request).await.map_err(DispatchError::from)?;
    debug!(target: DISPATCH_TARGET, "request sent");

    match framed.next().await {
        Some(Ok(reply)) => Ok(reply),
        Some(Err(error)) => Err(DispatchError::from(error)),
        None => Err(DispatchError::Closed),
    }
}

impl From<LinesCodecError> for DispatchError {
    fn from(error: LinesCodecError) -> Self {
        match error {
            LinesCodecError::MaxLineLengthExceeded => Self::FrameTooLong,
            LinesCodecError::Io(source) if source.kind() == io::ErrorKind::UnexpectedEof => {
                Self::Closed
            }
            LinesCodecError::Io(source) => Self::Io { source },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connector::{MAX_FRAME_LENGTH, connect};
    use crate::tests::support::{FakeReplica, Reply};
    use std::time::Instant;

    async fn connection_to(replica: &FakeReplica) -> Connection {
        let (connection, _) = connect(&[replica.endpoint()], 1, 0)
            .await
            .expect("connect to fake replica");
        connection
    }

    #[tokio::test]
    async fn returns_the_reply_line() {
        let replica = FakeReplica::spawn(|_, _| Reply::Raw(String::from("pong"))).await;
        let mut connection = connection_to(&replica).await;

        let reply = dispatch("ping", &mut connection, Duration::from_secs(2))
            .await
            .expect("exchange should succeed");

        assert_eq!(reply, "pong");
        assert_eq!(replica.raw_lines(), vec![String::from("ping")]);
    }

    #[tokio::test]
    async fn silent_replica_times_out_after_deadline() {
        let replica = FakeReplica::spawn(|_, _| Reply::Silent).await;
        let mut connection = connection_to(&replica).await;
        let timeout = Duration::from_millis(150);

        let started = Instant::now();
        let error = dispatch("ping", &mut connection, timeout)
            .await
            .expect_err("silent replica must time out");
        let elapsed = started.elapsed();

        assert!(matches!(error, DispatchError::Timeout { .. }));
        assert!(elapsed >= timeout, "returned early after {elapsed:?}");
        assert!(
            elapsed < timeout + Duration::from_secs(1),
            "returned late after {elapsed:?}"
        );
    }

    #[tokio::test]
    async fn closed_stream_is_a_failure() {
        let replica = FakeReplica::spawn(|_, _| Reply::Close).await;
        let mut connection = connection_to(&replica).await;

        let error = dispatch("ping", &mut connection, Duration::from_secs(2))
            .await
            .expect_err("closed stream must fail");

        assert!(
            matches!(error, DispatchError::Closed | DispatchError::Io { .. }),
            "unexpected error: {error:?}"
        );
    }

    #[tokio::test]
    async fn oversized_reply_is_rejected() {
        let replica =
            FakeReplica::spawn(|_, _| Reply::Raw("x".repeat(MAX_FRAME_LENGTH + 1))).await;
        let mut connection = connection_to(&replica).await;

        let error = dispatch("ping", &mut connection, Duration::from_secs(5))
            .await
            .expect_err("oversized reply must fail");

        assert!(matches!(error, DispatchError::FrameTooLong));
    }

    #[test]
    fn codec_errors_map_to_dispatch_errors() {
        let eof = LinesCodecError::Io(io::Error::new(io::ErrorKind::UnexpectedEof, "eof"));
        assert!(matches!(DispatchError::from(eof), DispatchError::Closed));
        let reset = LinesCodecError::Io(io::Error::new(io::ErrorKind::ConnectionReset, "reset"));
        assert!(matches!(DispatchError::from(reset), DispatchError::Io { .. }));
    }
}
