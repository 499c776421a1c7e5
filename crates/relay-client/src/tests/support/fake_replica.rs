//! Loopback replica for exercising the client against real sockets.
//!
//! Each accepted connection is numbered in accept order and every received
//! line is recorded. A handler decides how each request is answered. Lines
//! that are not valid requests are presented to the handler as a zero-id
//! request whose command is the raw line.

use std::net::TcpListener as StdTcpListener;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use relay_config::Endpoint;
use relay_wire::{ClientRequest, ClientResponse, decode_request, encode_response};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Notify;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time;
use tokio_util::codec::{Framed, LinesCodec};

/// How the replica answers one request.
#[derive(Debug, Clone)]
pub enum Reply {
    /// Answer with the request's own command text.
    Echo,
    /// Answer with this record.
    Respond(ClientResponse),
    /// Write this line verbatim.
    Raw(String),
    /// Keep the connection open and never answer.
    Silent,
    /// Drop the connection without answering.
    Close,
}

impl Reply {
    /// A well-formed answer to `request` carrying `text`.
    pub fn answer(request: &ClientRequest, text: impl Into<String>) -> Self {
        Self::Respond(ClientResponse {
            client_id: request.client_id,
            request_id: request.request_id,
            response: text.into(),
        })
    }
}

type Handler = dyn Fn(usize, &ClientRequest) -> Reply + Send + Sync;

#[derive(Default)]
struct Recorded {
    raw_lines: Vec<String>,
    requests: Vec<ClientRequest>,
}

/// A replica listening on an ephemeral loopback port.
pub struct FakeReplica {
    endpoint: Endpoint,
    recorded: Arc<Mutex<Recorded>>,
    connections: Arc<AtomicUsize>,
    accepted: Arc<Notify>,
    task: JoinHandle<()>,
}

impl FakeReplica {
    /// Starts a replica answering with `handler(connection_number, request)`.
    pub async fn spawn<F>(handler: F) -> Self
    where
        F: Fn(usize, &ClientRequest) -> Reply + Send + Sync + 'static,
    {
        let listener = TcpListener::bind(("127.0.0.1", 0))
            .await
            .expect("bind fake replica");
        let port = listener.local_addr().expect("fake replica address").port();
        let recorded = Arc::new(Mutex::new(Recorded::default()));
        let connections = Arc::new(AtomicUsize::new(0));
        let accepted = Arc::new(Notify::new());
        let handler: Arc<Handler> = Arc::new(handler);

        let task = tokio::spawn(accept_loop(
            listener,
            handler,
            Arc::clone(&recorded),
            Arc::clone(&connections),
            Arc::clone(&accepted),
        ));

        Self {
            endpoint: Endpoint::new("127.0.0.1", port),
            recorded,
            connections,
            accepted,
            task,
        }
    }

    /// Address clients should connect to.
    pub fn endpoint(&self) -> Endpoint {
        self.endpoint.clone()
    }

    /// Every line received, in arrival order.
    pub fn raw_lines(&self) -> Vec<String> {
        self.lock().raw_lines.clone()
    }

    /// Every decodable request received, in arrival order.
    pub fn requests(&self) -> Vec<ClientRequest> {
        self.lock().requests.clone()
    }

    /// Connections accepted so far.
    pub fn connection_count(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    /// Waits until at least `count` connections have been accepted.
    pub async fn wait_for_connections(&self, count: usize) {
        time::timeout(Duration::from_secs(5), async {
            loop {
                let accepted = self.accepted.notified();
                if self.connection_count() >= count {
                    return;
                }
                accepted.await;
            }
        })
        .await
        .expect("fake replica did not see the expected connections");
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Recorded> {
        self.recorded.lock().expect("fake replica state poisoned")
    }
}

impl Drop for FakeReplica {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn accept_loop(
    listener: TcpListener,
    handler: Arc<Handler>,
    recorded: Arc<Mutex<Recorded>>,
    connections: Arc<AtomicUsize>,
    accepted: Arc<Notify>,
) {
    let mut sessions = JoinSet::new();
    while let Ok((stream, _)) = listener.accept().await {
        let number = connections.fetch_add(1, Ordering::SeqCst);
        accepted.notify_waiters();
        sessions.spawn(serve(
            stream,
            number,
            Arc::clone(&handler),
            Arc::clone(&recorded),
        ));
    }
}

async fn serve(
    stream: TcpStream,
    number: usize,
    handler: Arc<Handler>,
    recorded: Arc<Mutex<Recorded>>,
) {
    let mut framed = Framed::new(stream, LinesCodec::new());
    while let Some(Ok(line)) = framed.next().await {
        let request = match decode_request(&line) {
            Ok(request) => {
                record(&recorded, &line, Some(&request));
                request
            }
            Err(_) => {
                record(&recorded, &line, None);
                ClientRequest {
                    client_id: 0,
                    request_id: 0,
                    replicate: false,
                    command: line,
                }
            }
        };

        let outgoing = match (*handler)(number, &request) {
            Reply::Echo => Reply::answer(&request, request.command.clone()),
            other => other,
        };
        let line = match outgoing {
            Reply::Respond(response) => encode_response(&response).expect("encode fake reply"),
            Reply::Raw(line) => line,
            Reply::Silent => continue,
            Reply::Close | Reply::Echo => return,
        };
        if framed.send(line).await.is_err() {
            return;
        }
    }
}

fn record(recorded: &Mutex<Recorded>, line: &str, request: Option<&ClientRequest>) {
    let mut recorded = recorded.lock().expect("fake replica state poisoned");
    recorded.raw_lines.push(line.to_owned());
    if let Some(request) = request {
        recorded.requests.push(request.clone());
    }
}

/// An endpoint on which nothing is listening.
pub fn unreachable_endpoint() -> Endpoint {
    let listener = StdTcpListener::bind(("127.0.0.1", 0)).expect("reserve a port");
    let port = listener.local_addr().expect("reserved address").port();
    drop(listener);
    Endpoint::new("127.0.0.1", port)
}
