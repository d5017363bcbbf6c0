use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::{Buf, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio::time::timeout;

use crate::config::Limits;
use crate::http::parser::{parse_request_head, ChunkedDecoder, ParseError};
use crate::http::request::{HttpRequest, RequestHead};
use crate::http::response::{HttpResponse, Response, StatusCode};
use crate::http::writer::ResponseWriter;
use crate::server::router::{pathname, Handler, RouteTable};

pub const NO_ROUTE_MESSAGE: &str = "No handler for given url";

/// How long a closing connection keeps draining unread request bytes.
const LINGER_TIMEOUT: Duration = Duration::from_secs(2);

/// Why a request could not be read off the wire.
#[derive(Debug, thiserror::Error)]
pub enum ReceiveError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("connection closed before the request was complete")]
    Closed,
    #[error("no data received within {0:?}")]
    TimedOut(Duration),
    #[error("request body exceeds the limit of {limit} bytes")]
    TooLarge { limit: usize },
    #[error(transparent)]
    Malformed(#[from] ParseError),
}

pub struct Connection<S = TcpStream> {
    stream: S,
    peer: SocketAddr,
    buffer: BytesMut,
    routes: Arc<RouteTable>,
    limits: Limits,
    state: ConnectionState,
}

/// Per-request progress on one connection.
///
/// `Reading` either routes to `AwaitingBody` or short-circuits to `NoRoute`.
/// A body ends in `BodyComplete` or `Errored`. Every branch reaches
/// `Writing` with exactly one response.
pub enum ConnectionState {
    Reading,
    NoRoute,
    AwaitingBody {
        head: RequestHead,
        path: String,
        handler: Handler,
    },
    BodyComplete {
        head: RequestHead,
        path: String,
        handler: Handler,
        body: String,
    },
    Dispatched {
        pending: oneshot::Receiver<Response>,
        keep_alive: bool,
    },
    Errored(ReceiveError),
    Writing(ResponseWriter, bool), // bool = keep_alive?
    Closed,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S, peer: SocketAddr, routes: Arc<RouteTable>, limits: Limits) -> Self {
        Self {
            stream,
            peer,
            buffer: BytesMut::with_capacity(4096),
            routes,
            limits,
            state: ConnectionState::Reading,
        }
    }

    pub async fn run(&mut self) -> anyhow::Result<()> {
        loop {
            match std::mem::replace(&mut self.state, ConnectionState::Closed) {
                ConnectionState::Reading => {
                    self.state = match self.read_head().await {
                        Ok(Some(head)) => self.route(head),
                        Ok(None) => ConnectionState::Closed,
                        Err(ReceiveError::Malformed(e)) => {
                            tracing::warn!(peer = %self.peer, error = %e, "Malformed request");
                            let response = Response::envelope(
                                StatusCode::BadRequest,
                                format!("Malformed request {}", e),
                            );
                            Self::writing(response, false)
                        }
                        Err(e) => {
                            tracing::debug!(peer = %self.peer, error = %e, "Connection dropped before a full request");
                            ConnectionState::Closed
                        }
                    };
                }

                ConnectionState::NoRoute => {
                    let response = Response::envelope(StatusCode::NotFound, NO_ROUTE_MESSAGE);
                    self.state = Self::writing(response, false);
                }

                ConnectionState::AwaitingBody { head, path, handler } => {
                    self.state = match self.read_body(&head).await {
                        Ok(bytes) => {
                            let body = String::from_utf8_lossy(&bytes).into_owned();
                            tracing::debug!(peer = %self.peer, %path, %body, "Received request body");
                            ConnectionState::BodyComplete { head, path, handler, body }
                        }
                        Err(e) => ConnectionState::Errored(e),
                    };
                }

                ConnectionState::BodyComplete { head, path, handler, body } => {
                    tracing::info!(peer = %self.peer, method = %head.method, %path, "Dispatching request");

                    let keep_alive = head.keep_alive();
                    let (response, pending) = HttpResponse::channel();
                    let request = HttpRequest::new(head.method, path, body);

                    // Own task, so a panicking handler only loses its response.
                    tokio::spawn(handler(request, response));

                    self.state = ConnectionState::Dispatched { pending, keep_alive };
                }

                ConnectionState::Dispatched { pending, keep_alive } => {
                    self.state = match pending.await {
                        Ok(response) => Self::writing(response, keep_alive),
                        Err(_) => {
                            tracing::error!(peer = %self.peer, "Handler finished without sending a response");
                            let response = Response::envelope(
                                StatusCode::InternalServerError,
                                "Handler finished without sending a response",
                            );
                            Self::writing(response, false)
                        }
                    };
                }

                ConnectionState::Errored(e) => {
                    let response = match e {
                        ReceiveError::TooLarge { limit } => {
                            tracing::warn!(peer = %self.peer, limit, "Rejecting oversized request body");
                            Response::envelope(
                                StatusCode::PayloadTooLarge,
                                format!("Request body exceeds the limit of {} bytes", limit),
                            )
                        }
                        e => {
                            let message = format!("Failed to receive the request {}", e);
                            tracing::error!(peer = %self.peer, "{}", message);
                            Response::envelope(StatusCode::InternalServerError, message)
                        }
                    };
                    self.state = Self::writing(response, false);
                }

                ConnectionState::Writing(mut writer, keep_alive) => {
                    writer.write_to_stream(&mut self.stream).await?;

                    if keep_alive {
                        self.state = ConnectionState::Reading; // go back for next request
                    } else {
                        self.linger().await;
                        self.state = ConnectionState::Closed;
                    }
                }

                ConnectionState::Closed => {
                    break;
                }
            }
        }

        Ok(())
    }

    fn writing(response: Response, keep_alive: bool) -> ConnectionState {
        let response = if keep_alive { response } else { response.closing() };
        ConnectionState::Writing(ResponseWriter::new(&response), keep_alive)
    }

    fn route(&self, head: RequestHead) -> ConnectionState {
        let Some(path) = pathname(&head.target) else {
            tracing::info!(peer = %self.peer, target = %head.target, "Unparseable request target");
            return ConnectionState::NoRoute;
        };

        match self.routes.lookup(&path) {
            Some(handler) => ConnectionState::AwaitingBody {
                handler: Arc::clone(handler),
                head,
                path,
            },
            None => {
                tracing::info!(peer = %self.peer, method = %head.method, %path, "No handler for path");
                ConnectionState::NoRoute
            }
        }
    }

    pub async fn read_head(&mut self) -> Result<Option<RequestHead>, ReceiveError> {
        loop {
            // Try parsing whatever we already have
            match parse_request_head(&self.buffer) {
                Ok((head, consumed)) => {
                    self.buffer.advance(consumed);
                    return Ok(Some(head));
                }

                Err(ParseError::Incomplete) => {
                    // Need more data → fall through to read
                }

                Err(e) => return Err(e.into()),
            }

            match self.fill().await {
                Ok(()) => {}
                // Idle keep-alive connection went away or went quiet.
                Err(ReceiveError::Closed | ReceiveError::TimedOut(_)) if self.buffer.is_empty() => {
                    return Ok(None);
                }
                Err(e) => return Err(e),
            }
        }
    }

    pub async fn read_body(&mut self, head: &RequestHead) -> Result<Vec<u8>, ReceiveError> {
        let limit = self.limits.max_body_size;

        if head.is_chunked() {
            let mut decoder = ChunkedDecoder::new();
            loop {
                let done = decoder.decode(&mut self.buffer)?;
                if decoder.body_len() > limit {
                    return Err(ReceiveError::TooLarge { limit });
                }
                if done {
                    return Ok(decoder.into_body());
                }
                self.fill().await?;
            }
        }

        let len = head.content_length();
        if len > limit {
            return Err(ReceiveError::TooLarge { limit });
        }

        while self.buffer.len() < len {
            self.fill().await?;
        }

        Ok(self.buffer.split_to(len).to_vec())
    }

    /// Half-closes and discards whatever the client still sends, so unread
    /// request bytes do not turn the close into a reset that eats the reply.
    async fn linger(&mut self) {
        if self.stream.shutdown().await.is_err() {
            return;
        }

        let mut scratch = [0u8; 4096];
        let drain = async {
            loop {
                match self.stream.read(&mut scratch).await {
                    Ok(0) | Err(_) => break,
                    Ok(_) => {}
                }
            }
        };
        let _ = timeout(LINGER_TIMEOUT, drain).await;
    }

    /// Reads more bytes into the buffer, bounded by the read timeout.
    async fn fill(&mut self) -> Result<(), ReceiveError> {
        let wait = self.limits.read_timeout();
        let n = timeout(wait, self.stream.read_buf(&mut self.buffer))
            .await
            .map_err(|_| ReceiveError::TimedOut(wait))??;

        if n == 0 {
            // Client closed connection
            return Err(ReceiveError::Closed);
        }

        Ok(())
    }
}
