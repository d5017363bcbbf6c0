use std::collections::HashMap;
use std::fmt;

use serde::Serialize;
use tokio::sync::oneshot;

use crate::http::envelope::Envelope;

/// HTTP status codes the server emits.
///
/// - `Ok` (200): Request successful
/// - `Created` (201): Default status of [`HttpResponse::send`]
/// - `BadRequest` (400): Malformed request
/// - `NotFound` (404): No handler for the path
/// - `PayloadTooLarge` (413): Body over the configured limit
/// - `InternalServerError` (500): Receive or serialization failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    /// 200 OK
    Ok,
    /// 201 Created
    Created,
    /// 400 Bad Request
    BadRequest,
    /// 404 Not Found
    NotFound,
    /// 413 Payload Too Large
    PayloadTooLarge,
    /// 500 Internal Server Error
    InternalServerError
}

impl StatusCode {
    /// Returns the numeric HTTP status code.
    ///
    /// # Example
    ///
    /// ```
    /// # use switchboard::http::response::StatusCode;
    /// assert_eq!(StatusCode::Created.as_u16(), 201);
    /// assert_eq!(StatusCode::NotFound.as_u16(), 404);
    /// ```
    pub fn as_u16(&self) -> u16 {
        match self {
            StatusCode::Ok => 200,
            StatusCode::Created => 201,
            StatusCode::BadRequest => 400,
            StatusCode::NotFound => 404,
            StatusCode::PayloadTooLarge => 413,
            StatusCode::InternalServerError => 500,
        }
    }

    /// Returns the standard HTTP reason phrase for this status code.
    pub fn reason_phrase(&self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::Created => "Created",
            StatusCode::BadRequest => "Bad Request",
            StatusCode::NotFound => "Not Found",
            StatusCode::PayloadTooLarge => "Payload Too Large",
            StatusCode::InternalServerError => "Internal Server Error",
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.as_u16(), self.reason_phrase())
    }
}

/// Represents a complete HTTP response ready to be sent to a client.
#[derive(Debug)]
pub struct Response {
    /// The HTTP status code
    pub status: StatusCode,
    /// HTTP headers as key-value pairs
    pub headers: HashMap<String, String>,
    /// Response body as bytes
    pub body: Vec<u8>,
}

/// Builder for constructing HTTP responses in a fluent style.
///
/// # Example
///
/// ```ignore
/// let response = ResponseBuilder::new(StatusCode::Ok)
///     .header("Content-Type", "application/json")
///     .body(b"{}".to_vec())
///     .build();
/// ```
pub struct ResponseBuilder {
    status: StatusCode,
    headers: HashMap<String, String>,
    body: Vec<u8>,
}

impl ResponseBuilder {
    /// Creates a new response builder with the specified status code.
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: Vec::new(),
        }
    }

    /// Adds or replaces a header.
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Sets the response body.
    pub fn body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    /// Builds the final Response.
    ///
    /// Automatically adds the Content-Length header based on body size if not already present.
    pub fn build(mut self) -> Response {
        self.headers
            .entry("Content-Length".to_string())
            .or_insert_with(|| self.body.len().to_string());

        Response {
            status: self.status,
            headers: self.headers,
            body: self.body,
        }
    }
}

impl Response {
    /// A response carrying an already serialized JSON body.
    pub fn json(status: StatusCode, body: Vec<u8>) -> Self {
        ResponseBuilder::new(status)
            .header("Content-Type", "application/json")
            .body(body)
            .build()
    }

    /// A framework reply carrying an [`Envelope`].
    pub fn envelope(status: StatusCode, message: impl Into<String>) -> Self {
        Self::json(status, Envelope::new(status, message).to_json())
    }

    /// Marks the response as the last one on its connection.
    pub fn closing(mut self) -> Self {
        self.headers
            .insert("Connection".to_string(), "close".to_string());
        self
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ResponseError {
    /// The body could not be serialized; a 500 envelope was sent instead.
    #[error("Failed to convert the given type to json with error {0}")]
    Serialize(#[from] serde_json::Error),
    /// The connection went away before the response could be handed over.
    #[error("connection closed before the response was sent")]
    Closed,
}

/// A response that was not sent because its body failed to serialize.
///
/// Returned by [`HttpResponse::try_send`]; the handle is still unused and
/// can be finalized with something else.
#[derive(Debug)]
pub struct Unsent {
    pub response: HttpResponse,
    pub error: serde_json::Error,
}

/// The reply side of one request.
///
/// Finalizing consumes the handle, so a request gets at most one response.
/// Dropping it without sending makes the server reply with a 500 envelope.
#[derive(Debug)]
pub struct HttpResponse {
    status: Option<StatusCode>,
    sink: oneshot::Sender<Response>,
}

impl HttpResponse {
    pub fn new(sink: oneshot::Sender<Response>) -> Self {
        Self { status: None, sink }
    }

    /// A response handle together with the receiver its finalized
    /// [`Response`] arrives on.
    pub fn channel() -> (Self, oneshot::Receiver<Response>) {
        let (tx, rx) = oneshot::channel();
        (Self::new(tx), rx)
    }

    /// Status used on a successful send. Defaults to 201 when never set.
    pub fn status(mut self, status: StatusCode) -> Self {
        self.status = Some(status);
        self
    }

    /// Serializes `body` as JSON and finalizes the response.
    ///
    /// If serialization fails the body is dropped and a 500 envelope is sent
    /// in its place; the error is still returned so the caller can log it.
    /// Either way the response is finalized.
    pub fn send<T: Serialize + ?Sized>(self, body: &T) -> Result<StatusCode, ResponseError> {
        let status = self.status.unwrap_or(StatusCode::Created);
        match serde_json::to_vec(body) {
            Ok(bytes) => {
                self.finalize(Response::json(status, bytes))?;
                Ok(status)
            }
            Err(e) => {
                let err = ResponseError::Serialize(e);
                let message = err.to_string();
                tracing::error!("{}", message);
                self.finalize(Response::envelope(StatusCode::InternalServerError, message))?;
                Err(err)
            }
        }
    }

    /// Like [`HttpResponse::send`], but hands the response back untouched
    /// when `body` fails to serialize.
    ///
    /// A connection that is already gone is not an error here; the reply is
    /// dropped and logged.
    pub fn try_send<T: Serialize + ?Sized>(self, body: &T) -> Result<StatusCode, Unsent> {
        let status = self.status.unwrap_or(StatusCode::Created);
        let bytes = match serde_json::to_vec(body) {
            Ok(bytes) => bytes,
            Err(error) => return Err(Unsent { response: self, error }),
        };

        if self.finalize(Response::json(status, bytes)).is_err() {
            tracing::debug!("Response dropped, connection already closed");
        }
        Ok(status)
    }

    fn finalize(self, response: Response) -> Result<(), ResponseError> {
        self.sink.send(response).map_err(|_| ResponseError::Closed)
    }
}
