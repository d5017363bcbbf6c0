use std::collections::HashMap;
use std::fmt;

use serde::de::DeserializeOwned;

/// HTTP request methods.
///
/// Routing ignores the method; it is kept for logging and for handlers that
/// want to inspect it. Any valid method token is accepted, the common ones
/// get their own variant.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Method {
    /// GET - Retrieve a resource
    GET,
    /// POST - Create or submit data
    POST,
    /// PUT - Replace a resource
    PUT,
    /// DELETE - Delete a resource
    DELETE,
    /// HEAD - Like GET but without the response body
    HEAD,
    /// OPTIONS - Describe communication options
    OPTIONS,
    /// PATCH - Partial modification of a resource
    PATCH,
    /// Any other method token (TRACE, PURGE, CONNECT, ...)
    Other(String),
}

impl Method {
    /// Parses an HTTP method from a string.
    ///
    /// Methods are case-sensitive: "get" is a valid token but not `GET`.
    /// Returns `None` only when `s` is not a valid token.
    ///
    /// # Example
    ///
    /// ```
    /// # use switchboard::http::request::Method;
    /// assert_eq!(Method::from_str("GET"), Some(Method::GET));
    /// assert_eq!(Method::from_str("PURGE"), Some(Method::Other("PURGE".into())));
    /// assert_eq!(Method::from_str("G T"), None);
    /// ```
    pub fn from_str(s: &str) -> Option<Self> {
        let method = match s {
            "GET" => Method::GET,
            "POST" => Method::POST,
            "PUT" => Method::PUT,
            "DELETE" => Method::DELETE,
            "HEAD" => Method::HEAD,
            "OPTIONS" => Method::OPTIONS,
            "PATCH" => Method::PATCH,
            _ if is_token(s) => Method::Other(s.to_string()),
            _ => return None,
        };
        Some(method)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Method::GET => "GET",
            Method::POST => "POST",
            Method::PUT => "PUT",
            Method::DELETE => "DELETE",
            Method::HEAD => "HEAD",
            Method::OPTIONS => "OPTIONS",
            Method::PATCH => "PATCH",
            Method::Other(token) => token,
        }
    }
}

/// RFC 9110 `token`: one or more tchars.
fn is_token(s: &str) -> bool {
    !s.is_empty()
        && s.bytes().all(|b| {
            b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
        })
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The request line and headers of an incoming request.
///
/// The body is read separately once a route has been found for `target`.
#[derive(Debug, Clone)]
pub struct RequestHead {
    /// The HTTP method (GET, POST, etc.)
    pub method: Method,
    /// The raw request target, query string included (e.g. "/users?page=2")
    pub target: String,
    /// HTTP version (typically "HTTP/1.1")
    pub version: String,
    /// Request headers keyed by lowercase name. Repeated headers are joined
    /// with ", ".
    pub headers: HashMap<String, String>,
}

impl RequestHead {
    /// Retrieves a header value by name, ignoring ASCII case.
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers
            .get(&key.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Retrieves the Content-Length header value and parses it as a usize.
    ///
    /// Returns 0 if the header is missing or not a valid number.
    pub fn content_length(&self) -> usize {
        self.header("Content-Length")
            .and_then(|v| v.parse().ok())
            .unwrap_or(0)
    }

    /// Whether the body uses chunked transfer encoding.
    pub fn is_chunked(&self) -> bool {
        self.header("Transfer-Encoding")
            .map(|v| {
                v.rsplit(',')
                    .next()
                    .is_some_and(|last| last.trim().eq_ignore_ascii_case("chunked"))
            })
            .unwrap_or(false)
    }

    /// Determines whether the connection should remain open after the response.
    ///
    /// An explicit Connection header wins. Otherwise HTTP/1.1 defaults to
    /// keep-alive and HTTP/1.0 to close.
    pub fn keep_alive(&self) -> bool {
        match self.header("Connection") {
            Some(v) if v.eq_ignore_ascii_case("close") => false,
            Some(v) if v.eq_ignore_ascii_case("keep-alive") => true,
            _ => self.version != "HTTP/1.0",
        }
    }
}

/// Failure to decode a request body into the requested type.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct ExtractError(#[from] serde_json::Error);

/// The fully received request handed to a handler.
///
/// Holds the body as text; nothing is decoded until a handler asks for it.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    method: Method,
    path: String,
    body: String,
}

impl HttpRequest {
    pub fn new(method: Method, path: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: body.into(),
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The pathname the request was routed on.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    /// Decodes the body as JSON into `T`.
    ///
    /// Returns `None` when the body is not valid JSON or does not fit `T`;
    /// the failure is logged. Use [`HttpRequest::try_extract`] to get the
    /// error instead.
    pub fn extract<T: DeserializeOwned>(&self) -> Option<T> {
        match self.try_extract() {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::error!(
                    path = %self.path,
                    error = %e,
                    "Failed to extract given type from request"
                );
                None
            }
        }
    }

    pub fn try_extract<T: DeserializeOwned>(&self) -> Result<T, ExtractError> {
        Ok(serde_json::from_str(&self.body)?)
    }
}
