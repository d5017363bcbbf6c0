//! HTTP protocol implementation.
//!
//! A small HTTP/1.1 server with keep-alive support, routing each request to
//! a handler by path and speaking JSON in both directions.
//!
//! # Architecture
//!
//! - **`connection`**: The per-connection request/response state machine
//! - **`parser`**: Parses request heads and chunked bodies from byte buffers
//! - **`request`**: Request head and the `HttpRequest` handed to handlers
//! - **`response`**: Status codes, `Response` and the one-shot `HttpResponse`
//! - **`envelope`**: The `{status, message}` body of framework replies
//! - **`writer`**: Serializes and writes responses to the client
//!
//! # Connection State Machine
//!
//! ```text
//!        ┌─────────────┐
//!        │   Reading   │ ← Wait for a request head
//!        └──────┬──────┘
//!               ├─ No handler for path ──────────► NoRoute ──┐
//!               ▼                                            │
//!        ┌──────────────────┐                                │
//!        │  AwaitingBody    │ ← Buffer the whole body        │
//!        └──────┬───────────┘                                │
//!               ├─ Transport failure ────────────► Errored ──┤
//!               ▼                                            │
//!        ┌──────────────────┐                                │
//!        │  BodyComplete    │ → spawn handler                │
//!        └──────┬───────────┘                                │
//!               ▼                                            │
//!        ┌──────────────────┐                                │
//!        │   Dispatched     │ ← Await the handler's reply    │
//!        └──────┬───────────┘                                │
//!               ▼                                            │
//!        ┌──────────────────┐                                │
//!        │    Writing       │ ◄──────────────────────────────┘
//!        └──────┬───────────┘
//!               ├─ Keep-Alive → Reading (same connection)
//!               └─ Close → Closed
//! ```

pub mod connection;
pub mod envelope;
pub mod parser;
pub mod request;
pub mod response;
pub mod writer;

pub use envelope::Envelope;
pub use request::{HttpRequest, Method};
pub use response::{HttpResponse, StatusCode};
