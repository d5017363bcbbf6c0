//! Switchboard - path-routed JSON HTTP server
//!
//! Register one async handler per path, then `listen`. Handlers receive an
//! [`HttpRequest`] with the fully buffered body and an [`HttpResponse`] that
//! serializes a value to JSON and finalizes the reply exactly once.

pub mod config;
pub mod http;
pub mod server;

pub use config::Config;
pub use http::{Envelope, HttpRequest, HttpResponse, Method, StatusCode};
pub use server::{HttpServer, ServerHandle};
