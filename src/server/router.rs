//! Path to handler table.
//!
//! Lookup is by exact pathname. The method given at registration is only
//! logged: one path maps to one handler whatever the request method.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::http::request::{HttpRequest, Method};
use crate::http::response::HttpResponse;

pub type HandlerFuture = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// A registered request handler.
pub type Handler = Arc<dyn Fn(HttpRequest, HttpResponse) -> HandlerFuture + Send + Sync>;

#[derive(Clone, Default)]
pub struct RouteTable {
    routes: HashMap<String, Handler>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `handler` to `path`, replacing any handler already there.
    pub fn insert<F, Fut>(&mut self, method: Method, path: impl Into<String>, handler: F)
    where
        F: Fn(HttpRequest, HttpResponse) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let path = path.into();
        let handler: Handler =
            Arc::new(move |req: HttpRequest, resp: HttpResponse| -> HandlerFuture {
                Box::pin(handler(req, resp))
            });

        if self.routes.insert(path.clone(), handler).is_some() {
            tracing::warn!(%method, %path, "Replacing existing handler");
        } else {
            tracing::debug!(%method, %path, "Handler registered");
        }
    }

    pub fn lookup(&self, path: &str) -> Option<&Handler> {
        self.routes.get(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.routes.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl fmt::Debug for RouteTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.routes.keys()).finish()
    }
}

/// Extracts the pathname from a request target, dropping query and fragment.
///
/// Origin-form targets ("/users?id=1") are taken verbatim up to the query.
/// Absolute-form targets ("http://host/users") go through a URL parser.
/// Anything else ("*", garbage) has no pathname.
pub fn pathname(target: &str) -> Option<String> {
    if target.starts_with('/') {
        let end = target.find(['?', '#']).unwrap_or(target.len());
        return Some(target[..end].to_string());
    }

    match url::Url::parse(target) {
        Ok(url) if url.has_host() => Some(url.path().to_string()),
        _ => None,
    }
}
