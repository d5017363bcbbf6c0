use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::info;

use crate::config::{Config, Limits};
use crate::http::connection::Connection;
use crate::http::request::{HttpRequest, Method};
use crate::http::response::HttpResponse;
use crate::server::router::RouteTable;

/// Routes requests by path to registered handlers.
///
/// Handlers are registered on the un-started server. `listen`/`bind`
/// consume it and freeze the route table, so registration never races
/// with traffic.
///
/// ```ignore
/// let mut server = HttpServer::new();
/// server.post("/users", |req, resp| async move {
///     let _ = resp.send(&req.extract::<serde_json::Value>());
/// });
/// let handle = server.listen(3000).await?;
/// ```
#[derive(Debug, Default)]
pub struct HttpServer {
    routes: RouteTable,
    config: Config,
}

impl HttpServer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: Config) -> Self {
        Self {
            routes: RouteTable::new(),
            config,
        }
    }

    /// Registers `handler` for `path`.
    ///
    /// The method does not take part in routing: a later registration for
    /// the same path replaces this one whatever its method.
    pub fn register<F, Fut>(&mut self, method: Method, path: impl Into<String>, handler: F) -> &mut Self
    where
        F: Fn(HttpRequest, HttpResponse) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.routes.insert(method, path, handler);
        self
    }

    pub fn get<F, Fut>(&mut self, path: impl Into<String>, handler: F) -> &mut Self
    where
        F: Fn(HttpRequest, HttpResponse) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.register(Method::GET, path, handler)
    }

    pub fn post<F, Fut>(&mut self, path: impl Into<String>, handler: F) -> &mut Self
    where
        F: Fn(HttpRequest, HttpResponse) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.register(Method::POST, path, handler)
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Binds `port` on the configured host and starts accepting.
    pub async fn listen(self, port: u16) -> anyhow::Result<ServerHandle> {
        let addr = format!("{}:{}", self.config.host(), port);
        self.bind(&addr).await
    }

    /// Binds `addr` and starts accepting on a background task.
    ///
    /// Returns once the socket is bound.
    pub async fn bind(self, addr: &str) -> anyhow::Result<ServerHandle> {
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind {}", addr))?;
        let local_addr = listener.local_addr()?;
        info!("Listening on {}", local_addr);

        let (shutdown, signal) = watch::channel(false);
        let routes = Arc::new(self.routes);
        let task = tokio::spawn(run(listener, routes, self.config.limits, signal));

        Ok(ServerHandle {
            local_addr,
            shutdown,
            task,
        })
    }
}

/// A running server.
#[derive(Debug)]
pub struct ServerHandle {
    local_addr: SocketAddr,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl ServerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stops accepting new connections. Connections already accepted run
    /// to completion on their own tasks.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            tracing::error!("Accept loop ended abnormally: {}", e);
        }
    }
}

async fn run(
    listener: TcpListener,
    routes: Arc<RouteTable>,
    limits: Limits,
    mut shutdown: watch::Receiver<bool>,
) {
    let stopped = async move {
        // A dropped handle leaves the server running.
        let dropped = shutdown.wait_for(|stop| *stop).await.is_err();
        if dropped {
            std::future::pending::<()>().await;
        }
    };
    tokio::pin!(stopped);

    loop {
        let accepted = tokio::select! {
            res = listener.accept() => res,
            _ = &mut stopped => {
                info!("Listener shutting down");
                return;
            }
        };

        let (socket, peer) = match accepted {
            Ok(conn) => conn,
            Err(e) => {
                // Per-connection accept failures (e.g. fd exhaustion) are not fatal.
                tracing::error!("Failed to accept connection: {}", e);
                continue;
            }
        };
        info!("Accepted connection from {}", peer);

        let routes = Arc::clone(&routes);
        tokio::spawn(async move {
            let mut conn = Connection::new(socket, peer, routes, limits);
            if let Err(e) = conn.run().await {
                tracing::error!("Connection error from {}: {}", peer, e);
            }
        });
    }
}
