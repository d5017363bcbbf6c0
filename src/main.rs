use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use switchboard::{Config, HttpServer, StatusCode};
use tokio::sync::RwLock;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct User {
    id: u64,
    name: String,
    age: u32,
}

#[derive(Debug, Serialize)]
struct Reply<'a> {
    status: u16,
    message: &'a str,
}

type Users = Arc<RwLock<HashMap<u64, User>>>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_level(true)
        .init();

    let cfg = Config::load()?;
    let users: Users = Arc::default();

    let mut server = HttpServer::with_config(cfg.clone());

    let store = Arc::clone(&users);
    server.post("/users", move |req, resp| {
        let store = Arc::clone(&store);
        async move {
            let Some(user) = req.extract::<User>() else {
                let reply = Reply { status: 400, message: "Invalid request expected user body" };
                // Without status() this reply would go out as 201, like any send.
                if let Err(e) = resp.status(StatusCode::BadRequest).send(&reply) {
                    tracing::error!(error = %e, "Failed to reply");
                }
                return;
            };

            tracing::info!(id = user.id, name = %user.name, "Storing user");
            store.write().await.insert(user.id, user);

            let reply = Reply { status: 201, message: "User created successfully" };
            if let Err(e) = resp.send(&reply) {
                tracing::error!(error = %e, "Failed to reply");
            }
        }
    });

    let store = Arc::clone(&users);
    server.get("/users", move |_req, resp| {
        let store = Arc::clone(&store);
        async move {
            let mut all: Vec<User> = store.read().await.values().cloned().collect();
            all.sort_by_key(|u| u.id);
            if let Err(e) = resp.status(StatusCode::Ok).send(&all) {
                tracing::error!(error = %e, "Failed to reply");
            }
        }
    });

    let handle = server.bind(&cfg.listen_addr).await?;

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");
    handle.shutdown().await;

    Ok(())
}
