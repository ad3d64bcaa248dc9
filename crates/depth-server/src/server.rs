//! TCP listener and top-level server wiring.
//!
//! This module:
//! - Listens on the configured address/port.
//! - Accepts new TCP connections and assigns each a `ClientId`.
//! - Spawns:
//!   - a single writer task that owns the `DepthWriter`,
//!   - a per-client task to handle I/O, holding a `DepthReader` for queries.
//!
//! The per-client logic and the writer loop live in `client` and
//! `feed_task` respectively.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use depth_core::{shared_engine, DepthReader};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::client;
use crate::config::{Config, ConfigError};
use crate::feed_task;
use crate::types::{ClientId, ClientRegistry, FeedTx};

/// Counter for assigning unique `ClientId`s.
static NEXT_CLIENT_ID: AtomicU64 = AtomicU64::new(1);

fn next_client_id() -> ClientId {
    let id = NEXT_CLIENT_ID.fetch_add(1, Ordering::Relaxed);
    ClientId(id)
}

/// Bind to the configured address and serve until an accept error.
pub async fn run(config: Config) -> Result<()> {
    let addr = config.socket_addr_string();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("bind {}", addr))?;
    info!(%addr, "listening");

    serve(listener, config).await
}

/// Start the engine and its writer task.
///
/// Returns the feed channel, a reader over the engine and the writer task
/// handle, which finishes once every `FeedTx` clone is dropped.
pub fn spawn_engine(config: &Config) -> Result<(FeedTx, DepthReader, JoinHandle<()>), ConfigError> {
    config.validate()?;

    let (writer, reader) = shared_engine();
    let (feed_tx, feed_rx) = mpsc::channel(config.feed_queue_capacity);
    let handle = tokio::spawn(feed_task::run_feed_loop(feed_rx, writer));
    Ok((feed_tx, reader, handle))
}

/// Accept connections on an already bound listener.
pub async fn serve(listener: TcpListener, config: Config) -> Result<()> {
    config.validate()?;

    let clients: ClientRegistry = Arc::new(tokio::sync::RwLock::new(Default::default()));
    let (feed_tx, reader, _writer) = spawn_engine(&config)?;

    loop {
        let (stream, peer_addr) = listener.accept().await.context("accept")?;
        let current_clients = {
            let guard = clients.read().await;
            guard.len()
        };

        if current_clients >= config.max_clients {
            warn!(
                %peer_addr,
                max_clients = config.max_clients,
                "rejecting connection: max_clients reached"
            );
            // Dropping the stream closes the connection.
            continue;
        }

        let client_id = next_client_id();
        info!(client = client_id.0, %peer_addr, "accepted connection");

        {
            let mut guard = clients.write().await;
            guard.insert(client_id, peer_addr);
        }

        let clients_clone = clients.clone();
        let feed_tx_clone = feed_tx.clone();
        let reader_clone = reader.clone();

        tokio::spawn(async move {
            if let Err(e) =
                client::run_client(client_id, stream, feed_tx_clone, reader_clone).await
            {
                warn!(client = client_id.0, error = %format!("{:#}", e), "client error");
            } else {
                info!(client = client_id.0, "client disconnected");
            }

            let mut guard = clients_clone.write().await;
            guard.remove(&client_id);
        });
    }
}
