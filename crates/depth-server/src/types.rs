//! Shared types for the depth TCP server.
//!
//! This module defines:
//! - `ClientId`: a lightweight handle for connected clients
//! - `FeedRequest`: events flowing from feed connections to the writer task
//! - channel and registry aliases

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use depth_core::FeedEvent;
use tokio::sync::mpsc;
use tokio::sync::RwLock;

/// Identifier for a connected client.
///
/// Opaque; unique over the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId(pub u64);

/// Wire protocol a connection speaks, detected from its first byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Csv,
    Binary,
}

/// Registry of connected clients and where they connected from.
pub type ClientRegistry = Arc<RwLock<HashMap<ClientId, SocketAddr>>>;

/// An event from a client task, bound for the writer task.
#[derive(Debug)]
pub struct FeedRequest {
    pub client_id: ClientId,
    pub event: FeedEvent,
}

/// Bounded channel from feed connections → writer task.
pub type FeedTx = mpsc::Sender<FeedRequest>;
pub type FeedRx = mpsc::Receiver<FeedRequest>;
