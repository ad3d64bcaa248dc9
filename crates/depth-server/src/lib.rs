//! depth-server
//!
//! Multi-client async TCP service around the depth aggregation engine.
//! Feed connections push events to a single writer task; any connection
//! can query the current views.

pub mod config;
pub mod types;
pub mod server;

// these are internal modules, not re-exported
mod client;
mod feed_task;
