//! depth-protocol
//!
//! Wire-level encoding/decoding for the depth aggregation engine.
//!
//! This crate turns logical engine messages (`depth_core::FeedEvent`,
//! `depth_core::ViewQuery`) into bytes and back again.
//!
//! - [`binary_codec`] : binary wire protocol for high-rate feed connections
//! - [`csv_codec`]    : line protocol (replay files, netcat, queries)

pub mod wire_types;
pub mod binary_codec;
pub mod csv_codec;

pub use binary_codec::{decode_event, encode_event, encode_event_framed, ProtocolError};
pub use csv_codec::{format_event, format_query, parse_feed_line, CsvError, FeedLine};
