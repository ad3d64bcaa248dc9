//! Message types used by the aggregation engine.
//!
//! These are **transport-agnostic** logical messages:
//! - [`FeedEvent`]: what the market-data collaborator pushes in.
//! - [`ViewQuery`] / [`ViewResponse`]: what a renderer asks for and gets back.
//!
//! Note: Binary / CSV encoders live in the `depth-protocol` crate;
//! this module is purely logical.

use serde::{Deserialize, Serialize};

use crate::cumulative::CumulativeCurve;
use crate::extrema::ExtremaState;
use crate::level::{Price, PriceLevel, Volume};
use crate::side::Side;

/// A single event from the market-data feed.
///
/// Events arrive already sequenced; the engine applies them in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeedEvent {
    /// Full depth snapshot; starts a new cycle.
    InitSnapshot(Snapshot),

    /// One level's resting volume changed (zero = removed).
    LevelChanged(LevelChanged),

    /// Dedicated best bid / best ask notification.
    BestPriceChanged(BestPriceChanged),

    /// New session or bar: discard everything and wait for a snapshot.
    Reset,
}

/// Full depth snapshot (input).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub levels: Vec<PriceLevel>,
}

/// Level delta (input).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelChanged {
    pub price: Price,
    pub side: Side,
    /// New absolute resting volume at `price`, not a difference.
    pub volume: Volume,
}

/// Best price notification (input).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BestPriceChanged {
    pub side: Side,
    pub price: Price,
}

impl FeedEvent {
    pub fn init_snapshot(levels: Vec<PriceLevel>) -> Self {
        FeedEvent::InitSnapshot(Snapshot { levels })
    }

    pub fn level_changed(price: Price, side: Side, volume: Volume) -> Self {
        FeedEvent::LevelChanged(LevelChanged {
            price,
            side,
            volume,
        })
    }

    pub fn best_price_changed(side: Side, price: Price) -> Self {
        FeedEvent::BestPriceChanged(BestPriceChanged { side, price })
    }

    /// Short name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            FeedEvent::InitSnapshot(_) => "init_snapshot",
            FeedEvent::LevelChanged(_) => "level_changed",
            FeedEvent::BestPriceChanged(_) => "best_price_changed",
            FeedEvent::Reset => "reset",
        }
    }
}

/// Lifecycle of the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineState {
    /// No snapshot yet (or just reset); level and best-price events are dropped.
    #[default]
    Uninitialized,
    Ready,
}

/// Everything a renderer may draw, captured after one fully-applied event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepthView {
    /// Count of applied events; strictly increases with every change.
    pub version: u64,
    pub state: EngineState,
    /// Bid levels, ascending by price.
    pub bids: Vec<PriceLevel>,
    /// Ask levels, ascending by price.
    pub asks: Vec<PriceLevel>,
    pub extrema: ExtremaState,
    pub cumulative_bids: CumulativeCurve,
    pub cumulative_asks: CumulativeCurve,
}

/// A read request from a renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ViewQuery {
    Extrema,
    Book(Side),
    Cumulative(Side),
    Full,
}

/// Answer to a [`ViewQuery`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ViewResponse {
    Extrema {
        version: u64,
        extrema: ExtremaState,
    },
    Book {
        version: u64,
        side: Side,
        levels: Vec<PriceLevel>,
    },
    Cumulative {
        version: u64,
        side: Side,
        curve: CumulativeCurve,
    },
    Full {
        view: DepthView,
    },
}
