//! depth-core
//!
//! Pure market-depth aggregation logic:
//! - messages (feed events, queries, views)
//! - per-price book state
//! - extrema tracking (best prices, max-volume level, price bounds)
//! - cumulative depth curves
//! - the aggregation engine and its single-writer / multi-reader wrapper
//! - display-mode and volume-filter helpers for renderers

pub mod side;
pub mod level;
pub mod book_state;
pub mod extrema;
pub mod fenwick;
pub mod cumulative;
pub mod messages;
pub mod aggregation_engine;
pub mod shared;
pub mod filters;

pub use side::Side;
pub use level::{normalize_volume, Price, PriceLevel, Volume, MAX_LEVEL_VOLUME};

pub use book_state::{BookState, LevelChange};
pub use extrema::{ExtremaState, ExtremaTracker, MaxLevel};
pub use cumulative::{CumulativeCurve, CumulativeCurveBuilder};

pub use messages::{
    BestPriceChanged,
    DepthView,
    EngineState,
    FeedEvent,
    LevelChanged,
    Snapshot,
    ViewQuery,
    ViewResponse,
};

pub use aggregation_engine::{AggregationEngine, ApplyOutcome};
pub use shared::{shared_engine, DepthReader, DepthWriter};
pub use filters::{build_filter_table, filter_tag_for, update_filter_entry, DisplayMode, FilterRule};
