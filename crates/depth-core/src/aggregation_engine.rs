//! Aggregation engine orchestrator.
//!
//! Owns the [`BookState`] and the two derived trackers and applies feed
//! events to all three as one step:
//! - `InitSnapshot` rebuilds everything and moves the engine to `Ready`.
//! - `LevelChanged` updates the book, then extrema, then cumulative curves.
//! - `BestPriceChanged` only touches extrema.
//! - `Reset` drops back to `Uninitialized`.
//!
//! The engine itself is single-threaded; see [`crate::shared`] for the
//! single-writer / multi-reader wrapper.

use tracing::debug;

use crate::book_state::BookState;
use crate::cumulative::{CumulativeCurve, CumulativeCurveBuilder};
use crate::extrema::{ExtremaState, ExtremaTracker};
use crate::level::{Price, PriceLevel, Volume};
use crate::messages::{
    BestPriceChanged, DepthView, EngineState, FeedEvent, LevelChanged, Snapshot, ViewQuery,
    ViewResponse,
};
use crate::side::Side;

/// What happened to an event passed to [`AggregationEngine::apply`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The event changed engine state; the version was bumped.
    Applied,
    /// The event had no effect (engine not ready, or a no-op removal).
    Ignored,
}

/// Incremental market-depth aggregator for a single instrument.
#[derive(Debug, Clone, Default)]
pub struct AggregationEngine {
    state: EngineState,
    book: BookState,
    extrema: ExtremaTracker,
    cumulative: CumulativeCurveBuilder,

    /// Bumped on every applied event, never reset.
    version: u64,
}

impl AggregationEngine {
    /// Create a new, uninitialized engine.
    pub fn new() -> Self {
        AggregationEngine::default()
    }

    /// Apply a single feed event.
    pub fn apply(&mut self, event: FeedEvent) -> ApplyOutcome {
        let outcome = match event {
            FeedEvent::InitSnapshot(snapshot) => self.process_init_snapshot(snapshot),
            FeedEvent::LevelChanged(change) => self.process_level_changed(change),
            FeedEvent::BestPriceChanged(best) => self.process_best_price_changed(best),
            FeedEvent::Reset => self.process_reset(),
        };

        if outcome == ApplyOutcome::Applied {
            self.version += 1;
        }
        outcome
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == EngineState::Ready
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    // -------------------------------------------------------------------------
    // Read surface
    // -------------------------------------------------------------------------

    /// Resting levels of one side, ascending by price.
    pub fn current_book(&self, side: Side) -> Vec<PriceLevel> {
        self.book.levels(side).collect()
    }

    pub fn current_extrema(&self) -> ExtremaState {
        *self.extrema.state()
    }

    /// Cumulative curve of one side, ascending by price.
    pub fn current_cumulative(&self, side: Side) -> CumulativeCurve {
        self.cumulative.curve(side)
    }

    /// Cumulative volume from the best price out to `price`. O(log n).
    pub fn cumulative_at(&self, side: Side, price: Price) -> Option<Volume> {
        self.cumulative.cumulative_at(side, price)
    }

    /// Total resting volume of one side. O(log n).
    pub fn side_total(&self, side: Side) -> Volume {
        self.cumulative.total(side)
    }

    pub fn get(&self, price: Price) -> Option<PriceLevel> {
        self.book.get(price)
    }

    pub fn book(&self) -> &BookState {
        &self.book
    }

    /// All outputs captured together.
    pub fn view(&self) -> DepthView {
        DepthView {
            version: self.version,
            state: self.state,
            bids: self.current_book(Side::Bid),
            asks: self.current_book(Side::Ask),
            extrema: self.current_extrema(),
            cumulative_bids: self.current_cumulative(Side::Bid),
            cumulative_asks: self.current_cumulative(Side::Ask),
        }
    }

    /// Answer a renderer query from the current state.
    pub fn answer(&self, query: ViewQuery) -> ViewResponse {
        let version = self.version;
        match query {
            ViewQuery::Extrema => ViewResponse::Extrema {
                version,
                extrema: self.current_extrema(),
            },
            ViewQuery::Book(side) => ViewResponse::Book {
                version,
                side,
                levels: self.current_book(side),
            },
            ViewQuery::Cumulative(side) => ViewResponse::Cumulative {
                version,
                side,
                curve: self.current_cumulative(side),
            },
            ViewQuery::Full => ViewResponse::Full { view: self.view() },
        }
    }

    // -------------------------------------------------------------------------
    // Internal handlers
    // -------------------------------------------------------------------------

    fn process_init_snapshot(&mut self, snapshot: Snapshot) -> ApplyOutcome {
        self.book.reset(snapshot.levels);
        self.extrema.rebuild(&self.book);
        // The book has already dropped empty and duplicate levels.
        let levels = self.book.all_levels();
        self.cumulative.full_rebuild(levels);
        self.state = EngineState::Ready;

        debug!(
            bids = self.book.side_len(Side::Bid),
            asks = self.book.side_len(Side::Ask),
            "depth snapshot loaded"
        );
        ApplyOutcome::Applied
    }

    fn process_level_changed(&mut self, msg: LevelChanged) -> ApplyOutcome {
        if !self.is_ready() {
            debug!(price = %msg.price, "level change before snapshot dropped");
            return ApplyOutcome::Ignored;
        }

        let change = self.book.apply_update(msg.price, msg.side, msg.volume);
        if change.is_noop() {
            return ApplyOutcome::Ignored;
        }

        // A price the feed moved across sides leaves its old side first.
        if let Some(displaced) = change.displaced {
            let other = change.side.opposite();
            self.extrema.on_level_updated(
                &self.book,
                change.price,
                other,
                displaced,
                Volume::ZERO,
            );
            self.cumulative.incremental_patch(other, change.price, -displaced);
        }

        self.extrema.on_level_updated(
            &self.book,
            change.price,
            change.side,
            change.old_volume,
            change.new_volume,
        );
        self.cumulative
            .incremental_patch(change.side, change.price, change.delta());

        ApplyOutcome::Applied
    }

    fn process_best_price_changed(&mut self, msg: BestPriceChanged) -> ApplyOutcome {
        if !self.is_ready() {
            debug!(price = %msg.price, "best price before snapshot dropped");
            return ApplyOutcome::Ignored;
        }

        self.extrema.on_best_changed(msg.side, msg.price);
        ApplyOutcome::Applied
    }

    fn process_reset(&mut self) -> ApplyOutcome {
        self.book.clear();
        self.extrema.clear();
        self.cumulative.clear();
        self.state = EngineState::Uninitialized;

        debug!("depth engine reset");
        ApplyOutcome::Applied
    }
}
