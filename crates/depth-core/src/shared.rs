//! Single-writer, multi-reader access to an [`AggregationEngine`].
//!
//! The whole aggregate sits behind one `parking_lot::RwLock`. The writer
//! holds the exclusive lock for the full application of an event (book,
//! extrema and curves together), so a reader can never see the book
//! updated while a derived view is stale.
//!
//! [`DepthWriter`] is deliberately not `Clone`: exactly one owner drives
//! mutation from one ordered event stream. [`DepthReader`] handles are cheap
//! to clone and can live on any thread.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::aggregation_engine::{AggregationEngine, ApplyOutcome};
use crate::cumulative::CumulativeCurve;
use crate::extrema::ExtremaState;
use crate::level::PriceLevel;
use crate::messages::{DepthView, EngineState, FeedEvent, ViewQuery, ViewResponse};
use crate::side::Side;

type SharedEngine = Arc<RwLock<AggregationEngine>>;

/// Create a fresh engine and its writer / reader handles.
pub fn shared_engine() -> (DepthWriter, DepthReader) {
    let inner: SharedEngine = Arc::new(RwLock::new(AggregationEngine::new()));
    let reader = DepthReader {
        inner: Arc::clone(&inner),
    };
    (DepthWriter { inner }, reader)
}

/// The only handle allowed to mutate the engine.
#[derive(Debug)]
pub struct DepthWriter {
    inner: SharedEngine,
}

impl DepthWriter {
    /// Apply one event inside a single critical section.
    pub fn apply(&mut self, event: FeedEvent) -> ApplyOutcome {
        self.inner.write().apply(event)
    }

    /// Apply a run of events under one lock acquisition.
    ///
    /// Readers observe either none or all of the batch. Returns how many
    /// events were applied (not ignored).
    pub fn apply_all<I>(&mut self, events: I) -> usize
    where
        I: IntoIterator<Item = FeedEvent>,
    {
        let mut engine = self.inner.write();
        events
            .into_iter()
            .map(|event| engine.apply(event))
            .filter(|outcome| *outcome == ApplyOutcome::Applied)
            .count()
    }

    /// Like [`apply_all`](Self::apply_all), but reports each event's outcome.
    pub fn apply_each<I>(&mut self, events: I) -> Vec<ApplyOutcome>
    where
        I: IntoIterator<Item = FeedEvent>,
    {
        let mut engine = self.inner.write();
        events.into_iter().map(|event| engine.apply(event)).collect()
    }

    /// Another reader over the same engine.
    pub fn reader(&self) -> DepthReader {
        DepthReader {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// Read-only handle; every accessor takes the shared lock briefly and
/// returns owned data.
#[derive(Debug, Clone)]
pub struct DepthReader {
    inner: SharedEngine,
}

impl DepthReader {
    /// Run `f` against a consistent engine state.
    pub fn with<R>(&self, f: impl FnOnce(&AggregationEngine) -> R) -> R {
        f(&self.inner.read())
    }

    pub fn view(&self) -> DepthView {
        self.inner.read().view()
    }

    pub fn answer(&self, query: ViewQuery) -> ViewResponse {
        self.inner.read().answer(query)
    }

    pub fn current_book(&self, side: Side) -> Vec<PriceLevel> {
        self.inner.read().current_book(side)
    }

    pub fn current_extrema(&self) -> ExtremaState {
        self.inner.read().current_extrema()
    }

    pub fn current_cumulative(&self, side: Side) -> CumulativeCurve {
        self.inner.read().current_cumulative(side)
    }

    pub fn version(&self) -> u64 {
        self.inner.read().version()
    }

    pub fn state(&self) -> EngineState {
        self.inner.read().state()
    }
}
