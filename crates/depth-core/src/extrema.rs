//! Incrementally maintained order-book extrema.
//!
//! Tracks:
//! - best bid / best ask,
//! - the level with the largest resting volume,
//! - the lowest and highest resting prices in the current snapshot.
//!
//! Every update is O(1) except two fallbacks:
//! - the current maximum shrinks or disappears: one O(n) rescan of the book,
//! - the level defining a price bound is removed: the bound is re-read from
//!   the remaining keys (O(log n) on the ordered book).
//!
//! Ties on maximum volume always resolve to the lowest price so that a full
//! rebuild and an incremental replay agree on the same level.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::book_state::BookState;
use crate::level::{Price, Volume};
use crate::side::Side;

/// The level currently holding the largest resting volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaxLevel {
    pub price: Price,
    pub volume: Volume,
}

impl MaxLevel {
    /// Returns `true` if `(price, volume)` should replace `self` as maximum.
    fn is_beaten_by(&self, price: Price, volume: Volume) -> bool {
        volume > self.volume || (volume == self.volume && price < self.price)
    }
}

/// Snapshot of all extrema. Absent values mean the book (or side) is empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExtremaState {
    pub best_bid: Option<Price>,
    pub best_ask: Option<Price>,
    pub max_level: Option<MaxLevel>,
    pub min_price_seen: Option<Price>,
    pub max_price_seen: Option<Price>,
}

impl ExtremaState {
    /// Best price on one side.
    pub fn best(&self, side: Side) -> Option<Price> {
        match side {
            Side::Bid => self.best_bid,
            Side::Ask => self.best_ask,
        }
    }

    /// Returns `true` when best bid >= best ask. Informational only; the
    /// engine never rejects a crossed book.
    pub fn is_crossed(&self) -> bool {
        matches!((self.best_bid, self.best_ask), (Some(bid), Some(ask)) if bid >= ask)
    }

    /// Best ask minus best bid, when both exist.
    pub fn spread(&self) -> Option<Price> {
        match (self.best_bid, self.best_ask) {
            (Some(bid), Some(ask)) => Some(ask - bid),
            _ => None,
        }
    }
}

/// Keeps an [`ExtremaState`] in step with [`BookState`] mutations.
#[derive(Debug, Clone, Default)]
pub struct ExtremaTracker {
    state: ExtremaState,

    /// Number of O(n) max-volume rescans performed since the last rebuild.
    max_rescans: u64,
}

impl ExtremaTracker {
    pub fn new() -> Self {
        ExtremaTracker::default()
    }

    pub fn state(&self) -> &ExtremaState {
        &self.state
    }

    /// How many times the max-volume fallback rescan ran since the last
    /// [`rebuild`](Self::rebuild) or [`clear`](Self::clear).
    pub fn max_rescans(&self) -> u64 {
        self.max_rescans
    }

    /// Derive every extremum from scratch. O(n).
    pub fn rebuild(&mut self, book: &BookState) {
        self.state = ExtremaState {
            best_bid: book.best_price(Side::Bid),
            best_ask: book.best_price(Side::Ask),
            max_level: scan_max_level(book),
            min_price_seen: book.min_price(),
            max_price_seen: book.max_price(),
        };
        self.max_rescans = 0;
    }

    pub fn clear(&mut self) {
        self.state = ExtremaState::default();
        self.max_rescans = 0;
    }

    /// Dedicated best-price notification from the feed.
    ///
    /// Overwrites unconditionally: the feed is sequenced upstream, so no
    /// staleness check is made here.
    pub fn on_best_changed(&mut self, side: Side, price: Price) {
        match side {
            Side::Bid => self.state.best_bid = Some(price),
            Side::Ask => self.state.best_ask = Some(price),
        }
    }

    /// Patch extrema after `book` has already applied a level update.
    pub fn on_level_updated(
        &mut self,
        book: &BookState,
        price: Price,
        side: Side,
        old_volume: Volume,
        new_volume: Volume,
    ) {
        if old_volume == new_volume {
            return;
        }
        self.update_best(book, price, side, new_volume);
        self.update_bounds(book, price, new_volume);
        self.update_max_level(book, price, new_volume);
    }

    // -------------------------------------------------------------------------
    // Internal helpers
    // -------------------------------------------------------------------------

    fn update_best(&mut self, book: &BookState, price: Price, side: Side, new_volume: Volume) {
        let best = match side {
            Side::Bid => &mut self.state.best_bid,
            Side::Ask => &mut self.state.best_ask,
        };

        if new_volume.is_zero() {
            if *best == Some(price) {
                *best = book.best_price(side);
            }
        } else {
            match *best {
                Some(current) if !side.is_better(price, current) => {}
                _ => *best = Some(price),
            }
        }
    }

    fn update_bounds(&mut self, book: &BookState, price: Price, new_volume: Volume) {
        if new_volume.is_zero() {
            if self.state.min_price_seen == Some(price) {
                self.state.min_price_seen = book.min_price();
            }
            if self.state.max_price_seen == Some(price) {
                self.state.max_price_seen = book.max_price();
            }
            return;
        }

        match self.state.min_price_seen {
            Some(min) if min <= price => {}
            _ => self.state.min_price_seen = Some(price),
        }
        match self.state.max_price_seen {
            Some(max) if max >= price => {}
            _ => self.state.max_price_seen = Some(price),
        }
    }

    fn update_max_level(&mut self, book: &BookState, price: Price, new_volume: Volume) {
        let candidate = MaxLevel {
            price,
            volume: new_volume,
        };

        match self.state.max_level {
            Some(max) if max.price == price => {
                if new_volume >= max.volume {
                    self.state.max_level = Some(candidate);
                } else {
                    // The old maximum shrank; any other level may now lead.
                    self.max_rescans += 1;
                    trace!(%price, "max level shrank, rescanning book");
                    self.state.max_level = scan_max_level(book);
                }
            }
            Some(max) => {
                if !new_volume.is_zero() && max.is_beaten_by(price, new_volume) {
                    self.state.max_level = Some(candidate);
                }
            }
            None => {
                if !new_volume.is_zero() {
                    self.state.max_level = Some(candidate);
                }
            }
        }
    }
}

/// Full scan for the largest level, lowest price first on ties.
fn scan_max_level(book: &BookState) -> Option<MaxLevel> {
    book.levels(Side::Bid)
        .chain(book.levels(Side::Ask))
        .fold(None, |best: Option<MaxLevel>, level| match best {
            Some(current) if !current.is_beaten_by(level.price, level.volume) => Some(current),
            _ => Some(MaxLevel {
                price: level.price,
                volume: level.volume,
            }),
        })
}
