//! Current snapshot of resting price levels.
//!
//! - Bids and asks each live in a `BTreeMap` keyed by price, so iteration
//!   is ascending and best prices are the last bid / first ask key.
//! - A level is stored only while its volume is positive.
//! - A price lives on at most one side: when the feed claims a price for
//!   the other side, the latest write wins and the stale entry is dropped.
//!   Cross-side ordering (best bid < best ask) is never asserted.

use std::collections::BTreeMap;

use rust_decimal::Decimal;

use crate::level::{normalize_volume, Price, PriceLevel, Volume};
use crate::side::Side;

/// Result of a single [`BookState::apply_update`].
///
/// Carries the before/after volumes so derived trackers can patch
/// themselves without re-reading the book.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelChange {
    pub price: Price,
    pub side: Side,
    /// Volume on `side` before the update (zero if the level was absent).
    pub old_volume: Volume,
    /// Volume on `side` after the update (zero means removed).
    pub new_volume: Volume,
    /// Volume that was resting at the same price on the opposite side and
    /// has been evicted by this update.
    pub displaced: Option<Volume>,
}

impl LevelChange {
    /// Signed volume change on `side`.
    pub fn delta(&self) -> Volume {
        self.new_volume - self.old_volume
    }

    /// Returns `true` if nothing in the book changed.
    pub fn is_noop(&self) -> bool {
        self.old_volume == self.new_volume && self.displaced.is_none()
    }

    pub fn is_insert(&self) -> bool {
        self.old_volume.is_zero() && !self.new_volume.is_zero()
    }

    pub fn is_removal(&self) -> bool {
        !self.old_volume.is_zero() && self.new_volume.is_zero()
    }
}

/// Per-side ordered book of resting volume.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookState {
    /// Bids: price -> volume. Highest key is the best bid.
    bids: BTreeMap<Price, Volume>,

    /// Asks: price -> volume. Lowest key is the best ask.
    asks: BTreeMap<Price, Volume>,
}

impl BookState {
    pub fn new() -> Self {
        BookState::default()
    }

    /// Replace the entire snapshot with `levels`.
    ///
    /// Zero and negative volumes never create a level. If the same price appears
    /// more than once the last occurrence wins, on whichever side it names.
    pub fn reset<I>(&mut self, levels: I)
    where
        I: IntoIterator<Item = PriceLevel>,
    {
        self.clear();
        for level in levels {
            self.apply_update(level.price, level.side, level.volume);
        }
    }

    /// Insert, overwrite or remove one level.
    ///
    /// A volume of zero (or a negative volume, clamped to zero) removes the
    /// price if present and is a no-op otherwise.
    pub fn apply_update(&mut self, price: Price, side: Side, volume: Volume) -> LevelChange {
        let new_volume = normalize_volume(volume);

        // The newest claim on a price wins; evict it from the other side.
        let displaced = if new_volume.is_zero() {
            None
        } else {
            self.side_map_mut(side.opposite()).remove(&price)
        };

        let levels = self.side_map_mut(side);
        let previous = if new_volume.is_zero() {
            levels.remove(&price)
        } else {
            levels.insert(price, new_volume)
        };
        let old_volume = previous.unwrap_or(Decimal::ZERO);

        LevelChange {
            price,
            side,
            old_volume,
            new_volume,
            displaced,
        }
    }

    /// Look up a price on either side.
    pub fn get(&self, price: Price) -> Option<PriceLevel> {
        if let Some(volume) = self.bids.get(&price) {
            return Some(PriceLevel::new(price, Side::Bid, *volume));
        }
        self.asks
            .get(&price)
            .map(|volume| PriceLevel::new(price, Side::Ask, *volume))
    }

    /// Volume resting at `price` on `side` (zero if absent).
    pub fn volume(&self, side: Side, price: Price) -> Volume {
        self.side_map(side)
            .get(&price)
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    /// Ascending-by-price iteration over one side.
    ///
    /// The iterator borrows the book and can be recreated at will.
    pub fn levels(&self, side: Side) -> impl DoubleEndedIterator<Item = PriceLevel> + '_ {
        self.side_map(side)
            .iter()
            .map(move |(price, volume)| PriceLevel::new(*price, side, *volume))
    }

    /// Ascending iteration over every resting level regardless of side.
    pub fn all_levels(&self) -> Vec<PriceLevel> {
        let mut all: Vec<PriceLevel> = self.levels(Side::Bid).chain(self.levels(Side::Ask)).collect();
        all.sort_by(|a, b| a.price.cmp(&b.price));
        all
    }

    /// Best price on a side: highest bid / lowest ask.
    pub fn best_price(&self, side: Side) -> Option<Price> {
        match side {
            Side::Bid => self.bids.keys().next_back().copied(),
            Side::Ask => self.asks.keys().next().copied(),
        }
    }

    /// Lowest resting price across both sides.
    pub fn min_price(&self) -> Option<Price> {
        let bid = self.bids.keys().next().copied();
        let ask = self.asks.keys().next().copied();
        match (bid, ask) {
            (Some(b), Some(a)) => Some(b.min(a)),
            (b, a) => b.or(a),
        }
    }

    /// Highest resting price across both sides.
    pub fn max_price(&self) -> Option<Price> {
        let bid = self.bids.keys().next_back().copied();
        let ask = self.asks.keys().next_back().copied();
        match (bid, ask) {
            (Some(b), Some(a)) => Some(b.max(a)),
            (b, a) => b.or(a),
        }
    }

    /// Sum of all volume resting on a side. O(n).
    pub fn side_total(&self, side: Side) -> Volume {
        self.side_map(side).values().copied().sum()
    }

    pub fn side_len(&self, side: Side) -> usize {
        self.side_map(side).len()
    }

    pub fn len(&self) -> usize {
        self.bids.len() + self.asks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }

    pub fn clear(&mut self) {
        self.bids.clear();
        self.asks.clear();
    }

    // -------------------------------------------------------------------------
    // Internal helpers
    // -------------------------------------------------------------------------

    fn side_map(&self, side: Side) -> &BTreeMap<Price, Volume> {
        match side {
            Side::Bid => &self.bids,
            Side::Ask => &self.asks,
        }
    }

    fn side_map_mut(&mut self, side: Side) -> &mut BTreeMap<Price, Volume> {
        match side {
            Side::Bid => &mut self.bids,
            Side::Ask => &mut self.asks,
        }
    }
}
