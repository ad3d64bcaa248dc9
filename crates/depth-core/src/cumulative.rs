//! Per-side cumulative volume curves.
//!
//! A curve maps each resting price to the volume summed from the best price
//! (inclusive) outward to that price: asks walk up from the lowest ask,
//! bids walk down from the highest bid. The farthest entry of a side always
//! equals the side's total volume.
//!
//! Each side keeps its prices in outward order as "slots" backed by a
//! [`FenwickTree`], so a level change is a point update and any cumulative
//! value is a prefix query, both O(log n). Details:
//! - a new farthest price is appended in O(log n);
//! - a removed price keeps its slot as a zero-volume tombstone, so the
//!   removal only subtracts;
//! - a brand-new price inside the domain re-ranks the side (O(n)); slots of
//!   previously seen prices are reused, so this becomes rare once a
//!   session's price grid has filled in;
//! - tombstones are compacted away once they outnumber live levels.

use rust_decimal::Decimal;
use tracing::trace;

use crate::fenwick::FenwickTree;
use crate::level::{normalize_volume, Price, PriceLevel, Volume};
use crate::side::Side;

/// Cumulative curve of one side, ascending by price: `(price, cumulative)`.
pub type CumulativeCurve = Vec<(Price, Volume)>;

#[derive(Debug, Clone)]
struct SideCurve {
    side: Side,

    /// Prices in outward order (asks ascending, bids descending).
    slots: Vec<Price>,

    /// Resting volume per slot; zero marks a tombstone.
    volumes: Vec<Volume>,

    tree: FenwickTree<Volume>,

    /// Number of slots with a positive volume.
    live: usize,
}

impl SideCurve {
    fn new(side: Side) -> Self {
        SideCurve {
            side,
            slots: Vec::new(),
            volumes: Vec::new(),
            tree: FenwickTree::new(),
            live: 0,
        }
    }

    /// Rebuild from `(price, volume)` pairs already sorted outward.
    fn rebuild_from(&mut self, levels: Vec<(Price, Volume)>) {
        self.slots = levels.iter().map(|(price, _)| *price).collect();
        self.volumes = levels.iter().map(|(_, volume)| *volume).collect();
        self.tree = FenwickTree::from_values(&self.volumes);
        self.live = self.volumes.iter().filter(|v| !v.is_zero()).count();
    }

    fn clear(&mut self) {
        self.slots.clear();
        self.volumes.clear();
        self.tree = FenwickTree::new();
        self.live = 0;
    }

    /// Binary search for `price` in outward order.
    fn rank(&self, price: Price) -> Result<usize, usize> {
        match self.side {
            Side::Ask => self.slots.binary_search_by(|slot| slot.cmp(&price)),
            Side::Bid => self.slots.binary_search_by(|slot| price.cmp(slot)),
        }
    }

    /// Returns `true` if the price grid had to be re-ranked.
    fn patch(&mut self, price: Price, delta: Volume) -> bool {
        if delta.is_zero() {
            return false;
        }

        match self.rank(price) {
            Ok(idx) => {
                let was_live = !self.volumes[idx].is_zero();
                let mut updated = self.volumes[idx] + delta;
                if updated.is_sign_negative() {
                    // Only reachable if the caller's deltas drifted from the book.
                    updated = Decimal::ZERO;
                }
                let applied = updated - self.volumes[idx];
                self.volumes[idx] = updated;
                self.tree.add(idx, applied);

                match (was_live, updated.is_zero()) {
                    (true, true) => self.live -= 1,
                    (false, false) => self.live += 1,
                    _ => {}
                }
                if self.slots.len() - self.live > self.live {
                    self.compact();
                }
                false
            }
            Err(idx) => {
                if delta.is_sign_negative() {
                    return false;
                }
                self.live += 1;
                if idx == self.slots.len() {
                    // New farthest price: extend the domain in place.
                    self.slots.push(price);
                    self.volumes.push(delta);
                    self.tree.push(delta);
                    false
                } else {
                    self.slots.insert(idx, price);
                    self.volumes.insert(idx, delta);
                    self.compact();
                    true
                }
            }
        }
    }

    /// Drop tombstones and rebuild the tree. O(n).
    fn compact(&mut self) {
        let live: Vec<(Price, Volume)> = self
            .slots
            .iter()
            .copied()
            .zip(self.volumes.iter().copied())
            .filter(|(_, volume)| !volume.is_zero())
            .collect();
        self.rebuild_from(live);
    }

    fn cumulative_at(&self, price: Price) -> Option<Volume> {
        let idx = self.rank(price).ok()?;
        if self.volumes[idx].is_zero() {
            return None;
        }
        Some(self.tree.prefix_sum(idx))
    }

    fn total(&self) -> Volume {
        self.tree.total()
    }

    /// Live points in outward order with running sums.
    fn outward_points(&self) -> impl Iterator<Item = (Price, Volume)> + '_ {
        self.slots
            .iter()
            .zip(self.volumes.iter())
            .filter(|(_, volume)| !volume.is_zero())
            .scan(Decimal::ZERO, |sum, (price, volume)| {
                *sum += *volume;
                Some((*price, *sum))
            })
    }

    fn curve(&self) -> CumulativeCurve {
        let mut points: CumulativeCurve = self.outward_points().collect();
        if self.side == Side::Bid {
            points.reverse();
        }
        points
    }

    fn farthest(&self) -> Option<(Price, Volume)> {
        self.outward_points().last()
    }
}

/// Maintains both sides' cumulative curves.
#[derive(Debug, Clone)]
pub struct CumulativeCurveBuilder {
    bids: SideCurve,
    asks: SideCurve,

    /// Number of O(n) re-ranks caused by inner insertions since the last
    /// full rebuild.
    reranks: u64,
}

impl Default for CumulativeCurveBuilder {
    fn default() -> Self {
        CumulativeCurveBuilder::new()
    }
}

impl CumulativeCurveBuilder {
    pub fn new() -> Self {
        CumulativeCurveBuilder {
            bids: SideCurve::new(Side::Bid),
            asks: SideCurve::new(Side::Ask),
            reranks: 0,
        }
    }

    /// Rebuild both curves from a full set of levels. O(n log n).
    pub fn full_rebuild<I>(&mut self, levels: I)
    where
        I: IntoIterator<Item = PriceLevel>,
    {
        let mut bids = Vec::new();
        let mut asks = Vec::new();
        for level in levels {
            let volume = normalize_volume(level.volume);
            if volume.is_zero() {
                continue;
            }
            match level.side {
                Side::Bid => bids.push((level.price, volume)),
                Side::Ask => asks.push((level.price, volume)),
            }
        }

        // Outward from the best price: bids descending, asks ascending.
        bids.sort_by(|a, b| b.0.cmp(&a.0));
        asks.sort_by(|a, b| a.0.cmp(&b.0));

        self.bids.rebuild_from(bids);
        self.asks.rebuild_from(asks);
        self.reranks = 0;
    }

    /// Shift every cumulative entry at or beyond `price` on `side` by
    /// `delta`.
    pub fn incremental_patch(&mut self, side: Side, price: Price, delta: Volume) {
        if self.side_mut(side).patch(price, delta) {
            self.reranks += 1;
            trace!(?side, %price, "inner price inserted, re-ranked curve");
        }
    }

    pub fn clear(&mut self) {
        self.bids.clear();
        self.asks.clear();
        self.reranks = 0;
    }

    /// The whole curve of one side, ascending by price.
    pub fn curve(&self, side: Side) -> CumulativeCurve {
        self.side_ref(side).curve()
    }

    /// Cumulative volume from the best price out to `price`, if `price`
    /// rests on `side`. O(log n).
    pub fn cumulative_at(&self, side: Side, price: Price) -> Option<Volume> {
        self.side_ref(side).cumulative_at(price)
    }

    /// Total volume on a side (the farthest cumulative value). O(log n).
    pub fn total(&self, side: Side) -> Volume {
        self.side_ref(side).total()
    }

    /// Farthest live point of a side.
    pub fn farthest(&self, side: Side) -> Option<(Price, Volume)> {
        self.side_ref(side).farthest()
    }

    pub fn reranks(&self) -> u64 {
        self.reranks
    }

    fn side_ref(&self, side: Side) -> &SideCurve {
        match side {
            Side::Bid => &self.bids,
            Side::Ask => &self.asks,
        }
    }

    fn side_mut(&mut self, side: Side) -> &mut SideCurve {
        match side {
            Side::Bid => &mut self.bids,
            Side::Ask => &mut self.asks,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(v: i64) -> Decimal {
        Decimal::from(v)
    }

    fn pts(raw: &[(i64, i64)]) -> CumulativeCurve {
        raw.iter().map(|&(p, v)| (d(p), d(v))).collect()
    }

    fn builder_with(levels: &[(i64, Side, i64)]) -> CumulativeCurveBuilder {
        let mut builder = CumulativeCurveBuilder::new();
        builder.full_rebuild(levels.iter().map(|&(p, s, v)| PriceLevel::from_ints(p, s, v)));
        builder
    }

    #[test]
    fn full_rebuild_walks_outward() {
        let builder = builder_with(&[
            (100, Side::Bid, 50),
            (99, Side::Bid, 10),
            (101, Side::Ask, 30),
            (102, Side::Ask, 20),
        ]);

        assert_eq!(builder.curve(Side::Ask), pts(&[(101, 30), (102, 50)]));
        // Best bid is 100, so 99 accumulates both levels.
        assert_eq!(builder.curve(Side::Bid), pts(&[(99, 60), (100, 50)]));
        assert_eq!(builder.total(Side::Bid), d(60));
        assert_eq!(builder.farthest(Side::Bid), Some((d(99), d(60))));
    }

    #[test]
    fn patch_existing_level_shifts_farther_entries() {
        let mut builder = builder_with(&[(101, Side::Ask, 30), (102, Side::Ask, 20)]);
        builder.incremental_patch(Side::Ask, d(101), d(50));
        assert_eq!(builder.curve(Side::Ask), pts(&[(101, 80), (102, 100)]));
        assert_eq!(builder.cumulative_at(Side::Ask, d(102)), Some(d(100)));
    }

    #[test]
    fn farthest_insert_appends_without_rerank() {
        let mut builder = builder_with(&[(101, Side::Ask, 30)]);
        builder.incremental_patch(Side::Ask, d(105), d(5));
        builder.incremental_patch(Side::Bid, d(100), d(7));
        builder.incremental_patch(Side::Bid, d(98), d(3));
        assert_eq!(builder.reranks(), 0);
        assert_eq!(builder.curve(Side::Ask), pts(&[(101, 30), (105, 35)]));
        assert_eq!(builder.curve(Side::Bid), pts(&[(98, 10), (100, 7)]));
    }

    #[test]
    fn inner_insert_reranks() {
        let mut builder = builder_with(&[(101, Side::Ask, 30), (105, Side::Ask, 5)]);
        builder.incremental_patch(Side::Ask, d(103), d(1));
        assert_eq!(builder.reranks(), 1);
        assert_eq!(builder.curve(Side::Ask), pts(&[(101, 30), (103, 31), (105, 36)]));
    }

    #[test]
    fn removal_leaves_tombstone_then_reuses_slot() {
        let mut builder = builder_with(&[
            (101, Side::Ask, 30),
            (102, Side::Ask, 20),
            (103, Side::Ask, 10),
        ]);
        builder.incremental_patch(Side::Ask, d(102), d(-20));
        assert_eq!(builder.curve(Side::Ask), pts(&[(101, 30), (103, 40)]));
        assert_eq!(builder.cumulative_at(Side::Ask, d(102)), None);

        builder.incremental_patch(Side::Ask, d(102), d(4));
        assert_eq!(builder.reranks(), 0);
        assert_eq!(builder.curve(Side::Ask), pts(&[(101, 30), (102, 34), (103, 44)]));
    }

    #[test]
    fn emptying_a_side_compacts() {
        let mut builder = builder_with(&[(100, Side::Bid, 1), (99, Side::Bid, 2)]);
        builder.incremental_patch(Side::Bid, d(100), d(-1));
        builder.incremental_patch(Side::Bid, d(99), d(-2));
        assert!(builder.curve(Side::Bid).is_empty());
        assert_eq!(builder.total(Side::Bid), Decimal::ZERO);
        assert_eq!(builder.farthest(Side::Bid), None);
    }

    #[test]
    fn removing_unknown_price_is_ignored() {
        let mut builder = builder_with(&[(101, Side::Ask, 30)]);
        builder.incremental_patch(Side::Ask, d(150), d(-3));
        assert_eq!(builder.curve(Side::Ask), pts(&[(101, 30)]));
    }
}
