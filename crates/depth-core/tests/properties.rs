//! Property-based tests for aggregation invariants.
//!
//! Every derived output is compared against a brute-force scan of the book
//! after each mutation:
//!
//! - the farthest cumulative entry of a side equals the side's volume sum
//! - the tracked max level equals the brute-force max
//! - a snapshot and a level-by-level replay of it produce identical state
//! - a zero volume removes the level from lookups, sums and extrema
//! - out-of-range volumes (huge, negative, dust) never stop the engine

use depth_core::{
    AggregationEngine, FeedEvent, MaxLevel, PriceLevel, Side, Volume, MAX_LEVEL_VOLUME,
};
use proptest::prelude::*;
use rust_decimal::Decimal;

/// Prices on a half-tick grid, narrow enough to collide often.
fn arb_price() -> impl Strategy<Value = Decimal> {
    (180i64..220i64).prop_map(|ticks| Decimal::new(ticks * 5, 1))
}

/// Volumes with a good share of zeros (removals).
fn arb_volume() -> impl Strategy<Value = Decimal> {
    prop_oneof![
        1 => Just(Decimal::ZERO),
        3 => (1i64..100i64).prop_map(Decimal::from),
    ]
}

/// Any representable decimal: huge magnitudes, up to 28 decimal places,
/// either sign.
fn arb_extreme_volume() -> impl Strategy<Value = Decimal> {
    prop_oneof![
        1 => Just(Decimal::MAX),
        1 => Just(Decimal::MIN),
        1 => (1i64..100i64).prop_map(|n| Decimal::new(n, 28)),
        2 => (any::<u32>(), any::<u32>(), any::<u32>(), any::<bool>(), 0u32..=28u32)
            .prop_map(|(lo, mid, hi, negative, scale)| Decimal::from_parts(lo, mid, hi, negative, scale)),
        2 => arb_volume(),
    ]
}

fn arb_side() -> impl Strategy<Value = Side> {
    prop_oneof![Just(Side::Bid), Just(Side::Ask)]
}

fn arb_level() -> impl Strategy<Value = PriceLevel> {
    (arb_price(), arb_side(), arb_volume())
        .prop_map(|(price, side, volume)| PriceLevel::new(price, side, volume))
}

fn arb_extreme_level() -> impl Strategy<Value = PriceLevel> {
    (arb_price(), arb_side(), arb_extreme_volume())
        .prop_map(|(price, side, volume)| PriceLevel::new(price, side, volume))
}

fn arb_levels(max: usize) -> impl Strategy<Value = Vec<PriceLevel>> {
    prop::collection::vec(arb_level(), 0..max)
}

fn brute_force_max(engine: &AggregationEngine) -> Option<MaxLevel> {
    engine
        .book()
        .all_levels()
        .into_iter()
        .fold(None, |best: Option<MaxLevel>, level| match best {
            Some(m) if m.volume > level.volume || (m.volume == level.volume && m.price < level.price) => {
                Some(m)
            }
            _ => Some(MaxLevel {
                price: level.price,
                volume: level.volume,
            }),
        })
}

fn side_sum(engine: &AggregationEngine, side: Side) -> Volume {
    engine.current_book(side).iter().map(|l| l.volume).sum()
}

fn farthest_cumulative(engine: &AggregationEngine, side: Side) -> Volume {
    let curve = engine.current_cumulative(side);
    let farthest = match side {
        Side::Bid => curve.first(),
        Side::Ask => curve.last(),
    };
    farthest.map(|(_, cum)| *cum).unwrap_or(Decimal::ZERO)
}

fn ready_engine(levels: Vec<PriceLevel>) -> AggregationEngine {
    let mut engine = AggregationEngine::new();
    engine.apply(FeedEvent::init_snapshot(levels));
    engine
}

proptest! {
    #[test]
    fn prop_farthest_cumulative_is_side_total(
        snapshot in arb_levels(30),
        updates in arb_levels(200),
    ) {
        let mut engine = ready_engine(snapshot);
        for level in updates {
            engine.apply(FeedEvent::level_changed(level.price, level.side, level.volume));
            for side in [Side::Bid, Side::Ask] {
                prop_assert_eq!(farthest_cumulative(&engine, side), side_sum(&engine, side));
                prop_assert_eq!(engine.side_total(side), side_sum(&engine, side));
            }
        }
    }

    #[test]
    fn prop_max_level_matches_brute_force(
        snapshot in arb_levels(30),
        updates in arb_levels(200),
    ) {
        let mut engine = ready_engine(snapshot);
        prop_assert_eq!(engine.current_extrema().max_level, brute_force_max(&engine));
        for level in updates {
            engine.apply(FeedEvent::level_changed(level.price, level.side, level.volume));
            prop_assert_eq!(engine.current_extrema().max_level, brute_force_max(&engine));
        }
    }

    #[test]
    fn prop_bounds_and_best_match_book(updates in arb_levels(200)) {
        let mut engine = ready_engine(Vec::new());
        for level in updates {
            engine.apply(FeedEvent::level_changed(level.price, level.side, level.volume));
            let extrema = engine.current_extrema();
            let book = engine.book();
            prop_assert_eq!(extrema.min_price_seen, book.min_price());
            prop_assert_eq!(extrema.max_price_seen, book.max_price());
            prop_assert_eq!(extrema.best_bid, book.best_price(Side::Bid));
            prop_assert_eq!(extrema.best_ask, book.best_price(Side::Ask));
        }
    }

    #[test]
    fn prop_snapshot_equals_replay(levels in arb_levels(60)) {
        let from_snapshot = ready_engine(levels.clone());

        let mut replayed = ready_engine(Vec::new());
        for level in &levels {
            replayed.apply(FeedEvent::level_changed(level.price, level.side, level.volume));
        }

        prop_assert_eq!(from_snapshot.book(), replayed.book());
        prop_assert_eq!(from_snapshot.current_extrema(), replayed.current_extrema());
        for side in [Side::Bid, Side::Ask] {
            prop_assert_eq!(
                from_snapshot.current_cumulative(side),
                replayed.current_cumulative(side)
            );
        }
    }

    #[test]
    fn prop_zero_volume_removes_level(
        snapshot in arb_levels(30),
        price in arb_price(),
        side in arb_side(),
    ) {
        let mut engine = ready_engine(snapshot);
        engine.apply(FeedEvent::level_changed(price, side, Decimal::ONE));
        engine.apply(FeedEvent::level_changed(price, side, Decimal::ZERO));

        prop_assert_eq!(engine.get(price), None);
        prop_assert!(engine.cumulative_at(side, price).is_none());
        prop_assert!(engine.current_cumulative(side).iter().all(|(p, _)| *p != price));
        let extrema = engine.current_extrema();
        prop_assert!(extrema.max_level.map_or(true, |m| m.price != price));
        prop_assert!(extrema.best(side) != Some(price));
        prop_assert_eq!(farthest_cumulative(&engine, side), side_sum(&engine, side));
    }

    #[test]
    fn prop_extreme_volumes_keep_invariants(
        snapshot in prop::collection::vec(arb_extreme_level(), 0..30),
        updates in prop::collection::vec(arb_extreme_level(), 0..200),
    ) {
        let mut engine = ready_engine(snapshot);
        for level in updates {
            engine.apply(FeedEvent::level_changed(level.price, level.side, level.volume));
            prop_assert!(engine.is_ready());
            for side in [Side::Bid, Side::Ask] {
                prop_assert!(engine
                    .current_book(side)
                    .iter()
                    .all(|l| l.volume > Decimal::ZERO && l.volume <= MAX_LEVEL_VOLUME));
                prop_assert_eq!(farthest_cumulative(&engine, side), side_sum(&engine, side));
                prop_assert_eq!(engine.side_total(side), side_sum(&engine, side));
            }
            prop_assert_eq!(engine.current_extrema().max_level, brute_force_max(&engine));
        }
    }
}
