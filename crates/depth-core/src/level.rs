//! Price levels as they arrive from the market-data feed.
//!
//! Prices and volumes are fixed-point [`Decimal`]s so that aggregation is
//! exact: a cumulative curve built from thousands of patches must land on
//! the same total as a fresh prefix sum.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::side::Side;

/// Fixed-point price.
pub type Price = Decimal;

/// Fixed-point resting volume (never negative once normalized).
pub type Volume = Decimal;

/// A single resting price level.
///
/// A level only exists in the book while `volume > 0`; a level update with
/// zero volume is a removal, never a zero-volume entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceLevel {
    pub price: Price,
    pub side: Side,
    pub volume: Volume,
}

impl PriceLevel {
    pub fn new(price: Price, side: Side, volume: Volume) -> Self {
        PriceLevel {
            price,
            side,
            volume,
        }
    }

    /// Convenience constructor from integer ticks, mostly for tests and demos.
    pub fn from_ints(price: i64, side: Side, volume: i64) -> Self {
        PriceLevel::new(Decimal::from(price), side, Decimal::from(volume))
    }

    /// Returns `true` if this level would remove its price from the book.
    pub fn is_removal(&self) -> bool {
        normalize_volume(self.volume).is_zero()
    }
}

/// Largest volume a single level can hold (10^12). Larger feed volumes are
/// clamped so that side totals and cumulative sums can never overflow.
pub const MAX_LEVEL_VOLUME: Volume = Decimal::from_parts(0xD4A5_1000, 0xE8, 0, false, 0);

/// Decimal places kept on a volume. Together with `MAX_LEVEL_VOLUME` this
/// keeps sums over any realistic number of levels exact.
pub const MAX_VOLUME_SCALE: u32 = 8;

/// Clamp feed volumes into the book's domain.
///
/// Negative volumes are an upstream bug; they are treated as a removal
/// instead of aborting the feed. Volumes are rounded to `MAX_VOLUME_SCALE`
/// places (a dust volume that rounds to zero is a removal) and capped at
/// `MAX_LEVEL_VOLUME`.
pub fn normalize_volume(volume: Volume) -> Volume {
    if volume.is_sign_negative() {
        return Decimal::ZERO;
    }
    volume.round_dp(MAX_VOLUME_SCALE).min(MAX_LEVEL_VOLUME)
}
