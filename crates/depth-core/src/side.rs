//! Side (Bid / Ask) of a resting price level.

use serde::{Deserialize, Serialize};

use crate::level::Price;

/// Book side: Bid or Ask.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Bid,
    Ask,
}

impl Side {
    /// Convert to the char representation used by the CSV feed format
    /// (`'B'` / `'A'`).
    pub fn as_char(self) -> char {
        match self {
            Side::Bid => 'B',
            Side::Ask => 'A',
        }
    }

    /// Try to parse from a char (`'B'` / `'A'`, case-sensitive).
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'B' => Some(Side::Bid),
            'A' => Some(Side::Ask),
            _ => None,
        }
    }

    /// The other side of the book.
    pub fn opposite(self) -> Self {
        match self {
            Side::Bid => Side::Ask,
            Side::Ask => Side::Bid,
        }
    }

    /// Returns `true` if `candidate` is a better price than `current` on
    /// this side (higher for bids, lower for asks).
    pub fn is_better(self, candidate: Price, current: Price) -> bool {
        match self {
            Side::Bid => candidate > current,
            Side::Ask => candidate < current,
        }
    }
}
