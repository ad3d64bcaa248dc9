//! Low-level wire types and constants.
//!
//! This module defines:
//! - Message type IDs for binary feed frames.
//! - Protocol versioning and frame limits.
//! - First-byte protocol detection for new connections.
//!
//! The actual encode/decode logic lives in `binary_codec`.

/// Current protocol version.
pub const PROTOCOL_VERSION: u8 = 1;

/// Size of the common frame header: type, version, two reserved bytes.
pub const HEADER_LEN: usize = 4;

/// Bytes per encoded decimal (`rust_decimal::Decimal::serialize`).
pub const DECIMAL_LEN: usize = 16;

/// Bytes per encoded snapshot level: side + price + volume.
pub const LEVEL_LEN: usize = 1 + 2 * DECIMAL_LEN;

/// Largest accepted frame payload.
///
/// Kept below 16 MiB so the first byte of a length prefix is always zero,
/// which is what [`looks_like_csv`] relies on.
pub const MAX_FRAME_LEN: usize = 8 * 1024 * 1024;

/// Longest accepted CSV line, newline included. Large enough for a
/// snapshot of a few tens of thousands of levels.
pub const MAX_LINE_LEN: usize = 1024 * 1024;

/// Feed event types (feed → server).
///
/// These IDs are used in the first byte of each binary frame.
#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum WireFeedType {
    /// Full depth snapshot.
    InitSnapshot = 1,

    /// Absolute volume at one price.
    LevelChanged = 2,

    /// Best bid / best ask notification.
    BestPriceChanged = 3,

    /// Discard everything, wait for a snapshot.
    Reset = 4,
}

impl WireFeedType {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            1 => Some(WireFeedType::InitSnapshot),
            2 => Some(WireFeedType::LevelChanged),
            3 => Some(WireFeedType::BestPriceChanged),
            4 => Some(WireFeedType::Reset),
            _ => None,
        }
    }
}

/// Wire encoding of a side.
pub const SIDE_BID: u8 = 0;
pub const SIDE_ASK: u8 = 1;

/// Returns `true` if a connection whose first byte is `first` speaks the
/// line protocol.
///
/// Binary connections start with a u32 BE length prefix bounded by
/// [`MAX_FRAME_LEN`], so their first byte is always `0`.
pub fn looks_like_csv(first: u8) -> bool {
    first != 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feed_type_ids_round_trip() {
        for t in [
            WireFeedType::InitSnapshot,
            WireFeedType::LevelChanged,
            WireFeedType::BestPriceChanged,
            WireFeedType::Reset,
        ] {
            assert_eq!(WireFeedType::from_u8(t as u8), Some(t));
        }
        assert_eq!(WireFeedType::from_u8(0), None);
        assert_eq!(WireFeedType::from_u8(b'L'), None);
    }

    #[test]
    fn protocol_detection() {
        assert!(looks_like_csv(b'S'));
        assert!(looks_like_csv(b'#'));
        assert!(!looks_like_csv((MAX_FRAME_LEN as u32).to_be_bytes()[0]));
    }
}
