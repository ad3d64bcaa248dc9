//! Binary encoding/decoding for depth feed events.
//!
//! This module converts between:
//! - raw binary frames (`&[u8]`)
//! - high-level `depth_core::FeedEvent`
//!
//! Framing model (single-message buffer):
//!
//! ```text
//! Header
//! ------
//! [0]   : msg_type (WireFeedType as u8)
//! [1]   : version  (PROTOCOL_VERSION)
//! [2..4]: reserved = 0
//! [4..] : body (depends on msg_type)
//!
//! Decimals are the 16 bytes of `rust_decimal::Decimal::serialize`.
//! Sides are one byte (0=Bid, 1=Ask).
//!
//! InitSnapshot (type=1):
//!   [4..8]   level_count (u32 BE)
//!   then level_count times:
//!     [+1]   side
//!     [+16]  price
//!     [+16]  volume
//!
//! LevelChanged (type=2):
//!   [4..20]  price
//!   [20]     side
//!   [21..37] volume
//!
//! BestPriceChanged (type=3):
//!   [4]      side
//!   [5..21]  price
//!
//! Reset (type=4):
//!   [no body]
//! ```
//!
//! On TCP every frame is preceded by its length (u32 BE); see
//! [`encode_event_framed`].

use depth_core::{FeedEvent, Price, PriceLevel, Side};
use rust_decimal::Decimal;
use thiserror::Error;

use crate::wire_types::{
    WireFeedType, DECIMAL_LEN, HEADER_LEN, LEVEL_LEN, MAX_FRAME_LEN, PROTOCOL_VERSION, SIDE_ASK,
    SIDE_BID,
};

/// Largest scale `rust_decimal` can represent.
const MAX_DECIMAL_SCALE: u8 = 28;

/// Errors that can arise when encoding/decoding a binary frame.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("buffer truncated")]
    Truncated,

    #[error("unknown message type: {0}")]
    UnknownMessageType(u8),

    #[error("protocol version mismatch: got {0}, expected {}", PROTOCOL_VERSION)]
    VersionMismatch(u8),

    #[error("invalid field: {0}")]
    InvalidField(&'static str),

    #[error("{0} trailing bytes after message")]
    TrailingBytes(usize),

    #[error("frame of {0} bytes exceeds the limit")]
    FrameTooLarge(usize),
}

/// Decode a single feed event from a binary buffer.
///
/// The buffer must contain exactly one full message as described above.
pub fn decode_event(buf: &[u8]) -> Result<FeedEvent, ProtocolError> {
    if buf.len() < HEADER_LEN {
        return Err(ProtocolError::Truncated);
    }

    let msg_type = buf[0];
    let version = buf[1];

    if version != PROTOCOL_VERSION {
        return Err(ProtocolError::VersionMismatch(version));
    }

    let wire_type =
        WireFeedType::from_u8(msg_type).ok_or(ProtocolError::UnknownMessageType(msg_type))?;

    let mut reader = FrameReader::new(&buf[HEADER_LEN..]);
    let event = match wire_type {
        WireFeedType::InitSnapshot => decode_snapshot(&mut reader)?,
        WireFeedType::LevelChanged => {
            let price = reader.decimal()?;
            let side = reader.side()?;
            let volume = reader.decimal()?;
            FeedEvent::level_changed(price, side, volume)
        }
        WireFeedType::BestPriceChanged => {
            let side = reader.side()?;
            let price = reader.decimal()?;
            FeedEvent::best_price_changed(side, price)
        }
        WireFeedType::Reset => FeedEvent::Reset,
    };

    reader.finish()?;
    Ok(event)
}

/// Encode a single feed event into a binary frame.
///
/// The encoded bytes are appended to `out`.
pub fn encode_event(event: &FeedEvent, out: &mut Vec<u8>) -> Result<(), ProtocolError> {
    match event {
        FeedEvent::InitSnapshot(snapshot) => {
            let count = u32::try_from(snapshot.levels.len())
                .map_err(|_| ProtocolError::InvalidField("level_count"))?;
            let body_len = 4 + snapshot.levels.len() * LEVEL_LEN;
            if HEADER_LEN + body_len > MAX_FRAME_LEN {
                return Err(ProtocolError::FrameTooLarge(HEADER_LEN + body_len));
            }

            write_header(WireFeedType::InitSnapshot, out);
            out.reserve(body_len);
            out.extend_from_slice(&count.to_be_bytes());
            for level in &snapshot.levels {
                out.push(side_byte(level.side));
                out.extend_from_slice(&level.price.serialize());
                out.extend_from_slice(&level.volume.serialize());
            }
        }
        FeedEvent::LevelChanged(change) => {
            write_header(WireFeedType::LevelChanged, out);
            out.extend_from_slice(&change.price.serialize());
            out.push(side_byte(change.side));
            out.extend_from_slice(&change.volume.serialize());
        }
        FeedEvent::BestPriceChanged(best) => {
            write_header(WireFeedType::BestPriceChanged, out);
            out.push(side_byte(best.side));
            out.extend_from_slice(&best.price.serialize());
        }
        FeedEvent::Reset => write_header(WireFeedType::Reset, out),
    }
    Ok(())
}

/// Encode an event preceded by its u32 BE length, ready for a TCP stream.
pub fn encode_event_framed(event: &FeedEvent, out: &mut Vec<u8>) -> Result<(), ProtocolError> {
    let start = out.len();
    out.extend_from_slice(&[0; 4]);
    if let Err(err) = encode_event(event, out) {
        out.truncate(start);
        return Err(err);
    }

    let payload_len = out.len() - start - 4;
    let len = u32::try_from(payload_len).map_err(|_| ProtocolError::FrameTooLarge(payload_len))?;
    out[start..start + 4].copy_from_slice(&len.to_be_bytes());
    Ok(())
}

/// Validate a length prefix read from the stream.
pub fn check_frame_len(len: usize) -> Result<usize, ProtocolError> {
    if len > MAX_FRAME_LEN {
        return Err(ProtocolError::FrameTooLarge(len));
    }
    Ok(len)
}

fn decode_snapshot(reader: &mut FrameReader<'_>) -> Result<FeedEvent, ProtocolError> {
    let count = reader.u32_be()? as usize;
    if reader.remaining() < count.saturating_mul(LEVEL_LEN) {
        return Err(ProtocolError::Truncated);
    }

    let mut levels = Vec::with_capacity(count);
    for _ in 0..count {
        let side = reader.side()?;
        let price = reader.decimal()?;
        let volume = reader.decimal()?;
        levels.push(PriceLevel::new(price, side, volume));
    }
    Ok(FeedEvent::init_snapshot(levels))
}

// -----------------------------------------------------------------------------
// Helpers
// -----------------------------------------------------------------------------

fn write_header(wire_type: WireFeedType, out: &mut Vec<u8>) {
    out.push(wire_type as u8);
    out.push(PROTOCOL_VERSION);
    out.extend_from_slice(&[0, 0]); // reserved
}

fn side_byte(side: Side) -> u8 {
    match side {
        Side::Bid => SIDE_BID,
        Side::Ask => SIDE_ASK,
    }
}

/// Cursor over a frame body.
struct FrameReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> FrameReader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        FrameReader { buf, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], ProtocolError> {
        if self.remaining() < n {
            return Err(ProtocolError::Truncated);
        }
        let bytes = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    fn u32_be(&mut self) -> Result<u32, ProtocolError> {
        let mut arr = [0u8; 4];
        arr.copy_from_slice(self.take(4)?);
        Ok(u32::from_be_bytes(arr))
    }

    fn side(&mut self) -> Result<Side, ProtocolError> {
        match self.take(1)?[0] {
            SIDE_BID => Ok(Side::Bid),
            SIDE_ASK => Ok(Side::Ask),
            _ => Err(ProtocolError::InvalidField("side")),
        }
    }

    fn decimal(&mut self) -> Result<Price, ProtocolError> {
        let mut arr = [0u8; DECIMAL_LEN];
        arr.copy_from_slice(self.take(DECIMAL_LEN)?);
        // Flags are little-endian; the scale lives in the third byte.
        if arr[2] > MAX_DECIMAL_SCALE {
            return Err(ProtocolError::InvalidField("decimal scale"));
        }
        Ok(Decimal::deserialize(arr))
    }

    fn finish(self) -> Result<(), ProtocolError> {
        match self.remaining() {
            0 => Ok(()),
            n => Err(ProtocolError::TrailingBytes(n)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).expect("valid decimal")
    }

    fn round_trip(event: FeedEvent) -> FeedEvent {
        let mut buf = Vec::new();
        encode_event(&event, &mut buf).expect("encode");
        decode_event(&buf).expect("decode")
    }

    #[test]
    fn level_change_keeps_fractional_prices() {
        let event = FeedEvent::level_changed(dec("100.25"), Side::Ask, dec("0.005"));
        assert_eq!(round_trip(event.clone()), event);
    }

    #[test]
    fn snapshot_with_both_sides() {
        let event = FeedEvent::init_snapshot(vec![
            PriceLevel::from_ints(100, Side::Bid, 50),
            PriceLevel::new(dec("101.5"), Side::Ask, dec("30")),
        ]);
        let mut buf = Vec::new();
        encode_event(&event, &mut buf).expect("encode");
        assert_eq!(buf.len(), HEADER_LEN + 4 + 2 * LEVEL_LEN);
        assert_eq!(decode_event(&buf).expect("decode"), event);
    }

    #[test]
    fn empty_snapshot_and_reset() {
        assert_eq!(round_trip(FeedEvent::init_snapshot(Vec::new())), FeedEvent::init_snapshot(Vec::new()));
        assert_eq!(round_trip(FeedEvent::Reset), FeedEvent::Reset);
    }

    #[test]
    fn rejects_bad_headers() {
        assert_eq!(decode_event(&[2, 1]), Err(ProtocolError::Truncated));
        assert_eq!(decode_event(&[2, 9, 0, 0]), Err(ProtocolError::VersionMismatch(9)));
        assert_eq!(decode_event(&[42, 1, 0, 0]), Err(ProtocolError::UnknownMessageType(42)));
    }

    #[test]
    fn rejects_bad_side_and_truncation() {
        let mut buf = Vec::new();
        encode_event(&FeedEvent::best_price_changed(Side::Bid, dec("99")), &mut buf).expect("encode");

        let mut bad_side = buf.clone();
        bad_side[HEADER_LEN] = 7;
        assert_eq!(decode_event(&bad_side), Err(ProtocolError::InvalidField("side")));

        assert_eq!(decode_event(&buf[..buf.len() - 1]), Err(ProtocolError::Truncated));
    }

    #[test]
    fn snapshot_count_larger_than_body_is_truncated() {
        let mut buf = Vec::new();
        encode_event(&FeedEvent::init_snapshot(Vec::new()), &mut buf).expect("encode");
        buf[HEADER_LEN..HEADER_LEN + 4].copy_from_slice(&1000u32.to_be_bytes());
        assert_eq!(decode_event(&buf), Err(ProtocolError::Truncated));
    }

    #[test]
    fn rejects_trailing_bytes() {
        let mut buf = Vec::new();
        encode_event(&FeedEvent::Reset, &mut buf).expect("encode");
        buf.push(0);
        assert_eq!(decode_event(&buf), Err(ProtocolError::TrailingBytes(1)));
    }

    #[test]
    fn framed_encoding_prefixes_length() {
        let event = FeedEvent::level_changed(dec("1"), Side::Bid, dec("2"));
        let mut buf = Vec::new();
        encode_event_framed(&event, &mut buf).expect("encode");

        let len = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]) as usize;
        assert_eq!(len, buf.len() - 4);
        assert_eq!(buf[0], 0);
        assert_eq!(decode_event(&buf[4..]).expect("decode"), event);
    }

    #[test]
    fn frame_len_limit() {
        assert_eq!(check_frame_len(64), Ok(64));
        assert!(matches!(
            check_frame_len(MAX_FRAME_LEN + 1),
            Err(ProtocolError::FrameTooLarge(_))
        ));
    }
}
