//! CSV line codec.
//!
//! One event or query per line, comma separated, whitespace tolerant.
//! Blank lines and lines starting with `#` are skipped.
//!
//! Feed events (lines → `FeedEvent`):
//!
//! - Snapshot:
//!   `S, side:price:volume, side:price:volume, ...` (zero or more levels)
//!
//! - Level changed:
//!   `L, price, side(B or A), volume`
//!
//! - Best price changed:
//!   `P, side(B or A), price`
//!
//! - Reset:
//!   `R`
//!
//! Queries (lines → `ViewQuery`):
//!
//! - `Q, E`        extrema
//! - `Q, B, side`  resting levels of one side
//! - `Q, C, side`  cumulative curve of one side
//! - `Q, V`        full view
//!
//! Prices and volumes are plain decimals (`100`, `100.25`).

use std::str::FromStr;

use depth_core::{FeedEvent, PriceLevel, Side, ViewQuery};
use rust_decimal::Decimal;
use thiserror::Error;

/// A parsed line: either something to apply or something to answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedLine {
    Event(FeedEvent),
    Query(ViewQuery),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CsvError {
    #[error("unknown line tag: {0:?}")]
    UnknownTag(String),

    #[error("'{tag}' line expects {expected} fields, got {got}")]
    FieldCount {
        tag: char,
        expected: usize,
        got: usize,
    },

    #[error("invalid decimal: {0:?}")]
    InvalidDecimal(String),

    #[error("invalid side: {0:?}")]
    InvalidSide(String),

    #[error("invalid snapshot level (want side:price:volume): {0:?}")]
    InvalidLevel(String),

    #[error("unknown query: {0:?}")]
    UnknownQuery(String),
}

/// Parse a single CSV line.
///
/// Returns `Ok(None)` for blank lines and comments.
pub fn parse_feed_line(line: &str) -> Result<Option<FeedLine>, CsvError> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }

    let tokens = split_and_trim(trimmed, ',');

    let line = match tokens[0] {
        "S" => FeedLine::Event(parse_snapshot(&tokens)?),
        "L" => FeedLine::Event(parse_level_changed(&tokens)?),
        "P" => FeedLine::Event(parse_best_price(&tokens)?),
        "R" => {
            expect_fields('R', &tokens, 1)?;
            FeedLine::Event(FeedEvent::Reset)
        }
        "Q" => FeedLine::Query(parse_query(&tokens)?),
        other => return Err(CsvError::UnknownTag(other.to_string())),
    };
    Ok(Some(line))
}

fn parse_snapshot(tokens: &[&str]) -> Result<FeedEvent, CsvError> {
    // S, B:100:50, A:101:30, ...
    let levels = tokens[1..]
        .iter()
        .filter(|tok| !tok.is_empty())
        .map(|tok| parse_level(tok))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(FeedEvent::init_snapshot(levels))
}

fn parse_level(token: &str) -> Result<PriceLevel, CsvError> {
    let parts: Vec<&str> = token.split(':').map(str::trim).collect();
    if parts.len() != 3 {
        return Err(CsvError::InvalidLevel(token.to_string()));
    }

    let side = parse_side(parts[0])?;
    let price = parse_decimal(parts[1])?;
    let volume = parse_decimal(parts[2])?;
    Ok(PriceLevel::new(price, side, volume))
}

fn parse_level_changed(tokens: &[&str]) -> Result<FeedEvent, CsvError> {
    // L, price, side, volume
    expect_fields('L', tokens, 4)?;

    let price = parse_decimal(tokens[1])?;
    let side = parse_side(tokens[2])?;
    let volume = parse_decimal(tokens[3])?;
    Ok(FeedEvent::level_changed(price, side, volume))
}

fn parse_best_price(tokens: &[&str]) -> Result<FeedEvent, CsvError> {
    // P, side, price
    expect_fields('P', tokens, 3)?;

    let side = parse_side(tokens[1])?;
    let price = parse_decimal(tokens[2])?;
    Ok(FeedEvent::best_price_changed(side, price))
}

fn parse_query(tokens: &[&str]) -> Result<ViewQuery, CsvError> {
    match tokens.get(1).copied() {
        Some("E") => {
            expect_fields('Q', tokens, 2)?;
            Ok(ViewQuery::Extrema)
        }
        Some("V") => {
            expect_fields('Q', tokens, 2)?;
            Ok(ViewQuery::Full)
        }
        Some("B") => {
            expect_fields('Q', tokens, 3)?;
            Ok(ViewQuery::Book(parse_side(tokens[2])?))
        }
        Some("C") => {
            expect_fields('Q', tokens, 3)?;
            Ok(ViewQuery::Cumulative(parse_side(tokens[2])?))
        }
        Some(other) => Err(CsvError::UnknownQuery(other.to_string())),
        None => Err(CsvError::FieldCount {
            tag: 'Q',
            expected: 2,
            got: tokens.len(),
        }),
    }
}

/// Format a feed event as a CSV line (no trailing newline).
pub fn format_event(event: &FeedEvent) -> String {
    match event {
        FeedEvent::InitSnapshot(snapshot) => {
            let mut line = String::from("S");
            for level in &snapshot.levels {
                line.push_str(&format!(
                    ", {}:{}:{}",
                    level.side.as_char(),
                    level.price,
                    level.volume
                ));
            }
            line
        }
        FeedEvent::LevelChanged(c) => {
            format!("L, {}, {}, {}", c.price, c.side.as_char(), c.volume)
        }
        FeedEvent::BestPriceChanged(b) => format!("P, {}, {}", b.side.as_char(), b.price),
        FeedEvent::Reset => "R".to_string(),
    }
}

/// Format a query as a CSV line (no trailing newline).
pub fn format_query(query: &ViewQuery) -> String {
    match query {
        ViewQuery::Extrema => "Q, E".to_string(),
        ViewQuery::Book(side) => format!("Q, B, {}", side.as_char()),
        ViewQuery::Cumulative(side) => format!("Q, C, {}", side.as_char()),
        ViewQuery::Full => "Q, V".to_string(),
    }
}

// -----------------------------------------------------------------------------
// Helpers
// -----------------------------------------------------------------------------

fn split_and_trim(s: &str, delimiter: char) -> Vec<&str> {
    s.split(delimiter).map(str::trim).collect()
}

fn expect_fields(tag: char, tokens: &[&str], expected: usize) -> Result<(), CsvError> {
    if tokens.len() != expected {
        return Err(CsvError::FieldCount {
            tag,
            expected,
            got: tokens.len(),
        });
    }
    Ok(())
}

fn parse_side(s: &str) -> Result<Side, CsvError> {
    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Side::from_char(c).ok_or_else(|| CsvError::InvalidSide(s.to_string())),
        _ => Err(CsvError::InvalidSide(s.to_string())),
    }
}

fn parse_decimal(s: &str) -> Result<Decimal, CsvError> {
    Decimal::from_str(s).map_err(|_| CsvError::InvalidDecimal(s.to_string()))
}
