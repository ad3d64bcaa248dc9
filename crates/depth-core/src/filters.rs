//! Renderer-facing helpers: display mode and volume filters.
//!
//! A filter rule tags every level whose volume reaches its threshold; when
//! several rules pass, the one with the highest threshold wins. The tag type
//! is up to the caller (a color, a style name, ...).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::level::{Price, PriceLevel, Volume};

/// Which outputs a renderer draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayMode {
    /// Per-level volume bars only.
    #[default]
    Levels,
    /// Cumulative curves only.
    Cumulative,
    /// Both, overlaid.
    Combined,
}

impl DisplayMode {
    pub fn wants_levels(self) -> bool {
        !matches!(self, DisplayMode::Cumulative)
    }

    pub fn wants_cumulative(self) -> bool {
        !matches!(self, DisplayMode::Levels)
    }
}

/// Tag levels with at least `threshold` volume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterRule<T> {
    pub threshold: Volume,
    pub tag: T,
}

impl<T> FilterRule<T> {
    pub fn new(threshold: Volume, tag: T) -> Self {
        FilterRule { threshold, tag }
    }
}

/// Tag of the highest threshold that `volume` reaches, if any.
///
/// Rules need not be sorted. On equal thresholds the first rule wins.
pub fn filter_tag_for<T: Clone>(volume: Volume, rules: &[FilterRule<T>]) -> Option<T> {
    let mut best: Option<&FilterRule<T>> = None;
    for rule in rules.iter().filter(|rule| rule.threshold <= volume) {
        match best {
            Some(current) if current.threshold >= rule.threshold => {}
            _ => best = Some(rule),
        }
    }
    best.map(|rule| rule.tag.clone())
}

/// Tag every level that passes at least one rule.
///
/// Recompute whenever the rule set changes; for single level changes use
/// [`update_filter_entry`].
pub fn build_filter_table<'a, T, I>(levels: I, rules: &[FilterRule<T>]) -> BTreeMap<Price, T>
where
    T: Clone,
    I: IntoIterator<Item = &'a PriceLevel>,
{
    levels
        .into_iter()
        .filter(|level| !level.is_removal())
        .filter_map(|level| filter_tag_for(level.volume, rules).map(|tag| (level.price, tag)))
        .collect()
}

/// Refresh one price's entry after a level change (zero volume drops it).
pub fn update_filter_entry<T: Clone>(
    table: &mut BTreeMap<Price, T>,
    level: &PriceLevel,
    rules: &[FilterRule<T>],
) {
    table.remove(&level.price);
    if level.is_removal() {
        return;
    }
    if let Some(tag) = filter_tag_for(level.volume, rules) {
        table.insert(level.price, tag);
    }
}
