//! Per-row date and value resolution.
//!
//! A [`RowResolver`] is built once per batch from the located [`ColumnMap`]
//! and turns each data row into at most one [`Reading`]. Rows without a
//! usable date are rejected; rows with a usable date always yield a reading,
//! with the value forced to 0 when it is missing or implausible.

use std::sync::OnceLock;

use chrono::{Datelike, NaiveDate};
use pluvio_core::models::{ColumnMap, MonthDay, Reading};
use pluvio_core::time_utils::{parse_epoch_seconds, utc_date_from_epoch};
use regex::Regex;
use tracing::trace;

use crate::anomaly::AnomalyGuard;

/// `2024/03/05`, `2024-3-5`, `2024.03.05 12:00:00`...
fn year_first_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?:^|\D)(\d{4})[/.\-](\d{1,2})[/.\-](\d{1,2})(?:\D|$)")
            .expect("regex is valid")
    })
}

/// `05/03/2024`, `5-3-2024`...
fn day_first_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?:^|\D)(\d{1,2})[/.\-](\d{1,2})[/.\-](\d{4})(?:\D|$)")
            .expect("regex is valid")
    })
}

#[derive(Debug, Clone, Copy)]
pub struct RowResolver {
    columns: ColumnMap,
    guard: AnomalyGuard,
}

impl RowResolver {
    pub fn new(columns: ColumnMap, guard: AnomalyGuard) -> Self {
        Self { columns, guard }
    }

    /// Resolve one row, or `None` when it carries no usable date.
    pub fn resolve(&self, row: &[String]) -> Option<Reading> {
        if let Some(max) = self.columns.max_index() {
            if row.len() <= max {
                trace!(cells = row.len(), needed = max + 1, "row too short");
                return None;
            }
        }

        let Some(date) = self.resolve_date(row) else {
            trace!(?row, "row without a resolvable date");
            return None;
        };
        let month_day = MonthDay::new(date.month(), date.day())?;

        Some(Reading {
            year: date.year(),
            month_day,
            value: self.resolve_value(row),
        })
    }

    /// Epoch timestamp first (UTC), textual date second.
    fn resolve_date(&self, row: &[String]) -> Option<NaiveDate> {
        let from_timestamp = self
            .columns
            .timestamp_index
            .and_then(|i| row.get(i))
            .and_then(|cell| parse_epoch_seconds(cell))
            .and_then(utc_date_from_epoch);

        from_timestamp
            .or_else(|| {
                self.columns
                    .date_index
                    .and_then(|i| row.get(i))
                    .and_then(|cell| parse_date_text(cell))
            })
            .filter(|d| (1000..=9999).contains(&d.year()))
    }

    fn resolve_value(&self, row: &[String]) -> f64 {
        match self.columns.value_index {
            Some(i) => row
                .get(i)
                .and_then(|cell| parse_value(cell))
                .map_or(0.0, |v| self.guard.admit(v)),
            None => {
                let skip = [self.columns.timestamp_index, self.columns.date_index];
                row.iter()
                    .enumerate()
                    .filter(|(j, _)| !skip.contains(&Some(*j)))
                    .filter_map(|(_, cell)| parse_value(cell))
                    .find(|v| self.guard.is_plausible(*v))
                    .unwrap_or(0.0)
            }
        }
    }
}

/// Extract a calendar date from free text.
///
/// Year-first is tried before day-first; a match that is not a real
/// calendar date (e.g. `2023/02/30`) falls through to the next pattern.
pub fn parse_date_text(cell: &str) -> Option<NaiveDate> {
    let text: String = cell.chars().filter(|c| *c != '"' && *c != '\'').collect();

    let ymd = year_first_re().captures(&text).and_then(|caps| {
        NaiveDate::from_ymd_opt(
            caps[1].parse().ok()?,
            caps[2].parse().ok()?,
            caps[3].parse().ok()?,
        )
    });
    if ymd.is_some() {
        return ymd;
    }

    day_first_re().captures(&text).and_then(|caps| {
        NaiveDate::from_ymd_opt(
            caps[3].parse().ok()?,
            caps[2].parse().ok()?,
            caps[1].parse().ok()?,
        )
    })
}

/// Parse a locale-formatted number: decimal comma, optional quotes.
///
/// Returns `None` for empty, non-numeric and non-finite cells.
pub fn parse_value(cell: &str) -> Option<f64> {
    let cleaned = cell
        .trim()
        .trim_matches(|c: char| c == '"' || c == '\'')
        .trim()
        .replace(',', ".");
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}
