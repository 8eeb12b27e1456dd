use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::PluvioError;

/// Largest plausible single reading, in millimetres.
pub const DEFAULT_VALUE_CAP: f64 = 500.0;

/// A yearly total above this is treated as a parsing failure for that year.
pub const DEFAULT_YEAR_TOTAL_CAP: f64 = 5000.0;

/// Number of leading rows inspected when looking for a header.
pub const DEFAULT_HEADER_SCAN_ROWS: usize = 10;

/// Upper bound for [`NormalizerConfig::header_scan_rows`].
pub const MAX_HEADER_SCAN_ROWS: usize = 15;

/// One line of delimited input, cell by cell. Column meaning is decided by
/// the locator.
pub type RawRow = Vec<String>;

/// Summed rainfall per day for one year.
pub type DaySeries = BTreeMap<MonthDay, f64>;

/// Running total per day for one year, defined on the whole output domain.
pub type CumulativeSeries = BTreeMap<MonthDay, f64>;

// ── MonthDay ──────────────────────────────────────────────────────────────────

/// A calendar day without its year.
///
/// Ordering is numeric on `(month, day)` so `02/09` sorts before `02/10`.
/// Displays and serializes as zero-padded `"MM/DD"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthDay {
    month: u32,
    day: u32,
}

impl MonthDay {
    /// Build a month-day, or `None` when either component is out of range.
    ///
    /// Only the coarse `1..=12` / `1..=31` bounds are checked here; whether
    /// the day exists in a given year is the resolver's concern.
    pub fn new(month: u32, day: u32) -> Option<Self> {
        if (1..=12).contains(&month) && (1..=31).contains(&day) {
            Some(Self { month, day })
        } else {
            None
        }
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn day(&self) -> u32 {
        self.day
    }
}

impl fmt::Display for MonthDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}/{:02}", self.month, self.day)
    }
}

impl FromStr for MonthDay {
    type Err = PluvioError;

    /// Accepts `"MM/DD"` as well as unpadded `"M/D"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || PluvioError::TimestampParse(s.to_string());
        let (month, day) = s.trim().split_once('/').ok_or_else(invalid)?;
        let month: u32 = month.parse().map_err(|_| invalid())?;
        let day: u32 = day.parse().map_err(|_| invalid())?;
        MonthDay::new(month, day).ok_or_else(invalid)
    }
}

impl Serialize for MonthDay {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MonthDay {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// ── Reading ───────────────────────────────────────────────────────────────────

/// One resolved rainfall observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Four-digit calendar year.
    pub year: i32,
    /// Day within the year.
    pub month_day: MonthDay,
    /// Rainfall in millimetres, already clamped to the plausible range.
    pub value: f64,
}

// ── ColumnMap ─────────────────────────────────────────────────────────────────

/// Which cells of a row carry the timestamp, the textual date and the value.
///
/// A `None` value index means the value has to be found by scanning the row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ColumnMap {
    pub timestamp_index: Option<usize>,
    pub date_index: Option<usize>,
    pub value_index: Option<usize>,
}

impl ColumnMap {
    /// Positional layout of headerless gauge exports: timestamp, date, rain.
    pub fn fallback() -> Self {
        Self {
            timestamp_index: Some(0),
            date_index: Some(1),
            value_index: Some(2),
        }
    }

    /// Highest column index referenced, if any.
    pub fn max_index(&self) -> Option<usize> {
        [self.timestamp_index, self.date_index, self.value_index]
            .into_iter()
            .flatten()
            .max()
    }
}

// ── NormalizerConfig ──────────────────────────────────────────────────────────

/// Tunables of the normalization pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizerConfig {
    /// Single readings above this (mm) are replaced by 0.
    pub value_cap: f64,
    /// When set, a day whose summed value exceeds this contributes nothing
    /// to the cumulative series.
    pub cumulative_value_cap: Option<f64>,
    /// Yearly totals above this (mm) are reset to 0.
    pub year_total_cap: f64,
    /// Leading rows inspected by the locator.
    pub header_scan_rows: usize,
    /// Cell delimiter of the input text.
    pub delimiter: u8,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            value_cap: DEFAULT_VALUE_CAP,
            cumulative_value_cap: None,
            year_total_cap: DEFAULT_YEAR_TOTAL_CAP,
            header_scan_rows: DEFAULT_HEADER_SCAN_ROWS,
            delimiter: b';',
        }
    }
}

impl NormalizerConfig {
    /// Reject caps that are not finite and positive and scan windows outside
    /// `1..=MAX_HEADER_SCAN_ROWS`.
    pub fn validate(&self) -> crate::error::Result<()> {
        let positive = |v: f64| v.is_finite() && v > 0.0;
        if !positive(self.value_cap) {
            return Err(PluvioError::Config(format!(
                "value cap must be positive, got {}",
                self.value_cap
            )));
        }
        if let Some(cap) = self.cumulative_value_cap {
            if !positive(cap) {
                return Err(PluvioError::Config(format!(
                    "cumulative cap must be positive, got {cap}"
                )));
            }
        }
        if !positive(self.year_total_cap) {
            return Err(PluvioError::Config(format!(
                "year total cap must be positive, got {}",
                self.year_total_cap
            )));
        }
        if !(1..=MAX_HEADER_SCAN_ROWS).contains(&self.header_scan_rows) {
            return Err(PluvioError::Config(format!(
                "header scan rows must be within 1..={MAX_HEADER_SCAN_ROWS}, got {}",
                self.header_scan_rows
            )));
        }
        Ok(())
    }
}

// ── DailyRecord ───────────────────────────────────────────────────────────────

/// One day of the assembled output, with every year side by side.
///
/// Serializes to the flat shape charting code expects:
/// `{"date": "03/05", "2023": 1.2, "cumul2023": 40.5, ...}`.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyRecord {
    pub month_day: MonthDay,
    /// Raw rainfall per year; 0 for years without a reading that day.
    pub values: BTreeMap<i32, f64>,
    /// Running total per year, forward-filled.
    pub cumulative: BTreeMap<i32, f64>,
}

impl DailyRecord {
    /// Raw value for `year`, 0 when the year is unknown.
    pub fn value(&self, year: i32) -> f64 {
        self.values.get(&year).copied().unwrap_or(0.0)
    }

    /// Cumulative value for `year`, 0 when the year is unknown.
    pub fn cumulative(&self, year: i32) -> f64 {
        self.cumulative.get(&year).copied().unwrap_or(0.0)
    }
}

impl Serialize for DailyRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map =
            serializer.serialize_map(Some(1 + self.values.len() + self.cumulative.len()))?;
        map.serialize_entry("date", &self.month_day)?;
        for (year, value) in &self.values {
            map.serialize_entry(&format!("{year:04}"), value)?;
        }
        for (year, value) in &self.cumulative {
            map.serialize_entry(&format!("cumul{year:04}"), value)?;
        }
        map.end()
    }
}

// ── MonthlyRecord ─────────────────────────────────────────────────────────────

/// Rainfall summed per calendar month, every year side by side.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyRecord {
    /// Month number, 1-based.
    pub month: u32,
    /// Display name of the month.
    pub name: String,
    /// Total per year, rounded to one decimal.
    pub totals: BTreeMap<i32, f64>,
}
