//! Header and column detection.
//!
//! Gauge exports put their header on an arbitrary early line and name the
//! columns loosely (`Timestamp`, `"Timezone : Europe/Madrid"`, `sum_rain`,
//! `Pluie (mm)`...). The locator runs once per batch and hands the resolver
//! a fixed [`ColumnMap`].

use pluvio_core::models::{ColumnMap, RawRow};
use serde::Serialize;
use tracing::debug;

/// Where the data lives inside a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Location {
    pub columns: ColumnMap,
    /// Index of the first row holding data.
    pub data_start: usize,
    /// Index of the detected header row, `None` when the fallback was used.
    pub header_row: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnRole {
    Timestamp,
    Date,
    /// `exact` is set for the canonical `sum_rain` name.
    Value { exact: bool },
}

/// Scans the leading rows of a batch for a header.
#[derive(Debug, Clone, Copy)]
pub struct Locator {
    scan_rows: usize,
}

impl Locator {
    pub fn new(scan_rows: usize) -> Self {
        Self { scan_rows }
    }

    /// Find the column layout of `rows`.
    ///
    /// Every cell of the first `scan_rows` rows is classified; scanning stops
    /// after the row containing a `timestamp` cell, which becomes the header.
    /// Date and value columns keep the last match seen, except that an exact
    /// `sum_rain` is never replaced by a looser `rain`/`pluie` match.
    ///
    /// Without a `timestamp` cell, a row naming a date column (`Date`,
    /// `Timezone...`) is taken as the header and the matched date and value
    /// columns are kept; the last such row wins. With no date column either,
    /// the positional layout of [`ColumnMap::fallback`] is used and data
    /// starts at the first row; rows that are not data are rejected one by
    /// one by the resolver. Never fails.
    pub fn locate(&self, rows: &[RawRow]) -> Location {
        let mut timestamp_index = None;
        let mut date_index = None;
        let mut date_row = None;
        let mut value_index = None;
        let mut exact_value = false;

        for (i, row) in rows.iter().take(self.scan_rows).enumerate() {
            for (j, cell) in row.iter().enumerate() {
                match classify(cell) {
                    Some(ColumnRole::Timestamp) => timestamp_index = Some(j),
                    Some(ColumnRole::Date) => {
                        date_index = Some(j);
                        date_row = Some(i);
                    }
                    Some(ColumnRole::Value { exact }) => {
                        if exact || !exact_value {
                            value_index = Some(j);
                            exact_value = exact;
                        }
                    }
                    None => {}
                }
            }

            if timestamp_index.is_some() {
                let columns = ColumnMap {
                    timestamp_index,
                    date_index,
                    value_index,
                };
                debug!(header_row = i, ?columns, "header found");
                return Location {
                    columns,
                    data_start: i + 1,
                    header_row: Some(i),
                };
            }
        }

        if let Some(i) = date_row {
            let columns = ColumnMap {
                timestamp_index: None,
                date_index,
                value_index,
            };
            debug!(header_row = i, ?columns, "date header found");
            return Location {
                columns,
                data_start: i + 1,
                header_row: Some(i),
            };
        }

        debug!(
            scanned = rows.len().min(self.scan_rows),
            "no header found; using positional columns"
        );
        Location {
            columns: ColumnMap::fallback(),
            data_start: 0,
            header_row: None,
        }
    }
}

/// Match one cell against the known header tokens, case-insensitively.
fn classify(cell: &str) -> Option<ColumnRole> {
    let text = cell.trim().trim_matches('"').trim().to_lowercase();
    if text.is_empty() {
        return None;
    }
    if text == "timestamp" {
        Some(ColumnRole::Timestamp)
    } else if text.contains("timezone") || text.contains("date") {
        Some(ColumnRole::Date)
    } else if text == "sum_rain" {
        Some(ColumnRole::Value { exact: true })
    } else if text.contains("rain") || text.contains("pluie") {
        Some(ColumnRole::Value { exact: false })
    } else {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
