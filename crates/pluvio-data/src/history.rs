//! Home Assistant history adapter.
//!
//! The history API returns one array of state changes per entity:
//!
//! ```json
//! [[{"entity_id": "sensor.pluviometre_gui", "state": "0.4",
//!    "last_changed": "2024-03-05T08:00:00+00:00"}, ...]]
//! ```
//!
//! Only the first point of a series is guaranteed to carry `entity_id`.
//! The adapter turns the matching series into gauge-style rows so that it
//! goes through the normal pipeline.

use chrono::{DateTime, NaiveDate, Utc};
use pluvio_core::error::{PluvioError, Result};
use pluvio_core::formatting::round_one_decimal;
use pluvio_core::models::RawRow;
use pluvio_core::time_utils::{format_gauge_datetime, parse_iso_timestamp};
use serde::Deserialize;
use tracing::debug;

/// One state change as returned by the history API.
#[derive(Debug, Clone, Deserialize)]
pub struct HistoryPoint {
    #[serde(default)]
    pub entity_id: Option<String>,
    /// Usually a numeric string, sometimes `"unavailable"` or a bare number.
    #[serde(default)]
    pub state: serde_json::Value,
    #[serde(default)]
    pub last_changed: String,
}

impl HistoryPoint {
    /// Numeric, finite, non-negative state.
    pub fn rainfall(&self) -> Option<f64> {
        let value = match &self.state {
            serde_json::Value::Number(n) => n.as_f64(),
            serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }?;
        (value.is_finite() && value >= 0.0).then_some(value)
    }

    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        parse_iso_timestamp(&self.last_changed)
    }
}

pub type History = Vec<Vec<HistoryPoint>>;

pub fn parse_history_json(text: &str) -> Result<History> {
    Ok(serde_json::from_str(text)?)
}

/// Valid `(instant, value)` samples of `entity`, oldest first.
pub fn entity_samples(history: &History, entity: &str) -> Result<Vec<(DateTime<Utc>, f64)>> {
    let series = history
        .iter()
        .find(|series| {
            series
                .first()
                .and_then(|p| p.entity_id.as_deref())
                .is_some_and(|id| id == entity)
        })
        .ok_or_else(|| PluvioError::EntityNotFound(entity.to_string()))?;

    let mut samples: Vec<(DateTime<Utc>, f64)> = series
        .iter()
        .filter_map(|p| Some((p.timestamp()?, p.rainfall()?)))
        .collect();
    samples.sort_by_key(|(ts, _)| *ts);

    debug!(
        entity,
        points = series.len(),
        valid = samples.len(),
        "history series selected"
    );
    Ok(samples)
}

/// Gauge-style rows for `entity`: a `Timestamp;Date;sum_rain` header, then
/// one row per valid sample.
pub fn history_to_rows(history: &History, entity: &str) -> Result<Vec<RawRow>> {
    let samples = entity_samples(history, entity)?;
    let mut rows: Vec<RawRow> = Vec::with_capacity(samples.len() + 1);
    rows.push(vec![
        "Timestamp".to_string(),
        "Date".to_string(),
        "sum_rain".to_string(),
    ]);
    rows.extend(samples.into_iter().map(|(ts, value)| {
        vec![
            ts.timestamp().to_string(),
            format_gauge_datetime(ts),
            value.to_string(),
        ]
    }));
    Ok(rows)
}

/// Rainfall of one day from its sub-daily samples (oldest first).
///
/// Samples are normally per-interval amounts and are summed. A series that
/// looks like a running counter (last more than three times the first, and
/// more than 5 mm above it) is read as `last - first` instead. Rounded to
/// one decimal.
pub fn day_total(samples: &[f64]) -> f64 {
    let mut total: f64 = samples.iter().sum();
    if let (Some(&first), Some(&last)) = (samples.first(), samples.last()) {
        if samples.len() > 1 && last > first * 3.0 && last - first > 5.0 {
            total = last - first;
        }
    }
    round_one_decimal(total)
}

/// Day total of the most recent UTC day present in the history of `entity`.
pub fn latest_day_total(history: &History, entity: &str) -> Result<Option<(NaiveDate, f64)>> {
    let samples = entity_samples(history, entity)?;
    let Some(day) = samples.last().map(|(ts, _)| ts.date_naive()) else {
        return Ok(None);
    };
    let values: Vec<f64> = samples
        .iter()
        .filter(|(ts, _)| ts.date_naive() == day)
        .map(|(_, v)| *v)
        .collect();
    Ok(Some((day, day_total(&values))))
}
