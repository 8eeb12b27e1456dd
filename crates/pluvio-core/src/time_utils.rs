use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use tracing::warn;

/// Format used by rain-gauge exports for the textual date column.
pub const GAUGE_DATETIME_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

// ── Epoch handling ────────────────────────────────────────────────────────────

/// Parse a cell holding Unix epoch seconds.
///
/// Accepts integer and fractional seconds (fraction is dropped). Quotes and
/// surrounding whitespace are ignored. Returns `None` for empty, non-numeric
/// or non-finite input.
pub fn parse_epoch_seconds(cell: &str) -> Option<i64> {
    let cleaned = cell.trim().trim_matches('"').trim();
    if cleaned.is_empty() {
        return None;
    }
    if let Ok(secs) = cleaned.parse::<i64>() {
        return Some(secs);
    }
    let f: f64 = cleaned.parse().ok()?;
    if !f.is_finite() || f.abs() > i64::MAX as f64 {
        return None;
    }
    Some(f.trunc() as i64)
}

/// Calendar date of an epoch instant, evaluated in UTC.
///
/// UTC keeps the result independent of the machine running the pipeline.
pub fn utc_date_from_epoch(secs: i64) -> Option<NaiveDate> {
    DateTime::from_timestamp(secs, 0).map(|dt| dt.date_naive())
}

// ── History timestamps ────────────────────────────────────────────────────────

/// Parse an ISO 8601 / RFC 3339 timestamp into a UTC [`DateTime`].
///
/// Handles the `Z` suffix, any fixed offset, and naive date-times (read as
/// UTC). Returns `None` for empty strings or unrecognised formats.
pub fn parse_iso_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    let normalised = if let Some(stripped) = s.strip_suffix('Z') {
        format!("{}+00:00", stripped)
    } else {
        s.to_string()
    };

    if let Ok(dt) = DateTime::parse_from_rfc3339(&normalised) {
        return Some(dt.with_timezone(&Utc));
    }

    const FMTS: &[&str] = &[
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
    ];
    for fmt in FMTS {
        if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(s, fmt) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }

    warn!("could not parse timestamp \"{}\"", s);
    None
}

/// Render an instant the way gauge exports write their date column.
pub fn format_gauge_datetime(dt: DateTime<Utc>) -> String {
    dt.format(GAUGE_DATETIME_FORMAT).to_string()
}
