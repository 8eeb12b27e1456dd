//! Main normalization pipeline for pluvio.
//!
//! Runs one batch of rows through locate → resolve → aggregate → cumulate →
//! cap → assemble and returns a [`NormalizedSeries`] ready for display or
//! charting. Every intermediate map lives inside a single call.

use std::collections::BTreeMap;
use std::path::Path;

use pluvio_core::error::{PluvioError, Result};
use pluvio_core::models::{
    ColumnMap, CumulativeSeries, DailyRecord, MonthlyRecord, NormalizerConfig, RawRow, Reading,
};
use serde::Serialize;
use tracing::{debug, warn};

use crate::aggregator::DailyAggregator;
use crate::anomaly::AnomalyGuard;
use crate::assembler::SeriesAssembler;
use crate::cumulative::CumulativeBuilder;
use crate::locator::Locator;
use crate::reader::{parse_rows, read_text};
use crate::resolver::RowResolver;

// ── Public types ──────────────────────────────────────────────────────────────

/// Bookkeeping produced alongside a [`NormalizedSeries`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NormalizeStats {
    /// Non-empty rows in the batch, header and preamble included.
    pub rows_seen: usize,
    /// Data rows that did not resolve to a reading.
    pub rows_skipped: usize,
    /// Readings folded into the series.
    pub readings: usize,
    /// Index of the detected header row, `None` for positional input.
    pub header_row: Option<usize>,
    pub columns: ColumnMap,
    /// Years whose total was reset by the plausibility ceiling.
    pub capped_years: Vec<i32>,
}

/// The complete output of [`normalize`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NormalizedSeries {
    /// One record per observed day, ordered by `(month, day)`.
    pub records: Vec<DailyRecord>,
    /// Capped total per year, rounded to one decimal.
    pub yearly_totals: BTreeMap<i32, f64>,
    /// Totals per calendar month, only months with data.
    pub monthly: Vec<MonthlyRecord>,
    /// Last resolved reading in input order.
    pub latest: Option<Reading>,
    pub stats: NormalizeStats,
}

impl NormalizedSeries {
    /// Years present in the result, ascending.
    pub fn years(&self) -> Vec<i32> {
        self.yearly_totals.keys().copied().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

// ── Public functions ──────────────────────────────────────────────────────────

/// Normalize a batch of already split rows.
///
/// Fails only on an invalid `config` or a batch with fewer than two rows.
/// Unresolvable rows are skipped and implausible values are zeroed; a batch
/// in which no row resolves yields an empty series.
pub fn normalize(rows: &[RawRow], config: &NormalizerConfig) -> Result<NormalizedSeries> {
    config.validate()?;

    if rows.len() < 2 {
        return Err(PluvioError::MalformedBatch(format!(
            "expected at least 2 rows, got {}",
            rows.len()
        )));
    }

    // ── Step 1: Locate columns ────────────────────────────────────────────────
    let location = Locator::new(config.header_scan_rows).locate(rows);
    let guard = AnomalyGuard::from_config(config);
    let resolver = RowResolver::new(location.columns, guard);

    // ── Step 2: Resolve and aggregate ─────────────────────────────────────────
    let mut aggregator = DailyAggregator::new();
    let mut latest = None;
    let mut rows_skipped = 0usize;
    for row in rows.iter().skip(location.data_start) {
        match resolver.resolve(row) {
            Some(reading) => {
                aggregator.add(&reading);
                latest = Some(reading);
            }
            None => rows_skipped += 1,
        }
    }

    let mut stats = NormalizeStats {
        rows_seen: rows.len(),
        rows_skipped,
        readings: aggregator.len(),
        header_row: location.header_row,
        columns: location.columns,
        capped_years: Vec::new(),
    };

    if aggregator.is_empty() {
        warn!(rows = rows.len(), "no row resolved to a reading");
        return Ok(NormalizedSeries {
            stats,
            ..Default::default()
        });
    }

    // ── Step 3: Cumulative series ─────────────────────────────────────────────
    let domain = aggregator.output_domain();
    let builder = CumulativeBuilder::new(guard);
    let cumulative: BTreeMap<i32, CumulativeSeries> = aggregator
        .series()
        .iter()
        .map(|(&year, days)| (year, builder.build(days, &domain)))
        .collect();

    // ── Step 4: Yearly totals ─────────────────────────────────────────────────
    let mut yearly_totals = aggregator.totals().clone();
    stats.capped_years = guard.finalize_totals(&mut yearly_totals);

    // ── Step 5: Assemble ──────────────────────────────────────────────────────
    let records = SeriesAssembler::assemble(&domain, aggregator.series(), &cumulative);

    debug!(
        rows = stats.rows_seen,
        skipped = stats.rows_skipped,
        readings = stats.readings,
        days = records.len(),
        years = yearly_totals.len(),
        header_row = ?stats.header_row,
        "normalized batch"
    );

    Ok(NormalizedSeries {
        records,
        yearly_totals,
        monthly: aggregator.monthly_records(),
        latest,
        stats,
    })
}

/// Split `text` with the configured delimiter and normalize it.
pub fn normalize_text(text: &str, config: &NormalizerConfig) -> Result<NormalizedSeries> {
    let rows = parse_rows(text, config.delimiter)?;
    normalize(&rows, config)
}

/// Read a delimited file and normalize it.
pub fn normalize_file(path: &Path, config: &NormalizerConfig) -> Result<NormalizedSeries> {
    let text = read_text(path)?;
    debug!("Normalizing {}", path.display());
    normalize_text(&text, config)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
