//! Per-year, per-day folding of resolved readings.

use std::collections::{BTreeMap, BTreeSet};

use pluvio_core::formatting::{month_name, round_one_decimal};
use pluvio_core::models::{DaySeries, MonthDay, MonthlyRecord, Reading};

// ── DailyAggregator ───────────────────────────────────────────────────────────

/// Accumulates readings into one [`DaySeries`] per year.
///
/// Two readings for the same `(year, day)` are summed, never overwritten:
/// gauges that report several times a day produce several rows for it.
#[derive(Debug, Clone, Default)]
pub struct DailyAggregator {
    days: BTreeMap<i32, DaySeries>,
    totals: BTreeMap<i32, f64>,
    months: BTreeMap<(u32, i32), f64>,
    count: usize,
}

impl DailyAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, reading: &Reading) {
        *self
            .days
            .entry(reading.year)
            .or_default()
            .entry(reading.month_day)
            .or_insert(0.0) += reading.value;
        *self.totals.entry(reading.year).or_insert(0.0) += reading.value;
        *self
            .months
            .entry((reading.month_day.month(), reading.year))
            .or_insert(0.0) += reading.value;
        self.count += 1;
    }

    /// Number of readings folded so far.
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Years seen, ascending.
    pub fn years(&self) -> Vec<i32> {
        self.days.keys().copied().collect()
    }

    pub fn day_series(&self, year: i32) -> Option<&DaySeries> {
        self.days.get(&year)
    }

    /// All day series, keyed by year.
    pub fn series(&self) -> &BTreeMap<i32, DaySeries> {
        &self.days
    }

    /// Unrounded sum of raw values per year.
    pub fn totals(&self) -> &BTreeMap<i32, f64> {
        &self.totals
    }

    /// Every day observed in any year, in `(month, day)` order.
    pub fn output_domain(&self) -> Vec<MonthDay> {
        self.days
            .values()
            .flat_map(|series| series.keys().copied())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Totals per calendar month, only for months observed in some year.
    ///
    /// Every record lists every year; years without data that month get 0.
    pub fn monthly_records(&self) -> Vec<MonthlyRecord> {
        let years = self.years();
        let mut records: Vec<MonthlyRecord> = Vec::new();

        for (&(month, year), &sum) in &self.months {
            if records.last().map(|r| r.month) != Some(month) {
                records.push(MonthlyRecord {
                    month,
                    name: month_name(month).to_string(),
                    totals: years.iter().map(|&y| (y, 0.0)).collect(),
                });
            }
            if let Some(record) = records.last_mut() {
                record.totals.insert(year, round_one_decimal(sum));
            }
        }
        records
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
