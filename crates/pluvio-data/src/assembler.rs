//! Merges per-year series into chart-ready daily records.

use std::collections::{BTreeMap, BTreeSet};

use pluvio_core::models::{CumulativeSeries, DailyRecord, DaySeries, MonthDay};

/// Stateless merger of [`DaySeries`] and [`CumulativeSeries`].
pub struct SeriesAssembler;

impl SeriesAssembler {
    /// One [`DailyRecord`] per domain day, in domain order.
    ///
    /// Every record carries every year of either map: raw value 0 when the year
    /// has no reading that day, cumulative value as forward-filled by the
    /// builder (0 if the year has no cumulative series at all).
    pub fn assemble(
        domain: &[MonthDay],
        days: &BTreeMap<i32, DaySeries>,
        cumulative: &BTreeMap<i32, CumulativeSeries>,
    ) -> Vec<DailyRecord> {
        let years: BTreeSet<i32> = days.keys().chain(cumulative.keys()).copied().collect();

        domain
            .iter()
            .map(|day| {
                let mut values = BTreeMap::new();
                let mut cumul = BTreeMap::new();
                for &year in &years {
                    let raw = days
                        .get(&year)
                        .and_then(|s| s.get(day))
                        .copied()
                        .unwrap_or(0.0);
                    let running = cumulative
                        .get(&year)
                        .and_then(|s| s.get(day))
                        .copied()
                        .unwrap_or(0.0);
                    values.insert(year, raw);
                    cumul.insert(year, running);
                }
                DailyRecord {
                    month_day: *day,
                    values,
                    cumulative: cumul,
                }
            })
            .collect()
    }
}
