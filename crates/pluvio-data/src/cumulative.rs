//! Running totals per year, forward-filled across the output domain.

use pluvio_core::models::{CumulativeSeries, DaySeries, MonthDay};

use crate::anomaly::AnomalyGuard;

/// Builds one [`CumulativeSeries`] per year.
#[derive(Debug, Clone, Copy)]
pub struct CumulativeBuilder {
    guard: AnomalyGuard,
}

impl CumulativeBuilder {
    pub fn new(guard: AnomalyGuard) -> Self {
        Self { guard }
    }

    /// Walk `domain` in order, adding each day's value to the running total.
    ///
    /// Days missing from `days` carry the previous total (0 before the first
    /// reading), so the result has an entry for every domain day and never
    /// decreases. `domain` must be sorted.
    pub fn build(&self, days: &DaySeries, domain: &[MonthDay]) -> CumulativeSeries {
        let mut running = 0.0;
        domain
            .iter()
            .map(|day| {
                if let Some(&value) = days.get(day) {
                    running += self.guard.cumulative_contribution(value);
                }
                (*day, running)
            })
            .collect()
    }
}
