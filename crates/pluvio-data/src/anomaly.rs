//! Plausibility checks on readings and yearly totals.
//!
//! Gauges occasionally report garbage (sensor resets, unit mix-ups, a counter
//! written into the daily column). Nothing is dropped here: implausible
//! single values become 0 and implausible yearly totals are reset to 0 while
//! the daily series stay intact.

use std::collections::BTreeMap;

use pluvio_core::formatting::round_one_decimal;
use pluvio_core::models::NormalizerConfig;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnomalyGuard {
    value_cap: f64,
    cumulative_cap: Option<f64>,
    year_total_cap: f64,
}

impl AnomalyGuard {
    pub fn new(value_cap: f64, cumulative_cap: Option<f64>, year_total_cap: f64) -> Self {
        Self {
            value_cap,
            cumulative_cap,
            year_total_cap,
        }
    }

    pub fn from_config(config: &NormalizerConfig) -> Self {
        Self::new(
            config.value_cap,
            config.cumulative_value_cap,
            config.year_total_cap,
        )
    }

    /// `true` for a finite value within `[0, value_cap]`.
    pub fn is_plausible(&self, value: f64) -> bool {
        value.is_finite() && (0.0..=self.value_cap).contains(&value)
    }

    /// The value itself when plausible, 0 otherwise.
    pub fn admit(&self, value: f64) -> f64 {
        if self.is_plausible(value) {
            value
        } else {
            0.0
        }
    }

    /// What a day's summed value adds to the cumulative series.
    ///
    /// Identity unless a cumulative cap is configured, in which case days
    /// above the cap contribute nothing.
    pub fn cumulative_contribution(&self, day_sum: f64) -> f64 {
        match self.cumulative_cap {
            Some(cap) if day_sum > cap => 0.0,
            _ => day_sum,
        }
    }

    /// Cap and round yearly totals in place.
    ///
    /// Totals above the yearly ceiling are reset to 0; the rest are rounded
    /// to one decimal. Returns the years that were reset.
    pub fn finalize_totals(&self, totals: &mut BTreeMap<i32, f64>) -> Vec<i32> {
        let mut capped = Vec::new();
        for (year, total) in totals.iter_mut() {
            if *total > self.year_total_cap {
                warn!(
                    year = *year,
                    total = *total,
                    cap = self.year_total_cap,
                    "implausible yearly total reset to 0"
                );
                *total = 0.0;
                capped.push(*year);
            } else {
                *total = round_one_decimal(*total);
            }
        }
        capped
    }
}

impl Default for AnomalyGuard {
    fn default() -> Self {
        Self::from_config(&NormalizerConfig::default())
    }
}
