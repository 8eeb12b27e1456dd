//! Plain-text and JSON rendering of a normalized series.

use chrono::NaiveDate;
use pluvio_core::formatting::{format_day_label, format_mm, format_number};
use pluvio_data::NormalizedSeries;

const LABEL_WIDTH: usize = 14;
const YEAR_WIDTH: usize = 10;

/// Which slice of the result to print.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Totals,
    Daily,
    Cumulative,
    Monthly,
}

impl View {
    /// Parse a `--view` value; unknown names fall back to totals.
    pub fn from_flag(name: &str) -> Self {
        match name {
            "daily" => View::Daily,
            "cumulative" => View::Cumulative,
            "monthly" => View::Monthly,
            _ => View::Totals,
        }
    }
}

pub fn render_json(series: &NormalizedSeries) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(series)?)
}

pub fn render_table(series: &NormalizedSeries, view: View) -> String {
    if series.is_empty() {
        return "No rainfall data.\n".to_string();
    }
    match view {
        View::Totals => render_totals(series),
        View::Daily => render_days(series, false),
        View::Cumulative => render_days(series, true),
        View::Monthly => render_monthly(series),
    }
}

/// `Today (2024-03-06): 1.6 mm` line for history input.
pub fn render_today(day: NaiveDate, total: f64) -> String {
    format!("Today ({}): {}\n", day.format("%Y-%m-%d"), format_mm(total))
}

// ── Views ──────────────────────────────────────────────────────────────────────

fn render_totals(series: &NormalizedSeries) -> String {
    let mut out = String::new();
    for (year, total) in &series.yearly_totals {
        let mut line = format!("{:<LABEL_WIDTH$}{:>YEAR_WIDTH$}", year, format_mm(*total));
        if series.stats.capped_years.contains(year) {
            line.push_str("  (implausible total)");
        }
        out.push_str(&line);
        out.push('\n');
    }
    if let Some(latest) = series.latest {
        out.push_str(&format!(
            "Latest: {} {} {}\n",
            format_day_label(latest.month_day),
            latest.year,
            format_mm(latest.value)
        ));
    }
    out
}

fn render_days(series: &NormalizedSeries, cumulative: bool) -> String {
    let years = series.years();
    let mut out = header_line("Day", &years);
    for record in &series.records {
        let mut line = format!("{:<LABEL_WIDTH$}", format_day_label(record.month_day));
        for &year in &years {
            let value = if cumulative {
                record.cumulative(year)
            } else {
                record.value(year)
            };
            line.push_str(&format!("{:>YEAR_WIDTH$}", format_number(value, 1)));
        }
        out.push_str(&line);
        out.push('\n');
    }
    out
}

fn render_monthly(series: &NormalizedSeries) -> String {
    let years = series.years();
    let mut out = header_line("Month", &years);
    for month in &series.monthly {
        let mut line = format!("{:<LABEL_WIDTH$}", month.name);
        for year in &years {
            let total = month.totals.get(year).copied().unwrap_or(0.0);
            line.push_str(&format!("{:>YEAR_WIDTH$}", format_number(total, 1)));
        }
        out.push_str(&line);
        out.push('\n');
    }
    out
}

fn header_line(label: &str, years: &[i32]) -> String {
    let mut line = format!("{label:<LABEL_WIDTH$}");
    for year in years {
        line.push_str(&format!("{year:>YEAR_WIDTH$}"));
    }
    line.push('\n');
    line
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use pluvio_core::models::NormalizerConfig;
    use pluvio_data::normalize_text;

    fn sample() -> NormalizedSeries {
        normalize_text(
            "Timestamp;Date;sum_rain\n\
             ;2023/03/15;12,5\n;2023/03/16;0\n;2024/03/16;4\n",
            &NormalizerConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_view_from_flag() {
        assert_eq!(View::from_flag("daily"), View::Daily);
        assert_eq!(View::from_flag("cumulative"), View::Cumulative);
        assert_eq!(View::from_flag("monthly"), View::Monthly);
        assert_eq!(View::from_flag("totals"), View::Totals);
    }

    #[test]
    fn test_render_totals() {
        let out = render_table(&sample(), View::Totals);
        assert!(out.contains("2023"));
        assert!(out.contains("12.5 mm"));
        assert!(out.contains("4.0 mm"));
        assert!(out.contains("Latest: 16 Mars 2024 4.0 mm"));
    }

    #[test]
    fn test_render_daily_and_cumulative() {
        let daily = render_table(&sample(), View::Daily);
        let lines: Vec<&str> = daily.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("Day"));
        assert!(lines[2].starts_with("16 Mars"));
        assert!(lines[2].trim_end().ends_with("4.0"));

        let cumul = render_table(&sample(), View::Cumulative);
        let last = cumul.lines().last().unwrap();
        assert!(last.contains("12.5"));
    }

    #[test]
    fn test_render_monthly() {
        let out = render_table(&sample(), View::Monthly);
        assert!(out.lines().nth(1).unwrap().starts_with("Mars"));
    }

    #[test]
    fn test_render_empty_series() {
        let out = render_table(&NormalizedSeries::default(), View::Daily);
        assert_eq!(out, "No rainfall data.\n");
    }

    #[test]
    fn test_render_json_is_chart_shaped() {
        let json = render_json(&sample()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["records"][0]["date"], "03/15");
        assert_eq!(value["records"][1]["cumul2023"], 12.5);
    }

    #[test]
    fn test_render_today() {
        let day = NaiveDate::from_ymd_opt(2024, 3, 6).unwrap();
        assert_eq!(render_today(day, 1.6), "Today (2024-03-06): 1.6 mm\n");
    }
}
