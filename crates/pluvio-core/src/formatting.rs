use crate::models::MonthDay;

const MONTH_NAMES: [&str; 12] = [
    "Janvier",
    "Février",
    "Mars",
    "Avril",
    "Mai",
    "Juin",
    "Juillet",
    "Août",
    "Septembre",
    "Octobre",
    "Novembre",
    "Décembre",
];

const MONTH_SHORT_NAMES: [&str; 12] = [
    "Jan", "Fév", "Mar", "Avr", "Mai", "Juin", "Juil", "Août", "Sep", "Oct", "Nov", "Déc",
];

/// Format a floating-point number with thousands separators and a fixed number
/// of decimal places.
///
/// # Examples
///
/// ```
/// use pluvio_core::formatting::format_number;
///
/// assert_eq!(format_number(1234.5, 1), "1,234.5");
/// assert_eq!(format_number(0.0, 2), "0.00");
/// assert_eq!(format_number(-9876.5, 1), "-9,876.5");
/// ```
pub fn format_number(value: f64, decimals: u32) -> String {
    let negative = value < 0.0;
    let rounded = round_to(value.abs(), decimals);

    let integer_part = rounded.trunc() as u64;
    let grouped = group_thousands(&integer_part.to_string());

    let result = if decimals == 0 {
        grouped
    } else {
        // "0.50" → ".50"
        let frac_str = format!("{:.prec$}", rounded.fract(), prec = decimals as usize);
        format!("{}{}", grouped, &frac_str[1..])
    };

    if negative && rounded != 0.0 {
        format!("-{}", result)
    } else {
        result
    }
}

/// Rainfall amount in millimetres with one decimal, e.g. `"1,234.5 mm"`.
///
/// ```
/// use pluvio_core::formatting::format_mm;
///
/// assert_eq!(format_mm(12.5), "12.5 mm");
/// assert_eq!(format_mm(0.0), "0.0 mm");
/// ```
pub fn format_mm(value: f64) -> String {
    format!("{} mm", format_number(value, 1))
}

/// Round to one decimal place, the precision used for yearly totals.
pub fn round_one_decimal(value: f64) -> f64 {
    round_to(value, 1)
}

/// Full month name for a 1-based month number, `""` when out of range.
pub fn month_name(month: u32) -> &'static str {
    month
        .checked_sub(1)
        .and_then(|i| MONTH_NAMES.get(i as usize))
        .copied()
        .unwrap_or("")
}

/// Abbreviated month name for a 1-based month number, `""` when out of range.
pub fn month_short_name(month: u32) -> &'static str {
    month
        .checked_sub(1)
        .and_then(|i| MONTH_SHORT_NAMES.get(i as usize))
        .copied()
        .unwrap_or("")
}

/// Human label for a day of the year: `03/15` → `"15 Mars"`.
pub fn format_day_label(month_day: MonthDay) -> String {
    format!("{} {}", month_day.day(), month_name(month_day.month()))
}

// ── Internal helpers ──────────────────────────────────────────────────────────

fn round_to(value: f64, decimals: u32) -> f64 {
    // Half-ULP nudge so exact decimal midpoints like 1.005 round up.
    let factor = 10_f64.powi(decimals as i32);
    let epsilon = f64::EPSILON * value.abs() * factor;
    ((value * factor) + epsilon.copysign(value)).round() / factor
}

/// Insert commas every three digits from the right of an integer string.
fn group_thousands(s: &str) -> String {
    if s.len() <= 3 {
        return s.to_string();
    }
    let remainder = s.len() % 3;
    let mut result = String::with_capacity(s.len() + s.len() / 3);
    for (i, c) in s.chars().enumerate() {
        if i != 0 && (i % 3 == remainder) {
            result.push(',');
        }
        result.push(c);
    }
    result
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    // ── format_number ────────────────────────────────────────────────────────

    #[test]
    fn test_format_number_zero() {
        assert_eq!(format_number(0.0, 0), "0");
        assert_eq!(format_number(0.0, 1), "0.0");
    }

    #[test]
    fn test_format_number_with_thousands() {
        assert_eq!(format_number(1_234.5, 1), "1,234.5");
        assert_eq!(format_number(1_234_567.0, 0), "1,234,567");
    }

    #[test]
    fn test_format_number_negative() {
        assert_eq!(format_number(-9_876.5, 1), "-9,876.5");
    }

    #[test]
    fn test_format_number_rounds_up_midpoint() {
        assert_eq!(format_number(1.005, 2), "1.01");
    }

    #[test]
    fn test_format_number_carries_into_integer_part() {
        assert_eq!(format_number(9.96, 1), "10.0");
    }

    // ── format_mm ────────────────────────────────────────────────────────────

    #[test]
    fn test_format_mm() {
        assert_eq!(format_mm(12.5), "12.5 mm");
        assert_eq!(format_mm(1_024.04), "1,024.0 mm");
    }

    // ── round_one_decimal ────────────────────────────────────────────────────

    #[test]
    fn test_round_one_decimal() {
        assert!((round_one_decimal(12.34) - 12.3).abs() < 1e-9);
        assert!((round_one_decimal(12.35) - 12.4).abs() < 1e-9);
        assert!((round_one_decimal(0.1 + 0.2) - 0.3).abs() < 1e-9);
        assert_eq!(round_one_decimal(0.0), 0.0);
    }

    // ── month names ──────────────────────────────────────────────────────────

    #[test]
    fn test_month_name() {
        assert_eq!(month_name(1), "Janvier");
        assert_eq!(month_name(8), "Août");
        assert_eq!(month_name(12), "Décembre");
        assert_eq!(month_name(0), "");
        assert_eq!(month_name(13), "");
    }

    #[test]
    fn test_month_short_name() {
        assert_eq!(month_short_name(2), "Fév");
        assert_eq!(month_short_name(7), "Juil");
        assert_eq!(month_short_name(0), "");
    }

    #[test]
    fn test_format_day_label() {
        let md = MonthDay::new(3, 15).unwrap();
        assert_eq!(format_day_label(md), "15 Mars");
        let md = MonthDay::new(1, 5).unwrap();
        assert_eq!(format_day_label(md), "5 Janvier");
    }
}
