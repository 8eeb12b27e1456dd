//! Delimited text loading for pluvio.
//!
//! Splits gauge exports into [`RawRow`]s without assuming any schema: rows
//! may have different lengths, cells may be quoted, and the header (if any)
//! can sit anywhere in the first lines. Column meaning is left to the
//! [`locator`](crate::locator).

use std::path::Path;

use pluvio_core::error::{PluvioError, Result};
use pluvio_core::models::RawRow;
use tracing::debug;

// ── Public API ────────────────────────────────────────────────────────────────

/// Split `text` into rows of trimmed cells.
///
/// Blank lines and rows whose cells are all empty are dropped. A leading
/// UTF-8 byte-order mark is ignored.
pub fn parse_rows(text: &str, delimiter: u8) -> Result<Vec<RawRow>> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    // flexible(true): rows of varying width are normal in gauge exports.
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .delimiter(delimiter)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let mut rows: Vec<RawRow> = Vec::new();
    for record in rdr.records() {
        let record = record?;
        if record.iter().all(|cell| cell.is_empty()) {
            continue;
        }
        rows.push(record.iter().map(str::to_string).collect());
    }

    debug!("Parsed {} rows", rows.len());
    Ok(rows)
}

/// Read a whole file as UTF-8 text.
pub fn read_text(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|source| PluvioError::FileRead {
        path: path.to_path_buf(),
        source,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_rows_splits_on_semicolon() {
        let rows = parse_rows("a;b;c\n1;2;3\n", b';').unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], vec!["a", "b", "c"]);
        assert_eq!(rows[1], vec!["1", "2", "3"]);
    }

    #[test]
    fn test_parse_rows_unquotes_cells() {
        let text = "Timestamp;\"Timezone : Europe/Madrid\";sum_rain\n\
                    1661335200;\"2022/08/24 12:00:00\";0,2\n";
        let rows = parse_rows(text, b';').unwrap();
        assert_eq!(rows[0][1], "Timezone : Europe/Madrid");
        assert_eq!(rows[1][1], "2022/08/24 12:00:00");
        assert_eq!(rows[1][2], "0,2");
    }

    #[test]
    fn test_parse_rows_allows_ragged_rows() {
        let rows = parse_rows("title\na;b;c\n1;2\n", b';').unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].len(), 1);
        assert_eq!(rows[2].len(), 2);
    }

    #[test]
    fn test_parse_rows_skips_blank_rows() {
        let rows = parse_rows("a;b\n\n;\n  ;  \nc;d\n", b';').unwrap();
        assert_eq!(rows, vec![vec!["a", "b"], vec!["c", "d"]]);
    }

    #[test]
    fn test_parse_rows_strips_bom_and_trims() {
        let rows = parse_rows("\u{feff}Timestamp ; Date\n", b';').unwrap();
        assert_eq!(rows[0], vec!["Timestamp", "Date"]);
    }

    #[test]
    fn test_parse_rows_custom_delimiter() {
        let rows = parse_rows("1,2,3\n", b',').unwrap();
        assert_eq!(rows[0], vec!["1", "2", "3"]);
    }

    #[test]
    fn test_parse_rows_empty_text() {
        assert!(parse_rows("", b';').unwrap().is_empty());
    }

    #[test]
    fn test_read_text_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "Timestamp;Date;sum_rain").unwrap();
        writeln!(file, "1700006400;2023/11/15;12,5").unwrap();
        let text = read_text(file.path()).unwrap();
        let rows = parse_rows(&text, b';').unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1][2], "12,5");
    }

    #[test]
    fn test_read_text_missing_file_is_file_read_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = read_text(&dir.path().join("absent.csv")).unwrap_err();
        assert!(matches!(err, PluvioError::FileRead { .. }));
    }
}
