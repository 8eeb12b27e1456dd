use clap::{CommandFactory, Parser};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{PluvioError, Result};
use crate::models::{
    NormalizerConfig, DEFAULT_HEADER_SCAN_ROWS, DEFAULT_VALUE_CAP, DEFAULT_YEAR_TOTAL_CAP,
    MAX_HEADER_SCAN_ROWS,
};

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Year-over-year rainfall comparison from rain-gauge exports
#[derive(Parser, Debug, Clone)]
#[command(
    name = "pluvio",
    about = "Year-over-year rainfall comparison from rain-gauge exports",
    version
)]
pub struct Settings {
    /// Input files (delimited gauge export or history JSON)
    pub inputs: Vec<PathBuf>,

    /// Kind of input
    #[arg(long, default_value = "csv", value_parser = ["csv", "history"])]
    pub source: String,

    /// Entity id to extract from a history export
    #[arg(long, default_value = "sensor.pluviometre_gui")]
    pub entity: String,

    /// What to print
    #[arg(long, default_value = "totals", value_parser = ["totals", "daily", "cumulative", "monthly"])]
    pub view: String,

    /// Output format
    #[arg(long, default_value = "table", value_parser = ["table", "json"])]
    pub format: String,

    /// Cell delimiter of delimited input
    #[arg(long, default_value_t = ';')]
    pub delimiter: char,

    /// Largest plausible single reading in mm
    #[arg(long, default_value_t = DEFAULT_VALUE_CAP)]
    pub value_cap: f64,

    /// Days above this many mm are left out of cumulative sums (e.g. 300)
    #[arg(long)]
    pub cumulative_cap: Option<f64>,

    /// Yearly totals above this many mm are reported as 0
    #[arg(long, default_value_t = DEFAULT_YEAR_TOTAL_CAP)]
    pub year_cap: f64,

    /// Leading rows searched for a header (1-15)
    #[arg(
        long,
        default_value_t = DEFAULT_HEADER_SCAN_ROWS as u8,
        value_parser = clap::value_parser!(u8).range(1..=MAX_HEADER_SCAN_ROWS as i64)
    )]
    pub header_scan_rows: u8,

    /// Logging level
    #[arg(long, default_value = "WARNING", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR"])]
    pub log_level: String,

    /// Log file path
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    /// Clear saved configuration
    #[arg(long)]
    pub clear: bool,
}

// ── LastUsedParams ─────────────────────────────────────────────────────────────

/// Persisted last-used parameters saved to `~/.pluvio/last_used.json`.
///
/// Only presentation choices are kept. The caps change the computed series
/// and must be given on every run that wants them.
#[derive(Debug, Serialize, Deserialize, Default, Clone)]
pub struct LastUsedParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub view: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

impl LastUsedParams {
    /// Return the default path to the persisted config file.
    pub fn config_path() -> PathBuf {
        Self::config_path_in(&dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
    }

    /// Return the config path rooted at `base_dir` (used for testing).
    pub fn config_path_in(base_dir: &std::path::Path) -> PathBuf {
        base_dir.join(".pluvio").join("last_used.json")
    }

    /// Load persisted params from an explicit path.
    /// Returns `Default` when the file is absent or cannot be parsed.
    pub fn load_from(path: &std::path::Path) -> Self {
        let Ok(content) = std::fs::read_to_string(path) else {
            return Self::default();
        };
        serde_json::from_str(&content).unwrap_or_default()
    }

    /// Atomically write params to an explicit path, creating parent
    /// directories if needed.
    pub fn save_to(&self, path: &std::path::Path) -> std::result::Result<(), std::io::Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;

        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, &json)?;
        std::fs::rename(&tmp, path)?;

        Ok(())
    }

    /// Delete the config file at an explicit path if it exists.
    pub fn clear_at(path: &std::path::Path) -> std::result::Result<(), std::io::Error> {
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }
}

// ── Settings impl ──────────────────────────────────────────────────────────────

impl Settings {
    /// Parse CLI arguments, merge with last-used params where no explicit CLI
    /// value was provided, and persist the result.
    pub fn load_with_last_used() -> Self {
        Self::load_with_last_used_impl(
            std::env::args_os().collect(),
            &LastUsedParams::config_path(),
        )
    }

    /// Full implementation, with explicit args and config path so tests can
    /// redirect to a temporary directory.
    pub fn load_with_last_used_impl(
        args: Vec<std::ffi::OsString>,
        config_path: &std::path::Path,
    ) -> Self {
        let matches = Settings::command().get_matches_from(args.clone());
        let mut settings = Settings::parse_from(args);

        if settings.clear {
            let _ = LastUsedParams::clear_at(config_path);
            return Self::apply_debug(settings);
        }

        let last = LastUsedParams::load_from(config_path);

        // CLI always wins over persisted values.
        if !is_arg_explicitly_set(&matches, "view") {
            if let Some(v) = last.view {
                settings.view = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "format") {
            if let Some(v) = last.format {
                settings.format = v;
            }
        }

        settings = Self::apply_debug(settings);

        let params = LastUsedParams::from(&settings);
        let _ = params.save_to(config_path);

        settings
    }

    /// Build the pipeline configuration from the parsed flags.
    pub fn normalizer_config(&self) -> Result<NormalizerConfig> {
        if !self.delimiter.is_ascii() {
            return Err(PluvioError::Config(format!(
                "delimiter must be a single ASCII character, got {:?}",
                self.delimiter
            )));
        }
        let config = NormalizerConfig {
            value_cap: self.value_cap,
            cumulative_value_cap: self.cumulative_cap,
            year_total_cap: self.year_cap,
            header_scan_rows: usize::from(self.header_scan_rows),
            delimiter: self.delimiter as u8,
        };
        config.validate()?;
        Ok(config)
    }

    /// `--debug` overrides the log level.
    fn apply_debug(mut settings: Settings) -> Settings {
        if settings.debug {
            settings.log_level = "DEBUG".to_string();
        }
        settings
    }
}

// ── Conversion ─────────────────────────────────────────────────────────────────

impl From<&Settings> for LastUsedParams {
    fn from(s: &Settings) -> Self {
        LastUsedParams {
            view: Some(s.view.clone()),
            format: Some(s.format.clone()),
        }
    }
}

/// Returns `true` when `name` was supplied explicitly on the command line
/// (not via default value or environment variable).
fn is_arg_explicitly_set(matches: &clap::ArgMatches, name: &str) -> bool {
    matches.value_source(name) == Some(clap::parser::ValueSource::CommandLine)
}

// ── Tests ──────────────────────────────────────────────────────────────────────
