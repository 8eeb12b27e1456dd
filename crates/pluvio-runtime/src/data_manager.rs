//! Data manager for one rainfall source.
//!
//! Wraps the normalization pipeline with retry logic and keeps the last
//! valid result: a failed load never replaces a previous good one. Loads run
//! on tokio's blocking pool. Each refresh carries a generation ticket so that
//! a result overtaken by a newer refresh is dropped instead of applied.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use chrono::NaiveDate;
use pluvio_core::error::{PluvioError, Result};
use pluvio_core::models::NormalizerConfig;
use pluvio_data::analysis::{normalize, normalize_file, NormalizedSeries};
use pluvio_data::history::{history_to_rows, latest_day_total, parse_history_json};
use pluvio_data::reader::read_text;
use tokio::task::JoinHandle;

// ── Defaults ──────────────────────────────────────────────────────────────────

/// Maximum number of load attempts before giving up and keeping stale data.
const MAX_RETRY_ATTEMPTS: u32 = 3;

// ── Source ────────────────────────────────────────────────────────────────────

/// Where a manager loads its data from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// Delimited gauge export.
    Csv(PathBuf),
    /// Home Assistant history dump, filtered to one entity.
    History { path: PathBuf, entity: String },
}

/// Result of one successful load.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadedSeries {
    pub series: NormalizedSeries,
    /// Rainfall of the most recent day, for history sources only.
    pub today: Option<(NaiveDate, f64)>,
}

impl Source {
    pub fn path(&self) -> &Path {
        match self {
            Source::Csv(path) | Source::History { path, .. } => path,
        }
    }

    /// Read and normalize the source once.
    ///
    /// A history dump is parsed a single time; the latest day total is taken
    /// from the same parse as the series.
    pub fn load(&self, config: &NormalizerConfig) -> Result<LoadedSeries> {
        match self {
            Source::Csv(path) => Ok(LoadedSeries {
                series: normalize_file(path, config)?,
                today: None,
            }),
            Source::History { path, entity } => {
                let history = parse_history_json(&read_text(path)?)?;
                let rows = history_to_rows(&history, entity)?;
                let series = normalize(&rows, config)?;
                let today = latest_day_total(&history, entity)?;
                Ok(LoadedSeries { series, today })
            }
        }
    }
}

/// Only filesystem failures are worth another attempt; parse errors repeat.
fn is_transient(err: &PluvioError) -> bool {
    matches!(err, PluvioError::FileRead { .. })
}

/// Load `source` up to [`MAX_RETRY_ATTEMPTS`] times with linear back-off
/// (0 ms → 100 ms → 200 ms).
pub fn load_with_retry(source: &Source, config: &NormalizerConfig) -> Result<LoadedSeries> {
    let mut attempt = 0;
    loop {
        if attempt > 0 {
            let sleep_ms = u64::from(attempt) * 100;
            tracing::debug!(attempt, sleep_ms, "retrying load after back-off");
            thread::sleep(Duration::from_millis(sleep_ms));
        }

        match source.load(config) {
            Ok(loaded) => return Ok(loaded),
            Err(e) if is_transient(&e) && attempt + 1 < MAX_RETRY_ATTEMPTS => {
                tracing::warn!(attempt, error = %e, "load attempt failed");
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

// ── Refresh handles ───────────────────────────────────────────────────────────

/// Identifies one refresh; only the most recent ticket is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshTicket(u64);

/// A load running on the blocking pool, detached from the manager.
///
/// Obtained from [`DataManager::start_refresh`]; the manager is not borrowed
/// while it runs, so several refreshes may be in flight at once.
pub struct PendingRefresh {
    ticket: RefreshTicket,
    handle: JoinHandle<Result<LoadedSeries>>,
}

impl PendingRefresh {
    pub fn ticket(&self) -> RefreshTicket {
        self.ticket
    }

    /// Wait for the load; hand the pair to [`DataManager::complete_refresh`].
    pub async fn wait(self) -> (RefreshTicket, Result<LoadedSeries>) {
        let result = self
            .handle
            .await
            .unwrap_or_else(|e| Err(PluvioError::Other(e.into())));
        (self.ticket, result)
    }
}

// ── DataManager ───────────────────────────────────────────────────────────────

/// Last-good-result wrapper around the normalization pipeline.
///
/// # Example
/// ```no_run
/// use pluvio_runtime::data_manager::{DataManager, Source};
///
/// # async fn run() {
/// let mut mgr = DataManager::new(Source::Csv("rain.csv".into()), Default::default());
/// if let Some(loaded) = mgr.refresh().await {
///     println!("years: {:?}", loaded.series.years());
/// }
/// # }
/// ```
pub struct DataManager {
    source: Source,
    config: NormalizerConfig,
    /// Most recent valid result.
    latest: Option<Arc<LoadedSeries>>,
    /// Human-readable description of the last error encountered.
    last_error: Option<String>,
    /// Generation of the newest refresh handed out.
    generation: u64,
}

impl DataManager {
    pub fn new(source: Source, config: NormalizerConfig) -> Self {
        Self {
            source,
            config,
            latest: None,
            last_error: None,
            generation: 0,
        }
    }

    // ── Public API ────────────────────────────────────────────────────────

    pub fn source(&self) -> &Source {
        &self.source
    }

    /// Reload and apply the result, returning the newest valid data.
    ///
    /// Holds the manager for the whole load. Callers that want overlapping
    /// refreshes use [`start_refresh`](Self::start_refresh) and
    /// [`complete_refresh`](Self::complete_refresh) instead.
    pub async fn refresh(&mut self) -> Option<Arc<LoadedSeries>> {
        let (ticket, result) = self.start_refresh().wait().await;
        self.complete_refresh(ticket, result);
        self.latest()
    }

    /// Take a new ticket and start loading on the blocking pool.
    pub fn start_refresh(&mut self) -> PendingRefresh {
        let ticket = self.begin_refresh();
        let source = self.source.clone();
        let config = self.config.clone();
        let handle = tokio::task::spawn_blocking(move || load_with_retry(&source, &config));
        PendingRefresh { ticket, handle }
    }

    /// Start a refresh. Any ticket handed out earlier becomes stale.
    pub fn begin_refresh(&mut self) -> RefreshTicket {
        self.generation += 1;
        RefreshTicket(self.generation)
    }

    /// Apply the outcome of the refresh identified by `ticket`.
    ///
    /// Returns `false` when the ticket is stale and the outcome was dropped.
    /// An error keeps the previous result.
    pub fn complete_refresh(
        &mut self,
        ticket: RefreshTicket,
        result: Result<LoadedSeries>,
    ) -> bool {
        if ticket.0 != self.generation {
            tracing::debug!(
                ticket = ticket.0,
                current = self.generation,
                "discarding stale refresh"
            );
            return false;
        }

        match result {
            Ok(loaded) => {
                tracing::debug!(
                    days = loaded.series.records.len(),
                    years = loaded.series.yearly_totals.len(),
                    "series updated"
                );
                self.latest = Some(Arc::new(loaded));
                self.last_error = None;
            }
            Err(e) => {
                tracing::warn!(
                    source = %self.source.path().display(),
                    error = %e,
                    "load failed; keeping previous data"
                );
                self.last_error = Some(e.to_string());
            }
        }
        true
    }

    /// Newest valid result, if any load has succeeded.
    pub fn latest(&self) -> Option<Arc<LoadedSeries>> {
        self.latest.clone()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const GAUGE_CSV: &str = "Timestamp;Date;sum_rain\n\
                             1700006400;2023/11/15;12,5\n\
                             1700092800;2023/11/16;0\n";

    const WET_CSV: &str = "Timestamp;Date;sum_rain\n\
                           1700006400;2023/11/15;40\n\
                           1700092800;2023/11/16;2\n";

    /// Returns a manager over a CSV file inside a TempDir. The TempDir must
    /// stay alive for the duration of the test.
    fn make_manager_with_csv(content: &str) -> (DataManager, TempDir) {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("rain.csv");
        std::fs::write(&path, content).unwrap();
        let mgr = DataManager::new(Source::Csv(path), NormalizerConfig::default());
        (mgr, dir)
    }

    fn total_2023(loaded: &LoadedSeries) -> f64 {
        loaded.series.yearly_totals[&2023]
    }

    // ── refresh ───────────────────────────────────────────────────────────

    #[test]
    fn test_nothing_loaded_initially() {
        let (mgr, _dir) = make_manager_with_csv(GAUGE_CSV);
        assert!(mgr.latest().is_none());
        assert!(mgr.last_error().is_none());
    }

    #[tokio::test]
    async fn test_refresh_loads_on_blocking_pool() {
        let (mut mgr, _dir) = make_manager_with_csv(GAUGE_CSV);
        let loaded = mgr.refresh().await.expect("refresh");
        assert_eq!(loaded.series.records.len(), 2);
        assert!((total_2023(&loaded) - 12.5).abs() < 1e-9);
        assert!(loaded.today.is_none());
        assert!(Arc::ptr_eq(&loaded, &mgr.latest().unwrap()));
    }

    #[tokio::test]
    async fn test_refresh_picks_up_new_content() {
        let (mut mgr, dir) = make_manager_with_csv(GAUGE_CSV);
        let first = mgr.refresh().await.unwrap();

        std::fs::write(dir.path().join("rain.csv"), WET_CSV).unwrap();
        let second = mgr.refresh().await.unwrap();

        assert!(!Arc::ptr_eq(&first, &second));
        assert!((total_2023(&second) - 42.0).abs() < 1e-9);
    }

    // ── failures ──────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_failed_load_keeps_previous_result() {
        let (mut mgr, dir) = make_manager_with_csv(GAUGE_CSV);
        let good = mgr.refresh().await.unwrap();

        std::fs::write(dir.path().join("rain.csv"), "only one row\n").unwrap();
        let after = mgr.refresh().await.unwrap();

        assert!(Arc::ptr_eq(&good, &after));
        assert!(mgr.last_error().unwrap().contains("Malformed"));
    }

    #[tokio::test]
    async fn test_missing_file_reports_error() {
        let dir = TempDir::new().unwrap();
        let mut mgr = DataManager::new(
            Source::Csv(dir.path().join("absent.csv")),
            NormalizerConfig::default(),
        );
        assert!(mgr.refresh().await.is_none());
        assert!(mgr.last_error().unwrap().contains("absent.csv"));
    }

    #[tokio::test]
    async fn test_success_clears_last_error() {
        let (mut mgr, dir) = make_manager_with_csv("x\n");
        assert!(mgr.refresh().await.is_none());
        assert!(mgr.last_error().is_some());

        std::fs::write(dir.path().join("rain.csv"), GAUGE_CSV).unwrap();
        assert!(mgr.refresh().await.is_some());
        assert!(mgr.last_error().is_none());
    }

    #[test]
    fn test_only_file_errors_are_retried() {
        let read_err = PluvioError::FileRead {
            path: PathBuf::from("rain.csv"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };
        assert!(is_transient(&read_err));
        assert!(!is_transient(&PluvioError::MalformedBatch("x".into())));
    }

    // ── generation tickets ────────────────────────────────────────────────

    #[test]
    fn test_stale_ticket_is_discarded() {
        let (mut mgr, _dir) = make_manager_with_csv(GAUGE_CSV);
        let old = mgr.begin_refresh();
        let new = mgr.begin_refresh();

        let stale = mgr.source().load(&NormalizerConfig::default());
        assert!(!mgr.complete_refresh(old, stale));
        assert!(mgr.latest().is_none());

        let fresh = mgr.source().load(&NormalizerConfig::default());
        assert!(mgr.complete_refresh(new, fresh));
        assert!(mgr.latest().is_some());
    }

    #[tokio::test]
    async fn test_overlapping_refreshes_keep_the_newest() {
        let (mut mgr, dir) = make_manager_with_csv(GAUGE_CSV);

        let older = mgr.start_refresh();
        let (older_ticket, older_result) = older.wait().await;
        std::fs::write(dir.path().join("rain.csv"), WET_CSV).unwrap();
        let newer = mgr.start_refresh();
        assert_ne!(newer.ticket(), older_ticket);

        let (newer_ticket, newer_result) = newer.wait().await;
        assert!(mgr.complete_refresh(newer_ticket, newer_result));
        // The older load is applied last and must not overwrite newer data.
        assert!(!mgr.complete_refresh(older_ticket, older_result));

        let latest = mgr.latest().unwrap();
        assert!((total_2023(&latest) - 42.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_older_refresh_finishing_first_is_still_dropped() {
        let (mut mgr, _dir) = make_manager_with_csv(GAUGE_CSV);
        let older = mgr.start_refresh();
        let newer = mgr.start_refresh();

        let (ticket, result) = older.wait().await;
        assert!(!mgr.complete_refresh(ticket, result));
        assert!(mgr.latest().is_none());

        let (ticket, result) = newer.wait().await;
        assert!(mgr.complete_refresh(ticket, result));
        assert!(mgr.latest().is_some());
    }

    // ── history source ────────────────────────────────────────────────────

    #[test]
    fn test_history_source() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.json");
        std::fs::write(
            &path,
            r#"[[{"entity_id": "sensor.pluviometre_gui", "state": "3.5",
                  "last_changed": "2024-03-05T08:00:00+00:00"},
                 {"state": "1", "last_changed": "2024-03-06T08:00:00+00:00"},
                 {"state": "0.6", "last_changed": "2024-03-06T12:00:00+00:00"}]]"#,
        )
        .unwrap();

        let source = Source::History {
            path,
            entity: "sensor.pluviometre_gui".to_string(),
        };
        let loaded = source.load(&NormalizerConfig::default()).unwrap();
        assert!((loaded.series.yearly_totals[&2024] - 5.1).abs() < 1e-9);

        let (day, total) = loaded.today.expect("history carries a latest day");
        assert_eq!(day, NaiveDate::from_ymd_opt(2024, 3, 6).unwrap());
        assert!((total - 1.6).abs() < 1e-9);

        let other = Source::History {
            path: source.path().to_path_buf(),
            entity: "sensor.nope".to_string(),
        };
        assert!(matches!(
            other.load(&NormalizerConfig::default()),
            Err(PluvioError::EntityNotFound(_))
        ));
    }
}
