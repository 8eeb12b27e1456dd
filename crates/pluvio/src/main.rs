mod bootstrap;
mod report;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use pluvio_core::models::NormalizerConfig;
use pluvio_core::settings::Settings;
use pluvio_runtime::data_manager::{DataManager, LoadedSeries, Source};
use tokio::task::JoinSet;

use crate::report::View;

/// Outcome of loading one input file.
struct Loaded {
    path: PathBuf,
    loaded: Option<Arc<LoadedSeries>>,
    error: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::load_with_last_used();

    bootstrap::ensure_directories()?;
    bootstrap::setup_logging(&settings.log_level, settings.log_file.as_ref())?;

    tracing::info!("pluvio v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        "Source: {}, View: {}, Format: {}",
        settings.source,
        settings.view,
        settings.format
    );

    if settings.inputs.is_empty() {
        if settings.clear {
            return Ok(());
        }
        bail!("no input file given");
    }

    let config = settings.normalizer_config()?;
    let view = View::from_flag(&settings.view);
    let sources: Vec<Source> = settings
        .inputs
        .iter()
        .map(|path| match settings.source.as_str() {
            "history" => Source::History {
                path: path.clone(),
                entity: settings.entity.clone(),
            },
            _ => Source::Csv(path.clone()),
        })
        .collect();

    let loaded = load_all(&sources, &config).await?;

    let mut failures = 0usize;
    for item in &loaded {
        let Some(data) = &item.loaded else {
            failures += 1;
            eprintln!(
                "{}: {}",
                item.path.display(),
                item.error.as_deref().unwrap_or("no data")
            );
            continue;
        };

        if settings.format == "json" {
            println!("{}", report::render_json(&data.series)?);
            continue;
        }

        if loaded.len() > 1 {
            println!("== {} ==", item.path.display());
        }
        print!("{}", report::render_table(&data.series, view));
        if let Some((day, total)) = data.today {
            print!("{}", report::render_today(day, total));
        }
    }

    if failures == loaded.len() {
        bail!("no input could be loaded");
    }
    Ok(())
}

/// Load every source concurrently; results come back in input order.
async fn load_all(sources: &[Source], config: &NormalizerConfig) -> Result<Vec<Loaded>> {
    let mut set = JoinSet::new();
    for (index, source) in sources.iter().cloned().enumerate() {
        let config = config.clone();
        set.spawn(async move {
            let path = source.path().to_path_buf();
            let mut manager = DataManager::new(source, config);
            let loaded = manager.refresh().await;
            let error = manager.last_error().map(str::to_string);
            (
                index,
                Loaded {
                    path,
                    loaded,
                    error,
                },
            )
        });
    }

    let mut loaded: Vec<(usize, Loaded)> = Vec::with_capacity(sources.len());
    while let Some(joined) = set.join_next().await {
        loaded.push(joined.context("load task failed")?);
    }
    loaded.sort_by_key(|(index, _)| *index);
    Ok(loaded.into_iter().map(|(_, item)| item).collect())
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_load_all_keeps_order_and_history_today() {
        let dir = TempDir::new().unwrap();
        let csv = dir.path().join("rain.csv");
        std::fs::write(&csv, "Timestamp;Date;sum_rain\n1700006400;2023/11/15;12,5\n").unwrap();
        let json = dir.path().join("history.json");
        std::fs::write(
            &json,
            r#"[[{"entity_id": "sensor.rain", "state": "2",
                  "last_changed": "2024-03-06T08:00:00+00:00"}]]"#,
        )
        .unwrap();

        let sources = vec![
            Source::Csv(csv.clone()),
            Source::History {
                path: json.clone(),
                entity: "sensor.rain".to_string(),
            },
            Source::Csv(dir.path().join("absent.csv")),
        ];
        let loaded = load_all(&sources, &NormalizerConfig::default())
            .await
            .unwrap();

        assert_eq!(loaded[0].path, csv);
        assert!(loaded[0].loaded.as_ref().unwrap().today.is_none());

        assert_eq!(loaded[1].path, json);
        let (day, total) = loaded[1].loaded.as_ref().unwrap().today.unwrap();
        assert_eq!(day.to_string(), "2024-03-06");
        assert!((total - 2.0).abs() < 1e-9);

        assert!(loaded[2].loaded.is_none());
        assert!(loaded[2].error.is_some());
    }
}
