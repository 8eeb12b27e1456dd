//! Data ingestion and normalization layer for pluvio.
//!
//! Splits delimited gauge exports into rows, locates the timestamp, date and
//! rainfall columns, resolves each row into a reading, and folds readings
//! into per-year daily, cumulative and total series. Home Assistant history
//! dumps are adapted into the same row format.

pub mod aggregator;
pub mod analysis;
pub mod anomaly;
pub mod assembler;
pub mod cumulative;
pub mod history;
pub mod locator;
pub mod reader;
pub mod resolver;

pub use analysis::{normalize, normalize_file, normalize_text, NormalizeStats, NormalizedSeries};
pub use pluvio_core as core;
