//! Runtime layer for pluvio.
//!
//! Keeps the last valid normalization result per source, refreshes it on
//! tokio's blocking pool and discards results overtaken by newer refreshes.

pub mod data_manager;

pub use pluvio_core as core;
pub use pluvio_data as data;
