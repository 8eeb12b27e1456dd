//! Shared types for pluvio.
//!
//! Holds the data model of the rainfall normalizer (readings, column maps,
//! assembled daily records), the error type, CLI settings, and the small
//! time and formatting helpers used by the other crates.

pub mod error;
pub mod formatting;
pub mod models;
pub mod settings;
pub mod time_utils;

pub use error::{PluvioError, Result};
