#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Accumulated bulletin datasets.
//!
//! Two durable tables grow by one report per ingestion run:
//!
//! - [`TimeSeriesDataset`]: one row of national totals per publication
//!   date, strictly descending by date.
//! - [`AgeStratifiedDataset`]: one row per `(date, age bracket)`.
//!
//! Both are `;`-separated CSV files with the date in ISO format. Their
//! column set only ever grows; rows written before a column existed keep
//! an empty cell for it. Every save goes through [`persist::write_atomic`],
//! so an interrupted run leaves the previous file intact.

pub mod age;
pub mod merge;
pub mod paths;
pub mod persist;
pub mod time_series;

pub use age::{AgeDatedRow, AgeStratifiedDataset};
pub use merge::{MergeOutcome, merge_age_rows, merge_row};
pub use time_series::{DatedRow, TimeSeriesDataset};

/// Errors that can occur while reading or writing datasets.
#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV reading or writing failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// The file parsed as CSV but does not have the expected shape.
    #[error("Malformed dataset {path}: {message}")]
    Malformed {
        /// File being read (or `"<reader>"` for in-memory input).
        path: String,
        /// What is wrong with it.
        message: String,
    },
}

/// Field delimiter of every dataset file.
pub const DELIMITER: u8 = b';';

/// Format of the `data` column.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Header of the date column.
pub const DATE_COLUMN: &str = "data";
