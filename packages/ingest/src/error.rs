//! Ingestion errors.

use std::path::PathBuf;

use chrono::NaiveDate;
use iss_bulletin_analytics::AnalyticsError;
use iss_bulletin_dataset::DatasetError;
use iss_bulletin_pdf::PdfError;
use iss_bulletin_scraper::ScrapeError;

/// Errors that abort an ingestion run.
///
/// "Nothing to do" is not an error: see [`crate::IngestOutcome`].
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// Locating or downloading a report failed.
    #[error(transparent)]
    Scrape(#[from] ScrapeError),

    /// Locating or extracting a table failed.
    #[error(transparent)]
    Pdf(#[from] PdfError),

    /// Reading or writing a dataset failed.
    #[error(transparent)]
    Dataset(#[from] DatasetError),

    /// Writing rate tables failed.
    #[error(transparent)]
    Analytics(#[from] AnalyticsError),

    /// The configuration file could not be read.
    #[error("Cannot read config {}: {message}", path.display())]
    Config {
        /// Path that was tried.
        path: PathBuf,
        /// What went wrong.
        message: String,
    },

    /// The configuration file is not valid TOML for [`crate::config::IngestConfig`].
    #[error("Invalid config: {0}")]
    Toml(#[from] toml::de::Error),

    /// No table layout is known for reports published on this date.
    #[error("No table layout known for reports published on {0}")]
    UnsupportedDate(NaiveDate),

    /// No candidate reports were found on the index page.
    #[error("No reports found")]
    NoReports,

    /// The requested report index does not exist.
    #[error("Report index {index} out of range ({available} reports available)")]
    InvalidSelection {
        /// Requested index.
        index: usize,
        /// Number of candidate reports.
        available: usize,
    },

    /// Not a single row of a table reduced to clean integers.
    #[error("Table '{table}' on page {page} has no numeric rows")]
    ParseFailure {
        /// Table name from the schema.
        table: String,
        /// 1-based page number.
        page: u32,
    },

    /// A table has fewer rows than its row groups require.
    #[error("Table '{table}' has {found} numeric rows, expected {expected}")]
    MissingRows {
        /// Table name from the schema.
        table: String,
        /// Rows required by the schema.
        expected: usize,
        /// Rows that survived cleaning.
        found: usize,
    },

    /// Summing the completed-cycle sub-columns overflowed.
    #[error("Sum for '{column}' overflows in schema '{schema}'")]
    Overflow {
        /// Schema identifier.
        schema: String,
        /// Canonical name of the derived column.
        column: String,
    },

    /// A cleaned row does not have one value per schema column.
    #[error("Row has {found} values, schema '{schema}' expects {expected}")]
    SchemaMismatch {
        /// Schema identifier.
        schema: String,
        /// Columns in the schema.
        expected: usize,
        /// Values in the row.
        found: usize,
    },
}

impl IngestError {
    /// Whether the failure came from the network or the filesystem and
    /// could succeed on a later run. Nothing is retried automatically.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Scrape(ScrapeError::Http(_)) | Self::Dataset(DatasetError::Io(_))
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_transient_failures() {
        let io = || std::io::Error::other("disk");
        assert!(IngestError::Dataset(DatasetError::Io(io())).is_transient());

        assert!(!IngestError::NoReports.is_transient());
        assert!(
            !IngestError::MissingRows {
                table: "casi".to_owned(),
                expected: 10,
                found: 9,
            }
            .is_transient()
        );
        assert!(
            !IngestError::Pdf(PdfError::NotFound {
                captions: "TABELLA".to_owned()
            })
            .is_transient()
        );
    }
}
