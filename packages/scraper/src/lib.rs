#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Discovery and download of ISS integrated-surveillance bulletins.
//!
//! The bulletins are listed as plain anchors on the Epicentro "aggiornamenti"
//! page. [`locator`] pulls the report links out of that page and dates them
//! from their file names (using the embedded Italian month table in
//! [`months`], never the process locale). [`fetch`] downloads pages and PDFs.
//!
//! Requests are issued one at a time and never retried.

pub mod fetch;
pub mod locator;
pub mod months;
pub mod progress;

/// Errors that can occur while locating or downloading reports.
#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    /// An HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Parsing the response body failed.
    #[error("Parse error: {0}")]
    Parse(String),

    /// A URL could not be parsed or resolved.
    #[error("Invalid URL '{url}': {message}")]
    Url {
        /// The offending URL.
        url: String,
        /// Why it could not be parsed or joined.
        message: String,
    },

    /// A date token did not match `<day>-<italian month>-<year>`.
    #[error("Unrecognised report date '{0}'")]
    Date(String),
}
