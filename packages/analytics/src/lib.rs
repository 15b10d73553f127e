#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Incidence and vaccine efficacy rates.
//!
//! Incidence is events per 100 000 people of the same vaccination status.
//! The denominator is the population baseline dedicated to the event when
//! the report publishes one (hospitalised and deaths baselines), otherwise
//! the general population. Efficacy compares a vaccinated status with the
//! unvaccinated: `(1 - incidence_vaccinated / incidence_unvaccinated) * 100`.
//! The ratio (`rapporto`) is the unvaccinated share of the two incidences,
//! in percent.
//!
//! A missing or zero denominator yields no value rather than an infinity.

pub mod rates;

pub use rates::{
    RateKey, RateRow, age_rates, compute_rates, format_date, time_series_rates, write_rates,
};

/// Errors that can occur while writing rate tables.
#[derive(Debug, thiserror::Error)]
pub enum AnalyticsError {
    /// Reading or writing a dataset failed.
    #[error("Dataset error: {0}")]
    Dataset(#[from] iss_bulletin_dataset::DatasetError),
}
