#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Library for ingesting ISS COVID-19 surveillance bulletins into the
//! accumulated CSV datasets.
//!
//! One run processes exactly one report: locate it on the index page, pick
//! the table layout in force on its publication date, find and extract the
//! tables, clean and reconcile the figures, then merge them into the time
//! series and the age-stratified dataset.

pub mod aggregate;
pub mod clean;
pub mod config;
pub mod error;
pub mod interactive;
pub mod reconcile;

use std::fmt;
use std::sync::Arc;

use chrono::NaiveDate;
use iss_bulletin_analytics::{age_rates, format_date, time_series_rates, write_rates};
use iss_bulletin_dataset::{
    AgeStratifiedDataset, MergeOutcome, TimeSeriesDataset, age::write_report_file, merge_age_rows,
    merge_row, paths,
};
use iss_bulletin_models::Report;
use iss_bulletin_pdf::PdfDocument;
use iss_bulletin_pdf::extract::{StreamExtractor, TableExtractor, extract_page, select_table};
use iss_bulletin_pdf::locate::locate_occurrence;
use iss_bulletin_schema::{SchemaVersion, schema_for_date};
use iss_bulletin_scraper::progress::ProgressCallback;
use iss_bulletin_scraper::{fetch, locator};

pub use aggregate::ReportFigures;
pub use config::IngestConfig;
pub use error::IngestError;

/// Progress steps once a report is known to need ingesting.
const STEPS: u64 = 3;

/// Which candidate report to ingest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// The most recent report.
    Latest,
    /// Position in the candidate list (0 = most recent).
    Index(usize),
}

/// How a run ended when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// The report was written to the datasets.
    Ingested {
        date: NaiveDate,
        /// An existing row for the date was overwritten (`force` only).
        replaced: bool,
    },
    /// The report is already in the time series.
    AlreadyUpToDate { date: NaiveDate },
    /// The report repeats the figures of the latest stored report.
    NoNewData { date: NaiveDate },
}

impl fmt::Display for IngestOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ingested {
                date,
                replaced: false,
            } => write!(f, "Report {date} ingested"),
            Self::Ingested {
                date,
                replaced: true,
            } => write!(f, "Report {date} re-ingested"),
            Self::AlreadyUpToDate { date } => {
                write!(f, "Datasets already up to date with report {date}")
            }
            Self::NoNewData { date } => write!(f, "Report {date} carries no new data"),
        }
    }
}

/// What [`compute_rates`] wrote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RatesSummary {
    /// Dates in the rates time series.
    pub dates: usize,
    /// Report whose brackets were written, if the age dataset is not empty.
    pub age_report: Option<NaiveDate>,
}

/// Lists the candidate reports in the configured window, most recent first.
///
/// # Errors
///
/// Returns [`IngestError::Scrape`] if the index page cannot be fetched.
pub async fn list_reports(config: &IngestConfig) -> Result<Vec<Report>, IngestError> {
    let client = fetch::build_client()?;
    Ok(locator::locate_reports(
        &client,
        &config.index_url,
        &config.link_pattern,
        config.cutoff,
        config.end,
    )
    .await?)
}

/// Picks a report from the candidate list.
///
/// # Errors
///
/// Returns [`IngestError::NoReports`] if the list is empty or
/// [`IngestError::InvalidSelection`] for an out-of-range index.
pub fn select_report(reports: &[Report], selection: Selection) -> Result<&Report, IngestError> {
    match selection {
        Selection::Latest => reports.first().ok_or(IngestError::NoReports),
        Selection::Index(index) => reports.get(index).ok_or(IngestError::InvalidSelection {
            index,
            available: reports.len(),
        }),
    }
}

/// Extracts every table of `schema` from `doc` and folds them into one set
/// of report figures.
///
/// # Errors
///
/// Returns [`IngestError`] if a table cannot be located, has too few
/// columns, or has too few numeric rows.
pub fn extract_figures(
    doc: &PdfDocument,
    schema: &SchemaVersion,
    extractor: &impl TableExtractor,
) -> Result<ReportFigures, IngestError> {
    let mut figures = ReportFigures::default();
    let columns = schema.expected_columns();

    for table in &schema.tables {
        let page = locate_occurrence(doc, &table.captions, table.occurrence)?;
        log::info!("Table '{}' found on page {page}", table.name);

        let raw = select_table(extract_page(extractor, doc, page)?, columns, page)?;
        let cleaned = clean::clean_table(&raw, columns, schema.row_filter);
        if cleaned.is_empty() {
            return Err(IngestError::ParseFailure {
                table: table.name.clone(),
                page,
            });
        }

        aggregate::aggregate_table(&cleaned, table, schema, &mut figures)?;
    }

    Ok(figures)
}

/// Merges a report's figures into the datasets under `config.data_dir`
/// and saves whatever changed.
///
/// # Errors
///
/// Returns [`IngestError::Dataset`] if a dataset cannot be read or written.
pub fn store_figures(
    config: &IngestConfig,
    date: NaiveDate,
    figures: ReportFigures,
    force: bool,
) -> Result<IngestOutcome, IngestError> {
    let series_path = config.time_series_path();
    let mut series = TimeSeriesDataset::load(&series_path)?;

    let merged = merge_row(&mut series, date, figures.totals, force);
    if !merged.is_write() {
        return Ok(match merged {
            MergeOutcome::NoNewData => IngestOutcome::NoNewData { date },
            _ => IngestOutcome::AlreadyUpToDate { date },
        });
    }
    let replaced = merged == MergeOutcome::Replaced;

    if config.per_report_age_files {
        write_report_file(
            &paths::per_report_age_path(&config.data_dir, date),
            &figures.brackets,
        )?;
    }

    // The totals decided the report is new, so its brackets always land.
    let age_path = config.age_path();
    let mut ages = AgeStratifiedDataset::load(&age_path)?;
    merge_age_rows(&mut ages, date, figures.brackets, true);

    // Ages first: a crash before the series is saved makes the next run
    // redo the whole report.
    ages.save(&age_path)?;
    series.save(&series_path)?;

    Ok(IngestOutcome::Ingested { date, replaced })
}

/// Locates the candidate reports and ingests the selected one.
///
/// # Errors
///
/// Returns [`IngestError`] if the index cannot be fetched, the selection
/// is invalid, or [`ingest_report`] fails.
pub async fn run_ingest(
    config: &IngestConfig,
    selection: Selection,
    force: bool,
    progress: Arc<dyn ProgressCallback>,
) -> Result<IngestOutcome, IngestError> {
    progress.set_message("Locating reports".to_owned());
    let reports = list_reports(config).await?;
    let report = select_report(&reports, selection)?;
    ingest_report(config, report, force, progress).await
}

/// Ingests one report end to end.
///
/// Requests are awaited one after another and never retried.
///
/// # Errors
///
/// Returns [`IngestError`] if any stage fails. "Already up to date" and
/// "no new data" are successful outcomes, not errors.
pub async fn ingest_report(
    config: &IngestConfig,
    report: &Report,
    force: bool,
    progress: Arc<dyn ProgressCallback>,
) -> Result<IngestOutcome, IngestError> {
    let date = report.published;
    log::info!("Selected report {date}: {}", report.url);

    if !force && TimeSeriesDataset::load(&config.time_series_path())?.contains(date) {
        progress.finish_and_clear();
        log::info!("Report {date} already ingested");
        return Ok(IngestOutcome::AlreadyUpToDate { date });
    }

    let schema = schema_for_date(date).ok_or(IngestError::UnsupportedDate(date))?;
    log::info!("Using table layout '{}': {}", schema.id, schema.description);

    progress.set_total(STEPS);

    progress.set_message(format!("Downloading report {date}"));
    let doc = {
        let client = fetch::build_client()?;
        let bytes = fetch::fetch_bytes(&client, &report.url).await?;
        PdfDocument::from_bytes(&bytes)?
    };
    progress.inc(1);

    progress.set_message("Extracting tables".to_owned());
    let figures = extract_figures(&doc, schema, &StreamExtractor)?;
    progress.inc(1);

    progress.set_message("Merging".to_owned());
    let outcome = store_figures(config, date, figures, force)?;
    progress.inc(1);

    progress.finish(outcome.to_string());
    Ok(outcome)
}

/// Writes incidence and efficacy rates for the stored datasets.
///
/// # Errors
///
/// Returns [`IngestError`] if a dataset cannot be read or a rate file
/// cannot be written.
pub fn compute_rates(config: &IngestConfig) -> Result<RatesSummary, IngestError> {
    let series = TimeSeriesDataset::load(&config.time_series_path())?;
    let rows: Vec<_> = time_series_rates(&series)
        .into_iter()
        .map(|(date, rates)| (vec![format_date(date)], rates))
        .collect();
    write_rates(&config.rates_path(), &["data"], &rows)?;

    let ages = AgeStratifiedDataset::load(&config.age_path())?;
    let age_report = match age_rates(&ages) {
        Some((date, brackets)) => {
            let rows: Vec<_> = brackets
                .into_iter()
                .map(|(bracket, rates)| (vec![bracket.to_string()], rates))
                .collect();
            write_rates(&config.age_rates_path(), &["età"], &rows)?;
            Some(date)
        }
        None => {
            log::warn!("Age dataset is empty, skipping per-bracket rates");
            None
        }
    };

    Ok(RatesSummary {
        dates: rows.len(),
        age_report,
    })
}
