#![allow(clippy::module_name_repetitions)]

//! Interactive menu for the ingestion tool.
//!
//! Provides a menu-driven interface using `dialoguer` for picking a report
//! and running the pipeline without memorizing CLI flags.

use dialoguer::{Confirm, Select};
use iss_bulletin_cli_utils::{IndicatifProgress, MultiProgress};
use iss_bulletin_models::Report;

use crate::{IngestConfig, Selection, compute_rates, ingest_report, list_reports, select_report};

/// Top-level actions available in the interactive menu.
enum IngestAction {
    IngestLatest,
    ChooseReport,
    ListReports,
    ComputeRates,
}

impl IngestAction {
    const ALL: &[Self] = &[
        Self::IngestLatest,
        Self::ChooseReport,
        Self::ListReports,
        Self::ComputeRates,
    ];

    #[must_use]
    const fn label(&self) -> &'static str {
        match self {
            Self::IngestLatest => "Ingest the latest report",
            Self::ChooseReport => "Choose a report to ingest",
            Self::ListReports => "List available reports",
            Self::ComputeRates => "Compute incidence and efficacy rates",
        }
    }
}

/// Runs the interactive menu, prompting the user to select and configure
/// an operation.
///
/// # Errors
///
/// Returns an error if a prompt fails or the selected operation fails.
pub async fn run(
    config: &IngestConfig,
    multi: &MultiProgress,
) -> Result<(), Box<dyn std::error::Error>> {
    let labels: Vec<&str> = IngestAction::ALL.iter().map(IngestAction::label).collect();

    let idx = Select::new()
        .with_prompt("What would you like to do?")
        .items(&labels)
        .default(0)
        .interact()?;

    match IngestAction::ALL[idx] {
        IngestAction::IngestLatest => {
            ingest_selected(config, multi, Selection::Latest).await?;
        }
        IngestAction::ChooseReport => {
            let reports = list_reports(config).await?;
            if let Some(index) = choose_report(&reports)? {
                let report = select_report(&reports, Selection::Index(index))?;
                let force = prompt_force()?;
                let progress = IndicatifProgress::steps_bar(multi, "Ingesting");
                let outcome = ingest_report(config, report, force, progress).await?;
                println!("{outcome}");
            } else {
                println!("No reports available.");
            }
        }
        IngestAction::ListReports => {
            let reports = list_reports(config).await?;
            print_reports(&reports);
        }
        IngestAction::ComputeRates => {
            let summary = compute_rates(config)?;
            println!(
                "Rates written for {} date(s) to {}",
                summary.dates,
                config.rates_path().display()
            );
        }
    }

    Ok(())
}

async fn ingest_selected(
    config: &IngestConfig,
    multi: &MultiProgress,
    selection: Selection,
) -> Result<(), Box<dyn std::error::Error>> {
    let force = prompt_force()?;
    let progress = IndicatifProgress::steps_bar(multi, "Locating reports");
    let outcome = crate::run_ingest(config, selection, force, progress).await?;
    println!("{outcome}");
    Ok(())
}

fn prompt_force() -> Result<bool, dialoguer::Error> {
    Confirm::new()
        .with_prompt("Re-ingest if the report is already stored?")
        .default(false)
        .interact()
}

/// Prompts for one of `reports`, most recent first. Returns `None` when
/// there is nothing to choose from.
///
/// # Errors
///
/// Returns an error if the prompt fails (e.g. no terminal attached).
pub fn choose_report(reports: &[Report]) -> Result<Option<usize>, dialoguer::Error> {
    if reports.is_empty() {
        return Ok(None);
    }

    let labels: Vec<String> = reports.iter().map(report_label).collect();

    let idx = Select::new()
        .with_prompt("Select a report")
        .items(&labels)
        .default(0)
        .max_length(20)
        .interact()?;

    Ok(Some(idx))
}

/// Prints `reports` as an indexed table usable with `ingest --index`.
pub fn print_reports(reports: &[Report]) {
    if reports.is_empty() {
        println!("No reports in the configured window.");
        return;
    }

    println!("{:<6} {:<12} URL", "INDEX", "DATE");
    println!("{}", "-".repeat(80));
    for (index, report) in reports.iter().enumerate() {
        println!("{index:<6} {:<12} {}", report.published, report.url);
    }
}

fn report_label(report: &Report) -> String {
    let file = report
        .url
        .rsplit('/')
        .next()
        .unwrap_or(report.url.as_str());
    format!("{}  {file}", report.published)
}
