#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the ISS bulletin ingestion tool.

use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use clap::{Parser, Subcommand};
use iss_bulletin_cli_utils::{IndicatifProgress, MultiProgress};
use iss_bulletin_ingest::{
    IngestConfig, IngestError, Selection, compute_rates, ingest_report, interactive, list_reports,
    run_ingest, select_report,
};

#[derive(Parser)]
#[command(
    name = "iss_bulletin_ingest",
    about = "ISS COVID-19 surveillance bulletin ingestion tool"
)]
struct Cli {
    /// TOML config file (overrides `ISS_BULLETIN_CONFIG`)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest one report into the accumulated datasets
    Ingest {
        /// Ingest the most recent report without prompting
        #[arg(long, conflicts_with = "index")]
        auto: bool,
        /// Ingest the report at this position of `reports` (0 = most recent)
        #[arg(long)]
        index: Option<usize>,
        /// Re-ingest even if the report is already stored
        #[arg(long)]
        force: bool,
    },
    /// List the reports in the configured date window
    Reports,
    /// Recompute incidence and efficacy rates from the stored datasets
    Rates,
}

/// Exit status for network and filesystem failures (`EX_TEMPFAIL`).
const EXIT_TRANSIENT: u8 = 75;

/// Maps a failure to the process exit status, keeping transient failures
/// apart from reports that cannot be extracted.
fn failure_code(err: &(dyn Error + 'static)) -> u8 {
    if err
        .downcast_ref::<IngestError>()
        .is_some_and(IngestError::is_transient)
    {
        EXIT_TRANSIENT
    } else {
        1
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let multi = iss_bulletin_cli_utils::init_logger();
    let cli = Cli::parse();

    match run(cli, &multi).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let code = failure_code(e.as_ref());
            if code == EXIT_TRANSIENT {
                log::error!("{e} (transient, re-running later may succeed)");
            } else {
                log::error!("{e}");
            }
            ExitCode::from(code)
        }
    }
}

async fn run(cli: Cli, multi: &MultiProgress) -> Result<(), Box<dyn Error>> {
    let config = IngestConfig::load(cli.config.as_deref())?;

    let Some(command) = cli.command else {
        return interactive::run(&config, multi).await;
    };

    match command {
        Commands::Ingest { auto, index, force } => {
            let start = Instant::now();
            let progress = IndicatifProgress::steps_bar(multi, "Locating reports");

            let outcome = if auto {
                run_ingest(&config, Selection::Latest, force, progress).await?
            } else if let Some(index) = index {
                run_ingest(&config, Selection::Index(index), force, progress).await?
            } else {
                let reports = list_reports(&config).await?;
                progress.finish_and_clear();
                let Some(index) = interactive::choose_report(&reports)? else {
                    println!("No reports available.");
                    return Ok(());
                };
                let report = select_report(&reports, Selection::Index(index))?;
                let progress = IndicatifProgress::steps_bar(multi, "Ingesting");
                ingest_report(&config, report, force, progress).await?
            };

            log::info!("{outcome} in {:.1}s", start.elapsed().as_secs_f64());
            println!("{outcome}");
        }
        Commands::Reports => {
            let reports = list_reports(&config).await?;
            interactive::print_reports(&reports);
        }
        Commands::Rates => {
            let summary = compute_rates(&config)?;
            log::info!(
                "Rates written for {} date(s) to {}",
                summary.dates,
                config.rates_path().display()
            );
            if let Some(date) = summary.age_report {
                log::info!(
                    "Per-bracket rates of report {date} written to {}",
                    config.age_rates_path().display()
                );
            }
        }
    }

    Ok(())
}
