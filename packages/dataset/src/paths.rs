//! Canonical file paths for the data directory.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;

/// Default file name of the national time series.
pub const TIME_SERIES_FILE: &str = "dati_ISS_complessivi.csv";

/// Default file name of the consolidated age-stratified dataset.
pub const AGE_FILE: &str = "dati_ISS_eta.csv";

/// Default file name of the incidence/efficacy time series.
pub const RATES_FILE: &str = "tassi_ISS.csv";

/// Default file name of the per-bracket rates of the latest report.
pub const AGE_RATES_FILE: &str = "tassi_ISS_eta.csv";

/// Returns the workspace root directory, resolved at compile time from
/// `CARGO_MANIFEST_DIR`. Falls back to the working directory.
#[must_use]
pub fn project_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .ancestors()
        .nth(2)
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
}

/// Returns the default `data/` directory.
#[must_use]
pub fn data_dir() -> PathBuf {
    project_root().join("data")
}

/// Returns the path of the single-report age file for `date`.
#[must_use]
pub fn per_report_age_path(dir: &Path, date: NaiveDate) -> PathBuf {
    dir.join(format!("data_iss_eta_{}.csv", date.format(crate::DATE_FORMAT)))
}

/// Ensures a directory exists, creating it if necessary.
///
/// # Errors
///
/// Returns an I/O error if the directory cannot be created.
pub fn ensure_dir(path: &Path) -> std::io::Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn per_report_file_embeds_iso_date() {
        let path = per_report_age_path(
            Path::new("/tmp/data"),
            NaiveDate::from_ymd_opt(2022, 1, 19).unwrap(),
        );
        assert_eq!(path, Path::new("/tmp/data/data_iss_eta_2022-01-19.csv"));
    }

    #[test]
    fn ensure_dir_creates_nested_directories() {
        let tmp = tempfile::tempdir().unwrap();
        let nested = tmp.path().join("a").join("b");
        ensure_dir(&nested).unwrap();
        assert!(nested.is_dir());
        ensure_dir(&nested).unwrap();
    }
}
