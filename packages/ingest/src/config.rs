//! Ingestion configuration.
//!
//! Defaults cover the Epicentro index and the standard file names. A TOML
//! file given with `--config` (or `ISS_BULLETIN_CONFIG`) overrides any
//! subset of the fields, and `ISS_BULLETIN_DATA_DIR` overrides the data
//! directory last.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use iss_bulletin_dataset::paths;
use serde::Deserialize;

use crate::IngestError;

/// Environment variable naming a config file.
pub const CONFIG_ENV: &str = "ISS_BULLETIN_CONFIG";

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "ISS_BULLETIN_DATA_DIR";

/// Page listing every published bulletin.
pub const DEFAULT_INDEX_URL: &str = "https://www.epicentro.iss.it/coronavirus/aggiornamenti";

/// Substring identifying bulletin links on the index page.
pub const DEFAULT_LINK_PATTERN: &str = "Bollettino-sorveglianza-integrata-COVID-19";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IngestConfig {
    pub index_url: String,
    pub link_pattern: String,
    /// Earliest publication date considered (inclusive).
    pub cutoff: NaiveDate,
    /// Publication date from which reports are ignored (exclusive).
    pub end: Option<NaiveDate>,
    pub data_dir: PathBuf,
    pub time_series_file: String,
    pub age_file: String,
    pub rates_file: String,
    pub age_rates_file: String,
    /// Also write `data_iss_eta_<date>.csv` for every ingested report.
    pub per_report_age_files: bool,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            index_url: DEFAULT_INDEX_URL.to_owned(),
            link_pattern: DEFAULT_LINK_PATTERN.to_owned(),
            // First bulletin carrying the vaccination-status tables.
            cutoff: NaiveDate::from_ymd_opt(2021, 7, 14).unwrap_or_default(),
            end: None,
            data_dir: paths::data_dir(),
            time_series_file: paths::TIME_SERIES_FILE.to_owned(),
            age_file: paths::AGE_FILE.to_owned(),
            rates_file: paths::RATES_FILE.to_owned(),
            age_rates_file: paths::AGE_RATES_FILE.to_owned(),
            per_report_age_files: false,
        }
    }
}

impl IngestConfig {
    /// Parses a TOML config; missing fields keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::Toml`] for malformed TOML or unknown fields.
    pub fn from_toml_str(toml_str: &str) -> Result<Self, IngestError> {
        Ok(toml::de::from_str(toml_str)?)
    }

    /// Loads the configuration from `path`, else from the file named by
    /// [`CONFIG_ENV`], else defaults, then applies [`DATA_DIR_ENV`].
    ///
    /// # Errors
    ///
    /// Returns [`IngestError`] if the file cannot be read or parsed.
    pub fn load(path: Option<&Path>) -> Result<Self, IngestError> {
        let path = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from));

        let mut config = match path {
            Some(path) => {
                log::debug!("Loading config from {}", path.display());
                let text =
                    std::fs::read_to_string(&path).map_err(|e| IngestError::Config {
                        path: path.clone(),
                        message: e.to_string(),
                    })?;
                Self::from_toml_str(&text)?
            }
            None => Self::default(),
        };

        if let Some(dir) = std::env::var_os(DATA_DIR_ENV) {
            config.data_dir = PathBuf::from(dir);
        }

        Ok(config)
    }

    #[must_use]
    pub fn time_series_path(&self) -> PathBuf {
        self.data_dir.join(&self.time_series_file)
    }

    #[must_use]
    pub fn age_path(&self) -> PathBuf {
        self.data_dir.join(&self.age_file)
    }

    #[must_use]
    pub fn rates_path(&self) -> PathBuf {
        self.data_dir.join(&self.rates_file)
    }

    #[must_use]
    pub fn age_rates_path(&self) -> PathBuf {
        self.data_dir.join(&self.age_rates_file)
    }
}
