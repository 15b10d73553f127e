#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Schema-version registry for ISS surveillance bulletins.
//!
//! The bulletin tables changed layout many times: captions were renumbered,
//! the completed-cycle column was split by recency, booster and second
//! booster columns appeared, and the reference populations moved to their
//! own tables. Each layout revision is described by one [`SchemaVersion`],
//! loaded from an embedded TOML file (see [`registry`]) and selected by the
//! report's publication date.

pub mod registry;

use std::collections::BTreeSet;

use chrono::NaiveDate;
use iss_bulletin_models::{AgeBracket, Measure, VaccinationStatus};
use serde::Deserialize;

pub use registry::{all_schemas, schema_for_date};

/// Errors raised while loading or validating a schema definition.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// The TOML could not be deserialized.
    #[error("Schema parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// The definition parsed but is internally inconsistent.
    #[error("Invalid schema '{id}': {message}")]
    Invalid {
        /// Schema identifier.
        id: String,
        /// What is wrong with it.
        message: String,
    },
}

/// Predicate deciding which raw rows carry numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowFilter {
    /// The first retained cell starts with a digit.
    LeadingDigit,
    /// The first retained cell ends with `"%)"` (older reports print the
    /// percentage after the absolute count).
    PercentSuffix,
}

impl RowFilter {
    /// Applies the predicate to the first retained cell of a row.
    #[must_use]
    pub fn matches(self, cell: &str) -> bool {
        let cell = cell.trim();
        match self {
            Self::LeadingDigit => cell.chars().next().is_some_and(|c| c.is_ascii_digit()),
            Self::PercentSuffix => cell.ends_with("%)"),
        }
    }
}

/// One table of a bulletin and how its row groups map to measures.
#[derive(Debug, Clone, Deserialize)]
pub struct TableSpec {
    /// Human-readable name for log messages.
    pub name: String,
    /// Caption regexes, highest priority first. Matched case-insensitively
    /// against page text.
    pub captions: Vec<String>,
    /// Which matching page to use when the same caption heads several
    /// pages (0-based).
    #[serde(default)]
    pub occurrence: usize,
    /// Measure carried by each consecutive row group, in table order.
    pub groups: Vec<Measure>,
}

/// A layout revision of the bulletin tables.
#[derive(Debug, Clone, Deserialize)]
pub struct SchemaVersion {
    /// Unique identifier (e.g. `"per_event_pages"`).
    pub id: String,
    /// Free-form description of what changed in this revision.
    pub description: String,
    /// First publication date this layout applies to.
    pub valid_from: NaiveDate,
    /// First publication date this layout no longer applies to. `None`
    /// for the current layout.
    #[serde(default)]
    pub valid_until: Option<NaiveDate>,
    /// Numeric-row predicate.
    pub row_filter: RowFilter,
    /// Raw vaccination-status columns, in table order, taken from the
    /// trailing edge of each row.
    pub columns: Vec<VaccinationStatus>,
    /// Raw columns summed into [`VaccinationStatus::Completed`].
    pub completed: Vec<VaccinationStatus>,
    /// Statuses kept after reconciliation.
    pub output: Vec<VaccinationStatus>,
    /// Age brackets of each row group, in table order. Every group has one
    /// row per bracket followed by a total row.
    pub brackets: Vec<AgeBracket>,
    /// Brackets dropped from the age-stratified output.
    #[serde(default)]
    pub skip_brackets: Vec<AgeBracket>,
    /// Tables to extract from each report.
    pub tables: Vec<TableSpec>,
}

impl SchemaVersion {
    /// Whether `date` falls in `[valid_from, valid_until)`.
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.valid_from && self.valid_until.is_none_or(|until| date < until)
    }

    /// Rows per group: one per bracket plus the total row.
    #[must_use]
    pub fn stride(&self) -> usize {
        self.brackets.len() + 1
    }

    /// Offset of the total row within each group.
    #[must_use]
    pub fn total_offset(&self) -> usize {
        self.brackets.len()
    }

    /// Minimum column count a raw table needs to be usable.
    #[must_use]
    pub fn expected_columns(&self) -> usize {
        self.columns.len()
    }

    /// Brackets written to the age-stratified dataset.
    pub fn retained_brackets(&self) -> impl Iterator<Item = (usize, AgeBracket)> + '_ {
        self.brackets
            .iter()
            .copied()
            .enumerate()
            .filter(|(_, b)| !self.skip_brackets.contains(b))
    }

    /// Checks internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::Invalid`] if columns repeat, `completed` or
    /// `output` reference statuses the table does not publish, a table has
    /// no caption or group, or the validity window is empty.
    pub fn validate(&self) -> Result<(), SchemaError> {
        let invalid = |message: String| SchemaError::Invalid {
            id: self.id.clone(),
            message,
        };

        if self.columns.is_empty() {
            return Err(invalid("no columns".to_owned()));
        }

        let columns: BTreeSet<VaccinationStatus> = self.columns.iter().copied().collect();
        if columns.len() != self.columns.len() {
            return Err(invalid("duplicate raw column".to_owned()));
        }

        if self.completed.is_empty() {
            return Err(invalid("no completed-cycle columns".to_owned()));
        }
        if let Some(missing) = self.completed.iter().find(|&&s| !columns.contains(&s)) {
            return Err(invalid(format!("completed column '{missing}' is not a raw column")));
        }

        if let Some(missing) = self
            .output
            .iter()
            .find(|&&s| s != VaccinationStatus::Completed && !columns.contains(&s))
        {
            return Err(invalid(format!("output column '{missing}' is not a raw column")));
        }
        if !self.output.contains(&VaccinationStatus::Unvaccinated) {
            return Err(invalid("output must keep the unvaccinated column".to_owned()));
        }
        if !self.output.contains(&VaccinationStatus::Completed) {
            return Err(invalid("output must keep the completed aggregate".to_owned()));
        }

        if self.brackets.is_empty() {
            return Err(invalid("no age brackets".to_owned()));
        }

        if self.tables.is_empty() {
            return Err(invalid("no tables".to_owned()));
        }
        for table in &self.tables {
            if table.captions.is_empty() {
                return Err(invalid(format!("table '{}' has no captions", table.name)));
            }
            if table.groups.is_empty() {
                return Err(invalid(format!("table '{}' has no row groups", table.name)));
            }
        }

        if let Some(until) = self.valid_until
            && until <= self.valid_from
        {
            return Err(invalid(format!(
                "empty validity window {} .. {until}",
                self.valid_from
            )));
        }

        Ok(())
    }
}

/// Parses a single schema definition from TOML and validates it.
///
/// # Errors
///
/// Returns [`SchemaError`] if the TOML is malformed or the definition is
/// inconsistent.
pub fn parse_schema_toml(toml_str: &str) -> Result<SchemaVersion, SchemaError> {
    let schema: SchemaVersion = toml::de::from_str(toml_str)?;
    schema.validate()?;
    Ok(schema)
}
