#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Report, table and canonical column types for ISS bulletin ingestion.
//!
//! Every bulletin table, whatever its layout revision, is normalized into
//! [`SemanticRow`]s keyed by [`ColumnKey`]: a [`Measure`] (which event or
//! population baseline a row group carries) paired with a
//! [`VaccinationStatus`]. The rendered key (e.g. `"casi vaccinati
//! completo"`) is the column name used in the persisted datasets.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator as _;
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

/// One published bulletin.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Report {
    /// Absolute URL of the PDF.
    pub url: String,
    /// Publication date parsed from the file name.
    pub published: NaiveDate,
}

/// A grid of strings as returned by a table extractor. No semantics yet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTable {
    /// Rows in page order, cells in reading order.
    pub rows: Vec<Vec<String>>,
    /// 1-based page the table was found on.
    pub page_number: u32,
}

impl RawTable {
    /// Creates a table from borrowed cell text.
    #[must_use]
    pub fn from_rows(rows: &[&[&str]], page_number: u32) -> Self {
        Self {
            rows: rows
                .iter()
                .map(|row| row.iter().map(|&cell| cell.to_owned()).collect())
                .collect(),
            page_number,
        }
    }

    /// Width of the widest row.
    #[must_use]
    pub fn column_count(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// One fully-numeric row after cleaning, indexed by retained column position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanedRow {
    pub values: Vec<i64>,
}

impl CleanedRow {
    #[must_use]
    pub const fn new(values: Vec<i64>) -> Self {
        Self { values }
    }
}

/// Vaccination status columns, raw and derived.
///
/// The [`Display`](fmt::Display) form is the Italian label used in the
/// canonical column names; the serde form is the identifier used by the
/// schema registry.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
pub enum VaccinationStatus {
    #[strum(serialize = "non vaccinati")]
    Unvaccinated,
    #[strum(serialize = "vaccinati 1 dose")]
    FirstDose,
    /// Fully immunized: the sum of every completed-cycle sub-column the
    /// report publishes.
    #[strum(serialize = "vaccinati completo")]
    Completed,
    /// Completed cycle within the last 4-6 months.
    #[strum(serialize = "vaccinati < 4-6 mesi")]
    CompletedRecent,
    /// Completed cycle more than 4-6 months ago.
    #[strum(serialize = "vaccinati > 4-6 mesi")]
    CompletedOld,
    #[strum(serialize = "booster")]
    Booster,
    #[strum(serialize = "quarta dose")]
    SecondBooster,
}

/// The quantity a group of rows in a bulletin table counts.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Measure {
    /// Reference population (denominator for cases).
    Population,
    Cases,
    Hospitalized,
    IntensiveCare,
    Deaths,
    /// Reference population for hospitalizations and intensive care, when
    /// the report publishes it separately.
    HospitalizedPopulation,
    /// Reference population for deaths, when published separately.
    DeathsPopulation,
}

impl Measure {
    /// Prefix prepended to the status label in canonical column names.
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Population => "",
            Self::Cases => "casi ",
            Self::Hospitalized => "ospedalizzati ",
            Self::IntensiveCare => "terapia intensiva ",
            Self::Deaths => "decessi ",
            Self::HospitalizedPopulation => "popolazione ospedalizzati ",
            Self::DeathsPopulation => "popolazione decessi ",
        }
    }

    /// Whether this measure counts people at risk rather than events.
    #[must_use]
    pub const fn is_population(self) -> bool {
        matches!(
            self,
            Self::Population | Self::HospitalizedPopulation | Self::DeathsPopulation
        )
    }

    /// Population measure preferred as the denominator for this event.
    ///
    /// Callers fall back to [`Measure::Population`] when a report does not
    /// publish the dedicated baseline.
    #[must_use]
    pub const fn dedicated_baseline(self) -> Option<Self> {
        match self {
            Self::Hospitalized | Self::IntensiveCare => Some(Self::HospitalizedPopulation),
            Self::Deaths => Some(Self::DeathsPopulation),
            Self::Cases => Some(Self::Population),
            Self::Population | Self::HospitalizedPopulation | Self::DeathsPopulation => None,
        }
    }
}

/// Canonical column identity: a measure paired with a vaccination status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ColumnKey {
    pub measure: Measure,
    pub status: VaccinationStatus,
}

impl ColumnKey {
    #[must_use]
    pub const fn new(measure: Measure, status: VaccinationStatus) -> Self {
        Self { measure, status }
    }
}

impl fmt::Display for ColumnKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.measure.prefix(), self.status)
    }
}

/// Error returned when a column name is not a canonical [`ColumnKey`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownColumnError {
    pub name: String,
}

impl fmt::Display for UnknownColumnError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown canonical column '{}'", self.name)
    }
}

impl std::error::Error for UnknownColumnError {}

impl FromStr for ColumnKey {
    type Err = UnknownColumnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Longest prefixes first so "popolazione decessi ..." never parses
        // as a bare status.
        let mut measures: Vec<Measure> = Measure::iter().collect();
        measures.sort_by_key(|m| std::cmp::Reverse(m.prefix().len()));

        for measure in measures {
            if let Some(rest) = s.strip_prefix(measure.prefix())
                && let Ok(status) = rest.parse::<VaccinationStatus>()
            {
                return Ok(Self { measure, status });
            }
        }

        Err(UnknownColumnError { name: s.to_owned() })
    }
}

/// One normalized row: canonical column to count, in canonical order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SemanticRow {
    values: BTreeMap<ColumnKey, i64>,
}

impl SemanticRow {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            values: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, key: ColumnKey, value: i64) -> Option<i64> {
        self.values.insert(key, value)
    }

    #[must_use]
    pub fn get(&self, key: ColumnKey) -> Option<i64> {
        self.values.get(&key).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ColumnKey, i64)> + '_ {
        self.values.iter().map(|(k, v)| (*k, *v))
    }

    pub fn keys(&self) -> impl Iterator<Item = ColumnKey> + '_ {
        self.values.keys().copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Copies every column of `other` into `self`, overwriting duplicates.
    pub fn extend(&mut self, other: &Self) {
        self.values.extend(other.iter());
    }

    /// Column names and values in canonical order.
    #[must_use]
    pub fn named(&self) -> Vec<(String, i64)> {
        self.iter().map(|(k, v)| (k.to_string(), v)).collect()
    }
}

impl FromIterator<(ColumnKey, i64)> for SemanticRow {
    fn from_iter<T: IntoIterator<Item = (ColumnKey, i64)>>(iter: T) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

/// Age brackets used to stratify bulletin counts.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
pub enum AgeBracket {
    #[serde(rename = "5-11")]
    #[strum(serialize = "5-11")]
    From5To11,
    #[serde(rename = "12-39")]
    #[strum(serialize = "12-39")]
    From12To39,
    #[serde(rename = "40-59")]
    #[strum(serialize = "40-59")]
    From40To59,
    #[serde(rename = "60-79")]
    #[strum(serialize = "60-79")]
    From60To79,
    #[serde(rename = "80+")]
    #[strum(serialize = "80+")]
    Over80,
}

/// A [`SemanticRow`] for a single age bracket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgeStratifiedRow {
    pub bracket: AgeBracket,
    pub row: SemanticRow,
}
