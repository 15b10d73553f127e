//! Dataset merger.
//!
//! Deciding not to write is a normal outcome here: re-running an ingestion
//! for a report that is already stored, or for a report whose figures did
//! not change, reports [`MergeOutcome::AlreadyUpToDate`] or
//! [`MergeOutcome::NoNewData`] and leaves the dataset untouched.
//!
//! With `force`, both checks are skipped and the row for the date is
//! replaced wherever it sits in the history; the dataset is re-sorted
//! afterwards, so backfilling an older report is supported.

use chrono::NaiveDate;
use iss_bulletin_models::{AgeStratifiedRow, SemanticRow};

use crate::{AgeStratifiedDataset, TimeSeriesDataset};

/// What a merge did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// A row for a new date was added.
    Inserted,
    /// An existing row was overwritten (`force` only).
    Replaced,
    /// The date is already present.
    AlreadyUpToDate,
    /// The figures equal those of the most recent row.
    NoNewData,
}

impl MergeOutcome {
    /// Whether the dataset changed and must be saved.
    #[must_use]
    pub const fn is_write(self) -> bool {
        matches!(self, Self::Inserted | Self::Replaced)
    }
}

/// Whether every value of `row` equals the same column of `latest`.
fn same_figures(row: &SemanticRow, latest: &SemanticRow) -> bool {
    !row.is_empty() && row.iter().all(|(key, value)| latest.get(key) == Some(value))
}

/// Merges the national totals of the report published on `date`.
pub fn merge_row(
    dataset: &mut TimeSeriesDataset,
    date: NaiveDate,
    row: SemanticRow,
    force: bool,
) -> MergeOutcome {
    if !force {
        if dataset.contains(date) {
            log::info!("Report {date} already in the dataset");
            return MergeOutcome::AlreadyUpToDate;
        }
        if let Some(latest) = dataset.latest()
            && same_figures(&row, &latest.values)
        {
            log::info!(
                "Report {date} repeats the figures of {}, nothing to add",
                latest.date
            );
            return MergeOutcome::NoNewData;
        }
    }

    if dataset.upsert(date, row) {
        log::info!("Replaced row {date}");
        MergeOutcome::Replaced
    } else {
        log::info!("Inserted row {date}");
        MergeOutcome::Inserted
    }
}

/// Merges the per-bracket rows of the report published on `date`.
///
/// Only the presence check applies; the caller decides whether the report
/// carries new data from the totals.
pub fn merge_age_rows(
    dataset: &mut AgeStratifiedDataset,
    date: NaiveDate,
    rows: Vec<AgeStratifiedRow>,
    force: bool,
) -> MergeOutcome {
    if !force && dataset.contains(date) {
        return MergeOutcome::AlreadyUpToDate;
    }
    if dataset.replace_date(date, rows) {
        MergeOutcome::Replaced
    } else {
        MergeOutcome::Inserted
    }
}

#[cfg(test)]
mod tests {
    use iss_bulletin_models::{AgeBracket, ColumnKey, Measure, VaccinationStatus};

    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn totals(unvaccinated: i64, completed: i64, cases: i64) -> SemanticRow {
        [
            (
                ColumnKey::new(Measure::Population, VaccinationStatus::Unvaccinated),
                unvaccinated,
            ),
            (
                ColumnKey::new(Measure::Population, VaccinationStatus::Completed),
                completed,
            ),
            (
                ColumnKey::new(Measure::Cases, VaccinationStatus::Unvaccinated),
                cases,
            ),
        ]
        .into_iter()
        .collect()
    }

    fn assert_sorted_and_unique(ds: &TimeSeriesDataset) {
        for pair in ds.rows().windows(2) {
            assert!(pair[0].date > pair[1].date, "{pair:?}");
        }
    }

    #[test]
    fn merging_twice_is_idempotent() {
        let mut ds = TimeSeriesDataset::new();
        let outcome = merge_row(&mut ds, date(2022, 1, 19), totals(1, 2, 3), false);
        assert_eq!(outcome, MergeOutcome::Inserted);
        let after_first = ds.clone();

        let outcome = merge_row(&mut ds, date(2022, 1, 19), totals(1, 2, 3), false);
        assert_eq!(outcome, MergeOutcome::AlreadyUpToDate);
        assert!(!outcome.is_write());
        assert_eq!(ds, after_first);
    }

    #[test]
    fn repeated_figures_are_no_new_data() {
        let mut ds = TimeSeriesDataset::new();
        merge_row(&mut ds, date(2022, 1, 12), totals(1, 2, 3), false);
        let before = ds.clone();

        let outcome = merge_row(&mut ds, date(2022, 1, 19), totals(1, 2, 3), false);
        assert_eq!(outcome, MergeOutcome::NoNewData);
        assert_eq!(ds, before);
    }

    #[test]
    fn force_bypasses_both_checks() {
        let mut ds = TimeSeriesDataset::new();
        merge_row(&mut ds, date(2022, 1, 12), totals(1, 2, 3), false);

        let outcome = merge_row(&mut ds, date(2022, 1, 19), totals(1, 2, 3), true);
        assert_eq!(outcome, MergeOutcome::Inserted);

        let outcome = merge_row(&mut ds, date(2022, 1, 19), totals(4, 5, 6), true);
        assert_eq!(outcome, MergeOutcome::Replaced);
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.latest().unwrap().values, totals(4, 5, 6));
    }

    #[test]
    fn forced_backfill_lands_in_date_order() {
        let mut ds = TimeSeriesDataset::new();
        for (i, d) in [date(2022, 1, 19), date(2022, 1, 5)].into_iter().enumerate() {
            let i = i64::try_from(i).unwrap();
            merge_row(&mut ds, d, totals(i, i, i), false);
        }

        let outcome = merge_row(&mut ds, date(2022, 1, 12), totals(9, 9, 9), true);
        assert_eq!(outcome, MergeOutcome::Inserted);

        let dates: Vec<NaiveDate> = ds.rows().iter().map(|r| r.date).collect();
        assert_eq!(dates, vec![date(2022, 1, 19), date(2022, 1, 12), date(2022, 1, 5)]);
    }

    #[test]
    fn any_merge_sequence_keeps_dates_sorted_and_unique() {
        let mut ds = TimeSeriesDataset::new();
        let days = [12, 3, 27, 3, 19, 12, 1, 27, 8];
        for (i, day) in days.into_iter().enumerate() {
            let i = i64::try_from(i).unwrap();
            merge_row(&mut ds, date(2022, 1, day), totals(i, i + 1, i + 2), i % 2 == 0);
            assert_sorted_and_unique(&ds);
        }
        assert_eq!(ds.len(), 6);
    }

    #[test]
    fn new_report_becomes_top_row() {
        let existing = "\
data;non vaccinati;vaccinati completo;casi non vaccinati
2022-01-12;900;4800;45
";
        let mut ds = TimeSeriesDataset::read_from(existing.as_bytes()).unwrap();
        let previous = ds.latest().unwrap().clone();

        let outcome = merge_row(&mut ds, date(2022, 1, 19), totals(1000, 5000, 50), false);

        assert_eq!(outcome, MergeOutcome::Inserted);
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.rows()[0].date, date(2022, 1, 19));
        assert_eq!(ds.rows()[0].values, totals(1000, 5000, 50));
        assert_eq!(ds.rows()[1], previous);
    }

    #[test]
    fn age_rows_respect_presence_and_force() {
        let rows = || {
            vec![AgeStratifiedRow {
                bracket: AgeBracket::From12To39,
                row: totals(1, 2, 3),
            }]
        };
        let mut ds = AgeStratifiedDataset::new();
        assert_eq!(
            merge_age_rows(&mut ds, date(2022, 1, 19), rows(), false),
            MergeOutcome::Inserted
        );
        assert_eq!(
            merge_age_rows(&mut ds, date(2022, 1, 19), rows(), false),
            MergeOutcome::AlreadyUpToDate
        );
        assert_eq!(
            merge_age_rows(&mut ds, date(2022, 1, 19), rows(), true),
            MergeOutcome::Replaced
        );
        assert_eq!(ds.len(), 1);
    }
}
