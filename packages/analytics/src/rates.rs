//! Rate computation over [`SemanticRow`]s and the accumulated datasets.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::Path;

use chrono::NaiveDate;
use iss_bulletin_dataset::{
    AgeStratifiedDataset, DATE_FORMAT, DELIMITER, DatasetError, TimeSeriesDataset, persist,
};
use iss_bulletin_models::{AgeBracket, ColumnKey, Measure, SemanticRow, VaccinationStatus};

use crate::AnalyticsError;

const PER: f64 = 100_000.0;

/// Statuses compared against the unvaccinated for efficacy and ratio.
const EFFICACY_STATUSES: [VaccinationStatus; 3] = [
    VaccinationStatus::Completed,
    VaccinationStatus::Booster,
    VaccinationStatus::SecondBooster,
];

/// Name of one derived rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RateKey {
    /// Events per 100 000 of the status population.
    Incidence(ColumnKey),
    /// Percent reduction of incidence relative to the unvaccinated.
    Efficacy(ColumnKey),
    /// Share of the combined incidence borne by the unvaccinated, in
    /// percent: `100 * unvaccinated / (unvaccinated + vaccinated)`.
    Ratio(ColumnKey),
}

impl fmt::Display for RateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Incidence(key) => write!(f, "incidenza {key}"),
            Self::Efficacy(key) => write!(f, "efficacia {key}"),
            Self::Ratio(key) => write!(f, "rapporto {key}"),
        }
    }
}

/// Rates derived from one row, in canonical order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RateRow {
    values: BTreeMap<RateKey, f64>,
}

impl RateRow {
    #[must_use]
    pub fn get(&self, key: RateKey) -> Option<f64> {
        self.values.get(&key).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (RateKey, f64)> + '_ {
        self.values.iter().map(|(k, v)| (*k, *v))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Population count used as the denominator for `measure` and `status`.
fn baseline(row: &SemanticRow, measure: Measure, status: VaccinationStatus) -> Option<i64> {
    measure
        .dedicated_baseline()
        .and_then(|base| row.get(ColumnKey::new(base, status)))
        .or_else(|| row.get(ColumnKey::new(Measure::Population, status)))
}

#[allow(clippy::cast_precision_loss)]
fn incidence(row: &SemanticRow, measure: Measure, status: VaccinationStatus) -> Option<f64> {
    let events = row.get(ColumnKey::new(measure, status))?;
    let population = baseline(row, measure, status).filter(|&p| p > 0)?;
    Some(PER * events as f64 / population as f64)
}

fn efficacy(row: &SemanticRow, measure: Measure, status: VaccinationStatus) -> Option<f64> {
    let vaccinated = incidence(row, measure, status)?;
    let unvaccinated = incidence(row, measure, VaccinationStatus::Unvaccinated)
        .filter(|&rate| rate > 0.0)?;
    Some((1.0 - vaccinated / unvaccinated) * 100.0)
}

fn ratio(row: &SemanticRow, measure: Measure, status: VaccinationStatus) -> Option<f64> {
    let vaccinated = incidence(row, measure, status)?;
    let unvaccinated = incidence(row, measure, VaccinationStatus::Unvaccinated)?;
    let combined = unvaccinated + vaccinated;
    (combined > 0.0).then(|| 100.0 * unvaccinated / combined)
}

/// Derives every incidence, efficacy and ratio value available from `row`.
#[must_use]
pub fn compute_rates(row: &SemanticRow) -> RateRow {
    let mut values = BTreeMap::new();

    for key in row.keys().filter(|k| !k.measure.is_population()) {
        if let Some(rate) = incidence(row, key.measure, key.status) {
            values.insert(RateKey::Incidence(key), rate);
        }
        if EFFICACY_STATUSES.contains(&key.status) {
            if let Some(rate) = efficacy(row, key.measure, key.status) {
                values.insert(RateKey::Efficacy(key), rate);
            }
            if let Some(rate) = ratio(row, key.measure, key.status) {
                values.insert(RateKey::Ratio(key), rate);
            }
        }
    }

    RateRow { values }
}

/// Rates for every date of the time series, most recent first.
#[must_use]
pub fn time_series_rates(dataset: &TimeSeriesDataset) -> Vec<(NaiveDate, RateRow)> {
    dataset
        .rows()
        .iter()
        .map(|r| (r.date, compute_rates(&r.values)))
        .collect()
}

/// Rates per bracket of the most recent report in the age dataset.
#[must_use]
pub fn age_rates(dataset: &AgeStratifiedDataset) -> Option<(NaiveDate, Vec<(AgeBracket, RateRow)>)> {
    let date = dataset.latest_date()?;
    let rows = dataset
        .rows_for(date)
        .map(|r| (r.bracket, compute_rates(&r.values)))
        .collect();
    Some((date, rows))
}

/// Writes rate rows to `path` as `;`-separated CSV, atomically.
///
/// `leading` names the key columns; each row supplies the matching key
/// cells followed by its rates. Rate columns are the union over all rows,
/// empty where a row has no value. Values are written with two decimals.
///
/// # Errors
///
/// Returns [`AnalyticsError`] if writing fails.
pub fn write_rates(
    path: &Path,
    leading: &[&str],
    rows: &[(Vec<String>, RateRow)],
) -> Result<(), AnalyticsError> {
    let columns: BTreeSet<RateKey> = rows
        .iter()
        .flat_map(|(_, rates)| rates.iter().map(|(k, _)| k))
        .collect();

    persist::write_atomic(path, |file| {
        let mut csv = csv::WriterBuilder::new()
            .delimiter(DELIMITER)
            .from_writer(file);

        let mut header: Vec<String> = leading.iter().map(|&s| s.to_owned()).collect();
        header.extend(columns.iter().map(ToString::to_string));
        csv.write_record(&header)?;

        for (keys, rates) in rows {
            let mut record = keys.clone();
            record.extend(
                columns
                    .iter()
                    .map(|k| rates.get(*k).map(|v| format!("{v:.2}")).unwrap_or_default()),
            );
            csv.write_record(&record)?;
        }

        csv.flush().map_err(DatasetError::from)?;
        Ok(())
    })?;

    log::info!("Wrote {} rate rows to {}", rows.len(), path.display());
    Ok(())
}

/// Formats a date the way the datasets do.
#[must_use]
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use iss_bulletin_dataset::merge_row;

    use super::*;

    fn key(measure: Measure, status: VaccinationStatus) -> ColumnKey {
        ColumnKey::new(measure, status)
    }

    fn row(values: &[(Measure, VaccinationStatus, i64)]) -> SemanticRow {
        values.iter().map(|&(m, s, v)| (key(m, s), v)).collect()
    }

    fn close(actual: Option<f64>, expected: f64) {
        let actual = actual.unwrap();
        assert!((actual - expected).abs() < 1e-9, "{actual} != {expected}");
    }

    #[test]
    fn incidence_per_hundred_thousand() {
        let r = row(&[
            (Measure::Population, VaccinationStatus::Unvaccinated, 1_000_000),
            (Measure::Cases, VaccinationStatus::Unvaccinated, 500),
        ]);
        let rates = compute_rates(&r);
        close(
            rates.get(RateKey::Incidence(key(
                Measure::Cases,
                VaccinationStatus::Unvaccinated,
            ))),
            50.0,
        );
    }

    #[test]
    fn efficacy_relative_to_unvaccinated() {
        let r = row(&[
            (Measure::Population, VaccinationStatus::Unvaccinated, 100_000),
            (Measure::Population, VaccinationStatus::Completed, 400_000),
            (Measure::Deaths, VaccinationStatus::Unvaccinated, 40),
            (Measure::Deaths, VaccinationStatus::Completed, 16),
        ]);
        let rates = compute_rates(&r);
        close(
            rates.get(RateKey::Efficacy(key(
                Measure::Deaths,
                VaccinationStatus::Completed,
            ))),
            90.0,
        );
        assert!(
            rates
                .get(RateKey::Efficacy(key(
                    Measure::Deaths,
                    VaccinationStatus::Unvaccinated
                )))
                .is_none()
        );
    }

    #[test]
    fn ratio_is_the_unvaccinated_share_of_incidence() {
        let r = row(&[
            (Measure::Population, VaccinationStatus::Unvaccinated, 100_000),
            (Measure::Population, VaccinationStatus::Completed, 400_000),
            (Measure::Cases, VaccinationStatus::Unvaccinated, 300),
            (Measure::Cases, VaccinationStatus::Completed, 400),
        ]);
        let rates = compute_rates(&r);
        let completed = key(Measure::Cases, VaccinationStatus::Completed);
        // 300 vs 100 per 100 000.
        close(rates.get(RateKey::Ratio(completed)), 75.0);
        assert!(
            rates
                .get(RateKey::Ratio(key(
                    Measure::Cases,
                    VaccinationStatus::Unvaccinated
                )))
                .is_none()
        );
        assert_eq!(RateKey::Ratio(completed).to_string(), "rapporto casi vaccinati completo");
    }

    #[test]
    fn ratio_needs_some_incidence() {
        let r = row(&[
            (Measure::Population, VaccinationStatus::Unvaccinated, 1_000),
            (Measure::Population, VaccinationStatus::Booster, 1_000),
            (Measure::Deaths, VaccinationStatus::Unvaccinated, 0),
            (Measure::Deaths, VaccinationStatus::Booster, 0),
        ]);
        assert!(
            compute_rates(&r)
                .get(RateKey::Ratio(key(Measure::Deaths, VaccinationStatus::Booster)))
                .is_none()
        );
    }

    #[test]
    fn dedicated_baseline_wins_over_population() {
        let r = row(&[
            (Measure::Population, VaccinationStatus::Booster, 1_000),
            (Measure::DeathsPopulation, VaccinationStatus::Booster, 2_000),
            (Measure::Deaths, VaccinationStatus::Booster, 2),
        ]);
        close(
            compute_rates(&r).get(RateKey::Incidence(key(
                Measure::Deaths,
                VaccinationStatus::Booster,
            ))),
            100.0,
        );
    }

    #[test]
    fn zero_or_missing_baseline_yields_nothing() {
        let r = row(&[
            (Measure::Population, VaccinationStatus::Unvaccinated, 0),
            (Measure::Cases, VaccinationStatus::Unvaccinated, 5),
            (Measure::Cases, VaccinationStatus::Completed, 5),
        ]);
        assert!(compute_rates(&r).is_empty());
    }

    #[test]
    fn writes_time_series_rates() {
        let mut ds = TimeSeriesDataset::new();
        merge_row(
            &mut ds,
            NaiveDate::from_ymd_opt(2022, 1, 19).unwrap(),
            row(&[
                (Measure::Population, VaccinationStatus::Unvaccinated, 200_000),
                (Measure::Cases, VaccinationStatus::Unvaccinated, 3),
            ]),
            false,
        );

        let rows: Vec<(Vec<String>, RateRow)> = time_series_rates(&ds)
            .into_iter()
            .map(|(date, rates)| (vec![format_date(date)], rates))
            .collect();

        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("rates.csv");
        write_rates(&path, &["data"], &rows).unwrap();

        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "data;incidenza casi non vaccinati\n2022-01-19;1.50\n"
        );
    }
}
