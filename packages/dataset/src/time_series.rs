//! National time series: one row per publication date.

use std::io;
use std::path::Path;

use chrono::NaiveDate;
use iss_bulletin_models::{ColumnKey, SemanticRow};

use crate::{DATE_COLUMN, DATE_FORMAT, DELIMITER, DatasetError, persist};

/// One persisted row. Columns added after this row was written are absent
/// from `values`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatedRow {
    pub date: NaiveDate,
    pub values: SemanticRow,
}

/// Accumulated totals, strictly descending by date, one row per date.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimeSeriesDataset {
    columns: Vec<ColumnKey>,
    rows: Vec<DatedRow>,
}

impl TimeSeriesDataset {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            columns: Vec::new(),
            rows: Vec::new(),
        }
    }

    /// Columns in file order. New columns are appended, never removed.
    #[must_use]
    pub fn columns(&self) -> &[ColumnKey] {
        &self.columns
    }

    /// Rows, most recent first.
    #[must_use]
    pub fn rows(&self) -> &[DatedRow] {
        &self.rows
    }

    /// The most recent row.
    #[must_use]
    pub fn latest(&self) -> Option<&DatedRow> {
        self.rows.first()
    }

    #[must_use]
    pub fn get(&self, date: NaiveDate) -> Option<&DatedRow> {
        self.rows.iter().find(|r| r.date == date)
    }

    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.get(date).is_some()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Inserts the row for `date`, replacing any existing one, and restores
    /// the descending order. Returns `true` if a row was replaced.
    pub(crate) fn upsert(&mut self, date: NaiveDate, values: SemanticRow) -> bool {
        append_new_columns(&mut self.columns, values.keys());

        let replaced = if let Some(existing) = self.rows.iter_mut().find(|r| r.date == date) {
            existing.values = values;
            true
        } else {
            self.rows.push(DatedRow { date, values });
            false
        };

        self.rows.sort_by(|a, b| b.date.cmp(&a.date));
        replaced
    }

    /// Loads the dataset at `path`. A missing file is an empty dataset.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError`] if the file cannot be read or is malformed.
    pub fn load(path: &Path) -> Result<Self, DatasetError> {
        if !path.exists() {
            log::info!("{} does not exist yet, starting empty", path.display());
            return Ok(Self::new());
        }
        let file = std::fs::File::open(path)?;
        read_with_context(file, &path.display().to_string())
    }

    /// Reads a dataset from any reader.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError`] if the content is not a valid dataset.
    pub fn read_from(reader: impl io::Read) -> Result<Self, DatasetError> {
        read_with_context(reader, "<reader>")
    }

    /// Writes the dataset as `;`-separated CSV.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError`] if writing fails.
    pub fn write_to(&self, writer: impl io::Write) -> Result<(), DatasetError> {
        let mut csv = csv::WriterBuilder::new()
            .delimiter(DELIMITER)
            .from_writer(writer);

        let mut header = vec![DATE_COLUMN.to_owned()];
        header.extend(self.columns.iter().map(ToString::to_string));
        csv.write_record(&header)?;

        for row in &self.rows {
            let mut record = vec![row.date.format(DATE_FORMAT).to_string()];
            record.extend(cells(&self.columns, &row.values));
            csv.write_record(&record)?;
        }

        csv.flush()?;
        Ok(())
    }

    /// Atomically replaces the file at `path` with this dataset.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError`] if writing or renaming fails.
    pub fn save(&self, path: &Path) -> Result<(), DatasetError> {
        persist::write_atomic(path, |file| self.write_to(file))?;
        log::info!("Saved {} rows to {}", self.rows.len(), path.display());
        Ok(())
    }
}

fn read_with_context(reader: impl io::Read, source: &str) -> Result<TimeSeriesDataset, DatasetError> {
    let mut csv = csv::ReaderBuilder::new()
        .delimiter(DELIMITER)
        .from_reader(reader);

    let headers = csv.headers()?.clone();
    let columns = parse_header(&headers, &[DATE_COLUMN], source)?;

    let mut rows: Vec<DatedRow> = Vec::new();
    for record in csv.records() {
        let record = record?;
        let date = parse_date(record.get(0).unwrap_or_default(), source)?;
        if rows.iter().any(|r| r.date == date) {
            return Err(malformed(source, format!("duplicate date {date}")));
        }
        let values = parse_cells(&columns, record.iter().skip(1), source)?;
        rows.push(DatedRow { date, values });
    }

    rows.sort_by(|a, b| b.date.cmp(&a.date));
    Ok(TimeSeriesDataset { columns, rows })
}

pub(crate) fn malformed(source: &str, message: String) -> DatasetError {
    DatasetError::Malformed {
        path: source.to_owned(),
        message,
    }
}

/// Checks the leading key columns and parses the rest as canonical names.
pub(crate) fn parse_header(
    headers: &csv::StringRecord,
    leading: &[&str],
    source: &str,
) -> Result<Vec<ColumnKey>, DatasetError> {
    for (i, expected) in leading.iter().enumerate() {
        if headers.get(i) != Some(*expected) {
            return Err(malformed(
                source,
                format!("column {i} must be '{expected}', found {:?}", headers.get(i)),
            ));
        }
    }

    headers
        .iter()
        .skip(leading.len())
        .map(|name| {
            name.parse::<ColumnKey>()
                .map_err(|e| malformed(source, e.to_string()))
        })
        .collect()
}

pub(crate) fn parse_date(cell: &str, source: &str) -> Result<NaiveDate, DatasetError> {
    NaiveDate::parse_from_str(cell.trim(), DATE_FORMAT)
        .map_err(|e| malformed(source, format!("bad date '{cell}': {e}")))
}

/// Parses value cells; empty cells are absent values.
pub(crate) fn parse_cells<'a>(
    columns: &[ColumnKey],
    cells: impl Iterator<Item = &'a str>,
    source: &str,
) -> Result<SemanticRow, DatasetError> {
    let mut row = SemanticRow::new();
    for (key, cell) in columns.iter().zip(cells) {
        let cell = cell.trim();
        if cell.is_empty() {
            continue;
        }
        let value = cell
            .parse::<i64>()
            .map_err(|e| malformed(source, format!("bad value '{cell}' for '{key}': {e}")))?;
        row.insert(*key, value);
    }
    Ok(row)
}

/// Renders a row's values in column order, empty where absent.
pub(crate) fn cells<'a>(
    columns: &'a [ColumnKey],
    values: &'a SemanticRow,
) -> impl Iterator<Item = String> + 'a {
    columns
        .iter()
        .map(|key| values.get(*key).map(|v| v.to_string()).unwrap_or_default())
}

/// Appends keys not yet present, preserving existing order.
pub(crate) fn append_new_columns(
    columns: &mut Vec<ColumnKey>,
    keys: impl Iterator<Item = ColumnKey>,
) {
    for key in keys {
        if !columns.contains(&key) {
            log::info!("New column '{key}'");
            columns.push(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use iss_bulletin_models::{Measure, VaccinationStatus};

    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn key(measure: Measure, status: VaccinationStatus) -> ColumnKey {
        ColumnKey::new(measure, status)
    }

    const FILE: &str = "\
data;non vaccinati;vaccinati completo;casi non vaccinati;casi vaccinati completo
2022-01-12;1000;4000;40;30
2021-12-29;1100;3900;35;25
";

    #[test]
    fn reads_dataset() {
        let ds = TimeSeriesDataset::read_from(FILE.as_bytes()).unwrap();
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.columns().len(), 4);
        let latest = ds.latest().unwrap();
        assert_eq!(latest.date, date(2022, 1, 12));
        assert_eq!(
            latest
                .values
                .get(key(Measure::Cases, VaccinationStatus::Completed)),
            Some(30)
        );
    }

    #[test]
    fn rejects_unknown_columns_and_duplicate_dates() {
        let unknown = "data;guariti\n2022-01-12;1\n";
        assert!(matches!(
            TimeSeriesDataset::read_from(unknown.as_bytes()),
            Err(DatasetError::Malformed { .. })
        ));

        let duplicate = "data;non vaccinati\n2022-01-12;1\n2022-01-12;2\n";
        assert!(matches!(
            TimeSeriesDataset::read_from(duplicate.as_bytes()),
            Err(DatasetError::Malformed { .. })
        ));
    }

    #[test]
    fn sorts_rows_read_out_of_order() {
        let file = "data;non vaccinati\n2021-12-01;1\n2022-01-12;2\n";
        let ds = TimeSeriesDataset::read_from(file.as_bytes()).unwrap();
        assert_eq!(ds.rows()[0].date, date(2022, 1, 12));
    }

    #[test]
    fn new_columns_are_appended_and_old_rows_left_empty() {
        let mut ds = TimeSeriesDataset::read_from(FILE.as_bytes()).unwrap();
        let mut row = ds.latest().unwrap().values.clone();
        row.insert(key(Measure::Population, VaccinationStatus::Booster), 900);
        ds.upsert(date(2022, 1, 19), row);

        assert_eq!(
            ds.columns().last(),
            Some(&key(Measure::Population, VaccinationStatus::Booster))
        );

        let mut out = Vec::new();
        ds.write_to(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines[0],
            "data;non vaccinati;vaccinati completo;casi non vaccinati;casi vaccinati completo;booster"
        );
        assert_eq!(lines[1], "2022-01-19;1000;4000;40;30;900");
        assert_eq!(lines[3], "2021-12-29;1100;3900;35;25;");

        let reread = TimeSeriesDataset::read_from(text.as_bytes()).unwrap();
        assert_eq!(reread, ds);
    }

    #[test]
    fn missing_file_loads_empty_and_save_round_trips() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("series.csv");

        let mut ds = TimeSeriesDataset::load(&path).unwrap();
        assert!(ds.is_empty());

        let row: SemanticRow = [(key(Measure::Population, VaccinationStatus::Unvaccinated), 7)]
            .into_iter()
            .collect();
        ds.upsert(date(2022, 1, 19), row);
        ds.save(&path).unwrap();

        assert_eq!(TimeSeriesDataset::load(&path).unwrap(), ds);
    }
}
