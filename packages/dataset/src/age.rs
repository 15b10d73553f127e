//! Age-stratified dataset: one row per `(date, bracket)`.
//!
//! Rows are ordered by date descending, then by bracket in table order.
//! Besides the consolidated file, a single report's brackets can be written
//! on their own with [`write_report_file`].

use std::io;
use std::path::Path;

use chrono::NaiveDate;
use iss_bulletin_models::{AgeBracket, AgeStratifiedRow, ColumnKey, SemanticRow};

use crate::time_series::{
    append_new_columns, cells, malformed, parse_cells, parse_date, parse_header,
};
use crate::{DATE_COLUMN, DATE_FORMAT, DELIMITER, DatasetError, persist};

/// Header of the bracket column.
pub const BRACKET_COLUMN: &str = "età";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgeDatedRow {
    pub date: NaiveDate,
    pub bracket: AgeBracket,
    pub values: SemanticRow,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgeStratifiedDataset {
    columns: Vec<ColumnKey>,
    rows: Vec<AgeDatedRow>,
}

impl AgeStratifiedDataset {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            columns: Vec::new(),
            rows: Vec::new(),
        }
    }

    #[must_use]
    pub fn columns(&self) -> &[ColumnKey] {
        &self.columns
    }

    #[must_use]
    pub fn rows(&self) -> &[AgeDatedRow] {
        &self.rows
    }

    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.rows.iter().any(|r| r.date == date)
    }

    /// Most recent publication date present.
    #[must_use]
    pub fn latest_date(&self) -> Option<NaiveDate> {
        self.rows.first().map(|r| r.date)
    }

    /// The rows of one report, in bracket order.
    pub fn rows_for(&self, date: NaiveDate) -> impl Iterator<Item = &AgeDatedRow> + '_ {
        self.rows.iter().filter(move |r| r.date == date)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Replaces every row of `date` with `rows`. Returns `true` if rows for
    /// that date existed.
    pub(crate) fn replace_date(&mut self, date: NaiveDate, rows: Vec<AgeStratifiedRow>) -> bool {
        let before = self.rows.len();
        self.rows.retain(|r| r.date != date);
        let replaced = self.rows.len() != before;

        for AgeStratifiedRow { bracket, row } in rows {
            append_new_columns(&mut self.columns, row.keys());
            self.rows.push(AgeDatedRow {
                date,
                bracket,
                values: row,
            });
        }

        self.sort();
        replaced
    }

    fn sort(&mut self) {
        self.rows
            .sort_by(|a, b| b.date.cmp(&a.date).then(a.bracket.cmp(&b.bracket)));
    }

    /// Loads the dataset at `path`. A missing file is an empty dataset.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError`] if the file cannot be read or is malformed.
    pub fn load(path: &Path) -> Result<Self, DatasetError> {
        if !path.exists() {
            return Ok(Self::new());
        }
        let file = std::fs::File::open(path)?;
        Self::read_with_context(file, &path.display().to_string())
    }

    /// Reads a dataset from any reader.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError`] if the content is not a valid dataset.
    pub fn read_from(reader: impl io::Read) -> Result<Self, DatasetError> {
        Self::read_with_context(reader, "<reader>")
    }

    fn read_with_context(reader: impl io::Read, source: &str) -> Result<Self, DatasetError> {
        let mut csv = csv::ReaderBuilder::new()
            .delimiter(DELIMITER)
            .from_reader(reader);

        let headers = csv.headers()?.clone();
        let columns = parse_header(&headers, &[DATE_COLUMN, BRACKET_COLUMN], source)?;

        let mut rows: Vec<AgeDatedRow> = Vec::new();
        for record in csv.records() {
            let record = record?;
            let date = parse_date(record.get(0).unwrap_or_default(), source)?;
            let label = record.get(1).unwrap_or_default();
            let bracket: AgeBracket = label
                .trim()
                .parse()
                .map_err(|_| malformed(source, format!("unknown age bracket '{label}'")))?;
            if rows.iter().any(|r| r.date == date && r.bracket == bracket) {
                return Err(malformed(source, format!("duplicate row {date} {bracket}")));
            }
            let values = parse_cells(&columns, record.iter().skip(2), source)?;
            rows.push(AgeDatedRow {
                date,
                bracket,
                values,
            });
        }

        let mut dataset = Self { columns, rows };
        dataset.sort();
        Ok(dataset)
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

        let mut header = vec![DATE_COLUMN.to_owned(), BRACKET_COLUMN.to_owned()];
        header.extend(self.columns.iter().map(ToString::to_string));
        csv.write_record(&header)?;

        for row in &self.rows {
            let mut record = vec![
                row.date.format(DATE_FORMAT).to_string(),
                row.bracket.to_string(),
            ];
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
        log::info!("Saved {} age rows to {}", self.rows.len(), path.display());
        Ok(())
    }
}

/// Writes one report's brackets to their own file (`età;<columns>`).
///
/// # Errors
///
/// Returns [`DatasetError`] if writing or renaming fails.
pub fn write_report_file(path: &Path, rows: &[AgeStratifiedRow]) -> Result<(), DatasetError> {
    let mut columns = Vec::new();
    for row in rows {
        append_new_columns(&mut columns, row.row.keys());
    }

    persist::write_atomic(path, |file| {
        let mut csv = csv::WriterBuilder::new()
            .delimiter(DELIMITER)
            .from_writer(file);

        let mut header = vec![BRACKET_COLUMN.to_owned()];
        header.extend(columns.iter().map(ToString::to_string));
        csv.write_record(&header)?;

        for row in rows {
            let mut record = vec![row.bracket.to_string()];
            record.extend(cells(&columns, &row.row));
            csv.write_record(&record)?;
        }

        csv.flush()?;
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use iss_bulletin_models::{Measure, VaccinationStatus};

    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn bracket_row(bracket: AgeBracket, cases: i64) -> AgeStratifiedRow {
        AgeStratifiedRow {
            bracket,
            row: [(
                ColumnKey::new(Measure::Cases, VaccinationStatus::Unvaccinated),
                cases,
            )]
            .into_iter()
            .collect(),
        }
    }

    #[test]
    fn replaces_a_report_and_keeps_order() {
        let mut ds = AgeStratifiedDataset::new();
        ds.replace_date(
            date(2022, 1, 12),
            vec![
                bracket_row(AgeBracket::Over80, 4),
                bracket_row(AgeBracket::From12To39, 1),
            ],
        );
        ds.replace_date(date(2022, 1, 19), vec![bracket_row(AgeBracket::From12To39, 9)]);

        let order: Vec<(NaiveDate, AgeBracket)> =
            ds.rows().iter().map(|r| (r.date, r.bracket)).collect();
        assert_eq!(
            order,
            vec![
                (date(2022, 1, 19), AgeBracket::From12To39),
                (date(2022, 1, 12), AgeBracket::From12To39),
                (date(2022, 1, 12), AgeBracket::Over80),
            ]
        );

        assert!(ds.replace_date(date(2022, 1, 12), vec![bracket_row(AgeBracket::Over80, 5)]));
        assert_eq!(ds.rows_for(date(2022, 1, 12)).count(), 1);
        assert_eq!(ds.latest_date(), Some(date(2022, 1, 19)));
    }

    #[test]
    fn round_trips_through_csv() {
        let mut ds = AgeStratifiedDataset::new();
        ds.replace_date(
            date(2022, 1, 19),
            vec![
                bracket_row(AgeBracket::From12To39, 1),
                bracket_row(AgeBracket::Over80, 2),
            ],
        );

        let mut out = Vec::new();
        ds.write_to(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("data;età;casi non vaccinati\n2022-01-19;12-39;1\n"));

        assert_eq!(AgeStratifiedDataset::read_from(text.as_bytes()).unwrap(), ds);
    }

    #[test]
    fn writes_single_report_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("data_iss_eta_2022-01-19.csv");
        write_report_file(
            &path,
            &[
                bracket_row(AgeBracket::From12To39, 1),
                bracket_row(AgeBracket::Over80, 2),
            ],
        )
        .unwrap();

        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "età;casi non vaccinati\n12-39;1\n80+;2\n"
        );
    }

    #[test]
    fn rejects_unknown_bracket() {
        let text = "data;età;casi non vaccinati\n2022-01-19;0-11;1\n";
        assert!(matches!(
            AgeStratifiedDataset::read_from(text.as_bytes()),
            Err(DatasetError::Malformed { .. })
        ));
    }
}
