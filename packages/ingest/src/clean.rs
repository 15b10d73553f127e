//! Numeric cleaner.
//!
//! Cells look like `1.234 (12,5%)`: an absolute count with thousands
//! separators, optionally followed by a parenthesised percentage. Cleaning
//! drops everything from the first `(` on, then every non-digit, and parses
//! what is left. An empty residual is invalid, never zero.

use std::sync::LazyLock;

use iss_bulletin_models::{CleanedRow, RawTable};
use iss_bulletin_schema::RowFilter;
use regex::Regex;

static NOISE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\((.*)|[^0-9]").unwrap_or_else(|e| panic!("invalid cleaning regex: {e}"))
});

/// Reduces one cell to an integer, or `None` if nothing numeric remains
/// or the digits do not fit in an `i64`.
#[must_use]
pub fn clean_cell(cell: &str) -> Option<i64> {
    let digits = NOISE.replace_all(cell, "");
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}

/// Keeps the trailing `columns` cells of every row that passes `filter`
/// and cleans them. Rows that are too short, fail the filter, or contain a
/// cell that does not clean are dropped.
#[must_use]
pub fn clean_table(table: &RawTable, columns: usize, filter: RowFilter) -> Vec<CleanedRow> {
    let mut cleaned = Vec::new();

    for (index, row) in table.rows.iter().enumerate() {
        let Some(start) = row.len().checked_sub(columns) else {
            continue;
        };
        let cells = &row[start..];

        if !cells.first().is_some_and(|first| filter.matches(first)) {
            continue;
        }

        match cells.iter().map(|c| clean_cell(c)).collect::<Option<Vec<i64>>>() {
            Some(values) => cleaned.push(CleanedRow::new(values)),
            None => log::debug!(
                "Page {}: dropping row {index} with a non-numeric cell: {cells:?}",
                table.page_number
            ),
        }
    }

    log::debug!(
        "Page {}: {} of {} rows are numeric",
        table.page_number,
        cleaned.len(),
        table.rows.len()
    );

    cleaned
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_percentages_and_separators() {
        assert_eq!(clean_cell("1.234 (12%)"), Some(1234));
        assert_eq!(clean_cell(" 7 890 "), Some(7890));
        assert_eq!(clean_cell("2.345.678 (45,1%)"), Some(2_345_678));
        assert_eq!(clean_cell("0"), Some(0));
    }

    #[test]
    fn empty_residual_is_invalid_not_zero() {
        assert_eq!(clean_cell(""), None);
        assert_eq!(clean_cell("-"), None);
        assert_eq!(clean_cell("(12%)"), None);
        assert_eq!(clean_cell("n.d."), None);
    }

    #[test]
    fn values_beyond_i64_are_invalid() {
        assert_eq!(clean_cell("9.223.372.036.854.775.807"), Some(i64::MAX));
        assert_eq!(clean_cell("9.223.372.036.854.775.808"), None);
    }

    #[test]
    fn keeps_trailing_columns_of_numeric_rows() {
        let table = RawTable::from_rows(
            &[
                &["Fascia", "Non vaccinati", "1 dose", "Completo"],
                &["12-39", "1.000 (50%)", "10 (1%)", "990 (49%)"],
                &["40-59", "2.000 (40%)", "-", "3.000 (60%)"],
                &["Totale", "3.000 (43%)", "10 (0%)", "3.990 (57%)"],
                &["short"],
            ],
            4,
        );

        let rows = clean_table(&table, 3, RowFilter::LeadingDigit);
        assert_eq!(
            rows,
            vec![
                CleanedRow::new(vec![1000, 10, 990]),
                CleanedRow::new(vec![3000, 10, 3990]),
            ]
        );
    }

    #[test]
    fn percent_suffix_filter_selects_older_rows() {
        let table = RawTable::from_rows(
            &[
                &["12-39", "1.000 (50%)", "990 (49%)"],
                &["12-39", "1.000", "990"],
            ],
            1,
        );
        let rows = clean_table(&table, 2, RowFilter::PercentSuffix);
        assert_eq!(rows, vec![CleanedRow::new(vec![1000, 990])]);
    }
}
