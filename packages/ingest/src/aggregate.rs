//! Row aggregator.
//!
//! A bulletin table is a sequence of row groups, one per measure. Each
//! group has one row per age bracket followed by a total row, so the group
//! stride is `brackets + 1` and the total sits at offset `brackets` within
//! it. Totals feed the national time series; bracket rows feed the
//! age-stratified dataset.

use iss_bulletin_models::{AgeBracket, AgeStratifiedRow, CleanedRow, SemanticRow};
use iss_bulletin_schema::{SchemaVersion, TableSpec};

use crate::IngestError;
use crate::reconcile::reconcile_row;

/// Everything one report contributes to the datasets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportFigures {
    /// National totals across every table of the report.
    pub totals: SemanticRow,
    /// One row per retained bracket, in table order.
    pub brackets: Vec<AgeStratifiedRow>,
}

impl ReportFigures {
    fn add_bracket(&mut self, bracket: AgeBracket, row: &SemanticRow) {
        if let Some(existing) = self.brackets.iter_mut().find(|r| r.bracket == bracket) {
            existing.row.extend(row);
        } else {
            self.brackets.push(AgeStratifiedRow {
                bracket,
                row: row.clone(),
            });
        }
    }
}

/// Row indices of the total rows of `groups` consecutive groups.
#[must_use]
pub fn total_offsets(groups: usize, stride: usize) -> Vec<usize> {
    if stride == 0 {
        return Vec::new();
    }
    (0..groups).map(|g| g * stride + stride - 1).collect()
}

/// Folds the cleaned rows of one table into `figures`.
///
/// # Errors
///
/// Returns [`IngestError::MissingRows`] if the table is shorter than its
/// groups require, or a reconciliation error for a malformed row.
pub fn aggregate_table(
    rows: &[CleanedRow],
    table: &TableSpec,
    schema: &SchemaVersion,
    figures: &mut ReportFigures,
) -> Result<(), IngestError> {
    let stride = schema.stride();
    let expected = table.groups.len() * stride;

    if rows.len() < expected {
        return Err(IngestError::MissingRows {
            table: table.name.clone(),
            expected,
            found: rows.len(),
        });
    }
    if rows.len() > expected {
        log::warn!(
            "Table '{}' has {} numeric rows, ignoring the last {}",
            table.name,
            rows.len(),
            rows.len() - expected
        );
    }

    let totals = total_offsets(table.groups.len(), stride);
    for (&measure, &offset) in table.groups.iter().zip(&totals) {
        let total = reconcile_row(&rows[offset], schema, measure)?;
        figures.totals.extend(&total);

        let group_start = offset + 1 - stride;
        for (index, bracket) in schema.retained_brackets() {
            let row = reconcile_row(&rows[group_start + index], schema, measure)?;
            figures.add_bracket(bracket, &row);
        }
    }

    Ok(())
}
