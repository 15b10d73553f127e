//! Column reconciler.
//!
//! Maps the positional values of a [`CleanedRow`] onto named
//! [`ColumnKey`]s for one measure, deriving `vaccinati completo` as the sum
//! of the completed-cycle sub-columns the schema version publishes.

use std::collections::BTreeMap;

use iss_bulletin_models::{CleanedRow, ColumnKey, Measure, SemanticRow, VaccinationStatus};
use iss_bulletin_schema::SchemaVersion;

use crate::IngestError;

/// Names the values of `row` for `measure` according to `schema`.
///
/// # Errors
///
/// Returns [`IngestError::SchemaMismatch`] if the row does not have one
/// value per schema column, or [`IngestError::Overflow`] if the
/// completed-cycle sum does not fit in an `i64`.
pub fn reconcile_row(
    row: &CleanedRow,
    schema: &SchemaVersion,
    measure: Measure,
) -> Result<SemanticRow, IngestError> {
    if row.values.len() != schema.columns.len() {
        return Err(IngestError::SchemaMismatch {
            schema: schema.id.clone(),
            expected: schema.columns.len(),
            found: row.values.len(),
        });
    }

    let raw: BTreeMap<VaccinationStatus, i64> = schema
        .columns
        .iter()
        .copied()
        .zip(row.values.iter().copied())
        .collect();

    let completed = schema
        .completed
        .iter()
        .filter_map(|status| raw.get(status))
        .try_fold(0_i64, |sum, &value| sum.checked_add(value))
        .ok_or_else(|| IngestError::Overflow {
            schema: schema.id.clone(),
            column: ColumnKey::new(measure, VaccinationStatus::Completed).to_string(),
        })?;

    Ok(schema
        .output
        .iter()
        .filter_map(|&status| {
            let value = if status == VaccinationStatus::Completed {
                Some(completed)
            } else {
                raw.get(&status).copied()
            };
            value.map(|v| (ColumnKey::new(measure, status), v))
        })
        .collect())
}
