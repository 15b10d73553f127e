//! Raw table extraction.
//!
//! [`TableExtractor`] is the seam to whatever turns a page into grids of
//! strings. [`StreamExtractor`] is the whitespace-layout heuristic used
//! for the bulletins: a run of two or more spaces (or a tab) separates
//! cells. Blank lines carry no meaning, since `pdf-extract` scatters them
//! between headers and row groups. A table runs from its first multi-cell
//! line to its last one, absorbing single-cell group labels in between,
//! and is closed early by a caption or footer line.

use std::sync::LazyLock;

use iss_bulletin_models::RawTable;
use regex::Regex;

use crate::{PdfDocument, PdfError};

/// Detects candidate tables in the text of one page.
pub trait TableExtractor {
    /// Returns every table detected on the page, in reading order.
    fn extract_tables(&self, page_text: &str, page_number: u32) -> Vec<RawTable>;
}

static CELL_GAP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\t+| {2,}").unwrap_or_else(|e| panic!("invalid cell gap regex: {e}"))
});

/// Single-cell lines that always sit outside a table.
static BOUNDARY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(tabella|figura|fonte|nota)\b")
        .unwrap_or_else(|e| panic!("invalid table boundary regex: {e}"))
});

/// Whitespace-aligned ("stream") table detection.
#[derive(Debug, Clone, Copy, Default)]
pub struct StreamExtractor;

impl StreamExtractor {
    fn split_cells(line: &str) -> Vec<String> {
        CELL_GAP
            .split(line.trim())
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_owned)
            .collect()
    }
}

impl TableExtractor for StreamExtractor {
    fn extract_tables(&self, page_text: &str, page_number: u32) -> Vec<RawTable> {
        let mut tables = Vec::new();
        // Single-cell lines outside any table, emitted as their own
        // candidates so captions keep their place in reading order.
        let mut text: Vec<Vec<String>> = Vec::new();
        let mut table: Vec<Vec<String>> = Vec::new();
        // Single-cell lines after the last multi-cell row of `table`.
        let mut trailing: Vec<Vec<String>> = Vec::new();

        let mut emit = |rows: &mut Vec<Vec<String>>| {
            if !rows.is_empty() {
                tables.push(RawTable {
                    rows: std::mem::take(rows),
                    page_number,
                });
            }
        };

        for line in page_text.lines().filter(|l| !l.trim().is_empty()) {
            let cells = Self::split_cells(line);

            if cells.len() > 1 {
                if table.is_empty() {
                    emit(&mut text);
                }
                table.append(&mut trailing);
                table.push(cells);
            } else if BOUNDARY.is_match(line.trim_start()) {
                emit(&mut table);
                text.append(&mut trailing);
                text.push(cells);
            } else if table.is_empty() {
                text.push(cells);
            } else {
                trailing.push(cells);
            }
        }

        emit(&mut table);
        text.append(&mut trailing);
        emit(&mut text);

        log::debug!(
            "Page {page_number}: {} candidate tables with widths {:?}",
            tables.len(),
            tables.iter().map(RawTable::column_count).collect::<Vec<_>>()
        );

        tables
    }
}

/// Runs `extractor` on a 1-based page of `doc`.
///
/// # Errors
///
/// Returns [`PdfError::Extraction`] if the page does not exist.
pub fn extract_page(
    extractor: &impl TableExtractor,
    doc: &PdfDocument,
    page_number: u32,
) -> Result<Vec<RawTable>, PdfError> {
    let text = doc.page(page_number).ok_or_else(|| {
        PdfError::Extraction(format!(
            "page {page_number} out of range (document has {} pages)",
            doc.page_count()
        ))
    })?;
    Ok(extractor.extract_tables(text, page_number))
}

/// Picks the table to use among the candidates of one page.
///
/// The first candidate is taken unless it has fewer than `expected`
/// columns, in which case the second is tried. Never falls back further.
///
/// # Errors
///
/// Returns [`PdfError::SchemaMismatch`] if neither of the first two
/// candidates is wide enough.
pub fn select_table(
    mut candidates: Vec<RawTable>,
    expected: usize,
    page_number: u32,
) -> Result<RawTable, PdfError> {
    candidates.truncate(2);

    let found = candidates
        .iter()
        .map(RawTable::column_count)
        .max()
        .unwrap_or(0);

    match candidates
        .into_iter()
        .enumerate()
        .find(|(_, t)| t.column_count() >= expected)
    {
        Some((index, table)) => {
            if index > 0 {
                log::info!("First table on page {page_number} too narrow, using the second");
            }
            Ok(table)
        }
        None => Err(PdfError::SchemaMismatch {
            page: page_number,
            expected,
            found,
        }),
    }
}
