#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Table location and extraction for ISS bulletin PDFs.
//!
//! The bulletins publish their vaccination-status tables without ruling,
//! so extraction works on the page text produced by [`pdf_extract`]:
//! [`locate`] finds the page(s) whose text matches a caption, and
//! [`extract`] splits that page into whitespace-aligned candidate tables
//! and picks the one wide enough to use.

pub mod extract;
pub mod locate;

/// Errors specific to PDF table extraction.
#[derive(Debug, thiserror::Error)]
pub enum PdfError {
    /// PDF text extraction failed.
    #[error("PDF extraction error: {0}")]
    Extraction(String),

    /// A caption pattern failed to compile.
    #[error("Invalid caption pattern: {0}")]
    Regex(#[from] regex::Error),

    /// No page matched any of the caption patterns.
    #[error("No page matches any of the captions [{captions}]")]
    NotFound {
        /// The patterns that were tried, comma separated.
        captions: String,
    },

    /// Neither candidate table had enough columns.
    #[error(
        "Cannot extract table on page {page}: expected at least {expected} columns, found {found}"
    )]
    SchemaMismatch {
        /// 1-based page number.
        page: u32,
        /// Columns the schema needs.
        expected: usize,
        /// Widest candidate that was considered.
        found: usize,
    },
}

/// The text of a PDF, one entry per page.
#[derive(Debug, Clone, Default)]
pub struct PdfDocument {
    pages: Vec<String>,
}

impl PdfDocument {
    /// Extracts the text of every page of an in-memory PDF.
    ///
    /// # Errors
    ///
    /// Returns [`PdfError::Extraction`] if the bytes are not a readable
    /// PDF.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PdfError> {
        let pages = pdf_extract::extract_text_from_mem_by_pages(bytes)
            .map_err(|e| PdfError::Extraction(format!("failed to extract text from PDF: {e}")))?;

        log::debug!(
            "Extracted {} pages ({} characters) of text",
            pages.len(),
            pages.iter().map(String::len).sum::<usize>()
        );

        Ok(Self { pages })
    }

    /// Wraps already extracted page texts.
    #[must_use]
    pub const fn from_pages(pages: Vec<String>) -> Self {
        Self { pages }
    }

    /// Number of pages.
    #[must_use]
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Text of a 1-based page.
    #[must_use]
    pub fn page(&self, page_number: u32) -> Option<&str> {
        let index = usize::try_from(page_number).ok()?.checked_sub(1)?;
        self.pages.get(index).map(String::as_str)
    }

    /// Iterates `(page_number, text)` pairs with 1-based page numbers.
    pub fn pages(&self) -> impl Iterator<Item = (u32, &str)> + '_ {
        (1_u32..).zip(self.pages.iter().map(String::as_str))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pages_are_one_based() {
        let doc = PdfDocument::from_pages(vec!["first".to_owned(), "second".to_owned()]);
        assert_eq!(doc.page_count(), 2);
        assert_eq!(doc.page(1), Some("first"));
        assert_eq!(doc.page(2), Some("second"));
        assert_eq!(doc.page(0), None);
        assert_eq!(doc.page(3), None);

        let numbers: Vec<u32> = doc.pages().map(|(n, _)| n).collect();
        assert_eq!(numbers, vec![1, 2]);
    }

    #[test]
    fn garbage_bytes_are_an_extraction_error() {
        assert!(matches!(
            PdfDocument::from_bytes(b"definitely not a pdf"),
            Err(PdfError::Extraction(_))
        ));
    }
}
