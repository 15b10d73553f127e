//! Table locator.
//!
//! Caption wording and numbering drift between bulletin revisions, so a
//! table is described by a ranked list of caption patterns. Patterns are
//! tried in priority order; within one pattern the first matching page
//! wins.

use regex::{Regex, RegexBuilder};

use crate::{PdfDocument, PdfError};

fn compile(captions: &[String]) -> Result<Vec<Regex>, PdfError> {
    captions
        .iter()
        .map(|c| {
            RegexBuilder::new(c)
                .case_insensitive(true)
                .build()
                .map_err(PdfError::from)
        })
        .collect()
}

fn pages_matching<'a>(doc: &'a PdfDocument, pattern: &'a Regex) -> impl Iterator<Item = u32> + 'a {
    doc.pages()
        .filter(|(_, text)| pattern.is_match(text))
        .map(|(n, _)| n)
}

/// Returns the 1-based page of the first page matching the
/// highest-priority caption that matches anything, or `None`.
///
/// # Errors
///
/// Returns [`PdfError::Regex`] if a caption is not a valid regex.
pub fn locate_page(doc: &PdfDocument, captions: &[String]) -> Result<Option<u32>, PdfError> {
    for (caption, pattern) in captions.iter().zip(compile(captions)?) {
        if let Some(page) = pages_matching(doc, &pattern).next() {
            log::debug!("Caption '{caption}' found on page {page}");
            return Ok(Some(page));
        }
    }
    Ok(None)
}

/// Returns every page matching the highest-priority caption that matches
/// anything. Used for layouts spreading one logical table over several
/// pages with the same caption.
///
/// # Errors
///
/// Returns [`PdfError::Regex`] if a caption is not a valid regex.
pub fn locate_pages(doc: &PdfDocument, captions: &[String]) -> Result<Vec<u32>, PdfError> {
    for (caption, pattern) in captions.iter().zip(compile(captions)?) {
        let pages: Vec<u32> = pages_matching(doc, &pattern).collect();
        if !pages.is_empty() {
            log::debug!("Caption '{caption}' found on pages {pages:?}");
            return Ok(pages);
        }
    }
    Ok(Vec::new())
}

/// Returns the `occurrence`-th (0-based) page matching `captions`.
///
/// # Errors
///
/// Returns [`PdfError::NotFound`] if fewer than `occurrence + 1` pages
/// match, or [`PdfError::Regex`] for an invalid caption.
pub fn locate_occurrence(
    doc: &PdfDocument,
    captions: &[String],
    occurrence: usize,
) -> Result<u32, PdfError> {
    let found = if occurrence == 0 {
        locate_page(doc, captions)?
    } else {
        locate_pages(doc, captions)?.get(occurrence).copied()
    };

    found.ok_or_else(|| PdfError::NotFound {
        captions: captions.join(", "),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(pages: &[&str]) -> PdfDocument {
        PdfDocument::from_pages(pages.iter().map(|&p| p.to_owned()).collect())
    }

    fn captions(list: &[&str]) -> Vec<String> {
        list.iter().map(|&c| c.to_owned()).collect()
    }

    #[test]
    fn finds_first_matching_page_case_insensitively() {
        let doc = doc(&[
            "Sommario",
            "Tabella 3 – Numero di casi di COVID-19 per stato vaccinale",
            "TABELLA 3 – NUMERO DI CASI DI COVID-19 (segue)",
        ]);
        let page = locate_page(&doc, &captions(&["TABELLA [0-9]+ [–-] NUMERO DI CASI"])).unwrap();
        assert_eq!(page, Some(2));
    }

    #[test]
    fn higher_priority_caption_wins_over_earlier_page() {
        let doc = doc(&[
            "POPOLAZIONE ITALIANA per stato vaccinale",
            "TABELLA 4 - POPOLAZIONE ITALIANA",
        ]);
        let page = locate_page(
            &doc,
            &captions(&["TABELLA [0-9]+ [–-] POPOLAZIONE", "POPOLAZIONE ITALIANA"]),
        )
        .unwrap();
        assert_eq!(page, Some(2));
    }

    #[test]
    fn falls_back_to_lower_priority_caption() {
        let doc = doc(&["intro", "popolazione italiana e stato vaccinale"]);
        let page = locate_page(
            &doc,
            &captions(&["TABELLA [0-9]+ [–-] POPOLAZIONE", "POPOLAZIONE ITALIANA.*STATO"]),
        )
        .unwrap();
        assert_eq!(page, Some(2));
    }

    #[test]
    fn missing_caption_is_not_found() {
        let doc = doc(&["nothing here"]);
        assert_eq!(locate_page(&doc, &captions(&["TABELLA 9"])).unwrap(), None);
        assert!(matches!(
            locate_occurrence(&doc, &captions(&["TABELLA 9"]), 0),
            Err(PdfError::NotFound { .. })
        ));
    }

    #[test]
    fn multi_page_layouts() {
        let doc = doc(&[
            "intro",
            "TABELLA 4A - POPOLAZIONE ITALIANA",
            "TABELLA 4B - POPOLAZIONE ITALIANA",
            "grafici",
            "TABELLA 5C - POPOLAZIONE ITALIANA",
        ]);
        let caption = captions(&["TABELLA [4-5][A-C] [–-] POPOLAZIONE ITALIANA"]);
        assert_eq!(locate_pages(&doc, &caption).unwrap(), vec![2, 3, 5]);
        assert_eq!(locate_occurrence(&doc, &caption, 0).unwrap(), 2);
        assert_eq!(locate_occurrence(&doc, &caption, 2).unwrap(), 5);
        assert!(locate_occurrence(&doc, &caption, 3).is_err());
    }

    #[test]
    fn invalid_caption_is_a_regex_error() {
        let doc = doc(&["x"]);
        assert!(matches!(
            locate_page(&doc, &captions(&["TABELLA ["])),
            Err(PdfError::Regex(_))
        ));
    }
}
