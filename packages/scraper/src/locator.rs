//! Report locator.
//!
//! Finds bulletin links on the index page, dates them from the token
//! embedded in their file name and keeps the ones published inside
//! `[cutoff, end)`, most recent first.

use std::sync::LazyLock;

use chrono::NaiveDate;
use iss_bulletin_models::Report;
use regex::Regex;
use reqwest::{Client, Url};
use scraper::{Html, Selector};

use crate::{ScrapeError, fetch, months::parse_italian_date};

static DATE_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d+[a-zA-Z-]+\d+").unwrap_or_else(|e| panic!("invalid date token regex: {e}"))
});

/// Parses the publication date embedded in a report URL.
///
/// Every `\d+[a-zA-Z-]+\d+` token is tried in order and the first one
/// that reads as `<day>-<italian month>-<year>` wins.
///
/// # Errors
///
/// Returns [`ScrapeError::Date`] if no token parses.
pub fn report_date_from_url(url: &str) -> Result<NaiveDate, ScrapeError> {
    DATE_TOKEN
        .find_iter(url)
        .find_map(|m| parse_italian_date(m.as_str()).ok())
        .ok_or_else(|| ScrapeError::Date(url.to_owned()))
}

/// Extracts every report link from the index page HTML.
///
/// Anchors whose `href` contains `pattern` are resolved against
/// `base_url` and dated. Links without a readable date are skipped.
///
/// # Errors
///
/// Returns [`ScrapeError::Url`] if `base_url` is not a valid URL.
pub fn extract_report_links(
    html: &str,
    base_url: &str,
    pattern: &str,
) -> Result<Vec<Report>, ScrapeError> {
    let base = Url::parse(base_url).map_err(|e| ScrapeError::Url {
        url: base_url.to_owned(),
        message: e.to_string(),
    })?;
    let selector = Selector::parse("a[href]")
        .map_err(|e| ScrapeError::Parse(format!("invalid anchor selector: {e}")))?;

    let document = Html::parse_document(html);
    let mut reports = Vec::new();

    for href in document
        .select(&selector)
        .filter_map(|a| a.value().attr("href"))
        .filter(|href| href.contains(pattern))
    {
        let url = match base.join(href) {
            Ok(url) => url,
            Err(e) => {
                log::debug!("Skipping unresolvable link '{href}': {e}");
                continue;
            }
        };
        match report_date_from_url(href) {
            Ok(published) => reports.push(Report {
                url: url.to_string(),
                published,
            }),
            Err(e) => log::debug!("Skipping link without report date: {e}"),
        }
    }

    Ok(reports)
}

/// Keeps reports published in `[cutoff, end)` and orders them most recent
/// first. Links pointing at the same URL are collapsed.
#[must_use]
pub fn filter_window(
    mut reports: Vec<Report>,
    cutoff: NaiveDate,
    end: Option<NaiveDate>,
) -> Vec<Report> {
    reports.retain(|r| r.published >= cutoff && end.is_none_or(|end| r.published < end));
    reports.sort_by(|a, b| {
        b.published
            .cmp(&a.published)
            .then_with(|| a.url.cmp(&b.url))
    });
    reports.dedup_by(|a, b| a.url == b.url);
    reports
}

/// Fetches the index page and returns the candidate reports in
/// `[cutoff, end)`, most recent first. An empty result is not an error.
///
/// # Errors
///
/// Returns [`ScrapeError`] if the index page cannot be fetched or its URL
/// is invalid.
pub async fn locate_reports(
    client: &Client,
    index_url: &str,
    pattern: &str,
    cutoff: NaiveDate,
    end: Option<NaiveDate>,
) -> Result<Vec<Report>, ScrapeError> {
    let html = fetch::fetch_text(client, index_url).await?;
    let links = extract_report_links(&html, index_url, pattern)?;
    let found = links.len();
    let reports = filter_window(links, cutoff, end);

    log::info!(
        "Found {found} bulletin links, {} published since {cutoff}",
        reports.len()
    );

    Ok(reports)
}
