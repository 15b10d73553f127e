//! Italian month names.
//!
//! Report file names embed their publication date as
//! `<day>-<month name>-<year>` with the month spelled out in Italian
//! (`19-gennaio-2022`). The table below replaces locale-dependent
//! `%B` parsing.

use chrono::NaiveDate;

use crate::ScrapeError;

const MONTHS: [&str; 12] = [
    "gennaio",
    "febbraio",
    "marzo",
    "aprile",
    "maggio",
    "giugno",
    "luglio",
    "agosto",
    "settembre",
    "ottobre",
    "novembre",
    "dicembre",
];

/// Returns the 1-based month number for an Italian month name, ignoring
/// case.
#[must_use]
pub fn month_number(name: &str) -> Option<u32> {
    let name = name.to_lowercase();
    MONTHS
        .iter()
        .position(|m| *m == name)
        .and_then(|i| u32::try_from(i + 1).ok())
}

/// Parses a `<day>-<month>-<year>` token such as `19-gennaio-2022`.
///
/// # Errors
///
/// Returns [`ScrapeError::Date`] if the token does not have three parts,
/// the month is not an Italian month name, or the day does not exist.
pub fn parse_italian_date(token: &str) -> Result<NaiveDate, ScrapeError> {
    let err = || ScrapeError::Date(token.to_owned());

    let parts: Vec<&str> = token.split('-').filter(|p| !p.is_empty()).collect();
    let [day, month, year] = parts.as_slice() else {
        return Err(err());
    };

    let day: u32 = day.parse().map_err(|_| err())?;
    let month = month_number(month).ok_or_else(err)?;
    let year: i32 = year.parse().map_err(|_| err())?;

    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(err)
}
