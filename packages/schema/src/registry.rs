//! Schema registry: loads every layout revision from embedded TOML.
//!
//! Each `.toml` file in `packages/schema/schemas/` is baked into the binary
//! at compile time via [`include_str!`]. Supporting a new bulletin layout
//! is a matter of adding a TOML file, closing the previous revision's
//! `valid_until`, and listing the file below.

use std::sync::LazyLock;

use chrono::NaiveDate;

use crate::{SchemaVersion, parse_schema_toml};

/// TOML definitions embedded at compile time, oldest first.
const SCHEMA_TOMLS: &[(&str, &str)] = &[
    ("two_dose", include_str!("../schemas/two_dose.toml")),
    (
        "recent_old_split",
        include_str!("../schemas/recent_old_split.toml"),
    ),
    ("leading_digit", include_str!("../schemas/leading_digit.toml")),
    (
        "split_population",
        include_str!("../schemas/split_population.toml"),
    ),
    (
        "per_event_pages",
        include_str!("../schemas/per_event_pages.toml"),
    ),
    (
        "second_booster",
        include_str!("../schemas/second_booster.toml"),
    ),
];

static SCHEMAS: LazyLock<Vec<SchemaVersion>> = LazyLock::new(|| {
    SCHEMA_TOMLS
        .iter()
        .map(|(name, toml)| {
            parse_schema_toml(toml).unwrap_or_else(|e| panic!("Failed to parse {name}.toml: {e}"))
        })
        .collect()
});

/// Returns every known layout revision, oldest first.
///
/// # Panics
///
/// Panics if any embedded TOML is malformed (the configs are compiled in,
/// so the registry tests catch this before release).
#[must_use]
pub fn all_schemas() -> &'static [SchemaVersion] {
    &SCHEMAS
}

/// Returns the layout revision in force on `date`, if any.
#[must_use]
pub fn schema_for_date(date: NaiveDate) -> Option<&'static SchemaVersion> {
    let schema = all_schemas().iter().find(|s| s.contains(date));
    if let Some(schema) = schema {
        log::debug!("Report dated {date} uses schema '{}'", schema.id);
    }
    schema
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn loads_all_schemas() {
        assert_eq!(all_schemas().len(), SCHEMA_TOMLS.len());
    }

    #[test]
    fn schema_ids_match_file_names() {
        for ((name, _), schema) in SCHEMA_TOMLS.iter().zip(all_schemas()) {
            assert_eq!(*name, schema.id);
        }
    }

    #[test]
    fn windows_are_contiguous_and_ordered() {
        let schemas = all_schemas();
        for pair in schemas.windows(2) {
            assert_eq!(
                pair[0].valid_until,
                Some(pair[1].valid_from),
                "gap or overlap between '{}' and '{}'",
                pair[0].id,
                pair[1].id
            );
        }
        assert!(schemas.last().unwrap().valid_until.is_none());
    }

    #[test]
    fn every_date_maps_to_at_most_one_schema() {
        let mut day = date(2021, 7, 1);
        while day < date(2022, 7, 1) {
            let matching = all_schemas().iter().filter(|s| s.contains(day)).count();
            assert!(matching <= 1, "{day} matches {matching} schemas");
            day = day.succ_opt().unwrap();
        }
    }

    #[test]
    fn selects_schema_by_publication_date() {
        assert!(schema_for_date(date(2021, 7, 13)).is_none());
        assert_eq!(schema_for_date(date(2021, 7, 14)).unwrap().id, "two_dose");
        assert_eq!(
            schema_for_date(date(2021, 11, 10)).unwrap().id,
            "recent_old_split"
        );
        assert_eq!(
            schema_for_date(date(2022, 1, 12)).unwrap().id,
            "split_population"
        );
        assert_eq!(
            schema_for_date(date(2022, 1, 19)).unwrap().id,
            "per_event_pages"
        );
        assert_eq!(
            schema_for_date(date(2023, 1, 4)).unwrap().id,
            "second_booster"
        );
    }

    #[test]
    fn multi_page_layouts_use_distinct_occurrences() {
        for schema in all_schemas() {
            let mut seen: Vec<(&[String], usize)> = Vec::new();
            for table in &schema.tables {
                let key = (table.captions.as_slice(), table.occurrence);
                assert!(
                    !seen.contains(&key),
                    "schema '{}' extracts the same page twice",
                    schema.id
                );
                seen.push(key);
            }
        }
    }
}
