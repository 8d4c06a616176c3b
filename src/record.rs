//! Publication record shared by both acquisition paths and the CSV layer.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Years outside this range are treated as missing
pub const YEAR_RANGE: std::ops::RangeInclusive<i32> = 1000..=9999;

/// CSV column order for publication tables
pub const PUBLICATION_COLUMNS: &[&str] = &["Title", "Year", "Authors", "Venue", "URL"];

/// A single publication scraped from Google Scholar.
///
/// `title` is the dedup key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Publication {
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "Year")]
    pub year: Option<i32>,
    #[serde(rename = "Authors")]
    pub authors: String,
    #[serde(rename = "Venue")]
    pub venue: String,
    #[serde(rename = "URL")]
    pub url: String,
}

impl Publication {
    /// Create a publication with only a title and year.
    pub fn new(title: impl Into<String>, year: Option<i32>) -> Self {
        Self {
            title: title.into(),
            year,
            ..Default::default()
        }
    }
}

fn year_regex() -> &'static Regex {
    static YEAR: OnceLock<Regex> = OnceLock::new();
    YEAR.get_or_init(|| Regex::new(r"\b(19|20)\d{2}\b").expect("static year regex"))
}

/// Find the first four-digit year (1900-2099) in free text.
///
/// Used on the Scholar byline, e.g. `"J Doe, A Roe - Nature, 2021 - nature.com"`.
pub fn extract_year(text: &str) -> Option<i32> {
    year_regex()
        .find(text)
        .and_then(|m| m.as_str().parse().ok())
}

/// Byte range of the first year match, for splitting venue from year.
pub(crate) fn find_year_span(text: &str) -> Option<(usize, usize)> {
    year_regex().find(text).map(|m| (m.start(), m.end()))
}

/// Coerce a raw year cell into an integer year.
///
/// A cell is numeric when, after dropping at most one `.`, it is made of ASCII
/// digits only. Numeric cells are parsed as floats and truncated, so `"2022.0"`
/// becomes `2022`. Everything else (`""`, `"Unknown"`, `"n.d."`, `"-5"`) is
/// treated as missing, and so is any value that is not a four-digit year.
pub fn normalize_year(raw: &str) -> Option<i32> {
    let raw = raw.trim();
    let digits = raw.replacen('.', "", 1);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let value: f64 = raw.parse().ok()?;
    if !value.is_finite() || value > i32::MAX as f64 {
        return None;
    }
    Some(value.trunc() as i32).filter(|y| is_plausible_year(*y))
}

/// Four-digit year check shared by parsing and counting.
pub fn is_plausible_year(year: i32) -> bool {
    YEAR_RANGE.contains(&year)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_year_float_strings() {
        assert_eq!(normalize_year("2022.0"), Some(2022));
        assert_eq!(normalize_year("2019"), Some(2019));
        assert_eq!(normalize_year(" 2001.7 "), Some(2001));
        assert_eq!(normalize_year("2020."), Some(2020));
    }

    #[test]
    fn test_normalize_year_missing() {
        assert_eq!(normalize_year(""), None);
        assert_eq!(normalize_year("Unknown"), None);
        assert_eq!(normalize_year("n.d."), None);
        assert_eq!(normalize_year("20.20.1"), None);
        assert_eq!(normalize_year("-2020"), None);
        assert_eq!(normalize_year("."), None);
    }

    #[test]
    fn test_normalize_year_rejects_non_four_digit() {
        assert_eq!(normalize_year("5.0"), None);
        assert_eq!(normalize_year("99999"), None);
        assert_eq!(normalize_year("2147483647"), None);
        assert_eq!(normalize_year("999"), None);
        assert_eq!(normalize_year("1000"), Some(1000));
        assert_eq!(normalize_year("9999.9"), Some(9999));
    }

    #[test]
    fn test_extract_year() {
        assert_eq!(
            extract_year("J Doe, A Roe - Nature Communications, 2021 - nature.com"),
            Some(2021)
        );
        assert_eq!(extract_year("arXiv preprint arXiv:12019.00001"), None);
        assert_eq!(extract_year("no year here"), None);
        assert_eq!(extract_year("1899 and 1999"), Some(1999));
    }
}
