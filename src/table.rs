//! Publication tables: CSV I/O, merge, title dedup and per-year counts.

use crate::error::{Result, ScholarError};
use crate::record::{is_plausible_year, normalize_year, Publication};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::Path;
use tracing::{debug, info};

/// Header aliases accepted when reading, matched case-insensitively.
const TITLE_HEADERS: &[&str] = &["title"];
const YEAR_HEADERS: &[&str] = &["year", "pub_year"];
const AUTHOR_HEADERS: &[&str] = &["authors", "author"];
const VENUE_HEADERS: &[&str] = &["venue", "journal"];
const URL_HEADERS: &[&str] = &["url", "article_url", "link"];

/// Read a publication CSV written by this tool or by an earlier session.
///
/// Years are coerced with [`normalize_year`], so `2022.0` reads as `2022`.
pub fn read_csv(path: &Path) -> Result<Vec<Publication>> {
    if !path.exists() {
        return Err(ScholarError::NotFound(path.display().to_string()));
    }

    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;

    let headers = rdr.headers()?.clone();
    let column = |aliases: &[&str]| {
        headers
            .iter()
            .position(|h| aliases.iter().any(|a| h.trim().eq_ignore_ascii_case(a)))
    };

    let title_col = column(TITLE_HEADERS).ok_or_else(|| {
        ScholarError::Validation(format!("{} has no Title column", path.display()))
    })?;
    let year_col = column(YEAR_HEADERS);
    let author_col = column(AUTHOR_HEADERS);
    let venue_col = column(VENUE_HEADERS);
    let url_col = column(URL_HEADERS);

    let mut publications = Vec::new();
    for record in rdr.records() {
        let record = record?;
        let cell = |idx: Option<usize>| {
            idx.and_then(|i| record.get(i))
                .unwrap_or("")
                .to_string()
        };

        publications.push(Publication {
            title: cell(Some(title_col)),
            year: year_col
                .and_then(|i| record.get(i))
                .and_then(normalize_year),
            authors: cell(author_col),
            venue: cell(venue_col),
            url: cell(url_col),
        });
    }

    info!(path = %path.display(), rows = publications.len(), "Read publication CSV");
    Ok(publications)
}

/// Write publications with a `Title,Year,Authors,Venue,URL` header.
///
/// The header is written even when the table is empty.
pub fn write_csv(path: &Path, publications: &[Publication]) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)?;

    wtr.write_record(crate::record::PUBLICATION_COLUMNS)?;
    for publication in publications {
        wtr.serialize(publication)?;
    }

    wtr.flush()?;
    info!(path = %path.display(), rows = publications.len(), "Wrote publication CSV");
    Ok(())
}

/// Drop every publication whose title was already seen.
///
/// Titles are compared as exact, case-sensitive strings. The first occurrence
/// wins and the relative order of survivors is preserved.
pub fn dedup_by_title(publications: Vec<Publication>) -> Vec<Publication> {
    let before = publications.len();
    let mut seen = HashSet::with_capacity(before);
    let unique: Vec<Publication> = publications
        .into_iter()
        .filter(|p| seen.insert(p.title.clone()))
        .collect();

    debug!(before, after = unique.len(), "Deduplicated by title");
    unique
}

/// Concatenate two tables (`first` before `second`) and dedup by title.
pub fn merge_unique(first: Vec<Publication>, second: Vec<Publication>) -> Vec<Publication> {
    let mut combined = first;
    combined.extend(second);
    dedup_by_title(combined)
}

/// Number of publications per year, plus the rows with no usable year.
///
/// A year outside four digits counts as unknown, so the dense year span stays
/// bounded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct YearCounts {
    by_year: BTreeMap<i32, usize>,
    unknown: usize,
}

impl YearCounts {
    /// Count publications by year.
    pub fn from_publications(publications: &[Publication]) -> Self {
        let mut counts = Self::default();
        for publication in publications {
            match publication.year.filter(|y| is_plausible_year(*y)) {
                Some(year) => *counts.by_year.entry(year).or_insert(0) += 1,
                None => counts.unknown += 1,
            }
        }
        counts
    }

    /// Known years in ascending order with their counts.
    pub fn years(&self) -> impl Iterator<Item = (i32, usize)> + '_ {
        self.by_year.iter().map(|(y, c)| (*y, *c))
    }

    /// Count for one year (zero when absent).
    pub fn get(&self, year: i32) -> usize {
        self.by_year.get(&year).copied().unwrap_or(0)
    }

    /// Rows with a missing year.
    pub fn unknown(&self) -> usize {
        self.unknown
    }

    /// Earliest and latest known year.
    pub fn year_range(&self) -> Option<(i32, i32)> {
        let first = self.by_year.keys().next()?;
        let last = self.by_year.keys().next_back()?;
        Some((*first, *last))
    }

    /// Every year from the earliest to the latest, gaps filled with zero.
    pub fn dense(&self) -> Vec<(i32, usize)> {
        match self.year_range() {
            Some((first, last)) => (first..=last).map(|y| (y, self.get(y))).collect(),
            None => Vec::new(),
        }
    }

    /// Sum of all counts, including unknown years.
    pub fn total(&self) -> usize {
        self.by_year.values().sum::<usize>() + self.unknown
    }

    pub fn is_empty(&self) -> bool {
        self.by_year.is_empty()
    }
}

impl fmt::Display for YearCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Number of publications per year:")?;
        for (year, count) in self.years() {
            writeln!(f, "{}: {}", year, count)?;
        }
        if self.unknown > 0 {
            writeln!(f, "Unknown: {}", self.unknown)?;
        }
        write!(f, "Total number of publications found: {}", self.total())
    }
}
