//! Output directories and file naming.

use crate::error::{Result, ScholarError};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::info;

/// Prefix of per-query result CSVs
pub const RESULTS_PREFIX: &str = "publications_data";

/// Number of query words used in file names
const SLUG_WORDS: usize = 3;

/// Create `dir` (and parents) when missing.
pub fn ensure_directory_exists(dir: &Path) -> Result<PathBuf> {
    if dir.exists() {
        if !dir.is_dir() {
            return Err(ScholarError::Config(format!(
                "{} exists and is not a directory",
                dir.display()
            )));
        }
        info!(dir = %dir.display(), "Directory found");
    } else {
        std::fs::create_dir_all(dir)?;
        info!(dir = %dir.display(), "Target directory not found, created it");
    }
    Ok(dir.to_path_buf())
}

fn non_word() -> &'static Regex {
    static NON_WORD: OnceLock<Regex> = OnceLock::new();
    NON_WORD.get_or_init(|| Regex::new(r"[^\w\s]").expect("static slug regex"))
}

/// File-name fragment for a query: its first three words joined by `_`,
/// punctuation removed, lowercased.
///
/// `("Knowledge Gap" AND x)` becomes `knowledge_gap_and`.
pub fn query_slug(query: &str) -> String {
    let joined = query
        .split_whitespace()
        .take(SLUG_WORDS)
        .collect::<Vec<_>>()
        .join("_");
    non_word().replace_all(&joined, "").to_lowercase()
}

/// First candidate that does not exist yet.
fn first_unused(dir: &Path, mut candidate: impl FnMut(usize) -> String) -> PathBuf {
    let mut path = dir.join(candidate(0));
    let mut counter = 1;
    while path.exists() {
        path = dir.join(candidate(counter));
        counter += 1;
    }
    path
}

/// `publications_data_<slug>.csv`, or `publications_data_<slug>_<n>.csv` when taken.
pub fn unique_results_csv_path(dir: &Path, query: &str) -> PathBuf {
    let slug = query_slug(query);
    first_unused(dir, |n| match n {
        0 => format!("{}_{}.csv", RESULTS_PREFIX, slug),
        n => format!("{}_{}_{}.csv", RESULTS_PREFIX, slug, n),
    })
}

/// `<slug>_year_counts_plot.svg`, or `<slug>_<n>_year_counts_plot.svg` when taken.
pub fn unique_plot_path(dir: &Path, query: &str) -> PathBuf {
    let slug = query_slug(query);
    first_unused(dir, |n| match n {
        0 => format!("{}_year_counts_plot.svg", slug),
        n => format!("{}_{}_year_counts_plot.svg", slug, n),
    })
}

/// Output paths of the merge command for two input CSVs.
///
/// Returns `(merged_<a>_and_<b>.csv, merged_<a>_and_<b>_year_counts.svg)`.
pub fn merged_output_paths(
    csv_dir: &Path,
    plot_dir: &Path,
    first: &Path,
    second: &Path,
) -> (PathBuf, PathBuf) {
    let stem = |p: &Path| {
        p.file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    };
    let base = format!("merged_{}_and_{}", stem(first), stem(second));
    (
        csv_dir.join(format!("{}.csv", base)),
        plot_dir.join(format!("{}_year_counts.svg", base)),
    )
}
