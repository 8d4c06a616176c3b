//! Scrape and merge pipelines.
//!
//! A scrape session is: acquire, merge with a previous session's CSV when
//! resuming, dedup by title, save CSV, count by year, save plot. The merge
//! pipeline does the same from two existing CSVs.

use crate::acquisition::{Scraper, SearchOutcome, Source};
use crate::error::Result;
use crate::output::{merged_output_paths, unique_plot_path, unique_results_csv_path};
use crate::plot::save_year_counts_plot;
use crate::record::Publication;
use crate::scholar_api::QueryOptions;
use crate::scholar_web::WebOptions;
use crate::table::{dedup_by_title, merge_unique, read_csv, write_csv, YearCounts};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Everything a session needs, collected from the command line
#[derive(Debug, Clone)]
pub struct Settings {
    pub source: Source,
    /// Directory for result CSVs
    pub results_dir: PathBuf,
    /// Directory for SVG plots
    pub plots_dir: PathBuf,
    /// Previous session to merge new results into
    pub resume_from_csv: Option<PathBuf>,
    pub api: QueryOptions,
    pub web: WebOptions,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            source: Source::default(),
            results_dir: Path::new("..").join("results").join("csv"),
            plots_dir: Path::new("..").join("results").join("plots"),
            resume_from_csv: None,
            api: QueryOptions::default(),
            web: WebOptions::default(),
        }
    }
}

/// What a finished session produced
#[derive(Debug)]
pub struct SessionReport {
    /// Rows returned by the scraper in this session
    pub scraped: usize,
    /// Rows carried over from `resume_from_csv`
    pub carried_over: usize,
    pub publications: Vec<Publication>,
    pub counts: YearCounts,
    pub csv_path: Option<PathBuf>,
    pub plot_path: Option<PathBuf>,
    /// Page to pass as `--start_page` to continue an interrupted crawl
    pub resume_page: Option<u32>,
}

/// Run one query and persist its results.
///
/// The previous session's CSV is read before any request is made, so a bad
/// `resume_from_csv` path fails fast instead of after a long crawl.
pub async fn run_query(scraper: &Scraper, query: &str, settings: &Settings) -> Result<SessionReport> {
    let prior = load_previous_session(settings)?;
    info!(query, source = %scraper.source(), "Starting scrape session");
    let outcome = scraper.search(query).await?;
    finish_session(outcome, prior, query, settings)
}

/// Rows of the session named by `resume_from_csv`, if any.
pub fn load_previous_session(settings: &Settings) -> Result<Option<Vec<Publication>>> {
    let Some(previous) = &settings.resume_from_csv else {
        return Ok(None);
    };
    let prior = read_csv(previous)?;
    info!(path = %previous.display(), rows = prior.len(), "Resuming from previous session");
    Ok(Some(prior))
}

/// Everything after acquisition: merge, dedup, save, count, plot.
///
/// `prior` rows come first, so they win over re-scraped duplicates.
pub fn finish_session(
    outcome: SearchOutcome,
    prior: Option<Vec<Publication>>,
    query: &str,
    settings: &Settings,
) -> Result<SessionReport> {
    let scraped = outcome.publications.len();
    let interrupted = outcome.interrupted();

    let (publications, carried_over) = match prior {
        Some(prior) => {
            let carried = prior.len();
            (merge_unique(prior, outcome.publications), carried)
        }
        None => (dedup_by_title(outcome.publications), 0),
    };

    let counts = YearCounts::from_publications(&publications);

    let csv_path = if publications.is_empty() {
        warn!(query, "No publications to save");
        None
    } else {
        let path = unique_results_csv_path(&settings.results_dir, query);
        write_csv(&path, &publications)?;
        Some(path)
    };

    let plot_path = if counts.is_empty() {
        warn!(query, "No dated publications, skipping plot");
        None
    } else {
        let path = unique_plot_path(&settings.plots_dir, query);
        save_year_counts_plot(&counts, &path)?;
        Some(path)
    };

    if interrupted {
        warn!(
            resume_page = ?outcome.resume_page,
            csv = ?csv_path,
            "Crawl interrupted; rerun with --start_page and --resume_from_csv to continue"
        );
    }

    Ok(SessionReport {
        scraped,
        carried_over,
        publications,
        counts,
        csv_path,
        plot_path,
        resume_page: outcome.resume_page,
    })
}

/// What the merge pipeline produced
#[derive(Debug)]
pub struct MergeReport {
    pub input_rows: usize,
    pub publications: Vec<Publication>,
    pub counts: YearCounts,
    pub csv_path: PathBuf,
    pub plot_path: Option<PathBuf>,
}

/// Merge two session CSVs into one deduplicated table with a year plot.
pub fn run_merge(first: &Path, second: &Path, results_dir: &Path, plots_dir: &Path) -> Result<MergeReport> {
    let a = read_csv(first)?;
    let b = read_csv(second)?;
    let input_rows = a.len() + b.len();

    let publications = merge_unique(a, b);
    info!(
        input_rows,
        unique = publications.len(),
        "Merged publication tables"
    );

    let (csv_path, plot_path) = merged_output_paths(results_dir, plots_dir, first, second);
    write_csv(&csv_path, &publications)?;

    let counts = YearCounts::from_publications(&publications);
    let plot_path = if counts.is_empty() {
        warn!("No dated publications, skipping plot");
        None
    } else {
        save_year_counts_plot(&counts, &plot_path)?;
        Some(plot_path)
    };

    Ok(MergeReport {
        input_rows,
        publications,
        counts,
        csv_path,
        plot_path,
    })
}
