//! scholarscrape - Google Scholar publication scraper
//!
//! Scrapes publication metadata from Google Scholar, saves it as CSV, and
//! plots publications per year. Sessions can be resumed and merged.
//!
//! ## Usage
//!
//! ### Interactive
//! ```bash
//! scholarscrape --CLI --scholar_API
//! ```
//!
//! ### One query, continuing an interrupted crawl
//! ```bash
//! scholarscrape --query '"neuro-symbolic" OR "neurosymbolic"' --start_page 12 \
//!     --resume_from_csv ../results/csv/publications_data_neurosymbolic_or_neurosymbolic.csv
//! ```
//!
//! ### Merge two sessions
//! ```bash
//! scholarscrape merge run_a.csv run_b.csv
//! ```

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use scholarscrape::acquisition::{Scraper, Source};
use scholarscrape::cookies::CookieManager;
use scholarscrape::output::ensure_directory_exists;
use scholarscrape::scholar_api::QueryOptions;
use scholarscrape::scholar_web::WebOptions;
use scholarscrape::session::{run_merge, run_query, SessionReport, Settings};
use scholarscrape::webdriver::DEFAULT_WEBDRIVER_URL;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info, Level};
use tracing_subscriber::{fmt, EnvFilter};

// ============================================================================
// CLI Definition
// ============================================================================

/// Search Google Scholar in CLI or guided mode, then save, merge and plot results
#[derive(Parser)]
#[command(name = "scholarscrape")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Directory to output the results CSV to
    #[arg(long = "results_location", global = true, default_value = "../results/csv")]
    results_location: PathBuf,

    /// Directory to save plots to
    #[arg(long = "plots_location", global = true, default_value = "../results/plots")]
    plots_location: PathBuf,

    #[command(flatten)]
    scrape: ScrapeArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args)]
struct ScrapeArgs {
    /// Run in command line mode: prompt for queries until 'exit'
    #[arg(long = "CLI", conflicts_with = "gui")]
    cli: bool,

    /// Run in guided mode: a short form for query and source
    #[arg(long = "GUI")]
    gui: bool,

    /// Fetch result pages over HTTP (default)
    #[arg(long = "scholar_API", conflicts_with = "scholar_web")]
    scholar_api: bool,

    /// Drive a Chrome browser over WebDriver
    #[arg(long = "scholar_Web")]
    scholar_web: bool,

    /// Run a single query and exit. Boolean syntax works, e.g. X AND (A OR B)
    #[arg(long)]
    query: Option<String>,

    /// First result page to fetch (1-indexed)
    #[arg(long = "start_page", default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    start_page: u32,

    /// Stop after this many pages
    #[arg(long = "max_pages")]
    max_pages: Option<u32>,

    /// Merge new results into this CSV from an earlier session
    #[arg(long = "resume_from_csv")]
    resume_from_csv: Option<PathBuf>,

    /// Seconds the browser waits for a result page before abandoning the search
    #[arg(long = "wait_time", default_value_t = 20)]
    wait_time: u64,

    /// Seconds to sleep between page requests (random jitter is added)
    #[arg(long, default_value_t = 2.0)]
    delay: f64,

    /// Retries of a rate-limited page
    #[arg(long = "max_retries", default_value_t = 3)]
    max_retries: u32,

    /// Only results from this year onwards
    #[arg(long = "year_low")]
    year_low: Option<i32>,

    /// Only results up to this year
    #[arg(long = "year_high")]
    year_high: Option<i32>,

    /// WebDriver endpoint (chromedriver)
    #[arg(long = "webdriver_url", default_value = DEFAULT_WEBDRIVER_URL)]
    webdriver_url: String,

    /// Run Chrome headless
    #[arg(long)]
    headless: bool,

    /// Proxy URL (e.g., http://127.0.0.1:7890)
    #[arg(long)]
    proxy: Option<String>,

    /// Mirror site URL
    #[arg(long)]
    mirror: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge two publication CSVs into a deduplicated CSV and plot
    Merge {
        /// Path to the first CSV file
        csv1: PathBuf,
        /// Path to the second CSV file
        csv2: PathBuf,
    },

    /// Manage cookies
    Cookies {
        #[command(subcommand)]
        action: CookieAction,
    },
}

#[derive(Subcommand)]
enum CookieAction {
    /// Clear stored cookies
    Clear,
    /// Show cookie file path
    Path,
    /// Import cookies exported from a browser as JSON
    Import {
        /// Exported cookie file
        file: PathBuf,
    },
}

impl ScrapeArgs {
    fn source(&self) -> Source {
        match (self.scholar_api, self.scholar_web) {
            (false, true) => Source::Web,
            _ => Source::Api,
        }
    }

    fn settings(&self, results_dir: PathBuf, plots_dir: PathBuf) -> Result<Settings> {
        let delay = Duration::try_from_secs_f64(self.delay)
            .with_context(|| format!("Invalid --delay value: {}", self.delay))?;

        Ok(Settings {
            source: self.source(),
            results_dir,
            plots_dir,
            resume_from_csv: self.resume_from_csv.clone(),
            api: QueryOptions {
                proxy: self.proxy.clone(),
                base_url: self.mirror.clone(),
                start_page: self.start_page,
                max_pages: self.max_pages,
                year_low: self.year_low,
                year_high: self.year_high,
                delay,
                max_retries: self.max_retries,
                ..QueryOptions::default()
            },
            web: WebOptions {
                webdriver_url: self.webdriver_url.clone(),
                headless: self.headless,
                wait_time: Duration::from_secs(self.wait_time),
                start_page: self.start_page,
                max_pages: self.max_pages,
                delay,
            },
        })
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.debug { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_string()));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .init();

    match cli.command {
        Some(Commands::Merge { csv1, csv2 }) => {
            handle_merge(&csv1, &csv2, &cli.results_location, &cli.plots_location)
        }
        Some(Commands::Cookies { action }) => handle_cookies(action),
        None => {
            let settings = cli
                .scrape
                .settings(cli.results_location.clone(), cli.plots_location.clone())?;

            if let Some(query) = cli.scrape.query.as_deref() {
                prepare_directories(&settings)?;
                let scraper = build_scraper(&settings, settings.source)?;
                run_and_print(&scraper, query, &settings).await
            } else if cli.scrape.gui {
                prepare_directories(&settings)?;
                run_guided(settings).await
            } else if cli.scrape.cli {
                prepare_directories(&settings)?;
                run_interactive(&settings).await
            } else {
                println!("No valid mode selected. Please use --GUI, --CLI or --query.");
                Ok(())
            }
        }
    }
}

fn prepare_directories(settings: &Settings) -> Result<()> {
    ensure_directory_exists(&settings.results_dir).context("Failed to create results directory")?;
    ensure_directory_exists(&settings.plots_dir).context("Failed to create plots directory")?;
    Ok(())
}

fn build_scraper(settings: &Settings, source: Source) -> Result<Scraper> {
    Scraper::new(source, settings.api.clone(), settings.web.clone())
        .context("Failed to set up scraper")
}

// ============================================================================
// Scrape Modes
// ============================================================================

async fn run_and_print(scraper: &Scraper, query: &str, settings: &Settings) -> Result<()> {
    let report = run_query(scraper, query, settings)
        .await
        .with_context(|| format!("Unable to retrieve results for {}, try again or try a simpler query", query))?;
    print_session(&report);
    Ok(())
}

/// Prompt for queries until the user types `exit`
async fn run_interactive(settings: &Settings) -> Result<()> {
    let scraper = build_scraper(settings, settings.source)?;
    let stdin = io::stdin();

    loop {
        print!("Enter your search query for Google Scholar (type 'exit' to quit): ");
        io::stdout().flush()?;

        let mut input = String::new();
        if stdin.lock().read_line(&mut input)? == 0 {
            break;
        }
        let query = input.trim();
        if query.eq_ignore_ascii_case("exit") {
            break;
        }
        if query.is_empty() {
            continue;
        }

        if let Err(e) = run_and_print(&scraper, query, settings).await {
            error!(error = %e, "Query failed");
            println!("{:#}", e);
        }
    }

    Ok(())
}

/// Short form: query text and acquisition source, then one session
async fn run_guided(mut settings: Settings) -> Result<()> {
    println!("=== Scholarly Database Search ===");
    let query = prompt("Query: ")?;
    if query.is_empty() {
        println!("No query entered.");
        return Ok(());
    }

    let default_choice = match settings.source {
        Source::Api => "1",
        Source::Web => "2",
    };
    println!("Sources:");
    println!("  [1] Google Scholar (scholar_API)");
    println!("  [2] Google Scholar in Chrome (scholar_Web)");
    let choice = prompt(&format!("Source [{}]: ", default_choice))?;
    if !choice.is_empty() {
        settings.source = choice
            .parse()
            .map_err(|e: String| anyhow::anyhow!(e))
            .context("Invalid source selection")?;
    }

    let scraper = build_scraper(&settings, settings.source)?;
    run_and_print(&scraper, &query, &settings).await
}

fn prompt(label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin().lock().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

fn print_session(report: &SessionReport) {
    println!();
    println!("{}", report.counts);
    if report.carried_over > 0 {
        println!(
            "Scraped {} publications, merged with {} from the previous session.",
            report.scraped, report.carried_over
        );
    }
    match &report.csv_path {
        Some(path) => println!("Saved data to {}", path.display()),
        None => println!("No results to save."),
    }
    if let Some(path) = &report.plot_path {
        println!("Plot saved to {}", path.display());
    }
    if let Some(page) = report.resume_page {
        let csv = report
            .csv_path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "<results csv>".to_string());
        println!(
            "Crawl stopped early. Continue with: --start_page {} --resume_from_csv {}",
            page, csv
        );
    }
}

// ============================================================================
// Merge
// ============================================================================

fn handle_merge(csv1: &Path, csv2: &Path, results_dir: &Path, plots_dir: &Path) -> Result<()> {
    ensure_directory_exists(results_dir).context("Failed to create results directory")?;
    ensure_directory_exists(plots_dir).context("Failed to create plots directory")?;

    let report = run_merge(csv1, csv2, results_dir, plots_dir).context("Merge failed")?;
    info!(
        input = report.input_rows,
        unique = report.publications.len(),
        "Merge complete"
    );

    println!("Merged CSV saved to: {}", report.csv_path.display());
    println!();
    println!("{}", report.counts);
    match &report.plot_path {
        Some(path) => println!("Plot saved to {}", path.display()),
        None => println!("No dated publications to plot."),
    }
    Ok(())
}

// ============================================================================
// Cookie Management
// ============================================================================

fn handle_cookies(action: CookieAction) -> Result<()> {
    let manager = CookieManager::new()?;

    match action {
        CookieAction::Clear => {
            manager.clear()?;
            println!("Cookies cleared.");
        }
        CookieAction::Path => {
            println!("Cookie file: {:?}", manager.path());
        }
        CookieAction::Import { file } => {
            let count = manager
                .import(&file)
                .with_context(|| format!("Failed to import cookies from {}", file.display()))?;
            println!("Successfully saved {} cookies to {:?}", count, manager.path());
        }
    }

    Ok(())
}
