//! # scholarscrape
//!
//! Google Scholar publication scraper with CSV merge, title dedup and
//! per-year plots.
//!
//! ## Modules
//!
//! - [`scholar_api`] - Scholar result pages over plain HTTP
//! - [`scholar_web`] - Scholar through a WebDriver-controlled Chrome
//! - [`acquisition`] - Picks one of the two paths
//! - [`parse`] - Result page parsing shared by both paths
//! - [`table`] - CSV I/O, merge, dedup and year counts
//! - [`plot`] - SVG bar chart of publications per year
//! - [`session`] - Scrape and merge pipelines
//! - [`cookies`] - Cookie persistence
//! - [`error`] - Custom error types
//!
//! ## Usage
//!
//! ```rust,no_run
//! use scholarscrape::acquisition::{Scraper, Source};
//! use scholarscrape::session::{run_query, Settings};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::default();
//!     let scraper = Scraper::new(Source::Api, settings.api.clone(), settings.web.clone())?;
//!     let report = run_query(&scraper, "neuro-symbolic", &settings).await?;
//!     println!("{}", report.counts);
//!     Ok(())
//! }
//! ```

pub mod acquisition;
pub mod cookies;
pub mod error;
pub mod output;
pub mod parse;
pub mod plot;
pub mod record;
pub mod scholar_api;
pub mod scholar_web;
pub mod session;
pub mod table;
pub mod webdriver;

pub use error::{Result, ScholarError};
pub use record::Publication;
