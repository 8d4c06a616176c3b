//! Acquisition path selection.
//!
//! The two ways of getting Scholar results, the HTTP client and the WebDriver
//! browser, are wrapped in one [`Scraper`] so the pipeline does not care which
//! was chosen on the command line.

use crate::error::Result;
use crate::record::Publication;
use crate::scholar_api::{ApiScraper, QueryOptions};
use crate::scholar_web::{WebOptions, WebScraper};
use std::fmt;
use std::str::FromStr;

/// Where publications are fetched from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Source {
    /// Direct HTTP requests against the Scholar result pages
    #[default]
    Api,
    /// A Chrome session driven over WebDriver
    Web,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Api => write!(f, "scholar_API"),
            Source::Web => write!(f, "scholar_Web"),
        }
    }
}

impl FromStr for Source {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "api" | "scholar_api" | "1" => Ok(Source::Api),
            "web" | "scholar_web" | "browser" | "2" => Ok(Source::Web),
            other => Err(format!("unknown source '{}'", other)),
        }
    }
}

/// Result of one crawl.
///
/// `resume_page` is set when the crawl stopped early (CAPTCHA, rate limit,
/// network failure); passing it back as the start page continues the crawl.
#[derive(Debug, Default)]
pub struct SearchOutcome {
    pub publications: Vec<Publication>,
    pub pages_fetched: u32,
    pub resume_page: Option<u32>,
}

impl SearchOutcome {
    pub fn interrupted(&self) -> bool {
        self.resume_page.is_some()
    }
}

/// Scraper for either acquisition path
pub enum Scraper {
    Api(ApiScraper),
    Web(WebScraper),
}

impl Scraper {
    /// Build the scraper for `source`.
    ///
    /// The web path opens its browser session lazily, per query.
    pub fn new(source: Source, api: QueryOptions, web: WebOptions) -> Result<Self> {
        Ok(match source {
            Source::Api => Scraper::Api(ApiScraper::new(api)?),
            Source::Web => Scraper::Web(WebScraper::new(web)?),
        })
    }

    pub fn source(&self) -> Source {
        match self {
            Scraper::Api(_) => Source::Api,
            Scraper::Web(_) => Source::Web,
        }
    }

    /// Run one query to completion (or interruption).
    pub async fn search(&self, query: &str) -> Result<SearchOutcome> {
        match self {
            Scraper::Api(scraper) => scraper.search(query).await,
            Scraper::Web(scraper) => scraper.search(query).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_from_str() {
        assert_eq!("api".parse::<Source>(), Ok(Source::Api));
        assert_eq!("scholar_Web".parse::<Source>(), Ok(Source::Web));
        assert_eq!(" 2 ".parse::<Source>(), Ok(Source::Web));
        assert!("ieee".parse::<Source>().is_err());
    }

    #[test]
    fn test_outcome_interrupted() {
        let mut outcome = SearchOutcome::default();
        assert!(!outcome.interrupted());
        outcome.resume_page = Some(4);
        assert!(outcome.interrupted());
    }
}
