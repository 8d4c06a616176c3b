//! Google Scholar HTTP client.
//!
//! Pages through `/scholar?q=..&start=..` with plain HTTP requests, the same
//! requests an unofficial Scholar API library makes, and parses each result
//! page with [`crate::parse`].

use crate::acquisition::SearchOutcome;
use crate::cookies::{cookie_header, CookieManager};
use crate::error::{Result, ScholarError};
use crate::parse::{has_next_page, is_captcha_page, parse_result_items};
use std::time::Duration;
use tracing::{debug, error, info, warn};
use url::Url;

/// Default Google Scholar URL
pub const DEFAULT_SCHOLAR_URL: &str = "https://scholar.google.com";

/// Results per Scholar page
pub const RESULTS_PER_PAGE: u32 = 10;

/// Wait used when a 429 response carries no Retry-After header
const DEFAULT_RATE_LIMIT_SECS: u64 = 60;

/// User agent string for requests
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// Query options for the HTTP client
#[derive(Debug, Clone)]
pub struct QueryOptions {
    /// Proxy URL (e.g., "http://127.0.0.1:7890")
    pub proxy: Option<String>,
    /// Custom base URL for mirror sites
    pub base_url: Option<String>,
    /// First page to fetch (1-indexed)
    pub start_page: u32,
    /// Stop after this many pages
    pub max_pages: Option<u32>,
    /// Only results from this year onwards
    pub year_low: Option<i32>,
    /// Only results up to this year
    pub year_high: Option<i32>,
    /// Fixed pause before every request
    pub delay: Duration,
    /// Upper bound of the random pause added to `delay`
    pub jitter: Duration,
    /// Retries of one page after a 429
    pub max_retries: u32,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            proxy: None,
            base_url: None,
            start_page: 1,
            max_pages: None,
            year_low: None,
            year_high: None,
            delay: Duration::from_secs(2),
            jitter: Duration::from_millis(1500),
            max_retries: 3,
        }
    }
}

/// HTTP scraper for Google Scholar
pub struct ApiScraper {
    client: reqwest::Client,
    options: QueryOptions,
    cookie_header: String,
}

impl ApiScraper {
    pub fn new(options: QueryOptions) -> Result<Self> {
        let cookies = CookieManager::default().load();
        if cookies.is_empty() {
            warn!("No cookies loaded. Run 'scholarscrape cookies import <file>' if Scholar starts serving CAPTCHAs.");
        } else {
            info!("Loaded {} cookies for Google Scholar", cookies.len());
        }

        Ok(Self {
            client: build_http_client(options.proxy.as_deref())?,
            cookie_header: cookie_header(&cookies),
            options,
        })
    }

    fn scholar_url(&self) -> String {
        self.options
            .base_url
            .as_ref()
            .map(|s| s.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_SCHOLAR_URL.to_string())
    }

    /// Crawl result pages for `query` until there is no next page.
    ///
    /// Failures after the first request do not discard what was already
    /// collected; they end the crawl with `resume_page` set.
    pub async fn search(&self, query: &str) -> Result<SearchOutcome> {
        let scholar_url = self.scholar_url();
        let mut page = self.options.start_page.max(1);
        let mut outcome = SearchOutcome::default();

        info!(
            query,
            url = %scholar_url,
            start_page = page,
            max_pages = ?self.options.max_pages,
            "Starting Google Scholar query"
        );

        if self.options.max_pages == Some(0) {
            return Ok(outcome);
        }

        loop {
            let url = build_search_url(
                &scholar_url,
                query,
                page_offset(page),
                self.options.year_low,
                self.options.year_high,
            )?;
            debug!(page, url = %url, "Fetching page");

            tokio::time::sleep(self.pause()).await;

            let html = match self.fetch_with_retry(&url).await {
                Ok(html) => html,
                Err(ScholarError::Captcha) => {
                    warn!(page, "CAPTCHA detected, stopping crawl");
                    outcome.resume_page = Some(page);
                    break;
                }
                Err(e) => {
                    error!(page, error = %e, "Failed to fetch page");
                    outcome.resume_page = Some(page);
                    break;
                }
            };

            let page_results = parse_result_items(&html)?;
            outcome.pages_fetched += 1;
            info!(page, count = page_results.len(), "Parsed results");

            if page_results.is_empty() {
                break;
            }
            outcome.publications.extend(page_results);

            if !has_next_page(&html)? {
                info!(page, "No more pages");
                break;
            }
            if self.options.max_pages.is_some_and(|max| outcome.pages_fetched >= max) {
                info!(pages = outcome.pages_fetched, "Reached page limit");
                outcome.resume_page = Some(page + 1);
                break;
            }
            page += 1;
        }

        info!(
            total = outcome.publications.len(),
            pages = outcome.pages_fetched,
            "Query complete"
        );
        Ok(outcome)
    }

    fn pause(&self) -> Duration {
        let jitter_ms = self.options.jitter.as_millis() as u64;
        if jitter_ms == 0 {
            return self.options.delay;
        }
        self.options.delay + Duration::from_millis(rand::random::<u64>() % jitter_ms)
    }

    /// Fetch one page, sleeping and retrying on 429s.
    async fn fetch_with_retry(&self, url: &Url) -> Result<String> {
        let mut attempt = 0;
        loop {
            match fetch_page_with_cookies(&self.client, url, &self.cookie_header).await {
                Err(ScholarError::RateLimited(secs)) if attempt < self.options.max_retries => {
                    attempt += 1;
                    warn!(attempt, wait_secs = secs, "Rate limited, waiting");
                    tokio::time::sleep(Duration::from_secs(secs)).await;
                }
                other => return other,
            }
        }
    }
}

/// Result offset of a 1-indexed page
pub fn page_offset(page: u32) -> u32 {
    page.saturating_sub(1) * RESULTS_PER_PAGE
}

/// Build HTTP client with optional proxy
fn build_http_client(proxy: Option<&str>) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(30))
        .cookie_store(true);

    if let Some(proxy_url) = proxy {
        let proxy = reqwest::Proxy::all(proxy_url).map_err(|e| {
            ScholarError::Config(format!("Invalid proxy URL '{}': {}", proxy_url, e))
        })?;
        builder = builder.proxy(proxy);
    }

    builder
        .build()
        .map_err(|e| ScholarError::Config(format!("Failed to build HTTP client: {}", e)))
}

/// Build Google Scholar search URL
fn build_search_url(
    base_url: &str,
    query: &str,
    start: u32,
    year_low: Option<i32>,
    year_high: Option<i32>,
) -> Result<Url> {
    let mut url = Url::parse(&format!("{}/scholar", base_url))
        .map_err(|e| ScholarError::Config(format!("Invalid base URL: {}", e)))?;

    {
        let mut params = url.query_pairs_mut();
        params.append_pair("q", query);
        params.append_pair("hl", "en"); // English labels keep "Next" and bylines parseable
        params.append_pair("start", &start.to_string());
        params.append_pair("as_sdt", "0,5");
        if let Some(year) = year_low {
            params.append_pair("as_ylo", &year.to_string());
        }
        if let Some(year) = year_high {
            params.append_pair("as_yhi", &year.to_string());
        }
    }

    Ok(url)
}

/// Fetch page content using HTTP client with cookies
async fn fetch_page_with_cookies(client: &reqwest::Client, url: &Url, cookie_header: &str) -> Result<String> {
    let mut request = client
        .get(url.as_str())
        .header("Accept", "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8")
        .header("Accept-Language", "en-US,en;q=0.9")
        .header("Cache-Control", "no-cache")
        .header("Upgrade-Insecure-Requests", "1");

    if !cookie_header.is_empty() {
        request = request.header("Cookie", cookie_header);
    }

    let response = request.send().await?;

    let status = response.status();
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        let wait = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_retry_after)
            .unwrap_or(DEFAULT_RATE_LIMIT_SECS);
        return Err(ScholarError::RateLimited(wait));
    }

    if !status.is_success() {
        return Err(ScholarError::Api {
            code: status.as_u16(),
            message: format!("HTTP error: {}", status),
        });
    }

    let html = response.text().await?;
    if is_captcha_page(&html) {
        return Err(ScholarError::Captcha);
    }
    Ok(html)
}

/// Retry-After in its delay-seconds form
fn parse_retry_after(value: &str) -> Option<u64> {
    value.trim().parse().ok()
}
