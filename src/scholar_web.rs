//! Google Scholar through a real browser.
//!
//! Types the query into the Scholar search box, waits for the result
//! container and follows the "Next" link page by page.

use crate::acquisition::SearchOutcome;
use crate::error::{Result, ScholarError};
use crate::parse::{has_next_page, is_captcha_page, parse_result_items};
use crate::scholar_api::DEFAULT_SCHOLAR_URL;
use crate::webdriver::{Locator, WebDriverSession, DEFAULT_WEBDRIVER_URL, KEY_ENTER};
use std::time::Duration;
use tracing::{info, warn};

/// Id of the element holding the result list
const RESULTS_CONTAINER: &str = "gs_res_ccl_mid";

/// Options for the browser scraper
#[derive(Debug, Clone)]
pub struct WebOptions {
    /// WebDriver endpoint
    pub webdriver_url: String,
    /// Run Chrome without a window
    pub headless: bool,
    /// How long to wait for a result page before giving up
    pub wait_time: Duration,
    /// First page to collect (1-indexed)
    pub start_page: u32,
    /// Stop after this many collected pages
    pub max_pages: Option<u32>,
    /// Pause after each click on "Next"
    pub delay: Duration,
}

impl Default for WebOptions {
    fn default() -> Self {
        Self {
            webdriver_url: DEFAULT_WEBDRIVER_URL.to_string(),
            headless: false,
            wait_time: Duration::from_secs(20),
            start_page: 1,
            max_pages: None,
            delay: Duration::from_secs(2),
        }
    }
}

/// Browser-driven scraper. One WebDriver session per query.
pub struct WebScraper {
    options: WebOptions,
}

impl WebScraper {
    pub fn new(options: WebOptions) -> Result<Self> {
        if options.webdriver_url.trim().is_empty() {
            return Err(ScholarError::Config("WebDriver URL is empty".to_string()));
        }
        Ok(Self { options })
    }

    /// Run `query` in a fresh browser session.
    ///
    /// The session is closed whether or not the crawl succeeded.
    pub async fn search(&self, query: &str) -> Result<SearchOutcome> {
        let session =
            WebDriverSession::start(&self.options.webdriver_url, self.options.headless).await?;

        let result = self.crawl(&session, query).await;

        if let Err(e) = session.quit().await {
            warn!(error = %e, "Browser session did not close cleanly");
        }
        result
    }

    async fn crawl(&self, session: &WebDriverSession, query: &str) -> Result<SearchOutcome> {
        session.goto(&format!("{}/", DEFAULT_SCHOLAR_URL)).await?;

        info!(query, "Querying Google Scholar");
        let search_box = session.find(Locator::Name("q")).await?;
        session
            .send_keys(&search_box, &format!("{}{}", query, KEY_ENTER))
            .await?;

        info!(wait_secs = self.options.wait_time.as_secs(), "Waiting for a response");
        session
            .wait_for(Locator::Id(RESULTS_CONTAINER), self.options.wait_time)
            .await?;

        if self.options.max_pages == Some(0) {
            return Ok(SearchOutcome::default());
        }

        let mut page = 1;
        let start_page = self.options.start_page.max(1);
        while page < start_page {
            if !self.next_page(session).await? {
                warn!(page, start_page, "Ran out of pages before the start page");
                return Ok(SearchOutcome::default());
            }
            page += 1;
        }

        let mut outcome = SearchOutcome::default();
        loop {
            info!(page, "Processing page");
            let html = match session.page_source().await {
                Ok(html) => html,
                Err(e) => {
                    warn!(page, error = %e, "Could not read page source");
                    outcome.resume_page = Some(page);
                    break;
                }
            };
            if is_captcha_page(&html) {
                warn!(page, "CAPTCHA detected, stopping crawl");
                outcome.resume_page = Some(page);
                break;
            }

            let page_results = match parse_result_items(&html) {
                Ok(results) => results,
                Err(e) => {
                    warn!(page, error = %e, "Could not parse page");
                    outcome.resume_page = Some(page);
                    break;
                }
            };
            info!(page, count = page_results.len(), "Parsed results");
            for publication in &page_results {
                info!(title = %publication.title, year = ?publication.year, "Found");
            }
            outcome.publications.extend(page_results);
            outcome.pages_fetched += 1;

            if self.options.max_pages.is_some_and(|max| outcome.pages_fetched >= max) {
                info!(pages = outcome.pages_fetched, "Reached page limit");
                if has_next_page(&html).unwrap_or(false) {
                    outcome.resume_page = Some(page + 1);
                }
                break;
            }

            match self.next_page(session).await {
                Ok(true) => page += 1,
                Ok(false) => {
                    info!(page, "No more pages");
                    break;
                }
                Err(e) => {
                    warn!(page = page + 1, error = %e, "Next page did not load");
                    outcome.resume_page = Some(page + 1);
                    break;
                }
            }
        }

        info!(
            total = outcome.publications.len(),
            pages = outcome.pages_fetched,
            "Query complete"
        );
        Ok(outcome)
    }

    /// Click "Next" and wait for the following page. `false` on the last page.
    async fn next_page(&self, session: &WebDriverSession) -> Result<bool> {
        let Some(next) = session.try_find(Locator::LinkText("Next")).await? else {
            return Ok(false);
        };
        session.click(&next).await?;
        tokio::time::sleep(self.options.delay).await;
        session
            .wait_for(Locator::Id(RESULTS_CONTAINER), self.options.wait_time)
            .await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::result_page_html;
    use serde_json::json;
    use wiremock::matchers::{method, path, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn ok_value(value: serde_json::Value) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({ "value": value }))
    }

    /// Chromedriver stand-in: every lookup finds element `e1`, page source is
    /// left to the caller.
    async fn fake_driver() -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/session"))
            .respond_with(ok_value(json!({ "sessionId": "s1", "capabilities": {} })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/session/s1/url"))
            .respond_with(ok_value(json!(null)))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/session/s1/element"))
            .respond_with(ok_value(json!({ "element-6066-11e4-a52e-4f735466cecf": "e1" })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path_regex(r"^/session/s1/element/e1/(value|click)$"))
            .respond_with(ok_value(json!(null)))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/session/s1"))
            .respond_with(ok_value(json!(null)))
            .mount(&server)
            .await;
        server
    }

    fn options_for(server: &MockServer) -> WebOptions {
        WebOptions {
            webdriver_url: server.uri(),
            wait_time: Duration::from_secs(1),
            delay: Duration::ZERO,
            ..Default::default()
        }
    }

    async fn clicks(server: &MockServer) -> usize {
        server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|r| r.url.path().ends_with("/click"))
            .count()
    }

    #[test]
    fn test_rejects_empty_driver_url() {
        let options = WebOptions {
            webdriver_url: "  ".to_string(),
            ..Default::default()
        };
        assert!(matches!(WebScraper::new(options), Err(ScholarError::Config(_))));
    }

    #[test]
    fn test_default_options() {
        let options = WebOptions::default();
        assert_eq!(options.webdriver_url, "http://localhost:9515");
        assert_eq!(options.wait_time, Duration::from_secs(20));
        assert_eq!(options.start_page, 1);
    }

    #[tokio::test]
    async fn test_unreachable_driver_is_browser_error() {
        let scraper = WebScraper::new(WebOptions {
            webdriver_url: "http://127.0.0.1:9".to_string(),
            ..Default::default()
        })
        .expect("valid options");

        match scraper.search("anything").await {
            Err(ScholarError::Browser(msg)) => assert!(msg.contains("Cannot reach WebDriver")),
            other => panic!("unexpected result {:?}", other.map(|o| o.pages_fetched)),
        }
    }

    #[tokio::test]
    async fn test_lost_page_source_keeps_earlier_pages() {
        let server = fake_driver().await;
        Mock::given(method("GET"))
            .and(path("/session/s1/source"))
            .respond_with(ok_value(json!(result_page_html(&["A", "B"], true))))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/session/s1/source"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({
                "value": { "error": "unknown error", "message": "tab crashed" }
            })))
            .mount(&server)
            .await;

        let scraper = WebScraper::new(options_for(&server)).expect("valid options");
        let outcome = scraper.search("neuro-symbolic").await.expect("search");

        let titles: Vec<&str> = outcome.publications.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["A", "B"]);
        assert_eq!(outcome.pages_fetched, 1);
        assert_eq!(outcome.resume_page, Some(2));
    }

    #[tokio::test]
    async fn test_page_limit_sets_resume_page_when_more_pages() {
        let server = fake_driver().await;
        Mock::given(method("GET"))
            .and(path("/session/s1/source"))
            .respond_with(ok_value(json!(result_page_html(&["A"], true))))
            .mount(&server)
            .await;

        let scraper = WebScraper::new(WebOptions {
            max_pages: Some(1),
            ..options_for(&server)
        })
        .expect("valid options");
        let outcome = scraper.search("q").await.expect("search");

        assert_eq!(outcome.publications.len(), 1);
        assert_eq!(outcome.resume_page, Some(2));
        assert_eq!(clicks(&server).await, 0);
    }

    #[tokio::test]
    async fn test_page_limit_on_last_page_is_complete() {
        let server = fake_driver().await;
        Mock::given(method("GET"))
            .and(path("/session/s1/source"))
            .respond_with(ok_value(json!(result_page_html(&["A"], false))))
            .mount(&server)
            .await;

        let scraper = WebScraper::new(WebOptions {
            max_pages: Some(1),
            ..options_for(&server)
        })
        .expect("valid options");
        let outcome = scraper.search("q").await.expect("search");

        assert_eq!(outcome.resume_page, None);
    }
}
