//! Google Scholar result page parsing.
//!
//! Both acquisition paths end up with the same result-page HTML (fetched over
//! HTTP or read back from the browser), so parsing lives here.

use crate::error::{Result, ScholarError};
use crate::record::{find_year_span, Publication};
use scraper::{ElementRef, Html, Selector};

/// Markers Scholar shows instead of results when it blocks a client
const CAPTCHA_MARKERS: &[&str] = &[
    "Solving the above CAPTCHA",
    "unusual traffic",
    "gs_captcha_ccl",
    "recaptcha",
];

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| ScholarError::Parse(e.to_string()))
}

/// True when the page is a CAPTCHA / "unusual traffic" interstitial.
pub fn is_captcha_page(html: &str) -> bool {
    CAPTCHA_MARKERS.iter().any(|m| html.contains(m))
}

/// True when the result page has a "Next" pagination control.
pub fn has_next_page(html: &str) -> Result<bool> {
    let document = Html::parse_document(html);
    let nav_link = selector("#gs_n a, #gs_nm button, .gs_ico_nav_next")?;

    Ok(document.select(&nav_link).any(|el| {
        let text = el.text().collect::<String>();
        text.trim() == "Next"
            || el.value().attr("aria-label") == Some("Next")
            || el.value().classes().any(|c| c == "gs_ico_nav_next")
    }))
}

/// Parse a Google Scholar result page into publications.
///
/// Items without a title are dropped.
pub fn parse_result_items(html: &str) -> Result<Vec<Publication>> {
    let document = Html::parse_document(html);

    let item_selector = selector("div.gs_r.gs_or.gs_scl")?;
    let title_selector = selector("h3.gs_rt")?;
    let link_selector = selector("h3.gs_rt a")?;
    let meta_selector = selector("div.gs_a")?;

    let mut results = Vec::new();

    for item in document.select(&item_selector) {
        let mut data = Publication::default();

        if let Some(title_elem) = item.select(&title_selector).next() {
            if let Some(link) = item.select(&link_selector).next() {
                data.title = element_text(&link);
                data.url = link.value().attr("href").unwrap_or("").to_string();
            } else {
                data.title = strip_type_tags(&element_text(&title_elem));
            }
        }

        if let Some(meta_elem) = item.select(&meta_selector).next() {
            let (authors, venue, year) = parse_byline(&meta_elem.text().collect::<String>());
            data.authors = authors;
            data.venue = venue;
            data.year = year;
        }

        if !data.title.is_empty() {
            results.push(data);
        }
    }

    Ok(results)
}

/// Split a Scholar byline `authors - venue, year - host` into its parts.
pub fn parse_byline(meta: &str) -> (String, String, Option<i32>) {
    let meta = meta.replace('\u{a0}', " ");
    let parts: Vec<&str> = meta.split(" - ").collect();

    let authors = parts.first().map(|s| s.trim().to_string()).unwrap_or_default();
    let mut venue = String::new();
    let mut year = None;

    if let Some(venue_year) = parts.get(1) {
        match find_year_span(venue_year) {
            Some((start, end)) => {
                year = venue_year[start..end].parse().ok();
                venue = venue_year[..start].trim().trim_end_matches(',').trim().to_string();
            }
            None => venue = venue_year.trim().to_string(),
        }
    }

    (authors, venue, year)
}

fn element_text(el: &ElementRef<'_>) -> String {
    el.text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Remove leading `[PDF]`, `[HTML]`, `[BOOK]`, `[CITATION]` style markers.
fn strip_type_tags(title: &str) -> String {
    let mut rest = title.trim();
    while rest.starts_with('[') {
        match rest.find(']') {
            Some(end) => rest = rest[end + 1..].trim_start(),
            None => break,
        }
    }
    rest.to_string()
}

/// Minimal result page with one item per title, each dated 2021.
#[cfg(test)]
pub(crate) fn result_page_html(titles: &[&str], next: bool) -> String {
    let items: String = titles
        .iter()
        .map(|t| {
            format!(
                r#"<div class="gs_r gs_or gs_scl"><h3 class="gs_rt"><a href="https://example.org/{t}">{t}</a></h3><div class="gs_a">J Doe - Venue, 2021 - example.org</div></div>"#
            )
        })
        .collect();
    let nav = if next {
        r#"<div id="gs_n"><a href="/scholar?start=10"><b>Next</b></a></div>"#
    } else {
        r#"<div id="gs_n"></div>"#
    };
    format!(r#"<html><body><div id="gs_res_ccl_mid">{items}</div>{nav}</body></html>"#)
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESULT_PAGE: &str = r#"
<html><body><div id="gs_res_ccl_mid">
  <div class="gs_r gs_or gs_scl">
    <h3 class="gs_rt"><a href="https://example.org/ns">Neuro-symbolic   knowledge gaps</a></h3>
    <div class="gs_a">J Doe, A Roe - Journal of AI, 2022 - example.org</div>
  </div>
  <div class="gs_r gs_or gs_scl">
    <h3 class="gs_rt"><span class="gs_ctu">[CITATION]</span> [C] Symbolic reasoning revisited</h3>
    <div class="gs_a">B Smith - 2019</div>
  </div>
  <div class="gs_r gs_or gs_scl">
    <h3 class="gs_rt"><a href="https://example.org/x">Preprint without a year</a></h3>
    <div class="gs_a">C Lee - arXiv preprint - arxiv.org</div>
  </div>
  <div class="gs_r gs_or gs_scl">
    <div class="gs_a">No title here - 2020</div>
  </div>
</div>
<div id="gs_n"><table><tr><td><a href="/scholar?start=10"><b>Next</b></a></td></tr></table></div>
</body></html>"#;

    #[test]
    fn test_parse_result_items() {
        let results = parse_result_items(RESULT_PAGE).expect("Parse failed");
        assert_eq!(results.len(), 3);

        assert_eq!(results[0].title, "Neuro-symbolic knowledge gaps");
        assert_eq!(results[0].url, "https://example.org/ns");
        assert_eq!(results[0].authors, "J Doe, A Roe");
        assert_eq!(results[0].venue, "Journal of AI");
        assert_eq!(results[0].year, Some(2022));

        assert_eq!(results[1].title, "Symbolic reasoning revisited");
        assert_eq!(results[1].year, Some(2019));
        assert_eq!(results[1].venue, "");

        assert_eq!(results[2].year, None);
        assert_eq!(results[2].venue, "arXiv preprint");
    }

    #[test]
    fn test_parse_empty_html() {
        let results = parse_result_items("<html><body></body></html>").expect("Parse failed");
        assert!(results.is_empty());
    }

    #[test]
    fn test_has_next_page() {
        assert!(has_next_page(RESULT_PAGE).expect("Parse failed"));
        assert!(!has_next_page("<html><body><div id=\"gs_n\"></div></body></html>")
            .expect("Parse failed"));
    }

    #[test]
    fn test_result_page_fixture() {
        let html = result_page_html(&["A", "B"], true);
        let results = parse_result_items(&html).expect("Parse failed");
        assert_eq!(results.len(), 2);
        assert_eq!(results[1].title, "B");
        assert_eq!(results[1].year, Some(2021));
        assert!(has_next_page(&html).expect("Parse failed"));
        assert!(!has_next_page(&result_page_html(&[], false)).expect("Parse failed"));
    }

    #[test]
    fn test_captcha_detection() {
        assert!(is_captcha_page("<p>Our systems have detected unusual traffic</p>"));
        assert!(!is_captcha_page(RESULT_PAGE));
    }

    #[test]
    fn test_strip_type_tags() {
        assert_eq!(strip_type_tags("[PDF] [HTML] Title"), "Title");
        assert_eq!(strip_type_tags("Plain"), "Plain");
        assert_eq!(strip_type_tags("[unterminated"), "[unterminated");
    }
}
