//! Minimal W3C WebDriver client.
//!
//! Speaks the WebDriver HTTP/JSON protocol to a running driver (chromedriver
//! listens on `http://localhost:9515` by default). Only the commands the web
//! scraper needs are implemented.

use crate::error::{OptionExt, Result, ScholarError};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Default chromedriver endpoint
pub const DEFAULT_WEBDRIVER_URL: &str = "http://localhost:9515";

/// JSON key identifying a web element reference
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// WebDriver key code for Enter
pub const KEY_ENTER: char = '\u{E007}';

/// Interval between element lookups while waiting
const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Element location strategies
#[derive(Debug, Clone, Copy)]
pub enum Locator<'a> {
    Css(&'a str),
    LinkText(&'a str),
    Name(&'a str),
    Id(&'a str),
}

impl Locator<'_> {
    fn to_json(self) -> Value {
        match self {
            Locator::Css(css) => json!({ "using": "css selector", "value": css }),
            Locator::LinkText(text) => json!({ "using": "link text", "value": text }),
            Locator::Name(name) => json!({ "using": "css selector", "value": format!("[name=\"{}\"]", name) }),
            Locator::Id(id) => json!({ "using": "css selector", "value": format!("#{}", id) }),
        }
    }
}

/// Reference to an element in the current page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementId(String);

#[derive(Debug, Deserialize)]
struct WireResponse {
    value: Value,
}

#[derive(Debug, Deserialize)]
struct WireError {
    error: String,
    #[serde(default)]
    message: String,
}

/// Open WebDriver session
pub struct WebDriverSession {
    client: reqwest::Client,
    base_url: String,
    session_id: String,
}

impl WebDriverSession {
    /// Start a Chrome session on the driver at `base_url`.
    pub async fn start(base_url: &str, headless: bool) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| ScholarError::Config(format!("Failed to build HTTP client: {}", e)))?;
        let base_url = base_url.trim_end_matches('/').to_string();

        let response = client
            .post(format!("{}/session", base_url))
            .json(&new_session_payload(headless))
            .send()
            .await
            .map_err(|e| {
                ScholarError::Browser(format!("Cannot reach WebDriver at {}: {}", base_url, e))
            })?;
        let value = decode_response(response).await?;
        let session_id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_parse("WebDriver response has no sessionId")?
            .to_string();

        info!(session = %session_id, driver = %base_url, "Started browser session");
        Ok(Self {
            client,
            base_url,
            session_id,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/session/{}/{}", self.base_url, self.session_id, path)
    }

    async fn post(&self, path: &str, body: Value) -> Result<Value> {
        let response = self.client.post(self.endpoint(path)).json(&body).send().await?;
        decode_response(response).await
    }

    async fn get(&self, path: &str) -> Result<Value> {
        let response = self.client.get(self.endpoint(path)).send().await?;
        decode_response(response).await
    }

    /// Navigate to `url`
    pub async fn goto(&self, url: &str) -> Result<()> {
        debug!(url, "Navigating");
        self.post("url", json!({ "url": url })).await?;
        Ok(())
    }

    /// Find the first element matching `locator`
    pub async fn find(&self, locator: Locator<'_>) -> Result<ElementId> {
        let value = self.post("element", locator.to_json()).await?;
        element_from_value(&value)
    }

    /// Find an element, `None` when it is not on the page
    pub async fn try_find(&self, locator: Locator<'_>) -> Result<Option<ElementId>> {
        match self.find(locator).await {
            Ok(id) => Ok(Some(id)),
            Err(ScholarError::Browser(msg)) if msg.starts_with("no such element") => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Poll for an element until it appears or `timeout` elapses
    pub async fn wait_for(&self, locator: Locator<'_>, timeout: Duration) -> Result<ElementId> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(id) = self.try_find(locator).await? {
                return Ok(id);
            }
            if Instant::now() >= deadline {
                return Err(ScholarError::Timeout(timeout.as_secs(), format!("{:?}", locator)));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    /// Type `text` into an element
    pub async fn send_keys(&self, element: &ElementId, text: &str) -> Result<()> {
        self.post(&format!("element/{}/value", element.0), json!({ "text": text }))
            .await?;
        Ok(())
    }

    pub async fn click(&self, element: &ElementId) -> Result<()> {
        self.post(&format!("element/{}/click", element.0), json!({})).await?;
        Ok(())
    }

    /// Serialized DOM of the current page
    pub async fn page_source(&self) -> Result<String> {
        let value = self.get("source").await?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_parse("page source is not a string")
    }

    /// End the session and close the browser
    pub async fn quit(self) -> Result<()> {
        let response = self
            .client
            .delete(format!("{}/session/{}", self.base_url, self.session_id))
            .send()
            .await?;
        match decode_response(response).await {
            Ok(_) => {
                info!(session = %self.session_id, "Closed browser session");
                Ok(())
            }
            Err(e) => {
                warn!(session = %self.session_id, error = %e, "Failed to close browser session");
                Err(e)
            }
        }
    }
}

fn new_session_payload(headless: bool) -> Value {
    let mut args = vec!["--window-size=1280,1024", "--lang=en-US"];
    if headless {
        args.push("--headless=new");
    }
    json!({
        "capabilities": {
            "alwaysMatch": {
                "browserName": "chrome",
                "goog:chromeOptions": { "args": args }
            }
        }
    })
}

/// Unwrap the `value` member, turning WebDriver error objects into errors.
async fn decode_response(response: reqwest::Response) -> Result<Value> {
    let status = response.status();
    let body: WireResponse = response.json().await?;
    check_wire_value(status.as_u16(), body.value)
}

fn check_wire_value(status: u16, value: Value) -> Result<Value> {
    if let Ok(err) = serde_json::from_value::<WireError>(value.clone()) {
        return Err(ScholarError::Browser(format!("{}: {}", err.error, err.message)));
    }
    if !(200..300).contains(&status) {
        return Err(ScholarError::Api {
            code: status,
            message: format!("WebDriver returned {}", value),
        });
    }
    Ok(value)
}

fn element_from_value(value: &Value) -> Result<ElementId> {
    value
        .get(ELEMENT_KEY)
        .and_then(Value::as_str)
        .map(|id| ElementId(id.to_string()))
        .ok_or_parse("element reference missing from WebDriver response")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_payload() {
        let payload = new_session_payload(true);
        let args = &payload["capabilities"]["alwaysMatch"]["goog:chromeOptions"]["args"];
        assert!(args
            .as_array()
            .expect("args array")
            .iter()
            .any(|a| a == "--headless=new"));
        assert_eq!(payload["capabilities"]["alwaysMatch"]["browserName"], "chrome");
    }

    #[test]
    fn test_locator_json() {
        assert_eq!(
            Locator::Name("q").to_json(),
            json!({ "using": "css selector", "value": "[name=\"q\"]" })
        );
        assert_eq!(
            Locator::LinkText("Next").to_json(),
            json!({ "using": "link text", "value": "Next" })
        );
        assert_eq!(Locator::Id("gs_res_ccl_mid").to_json()["value"], "#gs_res_ccl_mid");
    }

    #[test]
    fn test_element_from_value() {
        let mut map = serde_json::Map::new();
        map.insert(ELEMENT_KEY.to_string(), json!("abc-123"));
        let value = Value::Object(map);
        assert_eq!(
            element_from_value(&value).expect("element"),
            ElementId("abc-123".to_string())
        );
        assert!(element_from_value(&json!({})).is_err());
    }

    #[test]
    fn test_check_wire_value_error_object() {
        let err = check_wire_value(
            404,
            json!({ "error": "no such element", "message": "Unable to locate element", "stacktrace": "" }),
        )
        .expect_err("should fail");
        match err {
            ScholarError::Browser(msg) => assert!(msg.starts_with("no such element")),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_check_wire_value_ok() {
        let value = check_wire_value(200, json!("<html></html>")).expect("ok");
        assert_eq!(value, "<html></html>");
        assert!(check_wire_value(200, Value::Null).is_ok());
    }
}
