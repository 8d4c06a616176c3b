//! Custom error types for scholarscrape.
//!
//! All library functions return `Result<T, ScholarError>` instead of using `unwrap()`.

use thiserror::Error;

/// Main error type for scholarscrape operations.
#[derive(Debug, Error)]
pub enum ScholarError {
    /// Browser automation error (WebDriver)
    #[error("Browser error: {0}")]
    Browser(String),

    /// Network/HTTP request error
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// HTML parsing error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Rate limited by Google Scholar
    #[error("Rate limited, retry after {0}s")]
    RateLimited(u64),

    /// Remote endpoint returned an error status
    #[error("API error: {code} - {message}")]
    Api {
        /// HTTP status code
        code: u16,
        /// Error message
        message: String,
    },

    /// CAPTCHA detected
    #[error("CAPTCHA detected, please refresh cookies")]
    Captcha,

    /// Page did not reach the expected state in time
    #[error("Timed out after {0}s waiting for {1}")]
    Timeout(u64, String),

    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV read/write error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Input file does not exist
    #[error("File not found: {0}")]
    NotFound(String),

    /// Configuration error
    #[error("Config error: {0}")]
    Config(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Result type alias using `ScholarError`
pub type Result<T> = std::result::Result<T, ScholarError>;

/// Extension trait for adding context to Option types
pub trait OptionExt<T> {
    /// Convert Option to Result with a parse error message
    fn ok_or_parse(self, msg: &str) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_parse(self, msg: &str) -> Result<T> {
        self.ok_or_else(|| ScholarError::Parse(msg.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ok_or_parse() {
        let missing: Option<u32> = None;
        let err = missing.ok_or_parse("no value").expect_err("should fail");
        assert_eq!(err.to_string(), "Parse error: no value");
        assert_eq!(Some(3).ok_or_parse("unused").expect("present"), 3);
    }
}
