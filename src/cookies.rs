//! Cookie persistence for Google Scholar requests.
//!
//! A Scholar session cookie (NID, GSP, ...) exported from a real browser keeps
//! the API path from being served CAPTCHA pages after the first few requests.

use crate::error::{Result, ScholarError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Default cookie file path: `~/.scholarscrape_cookies.json`
fn default_cookie_path() -> Result<PathBuf> {
    dirs::home_dir()
        .map(|p| p.join(".scholarscrape_cookies.json"))
        .ok_or_else(|| ScholarError::Config("Cannot determine home directory".to_string()))
}

/// Cookie entry in the JSON layout browser export extensions produce
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub secure: bool,
    #[serde(default, alias = "httpOnly")]
    pub http_only: bool,
    #[serde(default, alias = "expirationDate")]
    pub expires: Option<f64>,
}

/// Loads and saves the cookie file
pub struct CookieManager {
    path: PathBuf,
}

impl CookieManager {
    /// Create a new CookieManager with default path
    pub fn new() -> Result<Self> {
        Ok(Self {
            path: default_cookie_path()?,
        })
    }

    /// Create a new CookieManager with custom path
    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Load cookies from file
    ///
    /// Returns empty vec if file doesn't exist or is invalid
    pub fn load(&self) -> Vec<Cookie> {
        if !self.path.exists() {
            debug!("Cookie file not found: {:?}", self.path);
            return Vec::new();
        }

        match std::fs::read_to_string(&self.path) {
            Ok(content) => match serde_json::from_str::<Vec<Cookie>>(&content) {
                Ok(cookies) => {
                    info!("Loaded {} cookies from {:?}", cookies.len(), self.path);
                    cookies
                }
                Err(e) => {
                    warn!("Failed to parse cookies: {}", e);
                    Vec::new()
                }
            },
            Err(e) => {
                warn!("Failed to read cookie file: {}", e);
                Vec::new()
            }
        }
    }

    /// Save cookies to file
    pub fn save(&self, cookies: &[Cookie]) -> Result<()> {
        let content = serde_json::to_string_pretty(cookies)?;
        std::fs::write(&self.path, content)?;
        info!("Saved {} cookies to {:?}", cookies.len(), self.path);
        Ok(())
    }

    /// Replace the stored cookies with the ones in an exported JSON file.
    ///
    /// Returns the number of cookies imported.
    pub fn import(&self, source: &Path) -> Result<usize> {
        if !source.exists() {
            return Err(ScholarError::NotFound(source.display().to_string()));
        }
        let content = std::fs::read_to_string(source)?;
        let cookies: Vec<Cookie> = serde_json::from_str(&content)?;
        self.save(&cookies)?;
        Ok(cookies.len())
    }

    /// Clear stored cookies
    pub fn clear(&self) -> Result<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)?;
            info!("Cleared cookies at {:?}", self.path);
        }
        Ok(())
    }
}

impl Default for CookieManager {
    fn default() -> Self {
        Self::new().unwrap_or_else(|_| Self {
            path: PathBuf::from(".scholarscrape_cookies.json"),
        })
    }
}

/// Build a `Cookie` header value from the google-domain cookies.
pub fn cookie_header(cookies: &[Cookie]) -> String {
    cookies
        .iter()
        .filter(|c| c.domain.contains("google"))
        .map(|c| format!("{}={}", c.name, c.value))
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn cookie(name: &str, domain: &str) -> Cookie {
        Cookie {
            name: name.to_string(),
            value: "value".to_string(),
            domain: domain.to_string(),
            path: "/".to_string(),
            secure: true,
            http_only: false,
            expires: None,
        }
    }

    #[test]
    fn test_load_empty() {
        let manager = CookieManager::with_path(PathBuf::from("/nonexistent/path"));
        assert!(manager.load().is_empty());
    }

    #[test]
    fn test_save_and_load() -> Result<()> {
        let temp = NamedTempFile::new()?;
        let manager = CookieManager::with_path(temp.path().to_path_buf());

        manager.save(&[cookie("NID", ".google.com")])?;
        let loaded = manager.load();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].name, "NID");
        Ok(())
    }

    #[test]
    fn test_import_browser_export() -> Result<()> {
        let mut export = NamedTempFile::new()?;
        write!(
            export,
            r#"[{{"name":"GSP","value":"abc","domain":".scholar.google.com","httpOnly":true,"expirationDate":1999999999.5}}]"#
        )?;
        let store = NamedTempFile::new()?;
        let manager = CookieManager::with_path(store.path().to_path_buf());

        assert_eq!(manager.import(export.path())?, 1);
        let loaded = manager.load();
        assert!(loaded[0].http_only);
        assert_eq!(loaded[0].expires, Some(1999999999.5));
        Ok(())
    }

    #[test]
    fn test_cookie_header_filters_domain() {
        let cookies = vec![cookie("NID", ".google.com"), cookie("other", ".example.com")];
        assert_eq!(cookie_header(&cookies), "NID=value");
        assert_eq!(cookie_header(&[]), "");
    }
}
