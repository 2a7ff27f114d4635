//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `GROCER_API_BASE_URL` - Base URL of the storefront API (e.g. `http://192.168.0.10:3000`)
//!
//! ## Optional
//! - `GROCER_STATE_DIR` - Directory for device-local state (default: `.grocer`)
//! - `GROCER_REQUEST_TIMEOUT_MS` - Default request deadline (default: 10000)
//! - `GROCER_FAVORITE_TIMEOUT_MS` - Deadline for favorite mutations (default: 2000)
//! - `GROCER_ADD_TO_CART_TIMEOUT_MS` - Deadline for add-to-cart (default: 3000)
//! - `GROCER_SEARCH_DEBOUNCE_MS` - Quiet period before a search is sent (default: 300)

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use url::Url;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Storefront API base URL (always ends with `/`)
    pub api_base_url: Url,
    /// Directory holding the device-local state file
    pub state_dir: PathBuf,
    /// Per-request deadlines
    pub timeouts: Timeouts,
    /// Quiet period before a typed search query is sent
    pub search_debounce: Duration,
}

/// Request deadlines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// Deadline for every request without a more specific one
    pub request: Duration,
    /// Deadline for favorite add/remove
    pub favorite: Duration,
    /// Deadline for add-to-cart
    pub add_to_cart: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            request: Duration::from_secs(10),
            favorite: Duration::from_millis(2000),
            add_to_cart: Duration::from_millis(3000),
        }
    }
}

/// Default quiet period for search-as-you-type.
pub const DEFAULT_SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the base URL is missing or any variable is
    /// not parseable.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from `lookup`, which maps a variable name to its
    /// value.
    ///
    /// # Errors
    ///
    /// Same as [`from_env`](Self::from_env).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api_base_url = parse_base_url(&get_required(&lookup, "GROCER_API_BASE_URL")?)
            .map_err(|e| ConfigError::InvalidEnvVar("GROCER_API_BASE_URL".to_string(), e))?;
        let state_dir = PathBuf::from(
            lookup("GROCER_STATE_DIR").unwrap_or_else(|| ".grocer".to_string()),
        );

        let defaults = Timeouts::default();
        let timeouts = Timeouts {
            request: get_millis(&lookup, "GROCER_REQUEST_TIMEOUT_MS", defaults.request)?,
            favorite: get_millis(&lookup, "GROCER_FAVORITE_TIMEOUT_MS", defaults.favorite)?,
            add_to_cart: get_millis(
                &lookup,
                "GROCER_ADD_TO_CART_TIMEOUT_MS",
                defaults.add_to_cart,
            )?,
        };
        let search_debounce =
            get_millis(&lookup, "GROCER_SEARCH_DEBOUNCE_MS", DEFAULT_SEARCH_DEBOUNCE)?;

        Ok(Self {
            api_base_url,
            state_dir,
            timeouts,
            search_debounce,
        })
    }

    /// Configuration for an API at `base_url` with default timeouts.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if `base_url` is not an
    /// absolute http(s) URL.
    pub fn for_base_url(base_url: &str, state_dir: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let api_base_url = parse_base_url(base_url)
            .map_err(|e| ConfigError::InvalidEnvVar("GROCER_API_BASE_URL".to_string(), e))?;
        Ok(Self {
            api_base_url,
            state_dir: state_dir.into(),
            timeouts: Timeouts::default(),
            search_debounce: DEFAULT_SEARCH_DEBOUNCE,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Parse an http(s) base URL and make sure its path ends with `/`.
fn parse_base_url(raw: &str) -> Result<Url, String> {
    let mut url = Url::parse(raw.trim()).map_err(|e| e.to_string())?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(format!("unsupported scheme '{}'", url.scheme()));
    }
    if url.cannot_be_a_base() {
        return Err("URL cannot be a base".to_string());
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Get a required variable.
fn get_required(lookup: impl Fn(&str) -> Option<String>, key: &str) -> Result<String, ConfigError> {
    lookup(key).ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get a duration in milliseconds with a default value.
fn get_millis(
    lookup: impl Fn(&str) -> Option<String>,
    key: &str,
    default: Duration,
) -> Result<Duration, ConfigError> {
    lookup(key).map_or(Ok(default), |raw| {
        raw.trim()
            .parse::<u64>()
            .map(Duration::from_millis)
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_base_url_appends_slash() {
        let url = parse_base_url("http://192.168.18.56:3000").unwrap();
        assert_eq!(url.as_str(), "http://192.168.18.56:3000/");

        let url = parse_base_url("https://api.example.com/v1").unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/v1/");
    }

    #[test]
    fn test_parse_base_url_rejects_other_schemes() {
        assert!(parse_base_url("ftp://example.com").is_err());
        assert!(parse_base_url("mailto:someone@example.com").is_err());
        assert!(parse_base_url("not a url").is_err());
    }

    #[test]
    fn test_for_base_url_uses_defaults() {
        let config = ClientConfig::for_base_url("http://localhost:3000", "/tmp/grocer").unwrap();
        assert_eq!(config.timeouts, Timeouts::default());
        assert_eq!(config.timeouts.favorite, Duration::from_secs(2));
        assert_eq!(config.timeouts.add_to_cart, Duration::from_secs(3));
        assert_eq!(config.search_debounce, Duration::from_millis(300));
        assert_eq!(config.state_dir, PathBuf::from("/tmp/grocer"));
    }

    fn lookup<'a>(vars: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        move |key| {
            vars.iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| (*v).to_string())
        }
    }

    #[test]
    fn test_from_lookup_reads_overrides() {
        let config = ClientConfig::from_lookup(lookup(&[
            ("GROCER_API_BASE_URL", "http://localhost:3000"),
            ("GROCER_STATE_DIR", "/var/lib/grocer"),
            ("GROCER_FAVORITE_TIMEOUT_MS", "750"),
            ("GROCER_SEARCH_DEBOUNCE_MS", "120"),
        ]))
        .unwrap();
        assert_eq!(config.search_debounce, Duration::from_millis(120));
        assert_eq!(config.timeouts.favorite, Duration::from_millis(750));
        assert_eq!(config.timeouts.request, Duration::from_secs(10));
        assert_eq!(config.state_dir, PathBuf::from("/var/lib/grocer"));
    }

    #[test]
    fn test_from_lookup_requires_base_url() {
        let err = ClientConfig::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(key) if key == "GROCER_API_BASE_URL"));
    }

    #[test]
    fn test_from_lookup_rejects_bad_debounce() {
        let err = ClientConfig::from_lookup(lookup(&[
            ("GROCER_API_BASE_URL", "http://localhost:3000"),
            ("GROCER_SEARCH_DEBOUNCE_MS", "soon"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(key, _) if key == "GROCER_SEARCH_DEBOUNCE_MS"));
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::MissingEnvVar("GROCER_API_BASE_URL".to_string());
        assert_eq!(
            err.to_string(),
            "Missing environment variable: GROCER_API_BASE_URL"
        );
    }
}
