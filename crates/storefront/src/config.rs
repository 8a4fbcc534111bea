//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All variables are optional; defaults point at the production order host
//! and a local ads service.
//!
//! - `RAFAL_API_BASE_URL` - Order and payment host (default: <https://apirafal.cyparta.com>)
//! - `RAFAL_ADS_BASE_URL` - Advertisement host (default: <http://localhost:8000>)
//! - `RAFAL_STORE_PATH` - File backing the persisted key/value store (default: `.rafal/store.json`)
//! - `RAFAL_ORDER_TIMEOUT_SECS` - Order and payment request timeout (default: 20)
//! - `RAFAL_ADS_TIMEOUT_SECS` - Advertisement fetch timeout (default: 15)
//! - `RAFAL_PING_TIMEOUT_SECS` - Advertisement connectivity test timeout (default: 10)
//! - `RAFAL_AD_SLIDE_TOTAL_MS` - Full banner rotation period, split across banners (default: 5000)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use url::Url;

pub const DEFAULT_API_BASE_URL: &str = "https://apirafal.cyparta.com";
pub const DEFAULT_ADS_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_STORE_PATH: &str = ".rafal/store.json";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront client configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// Base host for order and payment endpoints
    pub api_base_url: Url,
    /// Base host for the advertisement endpoint
    pub ads_base_url: Url,
    /// Location of the persisted key/value store
    pub store_path: PathBuf,
    /// Request timeouts
    pub timeouts: Timeouts,
    /// Total time for one full banner rotation
    pub ad_slide_total: Duration,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

/// Client-side request timeouts. A request that exceeds its timeout is a
/// failure; nothing is retried automatically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// Order submission and payment calls
    pub order: Duration,
    /// Advertisement fetches
    pub ads: Duration,
    /// Advertisement connectivity test
    pub ping: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            order: Duration::from_secs(20),
            ads: Duration::from_secs(15),
            ping: Duration::from_secs(10),
        }
    }
}

impl Default for StorefrontConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_url(DEFAULT_API_BASE_URL),
            ads_base_url: default_url(DEFAULT_ADS_BASE_URL),
            store_path: PathBuf::from(DEFAULT_STORE_PATH),
            timeouts: Timeouts::default(),
            ad_slide_total: Duration::from_millis(5000),
            sentry_dsn: None,
            sentry_environment: None,
        }
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is present but invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is present but invalid.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let api_base_url = parse_url(
            "RAFAL_API_BASE_URL",
            &get("RAFAL_API_BASE_URL", DEFAULT_API_BASE_URL),
        )?;
        let ads_base_url = parse_url(
            "RAFAL_ADS_BASE_URL",
            &get("RAFAL_ADS_BASE_URL", DEFAULT_ADS_BASE_URL),
        )?;
        let store_path = PathBuf::from(get("RAFAL_STORE_PATH", DEFAULT_STORE_PATH));

        let timeouts = Timeouts {
            order: Duration::from_secs(parse_positive(
                "RAFAL_ORDER_TIMEOUT_SECS",
                &get("RAFAL_ORDER_TIMEOUT_SECS", "20"),
            )?),
            ads: Duration::from_secs(parse_positive(
                "RAFAL_ADS_TIMEOUT_SECS",
                &get("RAFAL_ADS_TIMEOUT_SECS", "15"),
            )?),
            ping: Duration::from_secs(parse_positive(
                "RAFAL_PING_TIMEOUT_SECS",
                &get("RAFAL_PING_TIMEOUT_SECS", "10"),
            )?),
        };
        let ad_slide_total = Duration::from_millis(parse_positive(
            "RAFAL_AD_SLIDE_TOTAL_MS",
            &get("RAFAL_AD_SLIDE_TOTAL_MS", "5000"),
        )?);

        Ok(Self {
            api_base_url,
            ads_base_url,
            store_path,
            timeouts,
            ad_slide_total,
            sentry_dsn: lookup("SENTRY_DSN").filter(|s| !s.is_empty()),
            sentry_environment: lookup("SENTRY_ENVIRONMENT").filter(|s| !s.is_empty()),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

fn default_url(s: &str) -> Url {
    // Constants above are valid absolute URLs.
    Url::parse(s).unwrap_or_else(|_| unreachable!("invalid built-in URL {s}"))
}

/// Parse a base URL, requiring an http(s) scheme and a host.
fn parse_url(key: &str, value: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(value.trim())
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("expected an http(s) URL with a host, got {value}"),
        ));
    }
    Ok(url)
}

/// Parse a strictly positive integer.
fn parse_positive(key: &str, value: &str) -> Result<u64, ConfigError> {
    match value.trim().parse::<u64>() {
        Ok(0) => Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "must be greater than zero".to_string(),
        )),
        Ok(n) => Ok(n),
        Err(e) => Err(ConfigError::InvalidEnvVar(key.to_string(), e.to_string())),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = StorefrontConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.api_base_url.as_str(), "https://apirafal.cyparta.com/");
        assert_eq!(config.ads_base_url.host_str(), Some("localhost"));
        assert_eq!(config.timeouts.order, Duration::from_secs(20));
        assert_eq!(config.timeouts.ads, Duration::from_secs(15));
        assert_eq!(config.timeouts.ping, Duration::from_secs(10));
        assert_eq!(config.ad_slide_total, Duration::from_millis(5000));
        assert!(config.sentry_dsn.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = StorefrontConfig::from_lookup(lookup_from(&[
            ("RAFAL_API_BASE_URL", "http://127.0.0.1:9000"),
            ("RAFAL_ORDER_TIMEOUT_SECS", "5"),
            ("RAFAL_STORE_PATH", "/tmp/rafal.json"),
            ("SENTRY_DSN", ""),
        ]))
        .unwrap();
        assert_eq!(config.api_base_url.port(), Some(9000));
        assert_eq!(config.timeouts.order, Duration::from_secs(5));
        assert_eq!(config.store_path, PathBuf::from("/tmp/rafal.json"));
        assert!(config.sentry_dsn.is_none());
    }

    #[test]
    fn test_rejects_invalid_url() {
        let err = StorefrontConfig::from_lookup(lookup_from(&[("RAFAL_ADS_BASE_URL", "ftp://x")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(ref k, _) if k == "RAFAL_ADS_BASE_URL"));

        assert!(
            StorefrontConfig::from_lookup(lookup_from(&[("RAFAL_API_BASE_URL", "not a url")]))
                .is_err()
        );
    }

    #[test]
    fn test_rejects_zero_timeout() {
        let result =
            StorefrontConfig::from_lookup(lookup_from(&[("RAFAL_ADS_TIMEOUT_SECS", "0")]));
        assert!(result.is_err());
        let result =
            StorefrontConfig::from_lookup(lookup_from(&[("RAFAL_PING_TIMEOUT_SECS", "soon")]));
        assert!(result.is_err());
    }
}
