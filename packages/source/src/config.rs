//! Records API configuration.
//!
//! The only deployment-specific setting is the API base URL, read from the
//! `DISASTER_API_BASE_URL` environment variable unless given explicitly.

use std::time::Duration;

use crate::SourceError;
use crate::retry::RetryPolicy;

/// Environment variable holding the records API base URL.
pub const BASE_URL_ENV: &str = "DISASTER_API_BASE_URL";

/// Per-request timeout applied to every records API call.
pub const DEFAULT_TIMEOUT_MS: u64 = 5_000;

/// `User-Agent` sent with every request.
pub const USER_AGENT: &str = concat!("disaster_map/", env!("CARGO_PKG_VERSION"));

/// Connection settings for the records API.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Base URL without a trailing slash (e.g. `"https://api.example.org"`).
    pub base_url: String,
    /// Timeout for a single HTTP request.
    pub timeout: Duration,
    /// Backoff policy for transient failures.
    pub retry: RetryPolicy,
}

impl ApiConfig {
    /// Creates a config for `base_url` with the default timeout and retry
    /// policy.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Config`] if `base_url` is blank or not HTTP(S).
    pub fn new(base_url: &str) -> Result<Self, SourceError> {
        let base_url = base_url.trim().trim_end_matches('/');
        if base_url.is_empty() {
            return Err(SourceError::Config {
                message: "records API base URL is empty".to_string(),
            });
        }
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(SourceError::Config {
                message: format!("records API base URL must be http(s): {base_url}"),
            });
        }
        Ok(Self {
            base_url: base_url.to_string(),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            retry: RetryPolicy::default(),
        })
    }

    /// Builds a config from [`BASE_URL_ENV`].
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Config`] if the variable is unset or invalid.
    pub fn from_env() -> Result<Self, SourceError> {
        let base_url = std::env::var(BASE_URL_ENV).map_err(|_| SourceError::Config {
            message: format!("{BASE_URL_ENV} is not set"),
        })?;
        Self::new(&base_url)
    }

    /// Overrides the per-request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Overrides the retry policy.
    #[must_use]
    pub const fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// URL of the `/disasters` collection.
    #[must_use]
    pub fn disasters_url(&self) -> String {
        format!("{}/disasters", self.base_url)
    }

    /// Builds an HTTP client honoring [`Self::timeout`].
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Http`] if the TLS backend fails to initialize.
    pub fn build_client(&self) -> Result<reqwest::Client, SourceError> {
        Ok(reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(USER_AGENT)
            .build()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_trailing_slash() {
        let config = ApiConfig::new("https://api.example.org/").unwrap();
        assert_eq!(config.disasters_url(), "https://api.example.org/disasters");
    }

    #[test]
    fn default_timeout_is_five_seconds() {
        let config = ApiConfig::new("http://localhost:3000").unwrap();
        assert_eq!(config.timeout, Duration::from_millis(5_000));
    }

    #[test]
    fn rejects_blank_and_non_http_urls() {
        assert!(matches!(
            ApiConfig::new("   "),
            Err(SourceError::Config { .. })
        ));
        assert!(matches!(
            ApiConfig::new("ftp://example.org"),
            Err(SourceError::Config { .. })
        ));
    }
}
