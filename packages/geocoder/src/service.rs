//! Compile-time geocoding service configuration.
//!
//! The Nominatim endpoint and its politeness limits live in
//! `services/nominatim.toml`, embedded at compile time and exposed through
//! [`nominatim_service`].

use std::time::Duration;

use disaster_map_source::retry::RetryPolicy;
use serde::Deserialize;

use crate::pool::PoolConfig;

/// A geocoding service configuration loaded from TOML.
#[derive(Debug, Clone, Deserialize)]
pub struct GeocodingService {
    /// Unique identifier (e.g. `"nominatim"`).
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Search endpoint URL.
    pub base_url: String,
    /// `User-Agent` header; the public Nominatim instance rejects requests
    /// without one.
    pub user_agent: String,
    /// Minimum delay between request starts in milliseconds.
    pub rate_limit_ms: u64,
    /// Maximum lookups in flight.
    #[serde(default = "default_concurrent")]
    pub concurrent_requests: usize,
    /// Per-lookup timeout in milliseconds, retries and backoff included.
    pub timeout_ms: u64,
    /// Maximum HTTP requests a single pool may issue, retries included.
    pub request_budget: u32,
    /// Retries on HTTP 429 / 5xx / transport errors.
    #[serde(default)]
    pub max_retries: u32,
    /// Delay before the first retry, doubled for each further retry.
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,
}

const fn default_concurrent() -> usize {
    4
}

const fn default_backoff_base_ms() -> u64 {
    1_000
}

impl GeocodingService {
    /// Backoff policy for HTTP requests to this service.
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        let base_delay = Duration::from_millis(self.backoff_base_ms);
        RetryPolicy {
            max_retries: self.max_retries,
            base_delay,
            max_delay: base_delay.saturating_mul(1 << self.max_retries.min(6)),
        }
    }

    /// Pool settings derived from this service's limits.
    #[must_use]
    pub fn pool_config(&self) -> PoolConfig {
        PoolConfig {
            concurrency: self.concurrent_requests.max(1),
            lookup_timeout: Duration::from_millis(self.timeout_ms),
            request_budget: self.request_budget,
            min_interval: Duration::from_millis(self.rate_limit_ms),
            retry: self.retry_policy(),
        }
    }
}

const NOMINATIM_TOML: &str = include_str!("../services/nominatim.toml");

/// Returns the embedded Nominatim service configuration.
///
/// # Panics
///
/// Panics if the embedded TOML is malformed, which the tests below rule
/// out.
#[must_use]
pub fn nominatim_service() -> GeocodingService {
    toml::de::from_str(NOMINATIM_TOML)
        .unwrap_or_else(|e| panic!("Failed to parse geocoding service 'nominatim': {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_nominatim_service() {
        let svc = nominatim_service();
        assert_eq!(svc.id, "nominatim");
        assert!(svc.base_url.starts_with("https://"));
        assert!(!svc.user_agent.is_empty());
    }

    #[test]
    fn respects_public_rate_limit() {
        let svc = nominatim_service();
        assert!(svc.rate_limit_ms >= 1_000);
        assert!(svc.concurrent_requests >= 1);
    }

    #[test]
    fn derived_configs_are_consistent() {
        let svc = nominatim_service();
        let pool = svc.pool_config();
        assert_eq!(pool.min_interval, Duration::from_millis(svc.rate_limit_ms));
        assert_eq!(pool.request_budget, svc.request_budget);

        assert_eq!(pool.retry, svc.retry_policy());
        assert_eq!(pool.retry.max_retries, svc.max_retries);
        assert!(pool.retry.max_delay >= pool.retry.base_delay);
    }

    #[test]
    fn full_backoff_fits_inside_lookup_timeout() {
        let pool = nominatim_service().pool_config();
        let backoff: Duration = (1..=pool.retry.max_retries)
            .map(|attempt| pool.retry.delay_for(attempt))
            .sum();
        assert!(backoff < pool.lookup_timeout, "{backoff:?} >= {:?}", pool.lookup_timeout);
    }
}
