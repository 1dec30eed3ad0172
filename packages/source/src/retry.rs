//! HTTP retry helpers for transient errors.
//!
//! Callers use [`send_json`] instead of calling
//! `reqwest::RequestBuilder::send()` directly so that every request gets
//! exponential backoff on timeouts, connection resets, HTTP 429 and HTTP
//! 5xx.
//!
//! ```ignore
//! let body = retry::send_json(&policy, || client.get(&url).query(&params)).await?;
//! ```

use std::time::Duration;

use crate::SourceError;

/// Maximum length of the response body preview included in logs.
const BODY_PREVIEW_LEN: usize = 300;

/// Exponential backoff settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt. `0` disables retrying.
    pub max_retries: u32,
    /// Delay before the first retry; doubled for each further retry.
    pub base_delay: Duration,
    /// Upper bound for a single delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Delay before retry number `attempt` (1-based): `base * 2^(attempt-1)`,
    /// capped at [`Self::max_delay`].
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(16);
        self.base_delay
            .saturating_mul(1u32 << shift)
            .min(self.max_delay)
    }
}

/// Sends an HTTP request and parses the response body as JSON.
///
/// The `build_request` closure is called on each attempt to construct a
/// fresh [`reqwest::RequestBuilder`], since builders are consumed by
/// `.send()`.
///
/// An empty or non-JSON body is not an error: it is logged and returned as
/// [`serde_json::Value::Null`], leaving the caller to decide what a missing
/// payload means.
///
/// # Errors
///
/// Returns [`SourceError`] if the request fails after all retries or the
/// server returns a non-retryable status code.
#[allow(clippy::future_not_send)]
pub async fn send_json<F>(
    policy: &RetryPolicy,
    build_request: F,
) -> Result<serde_json::Value, SourceError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    for body_attempt in 0..=policy.max_retries {
        let response = send_inner(policy, &build_request).await?;

        let url = response.url().to_string();
        let status = response.status();

        match response.text().await {
            Ok(text) => {
                if text.trim().is_empty() {
                    log::warn!("Empty response body from {url} (status {status})");
                    return Ok(serde_json::Value::Null);
                }
                return Ok(serde_json::from_str(&text).unwrap_or_else(|e| {
                    log::warn!(
                        "Response from {url} is not JSON ({e}), treating as empty.\n  \
                         body preview: {}",
                        preview(&text),
                    );
                    serde_json::Value::Null
                }));
            }
            Err(e) => {
                if body_attempt < policy.max_retries {
                    let delay = policy.delay_for(body_attempt + 1);
                    log::warn!(
                        "Response body read failed (body retry {}/{}), \
                         re-fetching in {delay:?}...\n  \
                         url: {url}\n  \
                         status: {status}\n  \
                         error: {e}",
                        body_attempt + 1,
                        policy.max_retries,
                    );
                    tokio::time::sleep(delay).await;
                    continue;
                }
                log::error!("Response body read failed, giving up.\n  url: {url}\n  error: {e}");
                return Err(SourceError::Http(e));
            }
        }
    }

    unreachable!("send_json body retry loop exited without returning")
}

/// Core retry loop. Returns the first 2xx/3xx response.
#[allow(clippy::future_not_send)]
async fn send_inner<F>(
    policy: &RetryPolicy,
    build_request: &F,
) -> Result<reqwest::Response, SourceError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let max_retries = policy.max_retries;
    let mut attempt = 0;

    loop {
        if attempt > 0 {
            let delay = policy.delay_for(attempt);
            log::warn!("  retry {attempt}/{max_retries} in {delay:?}...");
            tokio::time::sleep(delay).await;
        }

        match build_request().send().await {
            Err(e) => {
                if is_transient(&e) && attempt < max_retries {
                    log::warn!("  transient error: {e}");
                    attempt += 1;
                    continue;
                }
                return Err(SourceError::Http(e));
            }
            Ok(response) => {
                let status = response.status();
                let retryable = status == reqwest::StatusCode::TOO_MANY_REQUESTS
                    || status.is_server_error();

                if retryable && attempt < max_retries {
                    log::warn!("  HTTP {status} from {}", response.url());
                    attempt += 1;
                    continue;
                }

                // 4xx (other than 429) is permanent; 429/5xx land here once
                // retries are exhausted.
                if status.is_client_error() || status.is_server_error() {
                    return Err(SourceError::Status {
                        status: status.as_u16(),
                        url: response.url().to_string(),
                    });
                }

                return Ok(response);
            }
        }
    }
}

/// Returns `true` if the error is likely transient and worth retrying.
fn is_transient(e: &reqwest::Error) -> bool {
    e.is_timeout() || e.is_connect() || e.is_body() || e.is_request()
}

fn preview(text: &str) -> &str {
    if text.len() <= BODY_PREVIEW_LEN {
        return text;
    }
    let mut end = BODY_PREVIEW_LEN;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delays_double_until_capped() {
        let policy = RetryPolicy {
            max_retries: 6,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(3),
        };
        assert_eq!(policy.delay_for(1), Duration::from_millis(500));
        assert_eq!(policy.delay_for(2), Duration::from_millis(1_000));
        assert_eq!(policy.delay_for(3), Duration::from_millis(2_000));
        assert_eq!(policy.delay_for(4), Duration::from_secs(3));
        assert_eq!(policy.delay_for(40), Duration::from_secs(3));
    }

    #[test]
    fn none_policy_never_waits() {
        let policy = RetryPolicy::none();
        assert_eq!(policy.max_retries, 0);
        assert_eq!(policy.delay_for(1), Duration::ZERO);
    }

    #[test]
    fn preview_respects_char_boundaries() {
        let text = "é".repeat(BODY_PREVIEW_LEN);
        let p = preview(&text);
        assert!(p.len() <= BODY_PREVIEW_LEN);
        assert!(text.starts_with(p));
    }

    #[tokio::test]
    async fn unreachable_host_is_http_error() {
        let client = reqwest::Client::new();
        // Port 9 (discard) is closed on loopback in test environments.
        let result = send_json(&RetryPolicy::none(), || client.get("http://127.0.0.1:9/")).await;
        assert!(matches!(result, Err(SourceError::Http(_))));
    }
}
