#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Disaster records API client and row normalization.
//!
//! The records API is queried once per [`DisasterCategory`] through the
//! [`RecordSource`] trait. Every category is fetched independently: a
//! timeout or HTTP failure in one category is recorded in the
//! [`fetch::FetchReport`] without discarding the rows of the others.
//! Raw rows are then turned into [`DisasterRecord`]s by [`normalize`].
//!
//! [`DisasterRecord`]: disaster_map_disaster_models::DisasterRecord

pub mod cancel;
pub mod config;
pub mod fetch;
pub mod normalize;
pub mod progress;
pub mod retry;

use async_trait::async_trait;
use disaster_map_disaster_models::DisasterCategory;

/// Errors that can occur while talking to the records API.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// HTTP request failed (connection, timeout, body read).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("HTTP {status} from {url}")]
    Status {
        /// Status code returned by the server.
        status: u16,
        /// Request URL.
        url: String,
    },

    /// The operation was cancelled before it completed.
    #[error("cancelled")]
    Cancelled,

    /// Invalid configuration (e.g. missing base URL).
    #[error("Configuration error: {message}")]
    Config {
        /// Description of what is wrong.
        message: String,
    },
}

impl SourceError {
    /// Returns `true` if the server rate limited the request.
    #[must_use]
    pub const fn is_rate_limited(&self) -> bool {
        matches!(self, Self::Status { status: 429, .. })
    }
}

/// Something that can serve raw disaster rows.
///
/// [`fetch::HttpRecordSource`] is the production implementation; tests
/// substitute in-memory fakes.
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Fetches every row of `category`.
    ///
    /// A response that is not a JSON array yields an empty vector.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the request fails after all retries.
    async fn fetch_category(
        &self,
        category: DisasterCategory,
    ) -> Result<Vec<serde_json::Value>, SourceError>;

    /// Fetches the rows of `category` for a single year.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the request fails after all retries.
    async fn fetch_category_year(
        &self,
        category: DisasterCategory,
        year: u16,
    ) -> Result<Vec<serde_json::Value>, SourceError>;
}
