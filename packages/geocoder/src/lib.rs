#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Geocoding of free-text disaster locations.
//!
//! Place strings are resolved to [`GeoPoint`]s through the public
//! Nominatim / `OpenStreetMap` search endpoint ([`nominatim`]). Callers go
//! through a [`pool::GeocodePool`], which
//!
//! 1. looks up each distinct place string once and remembers the answer,
//! 2. keeps at most a fixed number of lookups in flight,
//! 3. spaces request starts to respect Nominatim's rate limit,
//! 4. bounds every lookup with a timeout and the whole pool with a request
//!    budget, and
//! 5. stops when its cancel token fires.
//!
//! A failed lookup is never an error for the caller: it resolves to `None`
//! and the marker is left off the map.

pub mod location;
pub mod markers;
pub mod nominatim;
pub mod pool;
pub mod service;

use std::time::Duration;

use async_trait::async_trait;
use disaster_map_disaster_models::GeoPoint;
use disaster_map_source::SourceError;
use thiserror::Error;

/// Errors from geocoding operations.
#[derive(Debug, Error)]
pub enum GeocodeError {
    /// HTTP request failed.
    #[error(transparent)]
    Source(#[from] SourceError),

    /// Response parsing failed.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of the parsing failure.
        message: String,
    },

    /// Rate limit still exceeded after backing off.
    #[error("Rate limit exceeded")]
    RateLimited,

    /// The lookup did not finish in time.
    #[error("Lookup timed out after {0:?}")]
    Timeout(Duration),

    /// The pool's request budget is used up.
    #[error("Request budget exhausted")]
    BudgetExhausted,

    /// The lookup was cancelled.
    #[error("Cancelled")]
    Cancelled,
}

impl GeocodeError {
    /// Returns `true` for failures worth retrying after a backoff: rate
    /// limiting, transport errors and HTTP 5xx.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimited | Self::Source(SourceError::Http(_)) => true,
            Self::Source(SourceError::Status { status, .. }) => *status >= 500,
            _ => false,
        }
    }
}

/// A service that turns a free-form place query into coordinates.
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Looks up `query`, returning `Ok(None)` when nothing matched.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError`] if the request or response parsing fails.
    async fn lookup(&self, query: &str) -> Result<Option<GeoPoint>, GeocodeError>;
}

/// Looks up `place`, collapsing every failure to `None`.
///
/// Failures are logged at `warn`; an empty result at `debug`.
pub async fn geocode(geocoder: &dyn Geocoder, place: &str) -> Option<GeoPoint> {
    match geocoder.lookup(place).await {
        Ok(Some(point)) => Some(point),
        Ok(None) => {
            log::debug!("Geocoder: no match for '{place}'");
            None
        }
        Err(e) => {
            log::warn!("Geocoding error for '{place}': {e}");
            None
        }
    }
}
