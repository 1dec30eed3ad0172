//! Nominatim / `OpenStreetMap` geocoder client.
//!
//! Nominatim has strict rate limits: **1 request per second** on the public
//! instance. Each [`Geocoder::lookup`] call issues exactly one HTTP request;
//! spacing, backoff on HTTP 429 and the request budget are applied per
//! request by [`crate::pool::GeocodePool`].
//!
//! See <https://nominatim.org/release-docs/develop/api/Search/>

use async_trait::async_trait;
use disaster_map_disaster_models::GeoPoint;
use disaster_map_source::retry::{self, RetryPolicy};

use crate::service::GeocodingService;
use crate::{GeocodeError, Geocoder};

/// HTTP client for a Nominatim search endpoint.
pub struct NominatimClient {
    client: reqwest::Client,
    base_url: String,
}

impl NominatimClient {
    /// Builds a client from a service configuration.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError::Source`] if the HTTP client cannot be built.
    pub fn new(service: &GeocodingService) -> Result<Self, GeocodeError> {
        let client = reqwest::Client::builder()
            .user_agent(&service.user_agent)
            .build()
            .map_err(disaster_map_source::SourceError::from)?;
        Ok(Self {
            client,
            base_url: service.base_url.clone(),
        })
    }
}

#[async_trait]
impl Geocoder for NominatimClient {
    async fn lookup(&self, query: &str) -> Result<Option<GeoPoint>, GeocodeError> {
        let body = retry::send_json(&RetryPolicy::none(), || {
            self.client
                .get(&self.base_url)
                .query(&[("q", query), ("format", "json"), ("limit", "1")])
        })
        .await
        .map_err(|e| {
            if e.is_rate_limited() {
                GeocodeError::RateLimited
            } else {
                GeocodeError::Source(e)
            }
        })?;

        parse_response(&body)
    }
}

/// Parses a Nominatim JSON response, taking the first candidate.
fn parse_response(body: &serde_json::Value) -> Result<Option<GeoPoint>, GeocodeError> {
    let results = body.as_array().ok_or_else(|| GeocodeError::Parse {
        message: "Nominatim response is not an array".to_string(),
    })?;

    let Some(first) = results.first() else {
        return Ok(None);
    };

    let lat = coordinate(&first["lat"]).ok_or_else(|| GeocodeError::Parse {
        message: "Missing lat in Nominatim response".to_string(),
    })?;

    let lng = coordinate(&first["lon"]).ok_or_else(|| GeocodeError::Parse {
        message: "Missing lon in Nominatim response".to_string(),
    })?;

    Ok(Some(GeoPoint { lat, lng }))
}

/// Nominatim sends coordinates as strings; accept bare numbers too.
fn coordinate(value: &serde_json::Value) -> Option<f64> {
    value
        .as_str()
        .and_then(|s| s.parse::<f64>().ok())
        .or_else(|| value.as_f64())
}
