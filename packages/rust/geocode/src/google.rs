//! Google Geocoding JSON API client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument};
use url::Url;

use vanbuilder_shared::{Accuracy, GeocodeResult, Result, VanBuilderError};

use crate::Geocoder;

/// Maximum number of redirects to follow.
const MAX_REDIRECTS: usize = 3;

/// User-Agent string for geocoding requests.
const USER_AGENT: &str = concat!("vanbuilder/", env!("CARGO_PKG_VERSION"));

/// Source label on results from this service.
const SOURCE: &str = "google";

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    results: Vec<GeocodeHit>,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeocodeHit {
    geometry: Geometry,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: LatLng,
    #[serde(default)]
    location_type: String,
}

#[derive(Debug, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

/// Client for the Google Geocoding JSON endpoint.
pub struct GoogleGeocoder {
    client: Client,
    endpoint: Url,
    api_key: String,
}

impl GoogleGeocoder {
    /// Create a client for `endpoint` (normally
    /// `https://maps.googleapis.com/maps/api/geocode/json`).
    pub fn new(endpoint: &str, api_key: impl Into<String>, timeout: Duration) -> Result<Self> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| VanBuilderError::config(format!("invalid geocoding endpoint {endpoint}: {e}")))?;
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .timeout(timeout)
            .build()
            .map_err(|e| VanBuilderError::Geocode(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint,
            api_key: api_key.into(),
        })
    }

    fn request_url(&self, query: &str) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("address", query)
            .append_pair("key", &self.api_key);
        url
    }
}

#[async_trait(?Send)]
impl Geocoder for GoogleGeocoder {
    #[instrument(skip_all, fields(query = %query))]
    async fn geocode(&self, query: &str) -> Result<Option<GeocodeResult>> {
        let response = self
            .client
            .get(self.request_url(query))
            .send()
            .await
            .map_err(|e| VanBuilderError::Geocode(format!("{query}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(VanBuilderError::Geocode(format!("{query}: HTTP {status}")));
        }

        let body: GeocodeResponse = response
            .json()
            .await
            .map_err(|e| VanBuilderError::Geocode(format!("{query}: invalid response: {e}")))?;

        match body.status.as_str() {
            "OK" => {}
            "ZERO_RESULTS" => {
                debug!("no geocoding match");
                return Ok(None);
            }
            other => {
                let detail = body.error_message.unwrap_or_default();
                return Err(VanBuilderError::Geocode(format!("{query}: {other} {detail}")));
            }
        }

        let Some(hit) = body.results.into_iter().next() else {
            return Ok(None);
        };
        let accuracy = if hit.geometry.location_type == "ROOFTOP" {
            Accuracy::High
        } else {
            Accuracy::Medium
        };
        debug!(%accuracy, location_type = %hit.geometry.location_type, "geocoded");

        Ok(Some(GeocodeResult {
            lat: hit.geometry.location.lat,
            lng: hit.geometry.location.lng,
            accuracy,
            source: SOURCE.to_string(),
        }))
    }
}
