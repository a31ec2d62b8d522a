//! Nominatim HTTP client.
//!
//! Implements both provider traits against a configurable base URL (the
//! public OSM instance by default). The provider's usage policy requires a
//! fixed application identifier, sent as the User-Agent on every call.

use std::time::Duration;

use futures::future::BoxFuture;
use serde::Deserialize;

use crate::{
    AddressDetails, GeocodeError, Result, ReverseGeocodeResult, ReverseGeocoder, SearchProvider,
    SearchSuggestion,
};

pub const DEFAULT_BASE_URL: &str = "https://nominatim.openstreetmap.org";

/// Application identifier required by the provider's usage policy.
pub const APP_USER_AGENT: &str = "terrascope/0.1 (sustainability-analysis)";

/// Result-count cap for suggestion lists.
const SEARCH_LIMIT: u32 = 5;

/// Reverse lookups resolve at neighbourhood-to-town detail.
const REVERSE_ZOOM: u32 = 14;

const REQUEST_TIMEOUT_SEC: u64 = 10;

#[derive(Clone)]
pub struct NominatimClient {
    client: reqwest::Client,
    base_url: String,
}

impl NominatimClient {
    pub fn new() -> Result<Self> {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    pub fn with_base_url(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(APP_USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SEC))
            .build()
            .map_err(|e| GeocodeError::Request(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Free-text place search. Records the provider cannot express as a
    /// coordinate pair are dropped rather than failing the whole list.
    pub async fn search_places(&self, query: &str) -> Result<Vec<SearchSuggestion>> {
        let limit = SEARCH_LIMIT.to_string();
        let response = self
            .client
            .get(format!("{}/search", self.base_url))
            .query(&[
                ("q", query),
                ("format", "jsonv2"),
                ("addressdetails", "1"),
                ("limit", limit.as_str()),
            ])
            .send()
            .await
            .map_err(|e| GeocodeError::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(GeocodeError::Status(response.status().as_u16()));
        }

        let records: Vec<SearchRecord> = response
            .json()
            .await
            .map_err(|e| GeocodeError::Parse(e.to_string()))?;

        Ok(records
            .into_iter()
            .filter_map(SearchRecord::into_suggestion)
            .collect())
    }

    /// Structured address lookup for a coordinate.
    pub async fn reverse_lookup(&self, lat: f64, lon: f64) -> Result<ReverseGeocodeResult> {
        let zoom = REVERSE_ZOOM.to_string();
        let response = self
            .client
            .get(format!("{}/reverse", self.base_url))
            .query(&[
                ("lat", format!("{lat}").as_str()),
                ("lon", format!("{lon}").as_str()),
                ("format", "jsonv2"),
                ("zoom", zoom.as_str()),
                ("addressdetails", "1"),
            ])
            .send()
            .await
            .map_err(|e| GeocodeError::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(GeocodeError::Status(response.status().as_u16()));
        }

        let record: ReverseRecord = response
            .json()
            .await
            .map_err(|e| GeocodeError::Parse(e.to_string()))?;

        Ok(ReverseGeocodeResult {
            address: record.address,
            display_name: record.display_name,
        })
    }
}

impl SearchProvider for NominatimClient {
    fn search(&self, query: &str) -> BoxFuture<'static, Result<Vec<SearchSuggestion>>> {
        let this = self.clone();
        let query = query.to_string();
        Box::pin(async move { this.search_places(&query).await })
    }
}

impl ReverseGeocoder for NominatimClient {
    fn reverse(&self, lat: f64, lon: f64) -> BoxFuture<'static, Result<ReverseGeocodeResult>> {
        let this = self.clone();
        Box::pin(async move { this.reverse_lookup(lat, lon).await })
    }
}

/// Raw search record. Nominatim serializes coordinates as strings.
#[derive(Debug, Deserialize)]
struct SearchRecord {
    place_id: u64,
    display_name: String,
    lat: String,
    lon: String,
    #[serde(default, rename = "type")]
    kind: String,
    #[serde(default)]
    importance: Option<f64>,
}

impl SearchRecord {
    fn into_suggestion(self) -> Option<SearchSuggestion> {
        let lat = self.lat.parse().ok()?;
        let lon = self.lon.parse().ok()?;
        Some(SearchSuggestion {
            id: self.place_id,
            name: self.display_name,
            lat,
            lon,
            kind: self.kind,
            importance: self.importance.unwrap_or(0.0),
        })
    }
}

#[derive(Debug, Deserialize)]
struct ReverseRecord {
    #[serde(default)]
    address: AddressDetails,
    #[serde(default)]
    display_name: Option<String>,
}
