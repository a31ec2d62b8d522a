//! Place search and reverse geocoding for Terrascope.
//!
//! Both lookups are modeled as object-safe provider traits so the selector
//! and report screens can run against the live Nominatim client or the
//! mocks used in tests. Provider failures are always recoverable: callers
//! degrade to an empty suggestion list or an unnamed location.

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod nominatim;

pub use nominatim::NominatimClient;

#[derive(Error, Debug)]
pub enum GeocodeError {
    #[error("request failed: {0}")]
    Request(String),
    #[error("provider returned status {0}")]
    Status(u16),
    #[error("malformed provider response: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, GeocodeError>;

/// One entry in the search suggestion list.
///
/// Lives only in the active search session and is superseded wholesale on
/// each successful query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchSuggestion {
    pub id: u64,
    /// Full display form, e.g. "Alexanderplatz, Mitte, Berlin, Germany".
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    /// Provider category ("city", "peak", "park", ...).
    pub kind: String,
    /// Relevance score, higher is better.
    pub importance: f64,
}

/// Structured address breakdown from the reverse geocoder.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AddressDetails {
    pub neighbourhood: Option<String>,
    pub suburb: Option<String>,
    pub town: Option<String>,
    pub city: Option<String>,
    pub county: Option<String>,
    pub state: Option<String>,
}

/// Reverse geocoding result: structured components plus the provider's
/// full display string.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReverseGeocodeResult {
    pub address: AddressDetails,
    pub display_name: Option<String>,
}

/// Free-text place lookup, most relevant results first.
pub trait SearchProvider: Send + Sync {
    fn search(&self, query: &str) -> BoxFuture<'static, Result<Vec<SearchSuggestion>>>;
}

/// Coordinate to structured-address lookup.
pub trait ReverseGeocoder: Send + Sync {
    fn reverse(&self, lat: f64, lon: f64) -> BoxFuture<'static, Result<ReverseGeocodeResult>>;
}

/// Pick a human-readable label out of a reverse geocode result.
///
/// The most specific available component wins: neighbourhood, suburb,
/// town, city, county, then state. A city (or failing that, state) that
/// differs from the chosen component is appended as a disambiguating
/// suffix ("Mitte, Berlin"). When no structured component is present the
/// first comma-delimited segment of the display string is used instead.
pub fn extract_label(result: &ReverseGeocodeResult) -> Option<String> {
    let a = &result.address;
    let candidates = [
        a.neighbourhood.as_deref(),
        a.suburb.as_deref(),
        a.town.as_deref(),
        a.city.as_deref(),
        a.county.as_deref(),
        a.state.as_deref(),
    ];

    let Some(primary) = candidates.into_iter().flatten().next() else {
        return result
            .display_name
            .as_deref()
            .and_then(|d| d.split(',').next())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from);
    };

    let suffix = a
        .city
        .as_deref()
        .filter(|c| *c != primary)
        .or_else(|| a.state.as_deref().filter(|s| *s != primary));

    Some(match suffix {
        Some(suffix) => format!("{primary}, {suffix}"),
        None => primary.to_string(),
    })
}
