//! Place-name resolution for the report screen.
//!
//! A reverse geocode is only worth one request: the resolver remembers the
//! key it last attempted and refuses to re-fire for it, whether the attempt
//! succeeded, failed, or is still outstanding. Re-renders with unchanged
//! inputs are therefore free. Failures are logged and otherwise silent;
//! the sentinel name covers the gap at display time.

use std::sync::Arc;

use geo_lookup::{extract_label, ReverseGeocoder};
use tokio::sync::Mutex;
use tracing::warn;

use crate::{Coordinate, ReportPayload, SelectedArea, DEFAULT_PLACE_NAME};

/// Identity of one reverse-geocode attempt. Coordinates are compared at
/// the bit level so a re-render with the same inputs maps to the same key.
#[derive(Debug, Clone, PartialEq, Eq)]
struct GeocodeKey {
    lat_bits: u64,
    lon_bits: u64,
    selected_name: Option<String>,
}

#[derive(Default)]
struct ResolverState {
    last_key: Option<GeocodeKey>,
    fetched: Option<String>,
    loading: bool,
}

pub struct PlaceNameResolver {
    provider: Arc<dyn ReverseGeocoder>,
    state: Mutex<ResolverState>,
}

impl PlaceNameResolver {
    pub fn new(provider: Arc<dyn ReverseGeocoder>) -> Self {
        Self {
            provider,
            state: Mutex::new(ResolverState::default()),
        }
    }

    /// True while a reverse-geocode request is outstanding.
    pub async fn is_loading(&self) -> bool {
        self.state.lock().await.loading
    }

    /// The label fetched so far, if any.
    pub async fn fetched_name(&self) -> Option<String> {
        self.state.lock().await.fetched.clone()
    }

    /// Drive resolution for one render.
    ///
    /// Issues at most one reverse-geocode request per distinct
    /// (coordinate, selected-name) key, and none at all when a usable name
    /// is already known or the coordinate is unresolved. Returns the
    /// fetched label once available.
    pub async fn resolve(
        &self,
        selected: Option<&SelectedArea>,
        payload: &ReportPayload,
        coordinate: Option<Coordinate>,
    ) -> Option<String> {
        if usable_name_known(selected, payload) {
            return self.fetched_name().await;
        }
        let Some(coordinate) = coordinate else {
            return self.fetched_name().await;
        };

        let key = GeocodeKey {
            lat_bits: coordinate.latitude.to_bits(),
            lon_bits: coordinate.longitude.to_bits(),
            selected_name: selected.and_then(|s| s.place_name.clone()),
        };
        {
            let mut state = self.state.lock().await;
            if state.loading || state.last_key.as_ref() == Some(&key) {
                return state.fetched.clone();
            }
            state.last_key = Some(key);
            state.loading = true;
        }

        let outcome = self
            .provider
            .reverse(coordinate.latitude, coordinate.longitude)
            .await;

        let mut state = self.state.lock().await;
        state.loading = false;
        match outcome {
            Ok(result) => {
                if let Some(label) = extract_label(&result) {
                    state.fetched = Some(label);
                }
            }
            Err(err) => warn!(
                "reverse geocoding failed for ({:.4}, {:.4}): {}",
                coordinate.latitude, coordinate.longitude, err
            ),
        }
        state.fetched.clone()
    }
}

/// A name good enough to skip the network call: a non-sentinel selected
/// name, or any non-blank server-supplied one.
fn usable_name_known(selected: Option<&SelectedArea>, payload: &ReportPayload) -> bool {
    let selected_ok = selected
        .and_then(|s| s.place_name.as_deref())
        .map(|n| !n.trim().is_empty() && n != DEFAULT_PLACE_NAME)
        .unwrap_or(false);
    let payload_ok = payload
        .place_name
        .as_deref()
        .map(|n| !n.trim().is_empty())
        .unwrap_or(false);
    selected_ok || payload_ok
}
