//! Location selector core.
//!
//! Drives the search-and-select screen: debounced place search with
//! stale-result sequencing, map click handling, manual coordinate entry
//! validation, and the report submission flow with its re-entry guard.
//!
//! Everything runs on the cooperative async timeline; the debounce timer
//! is the one owned resource, aborted on re-trigger and on teardown.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use geo_lookup::{SearchProvider, SearchSuggestion};
use report_view::{ReportPayload, SelectedArea};
use thiserror::Error;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::warn;

pub mod report_api;

pub use report_api::HttpReportService;

pub const DEBOUNCE_MS: u64 = 300;

/// Queries shorter than this never issue a request.
pub const MIN_QUERY_LEN: usize = 2;

/// Zoom applied when a suggestion is chosen.
pub const SELECT_ZOOM: u8 = 13;

pub const DEFAULT_CENTER: (f64, f64) = (20.5937, 78.9629);
pub const DEFAULT_ZOOM: u8 = 5;

pub const GENERIC_SUBMIT_ERROR: &str = "Failed to generate the report. Please try again.";

/// Where the search session currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchPhase {
    Idle,
    /// Debounce timer armed, no request issued yet.
    Typing,
    /// Request in flight.
    Searching,
    ResultsShown,
    NoResults,
}

/// Report service failure, split by whether the server supplied a
/// human-readable rejection.
#[derive(Error, Debug)]
pub enum ReportServiceError {
    #[error("{0}")]
    Rejected(String),
    #[error("request failed: {0}")]
    Transport(String),
}

impl ReportServiceError {
    /// Message shown to the user: the server's detail verbatim, else a
    /// generic retry prompt.
    pub fn user_message(&self) -> String {
        match self {
            Self::Rejected(detail) => detail.clone(),
            Self::Transport(_) => GENERIC_SUBMIT_ERROR.to_string(),
        }
    }
}

/// Report-generation endpoint, abstracted for tests.
pub trait ReportService: Send + Sync {
    fn generate(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> BoxFuture<'static, Result<ReportPayload, ReportServiceError>>;
}

#[derive(Error, Debug)]
pub enum SubmitError {
    /// Manual entry rejected locally; no request was made.
    #[error("{0}")]
    Invalid(String),
    /// A submission is already in flight.
    #[error("a report request is already in flight")]
    InFlight,
    /// The report service refused or failed.
    #[error("{0}")]
    Service(String),
}

/// Render-ready copy of the selector state.
#[derive(Debug, Clone)]
pub struct SelectorSnapshot {
    pub phase: SearchPhase,
    pub search_text: String,
    pub suggestions: Vec<SearchSuggestion>,
    pub map_center: (f64, f64),
    pub zoom: u8,
    pub marker: (f64, f64),
    pub latitude_field: String,
    pub longitude_field: String,
    pub validation_error: Option<String>,
    pub submit_error: Option<String>,
    pub loading: bool,
}

struct SelectorInner {
    phase: SearchPhase,
    search_text: String,
    suggestions: Vec<SearchSuggestion>,
    map_center: (f64, f64),
    zoom: u8,
    marker: (f64, f64),
    latitude_field: String,
    longitude_field: String,
    selected_place_name: Option<String>,
    validation_error: Option<String>,
    submit_error: Option<String>,
    loading: bool,
}

impl Default for SelectorInner {
    fn default() -> Self {
        Self {
            phase: SearchPhase::Idle,
            search_text: String::new(),
            suggestions: Vec::new(),
            map_center: DEFAULT_CENTER,
            zoom: DEFAULT_ZOOM,
            marker: DEFAULT_CENTER,
            latitude_field: String::new(),
            longitude_field: String::new(),
            selected_place_name: None,
            validation_error: None,
            submit_error: None,
            loading: false,
        }
    }
}

pub struct LocationSelector {
    inner: Arc<RwLock<SelectorInner>>,
    search: Arc<dyn SearchProvider>,
    reports: Arc<dyn ReportService>,
    /// Bumped on every event that supersedes in-flight search results;
    /// a request claims a generation when it fires and its result is
    /// applied only while that claim is still current.
    generation: Arc<AtomicU64>,
    debounce: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl LocationSelector {
    pub fn new(search: Arc<dyn SearchProvider>, reports: Arc<dyn ReportService>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(SelectorInner::default())),
            search,
            reports,
            generation: Arc::new(AtomicU64::new(0)),
            debounce: std::sync::Mutex::new(None),
        }
    }

    pub async fn snapshot(&self) -> SelectorSnapshot {
        let inner = self.inner.read().await;
        SelectorSnapshot {
            phase: inner.phase,
            search_text: inner.search_text.clone(),
            suggestions: inner.suggestions.clone(),
            map_center: inner.map_center,
            zoom: inner.zoom,
            marker: inner.marker,
            latitude_field: inner.latitude_field.clone(),
            longitude_field: inner.longitude_field.clone(),
            validation_error: inner.validation_error.clone(),
            submit_error: inner.submit_error.clone(),
            loading: inner.loading,
        }
    }

    /// A keystroke in the search box. Re-arms the debounce timer; a query
    /// below the minimum length clears the suggestion list immediately
    /// without issuing a request.
    pub async fn on_input(&self, text: &str) {
        self.cancel_debounce();
        self.generation.fetch_add(1, Ordering::SeqCst);

        let query = text.to_string();
        {
            let mut inner = self.inner.write().await;
            inner.search_text = query.clone();
            if query.trim().chars().count() < MIN_QUERY_LEN {
                inner.suggestions.clear();
                inner.phase = SearchPhase::Idle;
                return;
            }
            inner.phase = SearchPhase::Typing;
        }

        let inner = Arc::clone(&self.inner);
        let search = Arc::clone(&self.search);
        let generation = Arc::clone(&self.generation);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(DEBOUNCE_MS)).await;

            let claimed = generation.fetch_add(1, Ordering::SeqCst) + 1;
            inner.write().await.phase = SearchPhase::Searching;

            // The request itself is fire-and-forget: only the debounce
            // timer is cancellable. A superseded request runs to
            // completion and its result is dropped by the claim check.
            tokio::spawn(async move {
                let outcome = search.search(&query).await;
                if generation.load(Ordering::SeqCst) != claimed {
                    return; // superseded while in flight
                }

                let mut state = inner.write().await;
                match outcome {
                    Ok(suggestions) => {
                        state.phase = if suggestions.is_empty() {
                            SearchPhase::NoResults
                        } else {
                            SearchPhase::ResultsShown
                        };
                        state.suggestions = suggestions;
                    }
                    Err(err) => {
                        warn!("place search failed for {:?}: {}", query, err);
                        state.suggestions.clear();
                        state.phase = SearchPhase::NoResults;
                    }
                }
            });
        });
        self.store_debounce(handle);
    }

    /// The user picked a suggestion: it becomes the search text, the map
    /// recenters on it, and the entry fields are derived from its
    /// coordinate at 4-decimal precision.
    pub async fn select_suggestion(&self, suggestion: &SearchSuggestion) {
        self.cancel_debounce();
        self.generation.fetch_add(1, Ordering::SeqCst);

        let mut inner = self.inner.write().await;
        inner.search_text = suggestion.name.clone();
        inner.suggestions.clear();
        inner.map_center = (suggestion.lat, suggestion.lon);
        inner.zoom = SELECT_ZOOM;
        inner.marker = (suggestion.lat, suggestion.lon);
        inner.latitude_field = format!("{:.4}", suggestion.lat);
        inner.longitude_field = format!("{:.4}", suggestion.lon);
        inner.selected_place_name = Some(suggestion.name.clone());
        inner.validation_error = None;
        inner.phase = SearchPhase::Idle;
    }

    /// A direct click on the map. The two input modes are mutually
    /// exclusive in what they last touched, so the search text is cleared.
    pub async fn on_map_click(&self, lat: f64, lon: f64) {
        self.cancel_debounce();
        self.generation.fetch_add(1, Ordering::SeqCst);

        let mut inner = self.inner.write().await;
        inner.marker = (lat, lon);
        inner.latitude_field = format!("{lat:.4}");
        inner.longitude_field = format!("{lon:.4}");
        inner.search_text.clear();
        inner.suggestions.clear();
        inner.selected_place_name = None;
        inner.validation_error = None;
        inner.phase = SearchPhase::Idle;
    }

    pub async fn set_latitude_field(&self, text: &str) {
        self.inner.write().await.latitude_field = text.to_string();
    }

    pub async fn set_longitude_field(&self, text: &str) {
        self.inner.write().await.longitude_field = text.to_string();
    }

    /// Form submit. Validates locally first (no request on bad input),
    /// rejects re-entry while a request is in flight, and on success hands
    /// back the payload together with the selected-area descriptor for the
    /// report screen.
    pub async fn submit(&self) -> Result<(ReportPayload, SelectedArea), SubmitError> {
        let (latitude, longitude, place_name) = {
            let mut inner = self.inner.write().await;
            if inner.loading {
                return Err(SubmitError::InFlight);
            }

            let latitude =
                match parse_coordinate_field(&inner.latitude_field, inner.marker.0, Axis::Latitude)
                {
                    Ok(v) => v,
                    Err(message) => {
                        inner.validation_error = Some(message.clone());
                        return Err(SubmitError::Invalid(message));
                    }
                };
            let longitude = match parse_coordinate_field(
                &inner.longitude_field,
                inner.marker.1,
                Axis::Longitude,
            ) {
                Ok(v) => v,
                Err(message) => {
                    inner.validation_error = Some(message.clone());
                    return Err(SubmitError::Invalid(message));
                }
            };

            inner.validation_error = None;
            inner.submit_error = None;
            inner.loading = true;
            (latitude, longitude, inner.selected_place_name.clone())
        };

        let outcome = self.reports.generate(latitude, longitude).await;

        let mut inner = self.inner.write().await;
        inner.loading = false;
        match outcome {
            Ok(payload) => Ok((
                payload,
                SelectedArea {
                    latitude: Some(latitude),
                    longitude: Some(longitude),
                    place_name,
                },
            )),
            Err(err) => {
                let message = err.user_message();
                inner.submit_error = Some(message.clone());
                Err(SubmitError::Service(message))
            }
        }
    }

    fn cancel_debounce(&self) {
        if let Ok(mut slot) = self.debounce.lock() {
            if let Some(handle) = slot.take() {
                handle.abort();
            }
        }
    }

    fn store_debounce(&self, handle: JoinHandle<()>) {
        if let Ok(mut slot) = self.debounce.lock() {
            if let Some(previous) = slot.replace(handle) {
                previous.abort();
            }
        }
    }
}

impl Drop for LocationSelector {
    fn drop(&mut self) {
        // No orphaned timer may fire after the screen is gone.
        self.cancel_debounce();
    }
}

#[derive(Clone, Copy)]
enum Axis {
    Latitude,
    Longitude,
}

impl Axis {
    fn label(self) -> &'static str {
        match self {
            Axis::Latitude => "Latitude",
            Axis::Longitude => "Longitude",
        }
    }

    fn range(self) -> std::ops::RangeInclusive<f64> {
        match self {
            Axis::Latitude => -90.0..=90.0,
            Axis::Longitude => -180.0..=180.0,
        }
    }
}

/// Parse one entry field, falling back to the marker position when the
/// field is blank. Rejects non-finite and out-of-range values.
fn parse_coordinate_field(text: &str, fallback: f64, axis: Axis) -> Result<f64, String> {
    let trimmed = text.trim();
    let value = if trimmed.is_empty() {
        fallback
    } else {
        trimmed
            .parse::<f64>()
            .map_err(|_| format!("{} must be a number", axis.label()))?
    };
    if !value.is_finite() || !axis.range().contains(&value) {
        let range = axis.range();
        return Err(format!(
            "{} must be between {} and {}",
            axis.label(),
            range.start(),
            range.end()
        ));
    }
    Ok(value)
}
