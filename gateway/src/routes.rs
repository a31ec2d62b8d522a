//! HTTP routes for the Terrascope gateway.
//!
//! Geocoding provider failures degrade silently (empty suggestion list, no
//! place name) so the screens stay usable; only report submission surfaces
//! an error message, and the server-supplied `detail` wins when present.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

use geo_lookup::{extract_label, SearchSuggestion};
use report_view::{resolve_coordinate, PlaceNameResolver, ReportPayload, ReportView, SelectedArea};

use crate::AppState;

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "terrascope-gateway",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub detail: String,
}

fn bad_request(detail: &str) -> (StatusCode, Json<ErrorDetail>) {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorDetail {
            detail: detail.to_string(),
        }),
    )
}

fn coordinate_in_range(latitude: f64, longitude: f64) -> bool {
    latitude.is_finite()
        && longitude.is_finite()
        && (-90.0..=90.0).contains(&latitude)
        && (-180.0..=180.0).contains(&longitude)
}

// ---- Place search ----

#[derive(Deserialize)]
pub struct SearchQuery {
    pub q: String,
}

#[derive(Serialize)]
pub struct SearchResponse {
    pub suggestions: Vec<SearchSuggestion>,
}

pub async fn search_places(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Json<SearchResponse> {
    if query.q.trim().chars().count() < site_selector::MIN_QUERY_LEN {
        return Json(SearchResponse {
            suggestions: Vec::new(),
        });
    }

    match state.geocoder.search_places(&query.q).await {
        Ok(suggestions) => Json(SearchResponse { suggestions }),
        Err(err) => {
            warn!("place search failed for {:?}: {}", query.q, err);
            Json(SearchResponse {
                suggestions: Vec::new(),
            })
        }
    }
}

// ---- Reverse geocoding ----

#[derive(Deserialize)]
pub struct ReverseQuery {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Serialize)]
pub struct ReverseResponse {
    pub name: Option<String>,
}

pub async fn reverse_geocode(
    State(state): State<AppState>,
    Query(query): Query<ReverseQuery>,
) -> Result<Json<ReverseResponse>, (StatusCode, Json<ErrorDetail>)> {
    if !coordinate_in_range(query.lat, query.lon) {
        return Err(bad_request(
            "latitude must be within -90..90 and longitude within -180..180",
        ));
    }

    match state.geocoder.reverse_lookup(query.lat, query.lon).await {
        Ok(result) => Ok(Json(ReverseResponse {
            name: extract_label(&result),
        })),
        Err(err) => {
            warn!(
                "reverse geocoding failed for ({:.4}, {:.4}): {}",
                query.lat, query.lon, err
            );
            Ok(Json(ReverseResponse { name: None }))
        }
    }
}

// ---- Report generation ----

#[derive(Deserialize)]
pub struct ReportRequest {
    pub latitude: f64,
    pub longitude: f64,
}

pub async fn generate_report(
    State(state): State<AppState>,
    Json(request): Json<ReportRequest>,
) -> Result<Json<ReportPayload>, (StatusCode, Json<ErrorDetail>)> {
    if !coordinate_in_range(request.latitude, request.longitude) {
        return Err(bad_request("Invalid coordinates"));
    }

    match state
        .reports
        .generate_report(request.latitude, request.longitude)
        .await
    {
        Ok(payload) => Ok(Json(payload)),
        Err(err) => Err((
            StatusCode::BAD_GATEWAY,
            Json(ErrorDetail {
                detail: err.user_message(),
            }),
        )),
    }
}

// ---- Report view ----

#[derive(Deserialize)]
pub struct ViewRequest {
    pub payload: ReportPayload,
    #[serde(default)]
    pub selected_area: Option<SelectedArea>,
}

/// Build the fully resolved view model for the report screen, including
/// the reverse-geocoded place name when no usable name was supplied.
pub async fn build_report_view(
    State(state): State<AppState>,
    Json(request): Json<ViewRequest>,
) -> Json<ReportView> {
    let provider: Arc<dyn geo_lookup::ReverseGeocoder> = state.geocoder.clone();
    let resolver = PlaceNameResolver::new(provider);
    let coordinate = resolve_coordinate(request.selected_area.as_ref(), Some(&request.payload));
    let fetched = resolver
        .resolve(request.selected_area.as_ref(), &request.payload, coordinate)
        .await;

    Json(ReportView::build(
        request.selected_area.as_ref(),
        &request.payload,
        fetched.as_deref(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_lookup::NominatimClient;
    use site_selector::HttpReportService;

    fn state() -> AppState {
        AppState {
            geocoder: Arc::new(NominatimClient::with_base_url("http://localhost:1").unwrap()),
            reports: Arc::new(HttpReportService::new("http://localhost:1/report").unwrap()),
        }
    }

    #[tokio::test]
    async fn reverse_geocode_rejects_out_of_range_input() {
        let result = reverse_geocode(
            State(state()),
            Query(ReverseQuery {
                lat: 95.0,
                lon: 0.0,
            }),
        )
        .await;
        let (status, _) = result.err().unwrap();
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn generate_report_rejects_bad_coordinates_locally() {
        let result = generate_report(
            State(state()),
            Json(ReportRequest {
                latitude: 0.0,
                longitude: 200.0,
            }),
        )
        .await;
        let (status, Json(body)) = result.err().unwrap();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.detail, "Invalid coordinates");
    }

    #[tokio::test]
    async fn short_search_query_short_circuits() {
        let Json(response) = search_places(
            State(state()),
            Query(SearchQuery {
                q: "a".to_string(),
            }),
        )
        .await;
        assert!(response.suggestions.is_empty());
    }

    #[tokio::test]
    async fn health_reports_the_service_name() {
        let Json(body) = health().await;
        assert_eq!(body["service"], "terrascope-gateway");
    }
}
