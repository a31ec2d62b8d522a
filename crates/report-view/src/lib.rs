//! Report rendering core for Terrascope.
//!
//! The report service's response shape is not fixed across versions, so
//! everything here is built to degrade: coordinates are resolved through a
//! strict priority chain, place names fall back to a reverse geocode and
//! finally to a sentinel, and every metric renders "N/A" when its field is
//! missing. A payload with nothing usable in it still renders.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod panels;
pub mod place;
pub mod recommendations;

pub use panels::{Metric, MetricPanel, NOT_AVAILABLE};
pub use place::PlaceNameResolver;
pub use recommendations::RecommendationSection;

/// Placeholder meaning "no real name known".
pub const DEFAULT_PLACE_NAME: &str = "Selected Location";

/// A resolved point on Earth. An unresolved coordinate is `None` at the
/// call sites, never a pair of NaNs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

/// Best-effort descriptor carried from the selector screen to the report
/// screen. Produced once at submit time, never persisted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SelectedArea {
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub place_name: Option<String>,
}

/// Coordinate pair as it appears nested in some payload versions. Either
/// member may be missing independently.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CoordinatePair {
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

/// Report service response. Treated as untyped external data: any subset
/// of these fields may be absent and unknown fields are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportPayload {
    /// Nested metric groups, shape varies by service version.
    #[serde(default)]
    pub report: Option<serde_json::Value>,
    /// Free-text recommendations blob, possibly with markdown-style
    /// section headers.
    #[serde(default)]
    pub recommendations: Option<String>,
    #[serde(default)]
    pub coordinates: Option<CoordinatePair>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub place_name: Option<String>,
}

/// Resolve the authoritative coordinate for a render.
///
/// Sources are tried in strict priority order and a source qualifies only
/// when *both* members are defined; a half-defined source is skipped
/// entirely. Definedness is what counts: `0.0` is a valid coordinate.
///
/// 1. the selected area carried from the selector screen
/// 2. `payload.coordinates`
/// 3. `latitude`/`longitude` inside the nested report object
/// 4. top-level `payload.latitude`/`payload.longitude`
pub fn resolve_coordinate(
    selected: Option<&SelectedArea>,
    payload: Option<&ReportPayload>,
) -> Option<Coordinate> {
    let sources = [
        selected.map(|s| (s.latitude, s.longitude)),
        payload
            .and_then(|p| p.coordinates.as_ref())
            .map(|c| (c.latitude, c.longitude)),
        payload
            .and_then(|p| p.report.as_ref())
            .and_then(report_coordinate),
        payload.map(|p| (p.latitude, p.longitude)),
    ];

    for source in sources.into_iter().flatten() {
        if let (Some(latitude), Some(longitude)) = source {
            return Some(Coordinate { latitude, longitude });
        }
    }
    None
}

fn report_coordinate(report: &serde_json::Value) -> Option<(Option<f64>, Option<f64>)> {
    let obj = report.as_object()?;
    Some((
        obj.get("latitude").and_then(serde_json::Value::as_f64),
        obj.get("longitude").and_then(serde_json::Value::as_f64),
    ))
}

/// Render-time place-name priority: a real (non-sentinel) selected name
/// beats the server-supplied name, which beats a fetched reverse-geocode
/// label, which beats the sentinel.
pub fn display_place_name(
    selected: Option<&SelectedArea>,
    payload: Option<&ReportPayload>,
    fetched: Option<&str>,
) -> String {
    if let Some(name) = selected.and_then(|s| s.place_name.as_deref()) {
        if !name.trim().is_empty() && name != DEFAULT_PLACE_NAME {
            return name.to_string();
        }
    }
    if let Some(name) = payload.and_then(|p| p.place_name.as_deref()) {
        if !name.trim().is_empty() {
            return name.to_string();
        }
    }
    if let Some(name) = fetched {
        if !name.trim().is_empty() {
            return name.to_string();
        }
    }
    DEFAULT_PLACE_NAME.to_string()
}

/// Fully resolved, render-ready report screen.
#[derive(Debug, Clone, Serialize)]
pub struct ReportView {
    pub place_name: String,
    /// "lat, lon" at 4 decimal places, absent when unresolved. A missing
    /// coordinate suppresses the coordinate line and the map.
    pub coordinate_text: Option<String>,
    pub panels: Vec<MetricPanel>,
    pub recommendations: Vec<RecommendationSection>,
    pub generated_at: DateTime<Utc>,
}

impl ReportView {
    pub fn build(
        selected: Option<&SelectedArea>,
        payload: &ReportPayload,
        fetched_name: Option<&str>,
    ) -> Self {
        let coordinate = resolve_coordinate(selected, Some(payload));
        Self {
            place_name: display_place_name(selected, Some(payload), fetched_name),
            coordinate_text: coordinate
                .map(|c| format!("{:.4}, {:.4}", c.latitude, c.longitude)),
            panels: panels::metric_panels(payload.report.as_ref()),
            recommendations: recommendations::parse(
                payload.recommendations.as_deref().unwrap_or(""),
            ),
            generated_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn area(lat: Option<f64>, lon: Option<f64>) -> SelectedArea {
        SelectedArea {
            latitude: lat,
            longitude: lon,
            place_name: None,
        }
    }

    #[test]
    fn selected_area_wins_over_payload() {
        let payload = ReportPayload {
            coordinates: Some(CoordinatePair {
                latitude: Some(1.0),
                longitude: Some(2.0),
            }),
            latitude: Some(3.0),
            longitude: Some(4.0),
            ..Default::default()
        };
        let resolved =
            resolve_coordinate(Some(&area(Some(10.0), Some(20.0))), Some(&payload)).unwrap();
        assert_eq!(resolved.latitude, 10.0);
        assert_eq!(resolved.longitude, 20.0);
    }

    #[test]
    fn half_defined_source_is_skipped_entirely() {
        let payload = ReportPayload {
            coordinates: Some(CoordinatePair {
                latitude: Some(1.0),
                longitude: None,
            }),
            latitude: Some(3.0),
            longitude: Some(4.0),
            ..Default::default()
        };
        // Selected area has only a latitude, coordinates only a latitude;
        // the top-level pair is the first fully defined source.
        let resolved =
            resolve_coordinate(Some(&area(Some(9.0), None)), Some(&payload)).unwrap();
        assert_eq!(resolved.latitude, 3.0);
        assert_eq!(resolved.longitude, 4.0);
    }

    #[test]
    fn zero_is_a_defined_coordinate() {
        let resolved =
            resolve_coordinate(Some(&area(Some(0.0), Some(0.0))), None).unwrap();
        assert_eq!(resolved.latitude, 0.0);
        assert_eq!(resolved.longitude, 0.0);
    }

    #[test]
    fn report_object_coordinates_are_dug_out() {
        let payload = ReportPayload {
            report: Some(json!({ "latitude": -33.86, "longitude": 151.21 })),
            ..Default::default()
        };
        let resolved = resolve_coordinate(None, Some(&payload)).unwrap();
        assert_eq!(resolved.latitude, -33.86);
        assert_eq!(resolved.longitude, 151.21);
    }

    #[test]
    fn nothing_qualifies_resolves_to_none() {
        assert!(resolve_coordinate(None, None).is_none());
        assert!(resolve_coordinate(None, Some(&ReportPayload::default())).is_none());

        let payload = ReportPayload {
            report: Some(json!("not an object")),
            latitude: Some(5.0),
            ..Default::default()
        };
        assert!(resolve_coordinate(None, Some(&payload)).is_none());
    }

    #[test]
    fn sentinel_selected_name_defers_to_payload_name() {
        let selected = SelectedArea {
            place_name: Some(DEFAULT_PLACE_NAME.to_string()),
            ..Default::default()
        };
        let payload = ReportPayload {
            place_name: Some("Riverside Park".to_string()),
            ..Default::default()
        };
        assert_eq!(
            display_place_name(Some(&selected), Some(&payload), None),
            "Riverside Park"
        );
    }

    #[test]
    fn place_name_priority_order() {
        let selected = SelectedArea {
            place_name: Some("Mysuru, Karnataka, India".to_string()),
            ..Default::default()
        };
        let payload = ReportPayload {
            place_name: Some("Riverside Park".to_string()),
            ..Default::default()
        };
        assert_eq!(
            display_place_name(Some(&selected), Some(&payload), Some("Fetched")),
            "Mysuru, Karnataka, India"
        );
        assert_eq!(
            display_place_name(None, Some(&payload), Some("Fetched")),
            "Riverside Park"
        );
        assert_eq!(display_place_name(None, None, Some("Fetched")), "Fetched");
        assert_eq!(display_place_name(None, None, None), DEFAULT_PLACE_NAME);
    }

    #[test]
    fn empty_payload_still_builds_a_view() {
        let view = ReportView::build(None, &ReportPayload::default(), None);
        assert_eq!(view.place_name, DEFAULT_PLACE_NAME);
        assert!(view.coordinate_text.is_none());
        assert!(view.recommendations.is_empty());
        assert!(!view.panels.is_empty());
        assert!(view
            .panels
            .iter()
            .flat_map(|p| &p.metrics)
            .all(|m| m.value == NOT_AVAILABLE));
    }

    #[test]
    fn coordinate_text_is_four_decimal_places() {
        let payload = ReportPayload {
            latitude: Some(12.305182),
            longitude: Some(76.655361),
            ..Default::default()
        };
        let view = ReportView::build(None, &payload, None);
        assert_eq!(view.coordinate_text.as_deref(), Some("12.3052, 76.6554"));
    }

    proptest! {
        /// The chain always picks the first source with both members
        /// defined, and only yields nothing when no source qualifies.
        #[test]
        fn resolution_picks_first_complete_source(
            sel_lat in proptest::option::of(-90.0f64..90.0),
            sel_lon in proptest::option::of(-180.0f64..180.0),
            pair_lat in proptest::option::of(-90.0f64..90.0),
            pair_lon in proptest::option::of(-180.0f64..180.0),
            top_lat in proptest::option::of(-90.0f64..90.0),
            top_lon in proptest::option::of(-180.0f64..180.0),
        ) {
            let selected = area(sel_lat, sel_lon);
            let payload = ReportPayload {
                coordinates: Some(CoordinatePair { latitude: pair_lat, longitude: pair_lon }),
                latitude: top_lat,
                longitude: top_lon,
                ..Default::default()
            };
            let resolved = resolve_coordinate(Some(&selected), Some(&payload));

            let expected = if let (Some(lat), Some(lon)) = (sel_lat, sel_lon) {
                Some((lat, lon))
            } else if let (Some(lat), Some(lon)) = (pair_lat, pair_lon) {
                Some((lat, lon))
            } else if let (Some(lat), Some(lon)) = (top_lat, top_lon) {
                Some((lat, lon))
            } else {
                None
            };

            prop_assert_eq!(resolved.map(|c| (c.latitude, c.longitude)), expected);
        }
    }
}
