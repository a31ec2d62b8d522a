//! Fixed-schema metric panels.
//!
//! The nested report body is untyped JSON; every field access degrades to
//! "N/A" so a partial, reshaped, or entirely missing report still renders.

use serde::Serialize;
use serde_json::Value;

pub const NOT_AVAILABLE: &str = "N/A";

#[derive(Debug, Clone, Serialize)]
pub struct Metric {
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricPanel {
    pub title: String,
    pub metrics: Vec<Metric>,
}

/// (group key, panel title, [(field key, metric label)])
const PANEL_SCHEMA: &[(&str, &str, &[(&str, &str)])] = &[
    (
        "solar_potential",
        "Solar Potential",
        &[
            ("average_irradiance", "Average irradiance (kWh/m²/day)"),
            ("annual_sunlight_hours", "Annual sunlight hours"),
            ("feasibility", "Feasibility"),
        ],
    ),
    (
        "afforestation",
        "Afforestation Feasibility",
        &[
            ("soil_suitability", "Soil suitability"),
            ("recommended_species", "Recommended species"),
            ("feasibility", "Feasibility"),
        ],
    ),
    (
        "water_harvesting",
        "Water Harvesting",
        &[
            ("annual_rainfall_mm", "Annual rainfall (mm)"),
            ("runoff_potential", "Runoff potential"),
            ("storage_recommendation", "Storage recommendation"),
        ],
    ),
    (
        "windmill",
        "Windmill Feasibility",
        &[
            ("average_wind_speed_ms", "Average wind speed (m/s)"),
            ("turbine_class", "Turbine class"),
            ("feasibility", "Feasibility"),
        ],
    ),
];

/// Build the four fixed panels from whatever the report object contains.
pub fn metric_panels(report: Option<&Value>) -> Vec<MetricPanel> {
    PANEL_SCHEMA
        .iter()
        .map(|(group, title, fields)| MetricPanel {
            title: (*title).to_string(),
            metrics: fields
                .iter()
                .map(|(key, label)| Metric {
                    label: (*label).to_string(),
                    value: field_text(report, group, key),
                })
                .collect(),
        })
        .collect()
}

fn field_text(report: Option<&Value>, group: &str, key: &str) -> String {
    let value = report.and_then(|r| r.get(group)).and_then(|g| g.get(key));
    match value {
        Some(Value::String(s)) if !s.trim().is_empty() => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => (if *b { "Yes" } else { "No" }).to_string(),
        _ => NOT_AVAILABLE.to_string(),
    }
}
