use anyhow::Result;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use geo_lookup::NominatimClient;
use site_selector::HttpReportService;

mod routes;

/// Default upstream for the report-generation service.
const DEFAULT_REPORT_URL: &str = "http://localhost:8000/api/generate-report";

#[derive(Clone)]
pub struct AppState {
    pub geocoder: Arc<NominatimClient>,
    pub reports: Arc<HttpReportService>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "terrascope_gateway=debug,info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let nominatim_url = std::env::var("TERRASCOPE_NOMINATIM_URL")
        .unwrap_or_else(|_| geo_lookup::nominatim::DEFAULT_BASE_URL.to_string());
    let report_url =
        std::env::var("TERRASCOPE_REPORT_URL").unwrap_or_else(|_| DEFAULT_REPORT_URL.to_string());

    let state = AppState {
        geocoder: Arc::new(NominatimClient::with_base_url(&nominatim_url)?),
        reports: Arc::new(HttpReportService::new(&report_url)?),
    };
    tracing::info!("   Geocoding provider: {}", nominatim_url);
    tracing::info!("   Report service: {}", report_url);

    let api_routes = Router::new()
        .route("/geocode/search", get(routes::search_places))
        .route("/geocode/reverse", get(routes::reverse_geocode))
        .route("/report", post(routes::generate_report))
        .route("/report/view", post(routes::build_report_view))
        .with_state(state);

    let app = Router::new()
        .route("/health", get(routes::health))
        .nest("/api/v1", api_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    // Static file serving for the map UI (if dist exists)
    let ui_path = std::path::Path::new("ui/dist");
    let app = if ui_path.exists() {
        tracing::info!("   Serving UI from {}", ui_path.display());
        app.nest_service("/", ServeDir::new(ui_path))
    } else {
        tracing::warn!("   UI not built - map screens served by the frontend dev server");
        app
    };

    let port = std::env::var("TERRASCOPE_GATEWAY_PORT")
        .or_else(|_| std::env::var("PORT"))
        .unwrap_or_else(|_| "18080".to_string());
    let addr = format!("0.0.0.0:{}", port);

    tracing::info!("🌍 Terrascope gateway starting on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
