//! Report service HTTP client.
//!
//! `POST`s the selected coordinate to the configured endpoint and maps
//! error bodies to their human-readable `detail` message so the selector
//! can surface the server's own wording.

use std::time::Duration;

use futures::future::BoxFuture;
use report_view::ReportPayload;
use serde::{Deserialize, Serialize};

use crate::{ReportService, ReportServiceError};

/// Report generation is slow; give the service plenty of room.
const REQUEST_TIMEOUT_SEC: u64 = 120;

#[derive(Debug, Serialize)]
struct ReportRequest {
    latitude: f64,
    longitude: f64,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    detail: Option<String>,
}

#[derive(Clone)]
pub struct HttpReportService {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpReportService {
    pub fn new(endpoint: &str) -> Result<Self, ReportServiceError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SEC))
            .build()
            .map_err(|e| ReportServiceError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
        })
    }

    pub async fn generate_report(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<ReportPayload, ReportServiceError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&ReportRequest {
                latitude,
                longitude,
            })
            .send()
            .await
            .map_err(|e| ReportServiceError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response
                .json::<ErrorBody>()
                .await
                .ok()
                .and_then(|body| body.detail);
            return Err(match detail {
                Some(detail) => ReportServiceError::Rejected(detail),
                None => {
                    ReportServiceError::Transport(format!("report service returned status {status}"))
                }
            });
        }

        response
            .json()
            .await
            .map_err(|e| ReportServiceError::Transport(format!("malformed report payload: {e}")))
    }
}

impl ReportService for HttpReportService {
    fn generate(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> BoxFuture<'static, Result<ReportPayload, ReportServiceError>> {
        let this = self.clone();
        Box::pin(async move { this.generate_report(latitude, longitude).await })
    }
}
