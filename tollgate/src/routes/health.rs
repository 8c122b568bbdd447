//! Health check endpoints
//!
//! `/health` and `/healthz` are liveness probes: 200 whenever the process
//! is serving requests.

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use serde::Serialize;

use super::http::json_response;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub healthy: bool,
    pub service: &'static str,
    pub version: &'static str,
    pub timestamp: String,
    /// Gateway only: how tokens are verified
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verifier: Option<&'static str>,
}

pub fn is_health_path(path: &str) -> bool {
    path == "/health" || path == "/healthz"
}

pub fn health_check(service: &'static str, verifier: Option<&'static str>) -> Response<Full<Bytes>> {
    json_response(
        StatusCode::OK,
        &HealthResponse {
            healthy: true,
            service,
            version: env!("CARGO_PKG_VERSION"),
            timestamp: chrono::Utc::now().to_rfc3339(),
            verifier,
        },
    )
}
