//! HTTP handlers outside the MCP endpoint

use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

use sapmux_core::ServiceCatalog;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub services: usize,
}

/// Health check endpoint
pub async fn health(State(catalog): State<Arc<ServiceCatalog>>) -> Json<HealthResponse> {
    debug!("[Gateway] Health check");
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        services: catalog.len(),
    })
}
