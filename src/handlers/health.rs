//! Banner and health endpoints

use std::sync::Arc;

use axum::{extract::State, Json};
use serde::Serialize;

use crate::store::RecordStore;

pub async fn root() -> &'static str {
    "Loan Fund API Server"
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    status: String,
    store: String,
    version: String,
}

/// Health check endpoint
pub async fn health_check(State(store): State<Arc<dyn RecordStore>>) -> Json<HealthResponse> {
    let store_status = match store.ping().await {
        Ok(()) => "connected".to_string(),
        Err(e) => format!("error: {}", e),
    };

    let status = if store_status == "connected" {
        "healthy"
    } else {
        "unhealthy"
    };

    Json(HealthResponse {
        status: status.to_string(),
        store: store_status,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
