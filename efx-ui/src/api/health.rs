//! Health check endpoint

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::AppState;

/// Liveness plus what the UI loaded at startup
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub module: &'static str,
    pub version: &'static str,
    /// Valid, selected content items
    pub items: usize,
    /// Whether a battery skeleton is configured (otherwise it is fetched on generate)
    pub battery: bool,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        module: "efx-ui",
        version: env!("CARGO_PKG_VERSION"),
        items: state.items.len(),
        battery: state.battery.is_some(),
    })
}

pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
