//! Liveness and configuration summary

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub module: &'static str,
    pub version: &'static str,
    /// Schema whose parameter sets get spectrum ordering
    pub spectrum_schema: String,
    /// Suffix selecting schemas that get EXIF ordering
    pub exif_schema_suffix: String,
    /// Schemas with a registered post-save filter
    pub filters: Vec<String>,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        module: "mt-portal",
        version: env!("CARGO_PKG_VERSION"),
        spectrum_schema: state.settings.spectrum_schema_name.clone(),
        exif_schema_suffix: state.settings.exif_schema_suffix.clone(),
        filters: state
            .settings
            .filters
            .iter()
            .map(|f| format!("{}:{}", f.kind, f.schema_name))
            .collect(),
    })
}

pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
