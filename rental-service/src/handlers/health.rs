use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use crate::services::{CacheBackend, RentalStore};
use crate::AppState;

pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "rental-service",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Ready when the store answers. A failing cache only degrades the report:
/// stats fall back to direct computation.
pub async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    if let Err(e) = state.store.health_check().await {
        tracing::warn!(error = %e, "Readiness check failed: store unavailable");
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "unavailable", "store": "down" })),
        );
    }

    let cache = match state.cache.backend().health_check().await {
        Ok(()) => "up",
        Err(e) => {
            tracing::warn!(error = %e, "Cache health check failed");
            "degraded"
        }
    };

    (
        StatusCode::OK,
        Json(json!({ "status": "ready", "store": "up", "cache": cache })),
    )
}

pub async fn metrics() -> impl IntoResponse {
    crate::services::metrics::get_metrics()
}
