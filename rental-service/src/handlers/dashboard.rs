use axum::{extract::State, http::header, response::IntoResponse, Json};
use service_core::error::AppError;

use crate::{dtos::ApiResponse, middleware::AuthUser, AppState};

/// `GET /api/dashboard/stats`
pub async fn get_dashboard_stats(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let stats = state.stats.dashboard_stats(user.user_id).await?;

    Ok((
        [(header::CACHE_CONTROL, state.config.cache.edge_cache_control())],
        Json(ApiResponse::ok("Dashboard stats retrieved", stats)),
    ))
}

/// `GET /api/dashboard/download-stats`
pub async fn get_download_stats(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let stats = state.stats.download_stats(user.user_id).await?;

    Ok((
        [(header::CACHE_CONTROL, state.config.cache.edge_cache_control())],
        Json(ApiResponse::ok("Download stats retrieved", stats)),
    ))
}
