use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use service_core::{error::AppError, utils::ValidatedJson};

use crate::{
    dtos::{
        notifications::{
            CreateNotificationRequest, ListNotificationsQuery, MarkReadRequest, MarkReadResult,
            NotificationListResponse,
        },
        ApiResponse,
    },
    middleware::AuthUser,
    services::MarkReadTarget,
    AppState,
};

/// `GET /api/notifications?unreadOnly=&limit=`
pub async fn list_notifications(
    State(state): State<AppState>,
    user: AuthUser,
    query: Result<Query<ListNotificationsQuery>, QueryRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Query(query) =
        query.map_err(|e| AppError::bad_request(format!("Invalid query: {}", e.body_text())))?;

    let (data, unread_count) = state
        .notifications
        .list(user.user_id, query.unread_only, query.limit)
        .await?;

    Ok(Json(NotificationListResponse {
        success: true,
        data,
        unread_count,
    }))
}

/// `POST /api/notifications`
pub async fn create_notification(
    State(state): State<AppState>,
    _user: AuthUser,
    ValidatedJson(payload): ValidatedJson<CreateNotificationRequest>,
) -> Result<impl IntoResponse, AppError> {
    let notification = state.notifications.create(payload.into()).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok("Notification created", notification)),
    ))
}

/// `PATCH /api/notifications/mark-read`
pub async fn mark_notifications_read(
    State(state): State<AppState>,
    user: AuthUser,
    ValidatedJson(payload): ValidatedJson<MarkReadRequest>,
) -> Result<impl IntoResponse, AppError> {
    let target = MarkReadTarget::try_from(payload)?;
    let updated_count = state.notifications.mark_read(user.user_id, target).await?;

    Ok(Json(ApiResponse::ok(
        "Notifications marked as read",
        MarkReadResult { updated_count },
    )))
}
