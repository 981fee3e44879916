use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use secrecy::ExposeSecret;
use service_core::{error::AppError, utils::verify_webhook_signature};

use crate::{
    dtos::{
        payments::{PaymentWebhookEvent, WEBHOOK_SIGNATURE_HEADER, WEBHOOK_TIMESTAMP_HEADER},
        ApiResponse,
    },
    AppState,
};

/// `POST /api/payments/webhook`
///
/// Authenticated by an HMAC over `"<timestamp>.<raw body>"`, so the body is
/// read as bytes and only parsed after the signature checks out.
pub async fn payment_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let timestamp = headers
        .get(WEBHOOK_TIMESTAMP_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<i64>().ok())
        .ok_or_else(|| {
            tracing::warn!("Missing or malformed webhook timestamp");
            AppError::unauthorized("Missing or invalid webhook timestamp")
        })?;

    let signature = headers
        .get(WEBHOOK_SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            tracing::warn!("Missing webhook signature header");
            AppError::unauthorized("Missing webhook signature")
        })?;

    let webhook = &state.config.webhook;
    let is_valid = verify_webhook_signature(
        webhook.secret.expose_secret(),
        timestamp,
        &body,
        signature,
        Utc::now().timestamp(),
        webhook.tolerance_seconds,
    )
    .map_err(|e| {
        tracing::error!(error = %e, "Webhook signature verification error");
        AppError::InternalError(anyhow::anyhow!("Webhook verification failed"))
    })?;

    if !is_valid {
        tracing::warn!("Invalid or stale webhook signature");
        return Err(AppError::unauthorized("Invalid webhook signature"));
    }

    let event: PaymentWebhookEvent = serde_json::from_slice(&body).map_err(|e| {
        tracing::warn!(error = %e, "Failed to parse webhook event");
        AppError::bad_request(format!("Invalid webhook payload: {}", e))
    })?;

    tracing::info!(
        payment_id = %event.payment_id,
        status = event.status.as_str(),
        "Processing payment webhook"
    );

    let payment = state.payments.apply(event.into()).await?;

    Ok(Json(ApiResponse::ok("Payment updated", payment)))
}
