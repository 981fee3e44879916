use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use chrono::Utc;
use service_core::{error::AppError, utils::ValidatedJson};

use crate::{
    dtos::{rental_requests::CreateRentalRequestBody, ApiResponse},
    middleware::AuthUser,
    AppState,
};

/// `POST /api/rental-requests`
pub async fn create_rental_request(
    State(state): State<AppState>,
    user: AuthUser,
    ValidatedJson(payload): ValidatedJson<CreateRentalRequestBody>,
) -> Result<impl IntoResponse, AppError> {
    let today = Utc::now().date_naive();
    let request = state
        .rentals
        .submit(user.user_id, payload.into(), today)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok("Rental request created", request)),
    ))
}
