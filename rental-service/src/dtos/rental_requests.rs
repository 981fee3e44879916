use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::services::NewRentalRequest;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateRentalRequestBody {
    pub product_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,

    #[validate(length(max = 1000, message = "message must be at most 1000 characters"))]
    pub message: Option<String>,
}

impl From<CreateRentalRequestBody> for NewRentalRequest {
    fn from(body: CreateRentalRequestBody) -> Self {
        Self {
            product_id: body.product_id,
            start_date: body.start_date,
            end_date: body.end_date,
            message: body.message.filter(|m| !m.trim().is_empty()),
        }
    }
}
