//! Rental request model.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Rental request lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RentalRequestStatus {
    Pending,
    Accepted,
    Rejected,
    Active,
    Completed,
    Cancelled,
    Returned,
}

impl RentalRequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RentalRequestStatus::Pending => "pending",
            RentalRequestStatus::Accepted => "accepted",
            RentalRequestStatus::Rejected => "rejected",
            RentalRequestStatus::Active => "active",
            RentalRequestStatus::Completed => "completed",
            RentalRequestStatus::Cancelled => "cancelled",
            RentalRequestStatus::Returned => "returned",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(RentalRequestStatus::Pending),
            "accepted" => Some(RentalRequestStatus::Accepted),
            "rejected" => Some(RentalRequestStatus::Rejected),
            "active" => Some(RentalRequestStatus::Active),
            "completed" => Some(RentalRequestStatus::Completed),
            "cancelled" => Some(RentalRequestStatus::Cancelled),
            "returned" => Some(RentalRequestStatus::Returned),
            _ => None,
        }
    }
}

/// A customer's request to rent a product for a date range.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct RentalRequest {
    pub rental_request_id: Uuid,
    pub product_id: Uuid,
    pub customer_id: Uuid,
    pub status: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_price: Decimal,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub message: Option<String>,
    pub created_utc: DateTime<Utc>,
}

impl RentalRequest {
    pub fn status(&self) -> Option<RentalRequestStatus> {
        RentalRequestStatus::parse(&self.status)
    }
}

/// Input for creating a rental request. Always created as `pending`.
#[derive(Debug, Clone)]
pub struct CreateRentalRequest {
    pub product_id: Uuid,
    pub customer_id: Uuid,
    pub total_price: Decimal,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub message: Option<String>,
}
