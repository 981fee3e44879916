//! Product listing model.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Listing availability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductStatus {
    Available,
    Rented,
    Unavailable,
}

impl ProductStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductStatus::Available => "available",
            ProductStatus::Rented => "rented",
            ProductStatus::Unavailable => "unavailable",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "available" => Some(ProductStatus::Available),
            "rented" => Some(ProductStatus::Rented),
            "unavailable" => Some(ProductStatus::Unavailable),
            _ => None,
        }
    }
}

/// A product offered for rent by its owner.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub product_id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: String,
    /// Price per rental day.
    #[serde(with = "rust_decimal::serde::float")]
    pub rental_price: Decimal,
    pub created_utc: DateTime<Utc>,
}

impl Product {
    pub fn status(&self) -> Option<ProductStatus> {
        ProductStatus::parse(&self.status)
    }
}
