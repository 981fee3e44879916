//! Invoice and invoice item models.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Invoice status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Pending,
    Sent,
    Paid,
    Overdue,
    Cancelled,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Pending => "pending",
            InvoiceStatus::Sent => "sent",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Overdue => "overdue",
            InvoiceStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(InvoiceStatus::Pending),
            "sent" => Some(InvoiceStatus::Sent),
            "paid" => Some(InvoiceStatus::Paid),
            "overdue" => Some(InvoiceStatus::Overdue),
            "cancelled" => Some(InvoiceStatus::Cancelled),
            _ => None,
        }
    }

    /// Whether a document has been issued to the customer and can be downloaded.
    pub fn is_downloadable(&self) -> bool {
        matches!(self, InvoiceStatus::Sent | InvoiceStatus::Paid)
    }
}

/// Kind of charge an invoice line represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceItemType {
    RentalFee,
    Tax,
    LateFee,
    DamageFee,
    AdditionalCharge,
}

impl InvoiceItemType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceItemType::RentalFee => "rental_fee",
            InvoiceItemType::Tax => "tax",
            InvoiceItemType::LateFee => "late_fee",
            InvoiceItemType::DamageFee => "damage_fee",
            InvoiceItemType::AdditionalCharge => "additional_charge",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "rental_fee" => Some(InvoiceItemType::RentalFee),
            "tax" => Some(InvoiceItemType::Tax),
            "late_fee" => Some(InvoiceItemType::LateFee),
            "damage_fee" => Some(InvoiceItemType::DamageFee),
            "additional_charge" => Some(InvoiceItemType::AdditionalCharge),
            _ => None,
        }
    }
}

/// Invoice issued for a completed rental.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub invoice_id: Uuid,
    pub rental_request_id: Option<Uuid>,
    pub invoice_number: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub subtotal: Decimal,
    /// Fraction, e.g. `0.08` for 8%.
    #[serde(with = "rust_decimal::serde::float")]
    pub tax_rate: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub tax_amount: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub late_fee: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub damage_fee: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub additional_charges: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_amount: Decimal,
    pub status: String,
    pub created_utc: DateTime<Utc>,
}

impl Invoice {
    pub fn status(&self) -> Option<InvoiceStatus> {
        InvoiceStatus::parse(&self.status)
    }
}

/// Line item on an invoice.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceItem {
    pub invoice_item_id: Uuid,
    pub invoice_id: Uuid,
    pub item_type: String,
    pub description: String,
    pub quantity: i32,
    #[serde(with = "rust_decimal::serde::float")]
    pub unit_price: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_price: Decimal,
    pub created_utc: DateTime<Utc>,
}

impl InvoiceItem {
    pub fn item_type(&self) -> Option<InvoiceItemType> {
        InvoiceItemType::parse(&self.item_type)
    }
}

/// Input for inserting an invoice item.
#[derive(Debug, Clone, PartialEq)]
pub struct NewInvoiceItem {
    pub invoice_id: Uuid,
    pub item_type: InvoiceItemType,
    pub description: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub total_price: Decimal,
}

/// Invoice row as seen by the item backfill: amounts, the rented product's
/// title (if the rental and product still resolve), and how many items exist.
#[derive(Debug, Clone, FromRow)]
pub struct BackfillCandidate {
    pub invoice_id: Uuid,
    pub invoice_number: String,
    pub rental_request_id: Option<Uuid>,
    pub subtotal: Decimal,
    pub tax_rate: Decimal,
    pub tax_amount: Decimal,
    pub product_title: Option<String>,
    pub item_count: i64,
}
