//! Dashboard statistics payloads.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Length of the rolling revenue window behind `monthly_revenue`.
///
/// This is 30 × 24h back from the moment of computation, not a calendar month.
pub const MONTHLY_REVENUE_WINDOW_DAYS: i64 = 30;

/// Owner dashboard counters and revenue.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_products: u64,
    pub available_products: u64,
    pub rented_products: u64,
    pub pending_requests: u64,
    pub active_requests: u64,
    pub completed_requests: u64,
    /// Sum of all completed payments for the owner's products.
    #[serde(with = "rust_decimal::serde::float")]
    pub total_revenue: Decimal,
    /// Completed payments dated within the last [`MONTHLY_REVENUE_WINDOW_DAYS`] days.
    #[serde(with = "rust_decimal::serde::float")]
    pub monthly_revenue: Decimal,
    pub total_requests: u64,
}

/// Invoice counters for the owner's downloadable documents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadStats {
    pub total_invoices: u64,
    /// Invoices issued to the customer (`sent` or `paid`).
    pub downloadable_invoices: u64,
    pub paid_invoices: u64,
    pub pending_invoices: u64,
    pub overdue_invoices: u64,
}
