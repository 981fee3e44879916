use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::models::PaymentStatus;
use crate::services::PaymentEvent;

pub const WEBHOOK_TIMESTAMP_HEADER: &str = "x-webhook-timestamp";
pub const WEBHOOK_SIGNATURE_HEADER: &str = "x-webhook-signature";

/// Body of `POST /api/payments/webhook`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentWebhookEvent {
    pub payment_id: Uuid,
    pub status: PaymentStatus,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub amount: Option<Decimal>,
    pub paid_at: Option<DateTime<Utc>>,
}

impl From<PaymentWebhookEvent> for PaymentEvent {
    fn from(event: PaymentWebhookEvent) -> Self {
        Self {
            payment_id: event.payment_id,
            status: event.status,
            amount: event.amount,
            paid_at: event.paid_at,
        }
    }
}
