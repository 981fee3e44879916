//! Applies signed payment-provider events to stored payments.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::json;
use service_core::error::AppError;
use service_core::utils::validate_amount;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::models::{CreateNotification, Payment, PaymentStatus};
use crate::services::metrics::PAYMENT_WEBHOOKS_TOTAL;
use crate::services::notifications::NotificationService;
use crate::services::stats::StatsAggregator;
use crate::services::store::RentalStore;

pub const PAYMENT_RECEIVED_NOTIFICATION: &str = "payment_received";

/// A verified provider event.
#[derive(Debug, Clone)]
pub struct PaymentEvent {
    pub payment_id: Uuid,
    pub status: PaymentStatus,
    pub amount: Option<Decimal>,
    pub paid_at: Option<DateTime<Utc>>,
}

#[derive(Clone)]
pub struct PaymentService {
    store: Arc<dyn RentalStore>,
    notifications: NotificationService,
    stats: StatsAggregator,
}

impl PaymentService {
    pub fn new(
        store: Arc<dyn RentalStore>,
        notifications: NotificationService,
        stats: StatsAggregator,
    ) -> Self {
        Self {
            store,
            notifications,
            stats,
        }
    }

    #[instrument(skip(self, event), fields(payment_id = %event.payment_id, status = event.status.as_str()))]
    pub async fn apply(&self, event: PaymentEvent) -> Result<Payment, AppError> {
        if event.status == PaymentStatus::Pending {
            return Err(AppError::bad_request(
                "status must be one of completed, failed, refunded",
            ));
        }
        if let Some(amount) = event.amount {
            validate_amount(amount, "amount")?;
        }

        let existing = self
            .store
            .find_payment(event.payment_id)
            .await?
            .ok_or_else(|| AppError::not_found("Payment not found"))?;

        if event.amount.is_some_and(|amount| amount != existing.amount) {
            return Err(AppError::bad_request("amount does not match the payment"));
        }

        // Providers redeliver; a repeated transition is acknowledged as-is.
        if existing.status() == Some(event.status) {
            PAYMENT_WEBHOOKS_TOTAL
                .with_label_values(&["duplicate"])
                .inc();
            info!("Payment already in requested status, ignoring redelivery");
            return Ok(existing);
        }

        let payment_date = match event.status {
            PaymentStatus::Completed => Some(event.paid_at.unwrap_or_else(Utc::now)),
            _ => None,
        };

        let payment = self
            .store
            .update_payment_status(event.payment_id, event.status, payment_date)
            .await?
            .ok_or_else(|| AppError::not_found("Payment not found"))?;

        PAYMENT_WEBHOOKS_TOTAL
            .with_label_values(&[event.status.as_str()])
            .inc();
        info!(amount = %payment.amount, "Payment status updated");

        match self
            .store
            .product_for_rental_request(payment.rental_request_id)
            .await?
        {
            Some(product) => {
                self.stats.invalidate(product.owner_id).await;

                if event.status == PaymentStatus::Completed {
                    let notice = CreateNotification {
                        user_id: product.owner_id,
                        rental_request_id: Some(payment.rental_request_id),
                        notification_type: PAYMENT_RECEIVED_NOTIFICATION.to_string(),
                        title: "Payment received".to_string(),
                        message: format!(
                            "Payment of {} received for {}",
                            payment.amount, product.title
                        ),
                        data: Some(json!({
                            "paymentId": payment.payment_id,
                            "amount": payment.amount,
                        })),
                    };
                    if let Err(e) = self.notifications.create(notice).await {
                        warn!(error = %e, "Failed to notify product owner of payment");
                    }
                }
            }
            None => warn!(
                rental_request_id = %payment.rental_request_id,
                "Payment has no resolvable product owner"
            ),
        }

        Ok(payment)
    }
}
