//! Rental request intake.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde_json::json;
use service_core::error::AppError;
use service_core::utils::{validate_amount, validate_date_range};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::models::{CreateNotification, CreateRentalRequest, ProductStatus, RentalRequest};
use crate::services::notifications::NotificationService;
use crate::services::stats::StatsAggregator;
use crate::services::store::RentalStore;

pub const RENTAL_REQUEST_NOTIFICATION: &str = "rental_request";

/// A customer's rental request as submitted.
#[derive(Debug, Clone)]
pub struct NewRentalRequest {
    pub product_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub message: Option<String>,
}

#[derive(Clone)]
pub struct RentalService {
    store: Arc<dyn RentalStore>,
    notifications: NotificationService,
    stats: StatsAggregator,
}

impl RentalService {
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

    /// Create a `pending` request priced at `rental_price × days` and notify
    /// the product owner.
    #[instrument(skip(self, request), fields(customer_id = %customer_id, product_id = %request.product_id))]
    pub async fn submit(
        &self,
        customer_id: Uuid,
        request: NewRentalRequest,
        today: NaiveDate,
    ) -> Result<RentalRequest, AppError> {
        let days = validate_date_range(request.start_date, request.end_date, today)?;

        let product = self
            .store
            .find_product(request.product_id)
            .await?
            .ok_or_else(|| AppError::not_found("Product not found"))?;

        if product.owner_id == customer_id {
            return Err(AppError::bad_request("You cannot rent your own product"));
        }
        if product.status() != Some(ProductStatus::Available) {
            return Err(AppError::bad_request("Product is not available for rent"));
        }

        let total_price =
            validate_amount((product.rental_price * Decimal::from(days)).round_dp(2), "totalPrice")?;

        let created = self
            .store
            .create_rental_request(&CreateRentalRequest {
                product_id: product.product_id,
                customer_id,
                total_price,
                start_date: request.start_date,
                end_date: request.end_date,
                message: request.message,
            })
            .await?;

        info!(
            rental_request_id = %created.rental_request_id,
            days,
            %total_price,
            "Rental request submitted"
        );

        let notice = CreateNotification {
            user_id: product.owner_id,
            rental_request_id: Some(created.rental_request_id),
            notification_type: RENTAL_REQUEST_NOTIFICATION.to_string(),
            title: "New rental request".to_string(),
            message: format!("You have a new rental request for {}", product.title),
            data: Some(json!({
                "productId": product.product_id,
                "startDate": created.start_date,
                "endDate": created.end_date,
                "totalPrice": total_price,
            })),
        };
        // The request stands even if the owner could not be notified.
        if let Err(e) = self.notifications.create(notice).await {
            warn!(error = %e, "Failed to notify product owner");
        }
        self.stats.invalidate(product.owner_id).await;

        Ok(created)
    }
}
