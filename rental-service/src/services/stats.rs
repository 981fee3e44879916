//! Owner dashboard statistics.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use service_core::error::AppError;
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;
use uuid::Uuid;

use crate::models::{
    DashboardStats, DownloadStats, Invoice, InvoiceStatus, Payment, Product, ProductStatus,
    RentalRequest, RentalRequestStatus, MONTHLY_REVENUE_WINDOW_DAYS,
};
use crate::services::cache::StatsCache;
use crate::services::store::RentalStore;

pub const DASHBOARD_STATS_SHAPE: &str = "dashboard-stats";
pub const DOWNLOAD_STATS_SHAPE: &str = "download-stats";

/// Cache tag covering every stats shape of one user.
pub fn stats_tag(user_id: Uuid) -> String {
    format!("user-stats:{}", user_id)
}

fn stats_key(shape: &str, user_id: Uuid) -> String {
    format!("{}:{}", shape, user_id)
}

#[derive(Clone)]
pub struct StatsAggregator {
    store: Arc<dyn RentalStore>,
    cache: StatsCache,
    ttl: Duration,
}

impl StatsAggregator {
    pub fn new(store: Arc<dyn RentalStore>, cache: StatsCache, ttl: Duration) -> Self {
        Self { store, cache, ttl }
    }

    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn dashboard_stats(&self, user_id: Uuid) -> Result<DashboardStats, AppError> {
        let store = self.store.clone();
        self.cache
            .get_or_compute(
                &stats_key(DASHBOARD_STATS_SHAPE, user_id),
                self.ttl,
                &[stats_tag(user_id)],
                || async move {
                    let (products, requests, payments) = tokio::try_join!(
                        store.products_by_owner(user_id),
                        store.rental_requests_for_owner(user_id),
                        store.completed_payments_for_owner(user_id),
                    )?;
                    Ok(summarize_dashboard(
                        &products,
                        &requests,
                        &payments,
                        Utc::now(),
                    ))
                },
            )
            .await
    }

    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn download_stats(&self, user_id: Uuid) -> Result<DownloadStats, AppError> {
        let store = self.store.clone();
        self.cache
            .get_or_compute(
                &stats_key(DOWNLOAD_STATS_SHAPE, user_id),
                self.ttl,
                &[stats_tag(user_id)],
                || async move {
                    let invoices = store.invoices_for_owner(user_id).await?;
                    Ok(summarize_downloads(&invoices))
                },
            )
            .await
    }

    pub async fn invalidate(&self, user_id: Uuid) {
        self.cache.invalidate(&stats_tag(user_id)).await;
    }
}

/// Fold an owner's products, rental requests and completed payments into
/// dashboard counters.
///
/// `monthly_revenue` covers payments dated within [`MONTHLY_REVENUE_WINDOW_DAYS`]
/// × 24h before `now` (a rolling window, not the calendar month). Payments with
/// no date count toward `total_revenue` only.
pub fn summarize_dashboard(
    products: &[Product],
    requests: &[RentalRequest],
    payments: &[Payment],
    now: DateTime<Utc>,
) -> DashboardStats {
    let mut stats = DashboardStats {
        total_products: products.len() as u64,
        total_requests: requests.len() as u64,
        ..Default::default()
    };

    for product in products {
        match product.status() {
            Some(ProductStatus::Available) => stats.available_products += 1,
            Some(ProductStatus::Rented) => stats.rented_products += 1,
            _ => {}
        }
    }

    for request in requests {
        match request.status() {
            Some(RentalRequestStatus::Pending) => stats.pending_requests += 1,
            Some(RentalRequestStatus::Active) => stats.active_requests += 1,
            Some(RentalRequestStatus::Completed) => stats.completed_requests += 1,
            _ => {}
        }
    }

    let window_start = now - ChronoDuration::days(MONTHLY_REVENUE_WINDOW_DAYS);
    for payment in payments {
        stats.total_revenue += payment.amount;
        if payment.payment_date.is_some_and(|d| d >= window_start) {
            stats.monthly_revenue += payment.amount;
        }
    }

    stats
}

pub fn summarize_downloads(invoices: &[Invoice]) -> DownloadStats {
    let mut stats = DownloadStats {
        total_invoices: invoices.len() as u64,
        ..Default::default()
    };

    for status in invoices.iter().filter_map(Invoice::status) {
        if status.is_downloadable() {
            stats.downloadable_invoices += 1;
        }
        match status {
            InvoiceStatus::Paid => stats.paid_invoices += 1,
            InvoiceStatus::Pending => stats.pending_invoices += 1,
            InvoiceStatus::Overdue => stats.overdue_invoices += 1,
            _ => {}
        }
    }

    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PaymentStatus;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn product(status: ProductStatus) -> Product {
        Product {
            product_id: Uuid::new_v4(),
            owner_id: Uuid::nil(),
            title: "Camera".to_string(),
            description: None,
            status: status.as_str().to_string(),
            rental_price: Decimal::from(10),
            created_utc: Utc::now(),
        }
    }

    fn request(status: RentalRequestStatus) -> RentalRequest {
        RentalRequest {
            rental_request_id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            customer_id: Uuid::new_v4(),
            status: status.as_str().to_string(),
            total_price: Decimal::from(30),
            start_date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2026, 1, 4).unwrap(),
            message: None,
            created_utc: Utc::now(),
        }
    }

    fn payment(amount: &str, paid: Option<DateTime<Utc>>) -> Payment {
        Payment {
            payment_id: Uuid::new_v4(),
            rental_request_id: Uuid::new_v4(),
            status: PaymentStatus::Completed.as_str().to_string(),
            amount: Decimal::from_str(amount).unwrap(),
            payment_date: paid,
            created_utc: Utc::now(),
        }
    }

    #[test]
    fn no_products_means_all_zero() {
        let stats = summarize_dashboard(&[], &[], &[], Utc::now());
        assert_eq!(stats, DashboardStats::default());
    }

    #[test]
    fn counts_products_and_requests_by_status() {
        let products = vec![
            product(ProductStatus::Available),
            product(ProductStatus::Available),
            product(ProductStatus::Rented),
            product(ProductStatus::Unavailable),
        ];
        let requests = vec![
            request(RentalRequestStatus::Pending),
            request(RentalRequestStatus::Active),
            request(RentalRequestStatus::Completed),
            request(RentalRequestStatus::Completed),
            request(RentalRequestStatus::Rejected),
        ];

        let stats = summarize_dashboard(&products, &requests, &[], Utc::now());

        assert_eq!(stats.total_products, 4);
        assert_eq!(stats.available_products, 2);
        assert_eq!(stats.rented_products, 1);
        assert_eq!(stats.pending_requests, 1);
        assert_eq!(stats.active_requests, 1);
        assert_eq!(stats.completed_requests, 2);
        assert_eq!(stats.total_requests, 5);
    }

    #[test]
    fn monthly_window_is_rolling_thirty_days() {
        let now = Utc::now();
        let payments = vec![
            payment("100.00", Some(now - ChronoDuration::days(1))),
            payment("50.50", Some(now - ChronoDuration::days(30))),
            payment("25.00", Some(now - ChronoDuration::days(31))),
            payment("10.00", None),
        ];

        let stats = summarize_dashboard(&[], &[], &payments, now);

        assert_eq!(stats.total_revenue, Decimal::from_str("185.50").unwrap());
        assert_eq!(stats.monthly_revenue, Decimal::from_str("150.50").unwrap());
        assert!(stats.total_revenue >= stats.monthly_revenue);
    }

    #[test]
    fn download_counts_follow_invoice_status() {
        let invoice = |status: InvoiceStatus| Invoice {
            invoice_id: Uuid::new_v4(),
            rental_request_id: None,
            invoice_number: "INV-1".to_string(),
            subtotal: Decimal::from(100),
            tax_rate: Decimal::ZERO,
            tax_amount: Decimal::ZERO,
            late_fee: Decimal::ZERO,
            damage_fee: Decimal::ZERO,
            additional_charges: Decimal::ZERO,
            total_amount: Decimal::from(100),
            status: status.as_str().to_string(),
            created_utc: Utc::now(),
        };
        let invoices = vec![
            invoice(InvoiceStatus::Sent),
            invoice(InvoiceStatus::Paid),
            invoice(InvoiceStatus::Pending),
            invoice(InvoiceStatus::Overdue),
            invoice(InvoiceStatus::Cancelled),
        ];

        let stats = summarize_downloads(&invoices);

        assert_eq!(
            stats,
            DownloadStats {
                total_invoices: 5,
                downloadable_invoices: 2,
                paid_invoices: 1,
                pending_invoices: 1,
                overdue_invoices: 1,
            }
        );
    }
}
