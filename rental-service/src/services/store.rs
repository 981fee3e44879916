//! Data-store seam shared by handlers, services and the backfill job.
//!
//! [`crate::services::Database`] is the PostgreSQL implementation;
//! [`crate::services::MemoryStore`] backs tests and local runs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use service_core::error::AppError;
use uuid::Uuid;

use crate::models::{
    BackfillCandidate, CreateNotification, CreateRentalRequest, Invoice, InvoiceItem,
    NewInvoiceItem, Notification, Payment, PaymentStatus, Product, RentalRequest,
};

#[async_trait]
pub trait RentalStore: Send + Sync {
    async fn health_check(&self) -> Result<(), AppError>;

    // ==================== Dashboard Reads ====================

    /// All products owned by `owner_id`.
    async fn products_by_owner(&self, owner_id: Uuid) -> Result<Vec<Product>, AppError>;

    /// All rental requests whose product is owned by `owner_id`.
    async fn rental_requests_for_owner(&self, owner_id: Uuid)
        -> Result<Vec<RentalRequest>, AppError>;

    /// Completed payments whose rental request's product is owned by `owner_id`.
    async fn completed_payments_for_owner(&self, owner_id: Uuid) -> Result<Vec<Payment>, AppError>;

    /// Invoices whose rental request's product is owned by `owner_id`.
    async fn invoices_for_owner(&self, owner_id: Uuid) -> Result<Vec<Invoice>, AppError>;

    // ==================== Rentals ====================

    async fn find_product(&self, product_id: Uuid) -> Result<Option<Product>, AppError>;

    async fn create_rental_request(
        &self,
        input: &CreateRentalRequest,
    ) -> Result<RentalRequest, AppError>;

    /// Product behind a rental request, if both still exist.
    async fn product_for_rental_request(
        &self,
        rental_request_id: Uuid,
    ) -> Result<Option<Product>, AppError>;

    // ==================== Payments ====================

    async fn find_payment(&self, payment_id: Uuid) -> Result<Option<Payment>, AppError>;

    /// Set a payment's status. `payment_date`, when given, replaces the stored
    /// date; otherwise the stored date is kept. Returns `None` for unknown ids.
    async fn update_payment_status(
        &self,
        payment_id: Uuid,
        status: PaymentStatus,
        payment_date: Option<DateTime<Utc>>,
    ) -> Result<Option<Payment>, AppError>;

    // ==================== Notifications ====================

    /// Newest first, at most `limit` rows.
    async fn list_notifications(
        &self,
        user_id: Uuid,
        unread_only: bool,
        limit: i64,
    ) -> Result<Vec<Notification>, AppError>;

    async fn count_unread_notifications(&self, user_id: Uuid) -> Result<i64, AppError>;

    async fn create_notification(
        &self,
        input: &CreateNotification,
    ) -> Result<Notification, AppError>;

    /// Mark every unread notification of `user_id` as read at `read_at`.
    /// Returns the number of rows changed.
    async fn mark_all_notifications_read(
        &self,
        user_id: Uuid,
        read_at: DateTime<Utc>,
    ) -> Result<u64, AppError>;

    /// Mark the unread notifications among `ids` that belong to `user_id`.
    /// Ids owned by other users are ignored. Returns the number of rows changed.
    async fn mark_notifications_read(
        &self,
        user_id: Uuid,
        ids: &[Uuid],
        read_at: DateTime<Utc>,
    ) -> Result<u64, AppError>;

    // ==================== Invoice Maintenance ====================

    /// Every invoice with its item count and rented product title.
    async fn backfill_candidates(&self) -> Result<Vec<BackfillCandidate>, AppError>;

    /// Insert items atomically: either all rows are stored or none.
    async fn insert_invoice_items(
        &self,
        items: &[NewInvoiceItem],
    ) -> Result<Vec<InvoiceItem>, AppError>;

    async fn invoice_items(&self, invoice_id: Uuid) -> Result<Vec<InvoiceItem>, AppError>;
}
