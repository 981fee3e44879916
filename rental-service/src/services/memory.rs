//! In-memory [`RentalStore`] for tests and local runs without PostgreSQL.
//!
//! Enforces the same relational rules the schema does: foreign keys on insert,
//! the `is_read`/`read_utc` pairing, and newest-first notification order.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use service_core::error::AppError;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use crate::models::{
    BackfillCandidate, CreateNotification, CreateRentalRequest, Invoice, InvoiceItem,
    NewInvoiceItem, Notification, Payment, PaymentStatus, Product, RentalRequest,
    RentalRequestStatus,
};
use crate::services::store::RentalStore;

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, String>,
    products: Vec<Product>,
    rental_requests: Vec<RentalRequest>,
    payments: Vec<Payment>,
    invoices: Vec<Invoice>,
    invoice_items: Vec<InvoiceItem>,
    notifications: Vec<Notification>,
}

impl Tables {
    fn product(&self, product_id: Uuid) -> Option<&Product> {
        self.products.iter().find(|p| p.product_id == product_id)
    }

    fn rental_request(&self, rental_request_id: Uuid) -> Option<&RentalRequest> {
        self.rental_requests
            .iter()
            .find(|r| r.rental_request_id == rental_request_id)
    }

    fn owner_of_request(&self, rental_request_id: Uuid) -> Option<Uuid> {
        self.rental_request(rental_request_id)
            .and_then(|r| self.product(r.product_id))
            .map(|p| p.owner_id)
    }
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    unavailable: AtomicBool,
    queries: AtomicU64,
    fail_item_inserts: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of store calls served so far, seeding excluded.
    pub fn query_count(&self) -> u64 {
        self.queries.load(Ordering::SeqCst)
    }

    /// Make every subsequent store call fail, as if the database were down.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Make `insert_invoice_items` fail without writing anything.
    pub fn fail_invoice_item_inserts(&self, fail: bool) {
        self.fail_item_inserts.store(fail, Ordering::SeqCst);
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn begin(&self) -> Result<MutexGuard<'_, Tables>, AppError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(AppError::DatabaseError(anyhow::anyhow!(
                "memory store marked unavailable"
            )));
        }
        Ok(self.lock())
    }

    // ==================== Seeding ====================

    pub fn insert_user(&self, user_id: Uuid, email: &str) {
        self.lock().users.insert(user_id, email.to_string());
    }

    pub fn insert_product(&self, product: Product) {
        self.lock().products.push(product);
    }

    pub fn insert_rental_request(&self, request: RentalRequest) {
        self.lock().rental_requests.push(request);
    }

    pub fn insert_payment(&self, payment: Payment) {
        self.lock().payments.push(payment);
    }

    pub fn insert_invoice(&self, invoice: Invoice) {
        self.lock().invoices.push(invoice);
    }

    /// Snapshot of a user's notifications, newest first.
    pub fn notifications_for(&self, user_id: Uuid) -> Vec<Notification> {
        let mut rows: Vec<Notification> = self
            .lock()
            .notifications
            .iter()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_utc.cmp(&a.created_utc));
        rows
    }

    pub fn payment(&self, payment_id: Uuid) -> Option<Payment> {
        self.lock()
            .payments
            .iter()
            .find(|p| p.payment_id == payment_id)
            .cloned()
    }
}

#[async_trait]
impl RentalStore for MemoryStore {
    async fn health_check(&self) -> Result<(), AppError> {
        self.begin().map(|_| ())
    }

    async fn products_by_owner(&self, owner_id: Uuid) -> Result<Vec<Product>, AppError> {
        let tables = self.begin()?;
        Ok(tables
            .products
            .iter()
            .filter(|p| p.owner_id == owner_id)
            .cloned()
            .collect())
    }

    async fn rental_requests_for_owner(
        &self,
        owner_id: Uuid,
    ) -> Result<Vec<RentalRequest>, AppError> {
        let tables = self.begin()?;
        Ok(tables
            .rental_requests
            .iter()
            .filter(|r| {
                tables
                    .product(r.product_id)
                    .is_some_and(|p| p.owner_id == owner_id)
            })
            .cloned()
            .collect())
    }

    async fn completed_payments_for_owner(&self, owner_id: Uuid) -> Result<Vec<Payment>, AppError> {
        let tables = self.begin()?;
        Ok(tables
            .payments
            .iter()
            .filter(|p| p.status() == Some(PaymentStatus::Completed))
            .filter(|p| tables.owner_of_request(p.rental_request_id) == Some(owner_id))
            .cloned()
            .collect())
    }

    async fn invoices_for_owner(&self, owner_id: Uuid) -> Result<Vec<Invoice>, AppError> {
        let tables = self.begin()?;
        Ok(tables
            .invoices
            .iter()
            .filter(|i| {
                i.rental_request_id
                    .and_then(|id| tables.owner_of_request(id))
                    == Some(owner_id)
            })
            .cloned()
            .collect())
    }

    async fn find_product(&self, product_id: Uuid) -> Result<Option<Product>, AppError> {
        let tables = self.begin()?;
        Ok(tables.product(product_id).cloned())
    }

    async fn create_rental_request(
        &self,
        input: &CreateRentalRequest,
    ) -> Result<RentalRequest, AppError> {
        let mut tables = self.begin()?;
        if tables.product(input.product_id).is_none()
            || !tables.users.contains_key(&input.customer_id)
        {
            return Err(AppError::bad_request("Unknown product or customer"));
        }

        let request = RentalRequest {
            rental_request_id: Uuid::new_v4(),
            product_id: input.product_id,
            customer_id: input.customer_id,
            status: RentalRequestStatus::Pending.as_str().to_string(),
            total_price: input.total_price,
            start_date: input.start_date,
            end_date: input.end_date,
            message: input.message.clone(),
            created_utc: Utc::now(),
        };
        tables.rental_requests.push(request.clone());
        Ok(request)
    }

    async fn product_for_rental_request(
        &self,
        rental_request_id: Uuid,
    ) -> Result<Option<Product>, AppError> {
        let tables = self.begin()?;
        Ok(tables
            .rental_request(rental_request_id)
            .and_then(|r| tables.product(r.product_id))
            .cloned())
    }

    async fn find_payment(&self, payment_id: Uuid) -> Result<Option<Payment>, AppError> {
        let tables = self.begin()?;
        Ok(tables
            .payments
            .iter()
            .find(|p| p.payment_id == payment_id)
            .cloned())
    }

    async fn update_payment_status(
        &self,
        payment_id: Uuid,
        status: PaymentStatus,
        payment_date: Option<DateTime<Utc>>,
    ) -> Result<Option<Payment>, AppError> {
        let mut tables = self.begin()?;
        let Some(payment) = tables
            .payments
            .iter_mut()
            .find(|p| p.payment_id == payment_id)
        else {
            return Ok(None);
        };

        payment.status = status.as_str().to_string();
        if payment_date.is_some() {
            payment.payment_date = payment_date;
        }
        Ok(Some(payment.clone()))
    }

    async fn list_notifications(
        &self,
        user_id: Uuid,
        unread_only: bool,
        limit: i64,
    ) -> Result<Vec<Notification>, AppError> {
        let tables = self.begin()?;
        let mut rows: Vec<Notification> = tables
            .notifications
            .iter()
            .filter(|n| n.user_id == user_id && (!unread_only || !n.is_read))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_utc.cmp(&a.created_utc));
        rows.truncate(usize::try_from(limit.max(0)).unwrap_or(usize::MAX));
        Ok(rows)
    }

    async fn count_unread_notifications(&self, user_id: Uuid) -> Result<i64, AppError> {
        let tables = self.begin()?;
        let count = tables
            .notifications
            .iter()
            .filter(|n| n.user_id == user_id && !n.is_read)
            .count();
        Ok(count as i64)
    }

    async fn create_notification(
        &self,
        input: &CreateNotification,
    ) -> Result<Notification, AppError> {
        let mut tables = self.begin()?;
        let request_missing = input
            .rental_request_id
            .is_some_and(|id| tables.rental_request(id).is_none());
        if !tables.users.contains_key(&input.user_id) || request_missing {
            return Err(AppError::bad_request("Unknown userId or rentalRequestId"));
        }

        let notification = Notification {
            notification_id: Uuid::new_v4(),
            user_id: input.user_id,
            rental_request_id: input.rental_request_id,
            notification_type: input.notification_type.clone(),
            title: input.title.clone(),
            message: input.message.clone(),
            data: input.data.clone(),
            is_read: false,
            read_utc: None,
            created_utc: Utc::now(),
        };
        tables.notifications.push(notification.clone());
        Ok(notification)
    }

    async fn mark_all_notifications_read(
        &self,
        user_id: Uuid,
        read_at: DateTime<Utc>,
    ) -> Result<u64, AppError> {
        let mut tables = self.begin()?;
        let mut updated = 0;
        for n in tables
            .notifications
            .iter_mut()
            .filter(|n| n.user_id == user_id && !n.is_read)
        {
            n.is_read = true;
            n.read_utc = Some(read_at);
            updated += 1;
        }
        Ok(updated)
    }

    async fn mark_notifications_read(
        &self,
        user_id: Uuid,
        ids: &[Uuid],
        read_at: DateTime<Utc>,
    ) -> Result<u64, AppError> {
        let mut tables = self.begin()?;
        let mut updated = 0;
        for n in tables
            .notifications
            .iter_mut()
            .filter(|n| n.user_id == user_id && !n.is_read && ids.contains(&n.notification_id))
        {
            n.is_read = true;
            n.read_utc = Some(read_at);
            updated += 1;
        }
        Ok(updated)
    }

    async fn backfill_candidates(&self) -> Result<Vec<BackfillCandidate>, AppError> {
        let tables = self.begin()?;
        let mut invoices: Vec<&Invoice> = tables.invoices.iter().collect();
        invoices.sort_by(|a, b| {
            a.created_utc
                .cmp(&b.created_utc)
                .then(a.invoice_id.cmp(&b.invoice_id))
        });

        Ok(invoices
            .into_iter()
            .map(|invoice| {
                let product_title = invoice
                    .rental_request_id
                    .and_then(|id| tables.rental_request(id))
                    .and_then(|r| tables.product(r.product_id))
                    .map(|p| p.title.clone());
                let item_count = tables
                    .invoice_items
                    .iter()
                    .filter(|item| item.invoice_id == invoice.invoice_id)
                    .count() as i64;

                BackfillCandidate {
                    invoice_id: invoice.invoice_id,
                    invoice_number: invoice.invoice_number.clone(),
                    rental_request_id: invoice.rental_request_id,
                    subtotal: invoice.subtotal,
                    tax_rate: invoice.tax_rate,
                    tax_amount: invoice.tax_amount,
                    product_title,
                    item_count,
                }
            })
            .collect())
    }

    async fn insert_invoice_items(
        &self,
        items: &[NewInvoiceItem],
    ) -> Result<Vec<InvoiceItem>, AppError> {
        let mut tables = self.begin()?;
        if self.fail_item_inserts.load(Ordering::SeqCst) {
            return Err(AppError::DatabaseError(anyhow::anyhow!(
                "invoice item insert rejected"
            )));
        }
        if let Some(orphan) = items.iter().find(|item| {
            !tables
                .invoices
                .iter()
                .any(|i| i.invoice_id == item.invoice_id)
        }) {
            return Err(AppError::DatabaseError(anyhow::anyhow!(
                "invoice {} does not exist",
                orphan.invoice_id
            )));
        }

        let now = Utc::now();
        let inserted: Vec<InvoiceItem> = items
            .iter()
            .map(|item| InvoiceItem {
                invoice_item_id: Uuid::new_v4(),
                invoice_id: item.invoice_id,
                item_type: item.item_type.as_str().to_string(),
                description: item.description.clone(),
                quantity: item.quantity,
                unit_price: item.unit_price,
                total_price: item.total_price,
                created_utc: now,
            })
            .collect();
        tables.invoice_items.extend(inserted.iter().cloned());
        Ok(inserted)
    }

    async fn invoice_items(&self, invoice_id: Uuid) -> Result<Vec<InvoiceItem>, AppError> {
        let tables = self.begin()?;
        Ok(tables
            .invoice_items
            .iter()
            .filter(|item| item.invoice_id == invoice_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seed_notification(store: &MemoryStore, user_id: Uuid) -> Uuid {
        let id = Uuid::new_v4();
        store.lock().notifications.push(Notification {
            notification_id: id,
            user_id,
            rental_request_id: None,
            notification_type: "system".to_string(),
            title: "t".to_string(),
            message: "m".to_string(),
            data: None,
            is_read: false,
            read_utc: None,
            created_utc: Utc::now(),
        });
        id
    }

    #[tokio::test]
    async fn mark_read_keeps_flag_and_timestamp_together() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        seed_notification(&store, user);

        let now = Utc::now();
        assert_eq!(store.mark_all_notifications_read(user, now).await.unwrap(), 1);

        let rows = store.notifications_for(user);
        assert!(rows[0].is_read);
        assert_eq!(rows[0].read_utc, Some(now));
    }

    #[tokio::test]
    async fn unavailable_store_fails_and_counts_queries() {
        let store = MemoryStore::new();
        store.set_unavailable(true);

        let err = store.products_by_owner(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, AppError::DatabaseError(_)));
        assert_eq!(store.query_count(), 1);
    }
}
