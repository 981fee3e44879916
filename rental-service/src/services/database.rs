//! PostgreSQL store for rental-service.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use service_core::error::AppError;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::models::{
    BackfillCandidate, CreateNotification, CreateRentalRequest, Invoice, InvoiceItem,
    NewInvoiceItem, Notification, Payment, PaymentStatus, Product, RentalRequest,
    RentalRequestStatus,
};
use crate::services::metrics::DB_QUERY_DURATION;
use crate::services::store::RentalStore;

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool.
    #[instrument(skip(database_url), fields(service = "rental-service"))]
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, AppError> {
        info!(
            max_connections = max_connections,
            min_connections = min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to connect: {}", e)))?;

        info!("PostgreSQL connection pool established");

        Ok(Self { pool })
    }

    /// Wrap an existing pool.
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run database migrations.
    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Migration failed: {}", e)))?;
        info!("Database migrations completed");
        Ok(())
    }

    /// Close every pooled connection. Called once on shutdown.
    pub async fn close(&self) {
        self.pool.close().await;
        info!("PostgreSQL connection pool closed");
    }
}

fn db_error(context: &str, e: sqlx::Error) -> AppError {
    AppError::DatabaseError(anyhow::anyhow!("{}: {}", context, e))
}

#[async_trait]
impl RentalStore for Database {
    #[instrument(skip(self))]
    async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("Health check failed", e))?;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Dashboard Reads
    // -------------------------------------------------------------------------

    #[instrument(skip(self), fields(owner_id = %owner_id))]
    async fn products_by_owner(&self, owner_id: Uuid) -> Result<Vec<Product>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["products_by_owner"])
            .start_timer();

        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT product_id, owner_id, title, description, status, rental_price, created_utc
            FROM products
            WHERE owner_id = $1
            "#,
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to list products", e))?;

        timer.observe_duration();
        Ok(products)
    }

    #[instrument(skip(self), fields(owner_id = %owner_id))]
    async fn rental_requests_for_owner(
        &self,
        owner_id: Uuid,
    ) -> Result<Vec<RentalRequest>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["rental_requests_for_owner"])
            .start_timer();

        let requests = sqlx::query_as::<_, RentalRequest>(
            r#"
            SELECT rr.rental_request_id, rr.product_id, rr.customer_id, rr.status,
                   rr.total_price, rr.start_date, rr.end_date, rr.message, rr.created_utc
            FROM rental_requests rr
            JOIN products p ON p.product_id = rr.product_id
            WHERE p.owner_id = $1
            "#,
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to list rental requests", e))?;

        timer.observe_duration();
        Ok(requests)
    }

    #[instrument(skip(self), fields(owner_id = %owner_id))]
    async fn completed_payments_for_owner(&self, owner_id: Uuid) -> Result<Vec<Payment>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["completed_payments_for_owner"])
            .start_timer();

        let payments = sqlx::query_as::<_, Payment>(
            r#"
            SELECT pay.payment_id, pay.rental_request_id, pay.status, pay.amount,
                   pay.payment_date, pay.created_utc
            FROM payments pay
            JOIN rental_requests rr ON rr.rental_request_id = pay.rental_request_id
            JOIN products p ON p.product_id = rr.product_id
            WHERE p.owner_id = $1 AND pay.status = $2
            "#,
        )
        .bind(owner_id)
        .bind(PaymentStatus::Completed.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to list payments", e))?;

        timer.observe_duration();
        Ok(payments)
    }

    #[instrument(skip(self), fields(owner_id = %owner_id))]
    async fn invoices_for_owner(&self, owner_id: Uuid) -> Result<Vec<Invoice>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["invoices_for_owner"])
            .start_timer();

        let invoices = sqlx::query_as::<_, Invoice>(
            r#"
            SELECT i.invoice_id, i.rental_request_id, i.invoice_number, i.subtotal, i.tax_rate,
                   i.tax_amount, i.late_fee, i.damage_fee, i.additional_charges, i.total_amount,
                   i.status, i.created_utc
            FROM invoices i
            JOIN rental_requests rr ON rr.rental_request_id = i.rental_request_id
            JOIN products p ON p.product_id = rr.product_id
            WHERE p.owner_id = $1
            "#,
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to list invoices", e))?;

        timer.observe_duration();
        Ok(invoices)
    }

    // -------------------------------------------------------------------------
    // Rentals
    // -------------------------------------------------------------------------

    #[instrument(skip(self), fields(product_id = %product_id))]
    async fn find_product(&self, product_id: Uuid) -> Result<Option<Product>, AppError> {
        sqlx::query_as::<_, Product>(
            r#"
            SELECT product_id, owner_id, title, description, status, rental_price, created_utc
            FROM products
            WHERE product_id = $1
            "#,
        )
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to get product", e))
    }

    #[instrument(skip(self, input), fields(product_id = %input.product_id, customer_id = %input.customer_id))]
    async fn create_rental_request(
        &self,
        input: &CreateRentalRequest,
    ) -> Result<RentalRequest, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_rental_request"])
            .start_timer();

        let request = sqlx::query_as::<_, RentalRequest>(
            r#"
            INSERT INTO rental_requests
                (rental_request_id, product_id, customer_id, status, total_price, start_date, end_date, message)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING rental_request_id, product_id, customer_id, status, total_price,
                      start_date, end_date, message, created_utc
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(input.product_id)
        .bind(input.customer_id)
        .bind(RentalRequestStatus::Pending.as_str())
        .bind(input.total_price)
        .bind(input.start_date)
        .bind(input.end_date)
        .bind(&input.message)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_foreign_key_violation() => {
                AppError::bad_request("Unknown product or customer")
            }
            _ => db_error("Failed to create rental request", e),
        })?;

        timer.observe_duration();

        info!(rental_request_id = %request.rental_request_id, "Rental request created");

        Ok(request)
    }

    #[instrument(skip(self), fields(rental_request_id = %rental_request_id))]
    async fn product_for_rental_request(
        &self,
        rental_request_id: Uuid,
    ) -> Result<Option<Product>, AppError> {
        sqlx::query_as::<_, Product>(
            r#"
            SELECT p.product_id, p.owner_id, p.title, p.description, p.status, p.rental_price,
                   p.created_utc
            FROM rental_requests rr
            JOIN products p ON p.product_id = rr.product_id
            WHERE rr.rental_request_id = $1
            "#,
        )
        .bind(rental_request_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to resolve product for rental request", e))
    }

    // -------------------------------------------------------------------------
    // Payments
    // -------------------------------------------------------------------------

    #[instrument(skip(self), fields(payment_id = %payment_id))]
    async fn find_payment(&self, payment_id: Uuid) -> Result<Option<Payment>, AppError> {
        sqlx::query_as::<_, Payment>(
            r#"
            SELECT payment_id, rental_request_id, status, amount, payment_date, created_utc
            FROM payments
            WHERE payment_id = $1
            "#,
        )
        .bind(payment_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to get payment", e))
    }

    #[instrument(skip(self), fields(payment_id = %payment_id, status = status.as_str()))]
    async fn update_payment_status(
        &self,
        payment_id: Uuid,
        status: PaymentStatus,
        payment_date: Option<DateTime<Utc>>,
    ) -> Result<Option<Payment>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["update_payment_status"])
            .start_timer();

        let payment = sqlx::query_as::<_, Payment>(
            r#"
            UPDATE payments
            SET status = $2, payment_date = COALESCE($3, payment_date)
            WHERE payment_id = $1
            RETURNING payment_id, rental_request_id, status, amount, payment_date, created_utc
            "#,
        )
        .bind(payment_id)
        .bind(status.as_str())
        .bind(payment_date)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to update payment", e))?;

        timer.observe_duration();
        Ok(payment)
    }

    // -------------------------------------------------------------------------
    // Notifications
    // -------------------------------------------------------------------------

    #[instrument(skip(self), fields(user_id = %user_id))]
    async fn list_notifications(
        &self,
        user_id: Uuid,
        unread_only: bool,
        limit: i64,
    ) -> Result<Vec<Notification>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_notifications"])
            .start_timer();

        let notifications = sqlx::query_as::<_, Notification>(
            r#"
            SELECT notification_id, user_id, rental_request_id, notification_type, title, message,
                   data, is_read, read_utc, created_utc
            FROM notifications
            WHERE user_id = $1
              AND ($2::bool = FALSE OR is_read = FALSE)
            ORDER BY created_utc DESC
            LIMIT $3
            "#,
        )
        .bind(user_id)
        .bind(unread_only)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to list notifications", e))?;

        timer.observe_duration();
        Ok(notifications)
    }

    #[instrument(skip(self), fields(user_id = %user_id))]
    async fn count_unread_notifications(&self, user_id: Uuid) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND is_read = FALSE",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("Failed to count unread notifications", e))?;

        Ok(count)
    }

    #[instrument(skip(self, input), fields(user_id = %input.user_id, notification_type = %input.notification_type))]
    async fn create_notification(
        &self,
        input: &CreateNotification,
    ) -> Result<Notification, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_notification"])
            .start_timer();

        let notification = sqlx::query_as::<_, Notification>(
            r#"
            INSERT INTO notifications
                (notification_id, user_id, rental_request_id, notification_type, title, message, data)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING notification_id, user_id, rental_request_id, notification_type, title,
                      message, data, is_read, read_utc, created_utc
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(input.user_id)
        .bind(input.rental_request_id)
        .bind(&input.notification_type)
        .bind(&input.title)
        .bind(&input.message)
        .bind(&input.data)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_foreign_key_violation() => {
                AppError::bad_request("Unknown userId or rentalRequestId")
            }
            _ => db_error("Failed to create notification", e),
        })?;

        timer.observe_duration();
        Ok(notification)
    }

    #[instrument(skip(self), fields(user_id = %user_id))]
    async fn mark_all_notifications_read(
        &self,
        user_id: Uuid,
        read_at: DateTime<Utc>,
    ) -> Result<u64, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["mark_all_notifications_read"])
            .start_timer();

        let result = sqlx::query(
            r#"
            UPDATE notifications
            SET is_read = TRUE, read_utc = $2
            WHERE user_id = $1 AND is_read = FALSE
            "#,
        )
        .bind(user_id)
        .bind(read_at)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to mark notifications read", e))?;

        timer.observe_duration();
        Ok(result.rows_affected())
    }

    #[instrument(skip(self, ids), fields(user_id = %user_id, requested = ids.len()))]
    async fn mark_notifications_read(
        &self,
        user_id: Uuid,
        ids: &[Uuid],
        read_at: DateTime<Utc>,
    ) -> Result<u64, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["mark_notifications_read"])
            .start_timer();

        let result = sqlx::query(
            r#"
            UPDATE notifications
            SET is_read = TRUE, read_utc = $3
            WHERE user_id = $1 AND notification_id = ANY($2) AND is_read = FALSE
            "#,
        )
        .bind(user_id)
        .bind(ids)
        .bind(read_at)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to mark notifications read", e))?;

        timer.observe_duration();
        Ok(result.rows_affected())
    }

    // -------------------------------------------------------------------------
    // Invoice Maintenance
    // -------------------------------------------------------------------------

    #[instrument(skip(self))]
    async fn backfill_candidates(&self) -> Result<Vec<BackfillCandidate>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["backfill_candidates"])
            .start_timer();

        let candidates = sqlx::query_as::<_, BackfillCandidate>(
            r#"
            SELECT i.invoice_id, i.invoice_number, i.rental_request_id, i.subtotal, i.tax_rate,
                   i.tax_amount, p.title AS product_title,
                   (SELECT COUNT(*) FROM invoice_items ii WHERE ii.invoice_id = i.invoice_id)
                       AS item_count
            FROM invoices i
            LEFT JOIN rental_requests rr ON rr.rental_request_id = i.rental_request_id
            LEFT JOIN products p ON p.product_id = rr.product_id
            ORDER BY i.created_utc, i.invoice_id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to list invoices for backfill", e))?;

        timer.observe_duration();
        Ok(candidates)
    }

    #[instrument(skip(self, items), fields(count = items.len()))]
    async fn insert_invoice_items(
        &self,
        items: &[NewInvoiceItem],
    ) -> Result<Vec<InvoiceItem>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["insert_invoice_items"])
            .start_timer();

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("Failed to begin transaction", e))?;

        let mut inserted = Vec::with_capacity(items.len());
        for item in items {
            let row = sqlx::query_as::<_, InvoiceItem>(
                r#"
                INSERT INTO invoice_items
                    (invoice_item_id, invoice_id, item_type, description, quantity, unit_price, total_price)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                RETURNING invoice_item_id, invoice_id, item_type, description, quantity,
                          unit_price, total_price, created_utc
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(item.invoice_id)
            .bind(item.item_type.as_str())
            .bind(&item.description)
            .bind(item.quantity)
            .bind(item.unit_price)
            .bind(item.total_price)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| db_error("Failed to insert invoice item", e))?;
            inserted.push(row);
        }

        tx.commit()
            .await
            .map_err(|e| db_error("Failed to commit invoice items", e))?;

        timer.observe_duration();
        Ok(inserted)
    }

    #[instrument(skip(self), fields(invoice_id = %invoice_id))]
    async fn invoice_items(&self, invoice_id: Uuid) -> Result<Vec<InvoiceItem>, AppError> {
        sqlx::query_as::<_, InvoiceItem>(
            r#"
            SELECT invoice_item_id, invoice_id, item_type, description, quantity, unit_price,
                   total_price, created_utc
            FROM invoice_items
            WHERE invoice_id = $1
            ORDER BY created_utc, invoice_item_id
            "#,
        )
        .bind(invoice_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to list invoice items", e))
    }
}
