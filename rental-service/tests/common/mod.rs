#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use http_body_util::BodyExt;
use rental_service::{
    build_router,
    config::{CacheConfig, DatabaseConfig, JwtConfig, RentalConfig, WebhookConfig},
    models::{
        Invoice, InvoiceStatus, Payment, PaymentStatus, Product, ProductStatus, RentalRequest,
        RentalRequestStatus,
    },
    services::{JwtService, MemoryStore, StatsCache},
    AppState,
};
use rust_decimal::Decimal;
use secrecy::Secret;
use serde_json::Value;
use service_core::utils::sign_webhook_payload;
use std::str::FromStr;
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

pub const JWT_SECRET: &str = "integration-jwt-secret";
pub const WEBHOOK_SECRET: &str = "integration-webhook-secret";

pub fn test_config() -> RentalConfig {
    RentalConfig {
        common: Default::default(),
        service_name: "rental-service-test".to_string(),
        service_version: "0.0.0".to_string(),
        log_level: "debug".to_string(),
        otlp_endpoint: None,
        database: DatabaseConfig {
            url: "postgres://unused".to_string(),
            max_connections: 1,
            min_connections: 0,
        },
        jwt: JwtConfig {
            secret: Secret::new(JWT_SECRET.to_string()),
        },
        webhook: WebhookConfig {
            secret: Secret::new(WEBHOOK_SECRET.to_string()),
            tolerance_seconds: 300,
        },
        cache: CacheConfig::default(),
    }
}

pub fn money(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

/// Router over an in-memory store and cache.
pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub state: AppState,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: RentalConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        let state = AppState::new(config, store.clone(), StatsCache::in_memory());
        Self {
            router: build_router(state.clone()),
            store,
            state,
        }
    }

    pub fn token_for(&self, user_id: Uuid) -> String {
        JwtService::new(&self.state.config.jwt)
            .generate_access_token(user_id, "user@example.com", Duration::minutes(15))
            .unwrap()
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        TestResponse {
            status,
            headers,
            body,
        }
    }

    /// JSON request, optionally as `user`.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        user: Option<Uuid>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user_id) = user {
            builder = builder.header(
                header::AUTHORIZATION,
                format!("Bearer {}", self.token_for(user_id)),
            );
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        self.send(builder.body(body).unwrap()).await
    }

    pub async fn get(&self, uri: &str, user: Uuid) -> TestResponse {
        self.request(Method::GET, uri, Some(user), None).await
    }

    /// Deliver a webhook body signed at `timestamp` with `secret`.
    pub async fn webhook(&self, body: &Value, timestamp: i64, secret: &str) -> TestResponse {
        let raw = body.to_string();
        let signature = sign_webhook_payload(secret, timestamp, raw.as_bytes()).unwrap();
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/payments/webhook")
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-webhook-timestamp", timestamp.to_string())
            .header("x-webhook-signature", signature)
            .body(Body::from(raw))
            .unwrap();
        self.send(request).await
    }

    // ==================== Seeding ====================

    pub fn user(&self) -> Uuid {
        let user_id = Uuid::new_v4();
        self.store
            .insert_user(user_id, &format!("{}@example.com", user_id));
        user_id
    }

    pub fn product(&self, owner_id: Uuid, status: ProductStatus, price: &str) -> Uuid {
        let product_id = Uuid::new_v4();
        self.store.insert_product(Product {
            product_id,
            owner_id,
            title: format!("Product {}", &product_id.to_string()[..8]),
            description: None,
            status: status.as_str().to_string(),
            rental_price: money(price),
            created_utc: Utc::now(),
        });
        product_id
    }

    pub fn rental_request(
        &self,
        product_id: Uuid,
        customer_id: Uuid,
        status: RentalRequestStatus,
    ) -> Uuid {
        let rental_request_id = Uuid::new_v4();
        self.store.insert_rental_request(RentalRequest {
            rental_request_id,
            product_id,
            customer_id,
            status: status.as_str().to_string(),
            total_price: money("100.00"),
            start_date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2026, 1, 5).unwrap(),
            message: None,
            created_utc: Utc::now(),
        });
        rental_request_id
    }

    pub fn payment(
        &self,
        rental_request_id: Uuid,
        status: PaymentStatus,
        amount: &str,
        payment_date: Option<DateTime<Utc>>,
    ) -> Uuid {
        let payment_id = Uuid::new_v4();
        self.store.insert_payment(Payment {
            payment_id,
            rental_request_id,
            status: status.as_str().to_string(),
            amount: money(amount),
            payment_date,
            created_utc: Utc::now(),
        });
        payment_id
    }

    pub fn invoice(
        &self,
        rental_request_id: Option<Uuid>,
        subtotal: &str,
        tax_rate: &str,
        tax_amount: &str,
        status: InvoiceStatus,
    ) -> Uuid {
        let invoice_id = Uuid::new_v4();
        let subtotal = money(subtotal);
        let tax_amount = money(tax_amount);
        self.store.insert_invoice(Invoice {
            invoice_id,
            rental_request_id,
            invoice_number: format!("INV-{}", &invoice_id.to_string()[..8]),
            subtotal,
            tax_rate: money(tax_rate),
            tax_amount,
            late_fee: Decimal::ZERO,
            damage_fee: Decimal::ZERO,
            additional_charges: Decimal::ZERO,
            total_amount: subtotal + tax_amount,
            status: status.as_str().to_string(),
            created_utc: Utc::now(),
        });
        invoice_id
    }

    /// Owner with one available product and a customer with a request on it.
    pub fn marketplace(&self) -> (Uuid, Uuid, Uuid, Uuid) {
        let owner = self.user();
        let customer = self.user();
        let product = self.product(owner, ProductStatus::Available, "25.00");
        let request = self.rental_request(product, customer, RentalRequestStatus::Active);
        (owner, customer, product, request)
    }
}
