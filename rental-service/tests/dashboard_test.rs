mod common;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use chrono::{Duration, Utc};
use common::{money, TestApp};
use rental_service::models::{InvoiceStatus, PaymentStatus, ProductStatus, RentalRequestStatus};
use rust_decimal::prelude::ToPrimitive;
use serde_json::json;

#[tokio::test]
async fn owner_without_products_gets_all_zeros() {
    let app = TestApp::new();
    let owner = app.user();

    let res = app.get("/api/dashboard/stats", owner).await;

    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["success"], true);
    assert_eq!(
        res.body["data"],
        json!({
            "totalProducts": 0,
            "availableProducts": 0,
            "rentedProducts": 0,
            "pendingRequests": 0,
            "activeRequests": 0,
            "completedRequests": 0,
            "totalRevenue": 0.0,
            "monthlyRevenue": 0.0,
            "totalRequests": 0
        })
    );
}

#[tokio::test]
async fn counts_and_revenue_cover_only_the_callers_products() {
    let app = TestApp::new();
    let owner = app.user();
    let customer = app.user();
    let camera = app.product(owner, ProductStatus::Available, "40.00");
    let tent = app.product(owner, ProductStatus::Rented, "15.00");

    let r1 = app.rental_request(camera, customer, RentalRequestStatus::Completed);
    let r2 = app.rental_request(tent, customer, RentalRequestStatus::Active);
    app.rental_request(camera, customer, RentalRequestStatus::Pending);

    let now = Utc::now();
    app.payment(r1, PaymentStatus::Completed, "120.00", Some(now - Duration::days(3)));
    app.payment(r2, PaymentStatus::Completed, "45.50", Some(now - Duration::days(45)));
    app.payment(r2, PaymentStatus::Pending, "999.00", None);

    // Another owner's activity must not leak in.
    let (_, _, _, other_request) = app.marketplace();
    app.payment(other_request, PaymentStatus::Completed, "500.00", Some(now));

    let res = app.get("/api/dashboard/stats", owner).await;
    let data = &res.body["data"];

    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(data["totalProducts"], 2);
    assert_eq!(data["availableProducts"], 1);
    assert_eq!(data["rentedProducts"], 1);
    assert_eq!(data["pendingRequests"], 1);
    assert_eq!(data["activeRequests"], 1);
    assert_eq!(data["completedRequests"], 1);
    assert_eq!(data["totalRequests"], 3);
    assert_eq!(data["totalRevenue"], money("165.50").to_f64().unwrap());
    assert_eq!(data["monthlyRevenue"], money("120.00").to_f64().unwrap());
    assert!(data["totalRevenue"].as_f64() >= data["monthlyRevenue"].as_f64());
}

#[tokio::test]
async fn stats_carry_edge_cache_policy() {
    let app = TestApp::new();
    let owner = app.user();

    for uri in ["/api/dashboard/stats", "/api/dashboard/download-stats"] {
        let res = app.get(uri, owner).await;
        assert_eq!(
            res.headers[header::CACHE_CONTROL],
            "public, s-maxage=60, stale-while-revalidate=120"
        );
    }
}

#[tokio::test]
async fn cached_stats_are_served_until_invalidated() {
    let app = TestApp::new();
    let owner = app.user();

    let first = app.get("/api/dashboard/stats", owner).await;
    assert_eq!(first.body["data"]["totalProducts"], 0);

    // A direct store write does not invalidate; the cached value is served.
    app.product(owner, ProductStatus::Available, "10.00");
    let cached = app.get("/api/dashboard/stats", owner).await;
    assert_eq!(cached.body["data"]["totalProducts"], 0);

    // Marking notifications read is a stats-affecting mutation.
    let res = app
        .request(
            Method::PATCH,
            "/api/notifications/mark-read",
            Some(owner),
            Some(json!({ "markAll": true })),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);

    let fresh = app.get("/api/dashboard/stats", owner).await;
    assert_eq!(fresh.body["data"]["totalProducts"], 1);
}

#[tokio::test]
async fn download_stats_count_invoices_by_status() {
    let app = TestApp::new();
    let (owner, _, _, request) = app.marketplace();
    app.invoice(Some(request), "100.00", "0.08", "8.00", InvoiceStatus::Paid);
    app.invoice(Some(request), "50.00", "0.08", "4.00", InvoiceStatus::Sent);
    app.invoice(Some(request), "50.00", "0.08", "4.00", InvoiceStatus::Overdue);
    app.invoice(None, "10.00", "0", "0", InvoiceStatus::Paid);

    let res = app.get("/api/dashboard/download-stats", owner).await;

    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(
        res.body["data"],
        json!({
            "totalInvoices": 3,
            "downloadableInvoices": 2,
            "paidInvoices": 1,
            "pendingInvoices": 0,
            "overdueInvoices": 1
        })
    );
}

#[tokio::test]
async fn missing_token_is_rejected_before_the_store() {
    let app = TestApp::new();

    let res = app
        .send(
            Request::builder()
                .uri("/api/dashboard/stats")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.body["success"], false);
    assert_eq!(app.store.query_count(), 0);
}

#[tokio::test]
async fn invalid_token_is_rejected() {
    let app = TestApp::new();

    let res = app
        .send(
            Request::builder()
                .uri("/api/dashboard/stats")
                .header(header::AUTHORIZATION, "Bearer not-a-jwt")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.body["message"], "Invalid or expired token");
    assert_eq!(app.store.query_count(), 0);
}

#[tokio::test]
async fn store_failure_yields_generic_500() {
    let app = TestApp::new();
    let owner = app.user();
    app.store.set_unavailable(true);

    let res = app.get("/api/dashboard/stats", owner).await;

    assert_eq!(res.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        res.body,
        json!({ "success": false, "message": "Internal server error" })
    );
}
