pub mod config;
pub mod dtos;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod startup;

use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::{get, patch, post},
    Router,
};
use service_core::middleware::{
    security_headers::security_headers_middleware,
    tracing::{request_id_middleware, REQUEST_ID_HEADER},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::config::RentalConfig;
use crate::middleware::auth_middleware;
use crate::services::{
    JwtService, NotificationService, PaymentService, RentalService, RentalStore, StatsAggregator,
    StatsCache,
};

pub use startup::Application;

#[derive(Clone)]
pub struct AppState {
    pub config: RentalConfig,
    pub store: Arc<dyn RentalStore>,
    pub cache: StatsCache,
    pub jwt: JwtService,
    pub stats: StatsAggregator,
    pub notifications: NotificationService,
    pub rentals: RentalService,
    pub payments: PaymentService,
}

impl AppState {
    /// Wire the domain services over one store and one cache.
    pub fn new(config: RentalConfig, store: Arc<dyn RentalStore>, cache: StatsCache) -> Self {
        let jwt = JwtService::new(&config.jwt);
        let stats = StatsAggregator::new(store.clone(), cache.clone(), config.cache.stats_ttl());
        let notifications = NotificationService::new(store.clone(), cache.clone());
        let rentals = RentalService::new(store.clone(), notifications.clone(), stats.clone());
        let payments = PaymentService::new(store.clone(), notifications.clone(), stats.clone());

        Self {
            config,
            store,
            cache,
            jwt,
            stats,
            notifications,
            rentals,
            payments,
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    // Bearer-authenticated API. `route_layer` keeps unknown paths at 404.
    let protected = Router::new()
        .route(
            "/api/dashboard/stats",
            get(handlers::dashboard::get_dashboard_stats),
        )
        .route(
            "/api/dashboard/download-stats",
            get(handlers::dashboard::get_download_stats),
        )
        .route(
            "/api/notifications",
            get(handlers::notifications::list_notifications)
                .post(handlers::notifications::create_notification),
        )
        .route(
            "/api/notifications/mark-read",
            patch(handlers::notifications::mark_notifications_read),
        )
        .route(
            "/api/rental-requests",
            post(handlers::rental_requests::create_rental_request),
        )
        .route_layer(from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics))
        // Signature-authenticated provider callback
        .route(
            "/api/payments/webhook",
            post(handlers::payments::payment_webhook),
        )
        .merge(protected)
        .layer(from_fn(security_headers_middleware))
        .layer(from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            }),
        )
        .with_state(state)
}
