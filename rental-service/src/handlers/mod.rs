//! HTTP handlers for rental-service.

pub mod dashboard;
pub mod health;
pub mod notifications;
pub mod payments;
pub mod rental_requests;

pub use health::{health_check, metrics, readiness_check};
