//! Domain models for rental-service.

mod invoice;
mod notification;
mod payment;
mod product;
mod rental_request;
mod stats;

pub use invoice::{
    BackfillCandidate, Invoice, InvoiceItem, InvoiceItemType, InvoiceStatus, NewInvoiceItem,
};
pub use notification::{CreateNotification, Notification};
pub use payment::{Payment, PaymentStatus};
pub use product::{Product, ProductStatus};
pub use rental_request::{CreateRentalRequest, RentalRequest, RentalRequestStatus};
pub use stats::{DashboardStats, DownloadStats, MONTHLY_REVENUE_WINDOW_DAYS};
