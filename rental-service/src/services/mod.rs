pub mod backfill;
pub mod cache;
pub mod database;
pub mod jwt;
pub mod memory;
pub mod metrics;
pub mod notifications;
pub mod payments;
pub mod rentals;
pub mod stats;
pub mod store;

pub use backfill::{BackfillReport, InvoiceBackfill};
pub use cache::{CacheBackend, InMemoryCache, RedisCache, StatsCache, TagVersion};
pub use database::Database;
pub use jwt::{AccessTokenClaims, JwtService};
pub use memory::MemoryStore;
pub use notifications::{MarkReadTarget, NotificationService};
pub use payments::{PaymentEvent, PaymentService};
pub use rentals::{NewRentalRequest, RentalService};
pub use stats::{stats_tag, StatsAggregator};
pub use store::RentalStore;
