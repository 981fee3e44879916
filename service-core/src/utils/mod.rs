pub mod signature;
pub mod validation;

pub use signature::{sign_webhook_payload, verify_webhook_signature};
pub use validation::{validate_amount, validate_date_range, ValidatedJson};
