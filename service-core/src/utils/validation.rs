use axum::{
    extract::{FromRequest, Request},
    Json,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::error::AppError;

/// Longest rental span accepted by [`validate_date_range`].
pub const MAX_RENTAL_DAYS: i64 = 365;

/// Largest monetary amount accepted by [`validate_amount`].
pub const MAX_AMOUNT: i64 = 1_000_000;

/// JSON body extractor that runs `validator` rules.
///
/// Malformed JSON and failed rules both reject with 400 and the shared error
/// envelope.
pub struct ValidatedJson<T>(pub T);

#[axum::async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate + 'static,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| AppError::bad_request(format!("Invalid request body: {}", e.body_text())))?;

        value.validate()?;

        Ok(ValidatedJson(value))
    }
}

/// Check a monetary amount: strictly positive, at most two decimal places,
/// not above [`MAX_AMOUNT`].
pub fn validate_amount(amount: Decimal, field: &str) -> Result<Decimal, AppError> {
    if amount <= Decimal::ZERO {
        return Err(AppError::bad_request(format!(
            "{} must be greater than zero",
            field
        )));
    }
    if amount.normalize().scale() > 2 {
        return Err(AppError::bad_request(format!(
            "{} must have at most two decimal places",
            field
        )));
    }
    if amount > Decimal::from(MAX_AMOUNT) {
        return Err(AppError::bad_request(format!(
            "{} must not exceed {}",
            field, MAX_AMOUNT
        )));
    }
    Ok(amount)
}

/// Check a rental date range against `today` and return its length in days.
///
/// `start` may be today but not earlier; `end` must be strictly after `start`.
pub fn validate_date_range(
    start: NaiveDate,
    end: NaiveDate,
    today: NaiveDate,
) -> Result<i64, AppError> {
    if start < today {
        return Err(AppError::bad_request("startDate cannot be in the past"));
    }
    if end <= start {
        return Err(AppError::bad_request("endDate must be after startDate"));
    }

    let days = (end - start).num_days();
    if days > MAX_RENTAL_DAYS {
        return Err(AppError::bad_request(format!(
            "Rental period cannot exceed {} days",
            MAX_RENTAL_DAYS
        )));
    }

    Ok(days)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn accepts_positive_two_place_amount() {
        let amount = Decimal::from_str("49.90").unwrap();
        assert_eq!(validate_amount(amount, "amount").unwrap(), amount);
    }

    #[test]
    fn trailing_zeros_do_not_count_as_precision() {
        let amount = Decimal::from_str("10.5000").unwrap();
        assert!(validate_amount(amount, "amount").is_ok());
    }

    #[test]
    fn rejects_zero_negative_and_fractional_cents() {
        assert!(validate_amount(Decimal::ZERO, "amount").is_err());
        assert!(validate_amount(Decimal::from(-5), "amount").is_err());
        assert!(validate_amount(Decimal::from_str("1.005").unwrap(), "amount").is_err());
    }

    #[test]
    fn rejects_amount_above_ceiling() {
        assert!(validate_amount(Decimal::from(MAX_AMOUNT + 1), "amount").is_err());
    }

    #[test]
    fn date_range_counts_days() {
        let today = date("2026-03-01");
        assert_eq!(
            validate_date_range(date("2026-03-01"), date("2026-03-04"), today).unwrap(),
            3
        );
    }

    #[test]
    fn date_range_rejects_past_start_and_inverted_range() {
        let today = date("2026-03-10");
        assert!(validate_date_range(date("2026-03-09"), date("2026-03-12"), today).is_err());
        assert!(validate_date_range(date("2026-03-12"), date("2026-03-12"), today).is_err());
        assert!(validate_date_range(date("2026-03-15"), date("2026-03-12"), today).is_err());
    }

    #[test]
    fn date_range_rejects_overlong_rentals() {
        let today = date("2026-01-01");
        assert!(validate_date_range(date("2026-01-01"), date("2027-01-02"), today).is_err());
    }
}
