//! One-shot repair of invoices stored without line items.
//!
//! Each empty invoice gets a `rental_fee` item for its subtotal and a `tax`
//! item for its tax amount, written together or not at all. Invoices that
//! already have items are left alone, so the job can be re-run safely.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use service_core::error::AppError;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, instrument};
use uuid::Uuid;

use crate::models::{BackfillCandidate, InvoiceItemType, NewInvoiceItem};
use crate::services::metrics::BACKFILL_INVOICES_TOTAL;
use crate::services::store::RentalStore;

#[derive(Debug, Error)]
pub enum BackfillError {
    #[error("invoice {0} has no rental request")]
    MissingRentalRequest(String),

    #[error("invoice {invoice_number}: no product found for rental request {rental_request_id}")]
    MissingProduct {
        invoice_number: String,
        rental_request_id: Uuid,
    },

    #[error(transparent)]
    Store(#[from] AppError),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BackfillReport {
    pub scanned: usize,
    pub fixed: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// `"Tax (8%)"` for a rate of `0.08`; the percentage is rounded half away from zero.
pub fn tax_description(tax_rate: Decimal) -> String {
    let percent = (tax_rate * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .normalize();
    format!("Tax ({}%)", percent)
}

/// The two items an empty invoice should have had.
pub fn plan_items(candidate: &BackfillCandidate) -> Result<Vec<NewInvoiceItem>, BackfillError> {
    let rental_request_id = candidate
        .rental_request_id
        .ok_or_else(|| BackfillError::MissingRentalRequest(candidate.invoice_number.clone()))?;
    let title = candidate
        .product_title
        .as_deref()
        .ok_or_else(|| BackfillError::MissingProduct {
            invoice_number: candidate.invoice_number.clone(),
            rental_request_id,
        })?;

    Ok(vec![
        NewInvoiceItem {
            invoice_id: candidate.invoice_id,
            item_type: InvoiceItemType::RentalFee,
            description: format!("Rental fee for {}", title),
            quantity: 1,
            unit_price: candidate.subtotal,
            total_price: candidate.subtotal,
        },
        NewInvoiceItem {
            invoice_id: candidate.invoice_id,
            item_type: InvoiceItemType::Tax,
            description: tax_description(candidate.tax_rate),
            quantity: 1,
            unit_price: candidate.tax_amount,
            total_price: candidate.tax_amount,
        },
    ])
}

pub struct InvoiceBackfill {
    store: Arc<dyn RentalStore>,
}

impl InvoiceBackfill {
    pub fn new(store: Arc<dyn RentalStore>) -> Self {
        Self { store }
    }

    /// Visit every invoice once. Per-invoice failures are logged and counted;
    /// only a failure to list invoices aborts the run.
    #[instrument(skip(self))]
    pub async fn run(&self) -> Result<BackfillReport, AppError> {
        let candidates = self.store.backfill_candidates().await?;
        let mut report = BackfillReport {
            scanned: candidates.len(),
            ..Default::default()
        };

        info!(invoices = report.scanned, "Starting invoice item backfill");

        for candidate in &candidates {
            if candidate.item_count > 0 {
                report.skipped += 1;
                BACKFILL_INVOICES_TOTAL.with_label_values(&["skipped"]).inc();
                continue;
            }

            match self.repair(candidate).await {
                Ok(()) => {
                    report.fixed += 1;
                    BACKFILL_INVOICES_TOTAL.with_label_values(&["fixed"]).inc();
                    info!(
                        invoice_id = %candidate.invoice_id,
                        invoice_number = %candidate.invoice_number,
                        "Invoice items created"
                    );
                }
                Err(e) => {
                    report.failed += 1;
                    BACKFILL_INVOICES_TOTAL.with_label_values(&["failed"]).inc();
                    error!(
                        invoice_id = %candidate.invoice_id,
                        error = %e,
                        "Invoice backfill failed"
                    );
                }
            }
        }

        info!(
            scanned = report.scanned,
            fixed = report.fixed,
            skipped = report.skipped,
            failed = report.failed,
            "Invoice item backfill finished"
        );

        Ok(report)
    }

    async fn repair(&self, candidate: &BackfillCandidate) -> Result<(), BackfillError> {
        let items = plan_items(candidate)?;
        self.store.insert_invoice_items(&items).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn candidate(title: Option<&str>) -> BackfillCandidate {
        BackfillCandidate {
            invoice_id: Uuid::new_v4(),
            invoice_number: "INV-0001".to_string(),
            rental_request_id: Some(Uuid::new_v4()),
            subtotal: Decimal::from(100),
            tax_rate: Decimal::from_str("0.08").unwrap(),
            tax_amount: Decimal::from(8),
            product_title: title.map(str::to_string),
            item_count: 0,
        }
    }

    #[test]
    fn tax_description_rounds_percentage() {
        assert_eq!(tax_description(Decimal::from_str("0.08").unwrap()), "Tax (8%)");
        assert_eq!(tax_description(Decimal::from_str("0.0800").unwrap()), "Tax (8%)");
        assert_eq!(tax_description(Decimal::from_str("0.075").unwrap()), "Tax (8%)");
        assert_eq!(tax_description(Decimal::from_str("0.125").unwrap()), "Tax (13%)");
        assert_eq!(tax_description(Decimal::ZERO), "Tax (0%)");
    }

    #[test]
    fn plans_rental_fee_and_tax() {
        let c = candidate(Some("Kayak"));
        let items = plan_items(&c).unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].item_type, InvoiceItemType::RentalFee);
        assert_eq!(items[0].description, "Rental fee for Kayak");
        assert_eq!(items[0].unit_price, Decimal::from(100));
        assert_eq!(items[0].total_price, Decimal::from(100));
        assert_eq!(items[1].item_type, InvoiceItemType::Tax);
        assert_eq!(items[1].description, "Tax (8%)");
        assert_eq!(items[1].total_price, Decimal::from(8));
    }

    #[test]
    fn missing_product_is_an_error() {
        let c = candidate(None);
        assert!(matches!(
            plan_items(&c),
            Err(BackfillError::MissingProduct { .. })
        ));
    }

    #[test]
    fn missing_rental_request_is_an_error() {
        let mut c = candidate(Some("Kayak"));
        c.rental_request_id = None;
        assert!(matches!(
            plan_items(&c),
            Err(BackfillError::MissingRentalRequest(_))
        ));
    }
}
