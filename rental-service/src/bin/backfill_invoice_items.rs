//! Create the missing `rental_fee` and `tax` items for invoices stored
//! without any. Safe to re-run: invoices that already have items are skipped.
//!
//! Exits non-zero if any invoice could not be repaired.

use rental_service::{
    config::BackfillConfig,
    services::{metrics, Database, InvoiceBackfill},
};
use service_core::observability::logging::init_tracing;
use std::process::ExitCode;
use std::sync::Arc;

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    match run().await {
        Ok(0) => ExitCode::SUCCESS,
        Ok(_) => ExitCode::from(2),
        Err(e) => {
            tracing::error!(error = %e, "Invoice item backfill aborted");
            eprintln!("backfill-invoice-items: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Returns the number of invoices that failed.
async fn run() -> Result<usize, service_core::error::AppError> {
    let config = BackfillConfig::from_env()?;
    init_tracing("backfill-invoice-items", &config.log_level, None)?;
    metrics::init_metrics();

    let db = Database::new(&config.database.url, 2, 1).await?;
    let backfill = InvoiceBackfill::new(Arc::new(db.clone()));
    let report = backfill.run().await;
    db.close().await;
    let report = report?;

    println!(
        "{}",
        serde_json::to_string(&report).unwrap_or_else(|_| format!("{:?}", report))
    );

    Ok(report.failed)
}
