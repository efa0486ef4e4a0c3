//! Per-company refresh pipeline.
//!
//! One company runs strictly sequentially: staleness pre-check, fetch from
//! each source under the retry executor, sanitize and reconcile, convert
//! and validate, then the staleness-gated upsert. A source that exhausts
//! its retries is logged and simply contributes no fields.

use tracing::{debug, warn};

use orebook_core::{execute, reconcile, Company, FinancialSnapshot, SourceFields, UtcDateTime};
use orebook_store::{SkipReason, StoreError, UpsertOutcome, FRESHNESS_WINDOW};

use crate::context::RunContext;

/// Refresh one company's snapshot.
///
/// Fetch failures never surface as errors here; only persistence problems
/// do, and the run coordinator isolates those per company.
pub async fn process_company(
    context: &RunContext,
    company: &Company,
) -> Result<UpsertOutcome, StoreError> {
    // Skip before any network work when the stored snapshot is fresh.
    if !context.force {
        if let Some(last) = context.store.last_updated(company.id)? {
            if last.age_at(UtcDateTime::now()) < FRESHNESS_WINDOW {
                debug!(ticker = %company.ticker, "snapshot fresh, skipping fetch");
                return Ok(UpsertOutcome::Skipped(SkipReason::Fresh));
            }
        }
    }

    let mut fetched = Vec::new();
    for source in &context.sources {
        match execute(|| source.fetch(company), &context.retry).await {
            Ok(raw) => {
                debug!(
                    ticker = %company.ticker,
                    source = %source.id(),
                    fields = raw.len(),
                    "fetched raw fields"
                );
                fetched.push(SourceFields::from_raw(&raw, source.priority()));
            }
            Err(reason) => {
                warn!(
                    ticker = %company.ticker,
                    source = %source.id(),
                    %reason,
                    "source unavailable"
                );
            }
        }
    }

    let merged = reconcile(&fetched, context.storage_currency);
    let now = UtcDateTime::now();
    let snapshot =
        FinancialSnapshot::from_merged(&merged, &context.rates, context.storage_currency, now);

    context
        .store
        .upsert_snapshot(company.id, &snapshot, now, context.force)
}
