//! Run coordinator.
//!
//! Dispatches company pipelines onto a semaphore-bounded worker pool,
//! isolates per-company failures (including panics surfaced as join
//! errors), honors cooperative shutdown between dispatches, and always
//! produces a [`RunSummary`].

use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{watch, Semaphore};
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, info, warn};

use orebook_core::{Company, Ticker};
use orebook_store::{StoreError, UpsertOutcome};

use crate::context::RunContext;
use crate::lease::{RunLease, STALE_LEASE_AFTER};
use crate::pipeline::process_company;
use crate::EngineError;

/// Default bound on concurrently in-flight company pipelines.
pub const DEFAULT_CONCURRENCY: usize = 5;

const PROGRESS_EVERY: usize = 10;

/// Aggregate outcome counts for one run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub total: usize,
    pub inserted: usize,
    pub updated: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl RunSummary {
    fn record(&mut self, outcome: UpsertOutcome) {
        self.total += 1;
        match outcome {
            UpsertOutcome::Inserted => self.inserted += 1,
            UpsertOutcome::Updated => self.updated += 1,
            UpsertOutcome::Skipped(_) => self.skipped += 1,
        }
    }

    fn record_failure(&mut self) {
        self.total += 1;
        self.failed += 1;
    }
}

impl Display for RunSummary {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} companies: {} inserted, {} updated, {} skipped, {} failed",
            self.total, self.inserted, self.updated, self.skipped, self.failed
        )
    }
}

/// Acquire the run lease, refresh the given companies, release the lease.
///
/// The lease is released on every exit path, including shutdown, because
/// [`RunLease`] removes its marker on drop.
pub async fn execute_run(
    context: Arc<RunContext>,
    lease_path: impl Into<PathBuf>,
    companies: Vec<Company>,
    concurrency: usize,
    shutdown: watch::Receiver<bool>,
) -> Result<RunSummary, EngineError> {
    let run_id = uuid::Uuid::new_v4();
    let lease = RunLease::acquire(lease_path, STALE_LEASE_AFTER)?;
    info!(%run_id, lease = %lease.path().display(), "lease acquired");

    let summary = run_all(context, companies, concurrency, shutdown).await;
    info!(%run_id, %summary, "releasing lease");
    drop(lease);
    Ok(summary)
}

/// Refresh all given companies with at most `concurrency` in flight.
pub async fn run_all(
    context: Arc<RunContext>,
    companies: Vec<Company>,
    concurrency: usize,
    mut shutdown: watch::Receiver<bool>,
) -> RunSummary {
    let concurrency = concurrency.max(1);
    let semaphore = Arc::new(Semaphore::new(concurrency));
    let mut tasks: JoinSet<(Ticker, i64, Result<UpsertOutcome, StoreError>)> = JoinSet::new();
    let mut summary = RunSummary::default();

    let planned = companies.len();
    info!(companies = planned, concurrency, "run started");

    for company in companies {
        if *shutdown.borrow() {
            info!("shutdown requested, stopping dispatch");
            break;
        }

        let permit = tokio::select! {
            permit = semaphore.clone().acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => break,
            },
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    info!("shutdown requested, stopping dispatch");
                    break;
                }
                continue;
            }
        };

        let context = Arc::clone(&context);
        tasks.spawn(async move {
            let _permit = permit;
            let ticker = company.ticker.clone();
            let outcome = process_company(&context, &company).await;
            (ticker, company.id, outcome)
        });

        while let Some(finished) = tasks.try_join_next() {
            absorb(&mut summary, finished);
        }
    }

    // In-flight pipelines finish even after a shutdown request.
    while let Some(finished) = tasks.join_next().await {
        absorb(&mut summary, finished);
    }

    info!(%summary, "run complete");
    summary
}

fn absorb(
    summary: &mut RunSummary,
    finished: Result<(Ticker, i64, Result<UpsertOutcome, StoreError>), JoinError>,
) {
    match finished {
        Ok((ticker, _, Ok(outcome))) => {
            debug!(%ticker, %outcome, "company refreshed");
            summary.record(outcome);
        }
        Ok((ticker, company_id, Err(error))) => {
            warn!(%ticker, company_id, %error, "company failed, run continues");
            summary.record_failure();
        }
        Err(join_error) => {
            warn!(%join_error, "company task aborted, run continues");
            summary.record_failure();
        }
    }

    if summary.total % PROGRESS_EVERY == 0 {
        info!(processed = summary.total, "progress");
    }
}
