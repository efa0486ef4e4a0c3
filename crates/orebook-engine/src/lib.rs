//! # Orebook Engine
//!
//! Run orchestration for the financial fact engine: a lease-guarded,
//! concurrency-bounded coordinator that refreshes every tracked company
//! through the fetch → sanitize → reconcile → convert → upsert pipeline.
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`adapters`] | Reqwest-backed and in-memory [`FactSource`] implementations |
//! | [`context`] | Per-run shared state (store, rates, sources, policy) |
//! | [`lease`] | Exclusive run marker with stale reclaim |
//! | [`pipeline`] | Sequential per-company refresh |
//! | [`runner`] | Bounded dispatch, failure isolation, run summary |
//!
//! [`FactSource`]: orebook_core::FactSource

pub mod adapters;
pub mod context;
pub mod lease;
pub mod pipeline;
pub mod runner;

use thiserror::Error;

pub use adapters::{FixtureSource, HttpFactSource};
pub use context::{RunContext, STORAGE_CURRENCY};
pub use lease::{LeaseError, RunLease, STALE_LEASE_AFTER};
pub use pipeline::process_company;
pub use runner::{execute_run, run_all, RunSummary, DEFAULT_CONCURRENCY};

/// Run-level failures. Everything per-company is isolated inside the
/// runner; only setup and lease problems surface here.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Lease(#[from] LeaseError),

    #[error(transparent)]
    Store(#[from] orebook_store::StoreError),
}
