//! Shared per-run state.

use std::sync::Arc;

use tracing::info;

use orebook_core::{FactSource, RateTable, RetryPolicy};
use orebook_store::{Store, StoreError};

/// All monetary fields are stored in this currency.
pub const STORAGE_CURRENCY: &str = "USD";

/// Read-mostly state built once per invocation and shared across all
/// in-flight company pipelines.
pub struct RunContext {
    pub store: Store,
    pub rates: Arc<RateTable>,
    pub sources: Vec<Arc<dyn FactSource>>,
    pub retry: RetryPolicy,
    pub force: bool,
    pub storage_currency: &'static str,
}

impl RunContext {
    /// Build a context: sources ordered by priority, rate table loaded from
    /// the store with fallback defaults injected for missing pairs.
    pub fn new(store: Store, mut sources: Vec<Arc<dyn FactSource>>) -> Result<Self, StoreError> {
        sources.sort_by_key(|source| source.priority());

        let entries = store.load_rates()?;
        let rates = RateTable::from_entries(&entries).with_fallback_defaults();
        info!(rates = rates.len(), sources = sources.len(), "run context ready");

        Ok(Self {
            store,
            rates: Arc::new(rates),
            sources,
            retry: RetryPolicy::default(),
            force: false,
            storage_currency: STORAGE_CURRENCY,
        })
    }

    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}
