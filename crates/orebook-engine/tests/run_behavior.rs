//! Behavior-driven tests for the run coordinator
//!
//! These tests verify HOW a full refresh run behaves end to end, from raw
//! collaborator payloads through sanitization, reconciliation, conversion,
//! and the staleness-gated upsert, focusing on user-visible outcomes.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tempfile::tempdir;
use tokio::sync::watch;

use orebook_core::{
    Company, FactSource, FetchError, RawFieldMap, RetryPolicy, SourceId, Ticker, UtcDateTime,
};
use orebook_engine::{
    execute_run, EngineError, FixtureSource, LeaseError, RunContext, DEFAULT_CONCURRENCY,
};
use orebook_store::{Store, StoreConfig};

fn bootstrap_store(dir: &tempfile::TempDir) -> Store {
    Store::bootstrap(StoreConfig::new(dir.path().join("orebook.duckdb"))).expect("bootstrap store")
}

fn company(id: i64, ticker: &str, name: &str) -> orebook_core::Company {
    orebook_core::Company::new(id, Ticker::parse(ticker).expect("ticker"), name, None)
}

fn raw(source: SourceId, currency: Option<&str>) -> RawFieldMap {
    RawFieldMap::new(source, currency.map(String::from), UtcDateTime::now())
}

fn no_shutdown() -> (watch::Sender<bool>, watch::Receiver<bool>) {
    watch::channel(false)
}

// =============================================================================
// Run coordinator: end-to-end refresh
// =============================================================================

#[tokio::test]
async fn when_two_sources_disagree_priority_wins_and_holes_are_filled() {
    // Given: a primary source with market cap and shares but no revenue,
    // and a verification source with revenue and a conflicting market cap
    let dir = tempdir().expect("tempdir");
    let store = bootstrap_store(&dir);
    store
        .insert_company(&company(6, "XOM", "Exxon Mobil"))
        .expect("insert company");

    let primary = Arc::new(FixtureSource::new(SourceId::PrimaryApi, 0));
    primary.stage(
        6,
        Ok(raw(SourceId::PrimaryApi, None)
            .with_field("market_cap_value", "$450.2B")
            .with_field("shares_outstanding", "4.1B")
            .with_field("revenue_value", "N/A")),
    );

    let verification = Arc::new(FixtureSource::new(SourceId::Verification, 1));
    verification.stage(
        6,
        Ok(raw(SourceId::Verification, None)
            .with_field("market_cap_value", "$999B")
            .with_field("revenue_value", "350M")),
    );

    let sources: Vec<Arc<dyn FactSource>> = vec![primary.clone(), verification.clone()];
    let context = Arc::new(
        RunContext::new(store.clone(), sources)
            .expect("context")
            .with_retry_policy(RetryPolicy::immediate(1)),
    );

    // When: a full run executes
    let (_tx, shutdown) = no_shutdown();
    let summary = execute_run(
        context,
        dir.path().join("orebook.lease"),
        store.list_companies(orebook_store::CompanySelector::All).expect("list"),
        DEFAULT_CONCURRENCY,
        shutdown,
    )
    .await
    .expect("run");

    // Then: the snapshot carries first-wins values with holes filled
    assert_eq!(summary.inserted, 1);
    assert_eq!(summary.failed, 0);
    assert_eq!(
        store.read_field(6, "market_cap_value").expect("read"),
        Some(4.502e11)
    );
    assert_eq!(
        store.read_field(6, "shares_outstanding").expect("read"),
        Some(4.1e9)
    );
    assert_eq!(
        store.read_field(6, "revenue_value").expect("read"),
        Some(3.5e8)
    );
    assert_eq!(
        store.read_data_source(6).expect("read"),
        Some(String::from("primary_api+verification"))
    );
}

#[tokio::test]
async fn when_run_repeats_within_freshness_window_nothing_is_written() {
    // Given: a company already refreshed moments ago
    let dir = tempdir().expect("tempdir");
    let store = bootstrap_store(&dir);
    store
        .insert_company(&company(1, "AEM", "Agnico Eagle"))
        .expect("insert company");

    let primary = Arc::new(FixtureSource::new(SourceId::PrimaryApi, 0));
    primary.stage(
        1,
        Ok(raw(SourceId::PrimaryApi, None).with_field("revenue_value", "1.2B")),
    );

    let companies = store
        .list_companies(orebook_store::CompanySelector::All)
        .expect("list");

    let sources: Vec<Arc<dyn FactSource>> = vec![primary.clone()];
    let context = Arc::new(
        RunContext::new(store.clone(), sources)
            .expect("context")
            .with_retry_policy(RetryPolicy::immediate(1)),
    );

    let (_tx, shutdown) = no_shutdown();
    let first = execute_run(
        Arc::clone(&context),
        dir.path().join("orebook.lease"),
        companies.clone(),
        DEFAULT_CONCURRENCY,
        shutdown,
    )
    .await
    .expect("first run");
    assert_eq!(first.inserted, 1);
    let calls_after_first = primary.calls();

    // When: the run repeats immediately
    let (_tx2, shutdown) = no_shutdown();
    let second = execute_run(
        context,
        dir.path().join("orebook.lease"),
        companies,
        DEFAULT_CONCURRENCY,
        shutdown,
    )
    .await
    .expect("second run");

    // Then: the company is skipped before any fetch
    assert_eq!(second.skipped, 1);
    assert_eq!(second.inserted + second.updated + second.failed, 0);
    assert_eq!(primary.calls(), calls_after_first);
}

#[tokio::test]
async fn when_a_later_figure_is_implausible_the_stored_value_survives() {
    // Given: a stored snapshot with a plausible market cap
    let dir = tempdir().expect("tempdir");
    let store = bootstrap_store(&dir);
    store
        .insert_company(&company(2, "NEM", "Newmont"))
        .expect("insert company");

    let primary = Arc::new(FixtureSource::new(SourceId::PrimaryApi, 0));
    primary.stage(
        2,
        Ok(raw(SourceId::PrimaryApi, None)
            .with_field("market_cap_value", "$52B")
            .with_field("revenue_value", "$11.8B")),
    );
    // Second fetch returns a junk market cap well below plausibility.
    primary.stage(
        2,
        Ok(raw(SourceId::PrimaryApi, None)
            .with_field("market_cap_value", "12")
            .with_field("revenue_value", "$12.5B")),
    );

    let companies = store
        .list_companies(orebook_store::CompanySelector::All)
        .expect("list");

    let sources: Vec<Arc<dyn FactSource>> = vec![primary];
    let context = Arc::new(
        RunContext::new(store.clone(), sources)
            .expect("context")
            .with_retry_policy(RetryPolicy::immediate(1))
            .with_force(true),
    );

    let (_tx, shutdown) = no_shutdown();
    execute_run(
        Arc::clone(&context),
        dir.path().join("orebook.lease"),
        companies.clone(),
        DEFAULT_CONCURRENCY,
        shutdown,
    )
    .await
    .expect("first run");

    // When: a forced refresh delivers the implausible figure
    let (_tx2, shutdown) = no_shutdown();
    execute_run(
        context,
        dir.path().join("orebook.lease"),
        companies,
        DEFAULT_CONCURRENCY,
        shutdown,
    )
    .await
    .expect("second run");

    // Then: market cap keeps its prior value while revenue moved
    assert_eq!(
        store.read_field(2, "market_cap_value").expect("read"),
        Some(5.2e10)
    );
    assert_eq!(
        store.read_field(2, "revenue_value").expect("read"),
        Some(1.25e10)
    );
}

#[tokio::test]
async fn when_a_source_returns_server_errors_it_is_retried_to_success() {
    // Given: a source that fails twice with 500 before succeeding
    let dir = tempdir().expect("tempdir");
    let store = bootstrap_store(&dir);
    store
        .insert_company(&company(3, "BHP", "BHP Group"))
        .expect("insert company");

    let primary = Arc::new(FixtureSource::new(SourceId::PrimaryApi, 0));
    primary.stage(3, Err(FetchError::Status(500)));
    primary.stage(3, Err(FetchError::Status(500)));
    primary.stage(
        3,
        Ok(raw(SourceId::PrimaryApi, None).with_field("ebitda", "30.2B")),
    );

    let sources: Vec<Arc<dyn FactSource>> = vec![primary.clone()];
    let context = Arc::new(
        RunContext::new(store.clone(), sources)
            .expect("context")
            .with_retry_policy(RetryPolicy::immediate(2)),
    );

    // When: the run executes
    let (_tx, shutdown) = no_shutdown();
    let summary = execute_run(
        context,
        dir.path().join("orebook.lease"),
        store.list_companies(orebook_store::CompanySelector::All).expect("list"),
        DEFAULT_CONCURRENCY,
        shutdown,
    )
    .await
    .expect("run");

    // Then: exactly three attempts were made and the snapshot landed
    assert_eq!(primary.calls(), 3);
    assert_eq!(summary.inserted, 1);
    assert_eq!(store.read_field(3, "ebitda").expect("read"), Some(3.02e10));
}

#[tokio::test]
async fn when_every_source_fails_the_company_is_skipped_not_failed() {
    // Given: one company whose only source is down, one healthy company
    let dir = tempdir().expect("tempdir");
    let store = bootstrap_store(&dir);
    store
        .insert_company(&company(1, "AEM", "Agnico Eagle"))
        .expect("insert company");
    store
        .insert_company(&company(2, "NEM", "Newmont"))
        .expect("insert company");

    let primary = Arc::new(FixtureSource::new(SourceId::PrimaryApi, 0));
    primary.stage(1, Err(FetchError::Status(500)));
    primary.stage(
        2,
        Ok(raw(SourceId::PrimaryApi, None).with_field("cash_value", "900M")),
    );

    let sources: Vec<Arc<dyn FactSource>> = vec![primary];
    let context = Arc::new(
        RunContext::new(store.clone(), sources)
            .expect("context")
            .with_retry_policy(RetryPolicy::immediate(0)),
    );

    // When: the run executes
    let (_tx, shutdown) = no_shutdown();
    let summary = execute_run(
        context,
        dir.path().join("orebook.lease"),
        store.list_companies(orebook_store::CompanySelector::All).expect("list"),
        DEFAULT_CONCURRENCY,
        shutdown,
    )
    .await
    .expect("run");

    // Then: the dark company skips with no valid data, the other lands
    assert_eq!(summary.total, 2);
    assert_eq!(summary.inserted, 1);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.failed, 0);
    assert_eq!(store.last_updated(1).expect("read"), None);
    assert_eq!(store.read_field(2, "cash_value").expect("read"), Some(9e8));
}

// =============================================================================
// Run coordinator: currency conversion
// =============================================================================

#[tokio::test]
async fn when_a_source_reports_cad_figures_they_are_stored_in_usd() {
    // Given: a source whose payload is tagged CAD, with no stored rates
    // so the documented fallback (0.73) applies
    let dir = tempdir().expect("tempdir");
    let store = bootstrap_store(&dir);
    store
        .insert_company(&company(4, "ABX", "Barrick"))
        .expect("insert company");

    let primary = Arc::new(FixtureSource::new(SourceId::PrimaryApi, 0));
    primary.stage(
        4,
        Ok(raw(SourceId::PrimaryApi, Some("CAD"))
            .with_field("revenue_value", "1B")
            .with_field("shares_outstanding", "1.75B")),
    );

    let sources: Vec<Arc<dyn FactSource>> = vec![primary];
    let context = Arc::new(
        RunContext::new(store.clone(), sources)
            .expect("context")
            .with_retry_policy(RetryPolicy::immediate(1)),
    );

    // When: the run executes
    let (_tx, shutdown) = no_shutdown();
    execute_run(
        context,
        dir.path().join("orebook.lease"),
        store.list_companies(orebook_store::CompanySelector::All).expect("list"),
        DEFAULT_CONCURRENCY,
        shutdown,
    )
    .await
    .expect("run");

    // Then: monetary fields are converted, share counts are not
    assert_eq!(
        store.read_field(4, "revenue_value").expect("read"),
        Some(7.3e8)
    );
    assert_eq!(
        store.read_field(4, "shares_outstanding").expect("read"),
        Some(1.75e9)
    );
}

// =============================================================================
// Run coordinator: lease and shutdown
// =============================================================================

#[tokio::test]
async fn when_another_run_holds_the_lease_the_invocation_aborts() {
    // Given: a fresh lease marker held by someone else
    let dir = tempdir().expect("tempdir");
    let store = bootstrap_store(&dir);
    let lease_path = dir.path().join("orebook.lease");
    std::fs::write(&lease_path, b"").expect("plant lease");

    let context = Arc::new(
        RunContext::new(
            store,
            vec![Arc::new(FixtureSource::new(SourceId::PrimaryApi, 0)) as Arc<dyn FactSource>],
        )
        .expect("context"),
    );

    // When: a run attempts to start
    let (_tx, shutdown) = no_shutdown();
    let result = execute_run(context, &lease_path, Vec::new(), DEFAULT_CONCURRENCY, shutdown).await;

    // Then: it aborts with a lease conflict and leaves the marker alone
    assert!(matches!(
        result,
        Err(EngineError::Lease(LeaseError::Conflict { .. }))
    ));
    assert!(lease_path.exists());
}

#[tokio::test]
async fn when_shutdown_is_requested_before_dispatch_no_company_runs() {
    // Given: shutdown already signalled
    let dir = tempdir().expect("tempdir");
    let store = bootstrap_store(&dir);
    store
        .insert_company(&company(1, "AEM", "Agnico Eagle"))
        .expect("insert company");

    let primary = Arc::new(FixtureSource::new(SourceId::PrimaryApi, 0));
    let sources: Vec<Arc<dyn FactSource>> = vec![primary.clone()];
    let context = Arc::new(RunContext::new(store.clone(), sources).expect("context"));

    let (tx, shutdown) = watch::channel(true);

    // When: the run executes
    let summary = execute_run(
        context,
        dir.path().join("orebook.lease"),
        store.list_companies(orebook_store::CompanySelector::All).expect("list"),
        DEFAULT_CONCURRENCY,
        shutdown,
    )
    .await
    .expect("run");
    drop(tx);

    // Then: nothing was dispatched, the summary still exists, lease is gone
    assert_eq!(summary.total, 0);
    assert_eq!(primary.calls(), 0);
    assert!(!dir.path().join("orebook.lease").exists());
}

/// Source whose fetches park until the test opens a gate, so a shutdown
/// can be signalled while a company is in flight.
struct GatedSource {
    started: watch::Sender<bool>,
    release: watch::Receiver<bool>,
    fetched: Mutex<Vec<i64>>,
}

impl FactSource for GatedSource {
    fn id(&self) -> SourceId {
        SourceId::PrimaryApi
    }

    fn priority(&self) -> u8 {
        0
    }

    fn fetch<'a>(
        &'a self,
        company: &'a Company,
    ) -> Pin<Box<dyn Future<Output = Result<RawFieldMap, FetchError>> + Send + 'a>> {
        Box::pin(async move {
            self.fetched
                .lock()
                .expect("fetched mutex poisoned")
                .push(company.id);
            let _ = self.started.send(true);
            let mut release = self.release.clone();
            let _ = release.wait_for(|open| *open).await;
            Ok(raw(SourceId::PrimaryApi, None).with_field("revenue_value", "2.5B"))
        })
    }
}

#[tokio::test]
async fn when_shutdown_arrives_mid_run_the_in_flight_company_still_lands() {
    // Given: a single-permit pool where the first company's fetch is parked
    // behind a gate and a second company waits its turn
    let dir = tempdir().expect("tempdir");
    let store = bootstrap_store(&dir);
    store
        .insert_company(&company(1, "AEM", "Agnico Eagle"))
        .expect("insert company");
    store
        .insert_company(&company(2, "NEM", "Newmont"))
        .expect("insert company");

    let (started_tx, mut started_rx) = watch::channel(false);
    let (release_tx, release_rx) = watch::channel(false);
    let gated = Arc::new(GatedSource {
        started: started_tx,
        release: release_rx,
        fetched: Mutex::new(Vec::new()),
    });

    let sources: Vec<Arc<dyn FactSource>> = vec![gated.clone()];
    let context = Arc::new(
        RunContext::new(store.clone(), sources)
            .expect("context")
            .with_retry_policy(RetryPolicy::immediate(0)),
    );

    let lease_path = dir.path().join("orebook.lease");
    let (shutdown_tx, shutdown) = no_shutdown();
    let run = tokio::spawn(execute_run(
        context,
        lease_path.clone(),
        vec![
            company(1, "AEM", "Agnico Eagle"),
            company(2, "NEM", "Newmont"),
        ],
        1,
        shutdown,
    ));

    // When: shutdown is signalled while the first company is mid-fetch,
    // then the gate opens
    started_rx.wait_for(|v| *v).await.expect("first fetch starts");
    shutdown_tx.send(true).expect("signal shutdown");
    // Let the coordinator observe the shutdown before the gate opens.
    tokio::time::sleep(Duration::from_millis(20)).await;
    release_tx.send(true).expect("open gate");

    let summary = run.await.expect("join").expect("run");

    // Then: the in-flight company finished its upsert, the second was never
    // dispatched, and the lease is released
    assert_eq!(summary.total, 1);
    assert_eq!(summary.inserted, 1);
    assert_eq!(
        store.read_field(1, "revenue_value").expect("read"),
        Some(2.5e9)
    );
    assert_eq!(
        gated
            .fetched
            .lock()
            .expect("fetched mutex poisoned")
            .as_slice(),
        &[1]
    );
    assert_eq!(store.last_updated(2).expect("read"), None);
    assert!(!lease_path.exists());
}
