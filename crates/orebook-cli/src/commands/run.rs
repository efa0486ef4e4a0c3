use std::sync::Arc;

use tokio::sync::watch;
use tracing::warn;

use orebook_core::{FactSource, SourceId};
use orebook_engine::{execute_run, HttpFactSource, RunContext};
use orebook_store::{CompanySelector, Store, StoreConfig};

use crate::cli::RunArgs;
use crate::error::CliError;

const DEFAULT_API_BASE: &str = "http://127.0.0.1:8080";

pub async fn execute(config: StoreConfig, args: RunArgs) -> Result<(), CliError> {
    let lease_path = config.db_path.with_extension("lease");
    let store = Store::open(config)?;

    let selector = match (args.id, args.limit) {
        (Some(id), _) => CompanySelector::Id(id),
        (None, Some(limit)) => CompanySelector::Range {
            offset: args.offset.unwrap_or(0),
            limit,
        },
        (None, None) => CompanySelector::All,
    };
    let companies = store.list_companies(selector)?;
    if companies.is_empty() {
        println!("no companies selected");
        return Ok(());
    }

    let context = Arc::new(
        RunContext::new(store, configured_sources())?.with_force(args.force),
    );

    let (shutdown_tx, shutdown) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, finishing in-flight work");
            let _ = shutdown_tx.send(true);
        }
    });

    let summary = execute_run(context, lease_path, companies, args.concurrency, shutdown).await?;
    println!("{summary}");
    Ok(())
}

fn configured_sources() -> Vec<Arc<dyn FactSource>> {
    let api_base =
        std::env::var("OREBOOK_API_BASE").unwrap_or_else(|_| String::from(DEFAULT_API_BASE));
    let mut sources: Vec<Arc<dyn FactSource>> = vec![Arc::new(HttpFactSource::new(
        SourceId::PrimaryApi,
        0,
        api_base,
    ))];

    if let Ok(base) = std::env::var("OREBOOK_SECONDARY_SOURCE") {
        if !base.trim().is_empty() {
            sources.push(Arc::new(HttpFactSource::new(SourceId::Verification, 1, base)));
        }
    }

    sources
}
