mod cli;
mod commands;
mod error;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = Cli::parse();
    if let Err(error) = commands::dispatch(cli).await {
        eprintln!("error: {error}");
        std::process::exit(error.exit_code());
    }
}

/// Verbosity comes from `OREBOOK_LOG`, then `RUST_LOG`, then `info`.
fn init_tracing() {
    let filter = EnvFilter::try_from_env("OREBOOK_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
