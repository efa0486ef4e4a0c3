//! CLI argument definitions for orebook.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `run` | Refresh financial snapshots for tracked companies |
//! | `rates` | List stored exchange rates |
//! | `init` | Create the database and schema |
//! | `add` | Register a company to track |
//!
//! # Examples
//!
//! ```bash
//! # Create the database
//! orebook init
//!
//! # Track a company
//! orebook add XOM --id 6 --name "Exxon Mobil"
//!
//! # Refresh everything, at most 3 pipelines in flight
//! orebook run --concurrency 3
//!
//! # Force-refresh one company
//! orebook run --id 6 --force
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use orebook_engine::DEFAULT_CONCURRENCY;

/// Financial fact engine for tracked mining companies.
///
/// Fetches noisy free-text financial figures from collaborator sources,
/// sanitizes and reconciles them, converts currencies, and persists
/// canonical snapshots into a local DuckDB store.
#[derive(Debug, Parser)]
#[command(name = "orebook", version, about = "Financial fact engine")]
pub struct Cli {
    /// Database file path (falls back to OREBOOK_DB_PATH, then ./orebook.duckdb).
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Refresh financial snapshots for tracked companies.
    Run(RunArgs),

    /// List stored exchange rates.
    Rates,

    /// Create the database and schema.
    Init,

    /// Register a company to track.
    Add(AddArgs),
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Refresh even when stored snapshots are fresh.
    #[arg(long)]
    pub force: bool,

    /// Refresh a single company id.
    #[arg(long, conflicts_with_all = ["offset", "limit"])]
    pub id: Option<i64>,

    /// Skip this many companies (ordered by id).
    #[arg(long, requires = "limit")]
    pub offset: Option<usize>,

    /// Refresh at most this many companies.
    #[arg(long)]
    pub limit: Option<usize>,

    /// Maximum in-flight company pipelines.
    #[arg(long, default_value_t = DEFAULT_CONCURRENCY)]
    pub concurrency: usize,
}

#[derive(Debug, Args)]
pub struct AddArgs {
    /// Ticker symbol, normalized to uppercase.
    pub ticker: String,

    /// Stable company id.
    #[arg(long)]
    pub id: i64,

    /// Display name.
    #[arg(long)]
    pub name: String,

    /// Optional description.
    #[arg(long)]
    pub description: Option<String>,
}
