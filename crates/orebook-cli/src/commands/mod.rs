mod add;
mod init;
mod rates;
mod run;

use std::path::PathBuf;

use orebook_store::StoreConfig;

use crate::cli::{Cli, Command};
use crate::error::CliError;

const DEFAULT_DB_PATH: &str = "orebook.duckdb";

pub async fn dispatch(cli: Cli) -> Result<(), CliError> {
    let config = store_config(cli.db);
    match cli.command {
        Command::Run(args) => run::execute(config, args).await,
        Command::Rates => rates::execute(config),
        Command::Init => init::execute(config),
        Command::Add(args) => add::execute(config, args),
    }
}

fn store_config(db: Option<PathBuf>) -> StoreConfig {
    let path = db
        .or_else(|| std::env::var_os("OREBOOK_DB_PATH").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH));
    StoreConfig::new(path)
}
