use orebook_store::{Store, StoreConfig};

use crate::error::CliError;

pub fn execute(config: StoreConfig) -> Result<(), CliError> {
    let path = config.db_path.clone();
    Store::bootstrap(config)?;
    println!("initialized {}", path.display());
    Ok(())
}
