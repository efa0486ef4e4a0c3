use orebook_core::{Company, Ticker};
use orebook_store::{Store, StoreConfig};

use crate::cli::AddArgs;
use crate::error::CliError;

pub fn execute(config: StoreConfig, args: AddArgs) -> Result<(), CliError> {
    let ticker = Ticker::parse(&args.ticker)?;
    let store = Store::open(config)?;

    let company = Company::new(args.id, ticker, args.name, args.description);
    store.insert_company(&company)?;
    println!("tracking {} (id {})", company.ticker, company.id);
    Ok(())
}
