use orebook_store::{Store, StoreConfig};

use crate::error::CliError;

pub fn execute(config: StoreConfig) -> Result<(), CliError> {
    let store = Store::open(config)?;
    let mut entries = store.load_rates()?;

    if entries.is_empty() {
        println!("no exchange rates stored");
        return Ok(());
    }

    entries.sort_by(|a, b| {
        (&a.from_currency, &a.to_currency, &a.fetch_date)
            .cmp(&(&b.from_currency, &b.to_currency, &b.fetch_date))
    });
    for entry in entries {
        println!(
            "{} -> {}  {:.6}  ({})",
            entry.from_currency, entry.to_currency, entry.rate, entry.fetch_date
        );
    }
    Ok(())
}
