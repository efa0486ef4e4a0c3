//! Schema bootstrap for the orebook database.
//!
//! The `financials` DDL is generated from the shared field vocabulary so
//! the schema can never drift from the parse rules.

use ::duckdb::Connection;
use orebook_core::FIELDS;

/// Apply the schema. Idempotent: every statement is `IF NOT EXISTS`.
///
/// # Errors
/// Returns an error if any DDL statement fails.
pub fn apply_migrations(connection: &Connection) -> Result<(), ::duckdb::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS companies (\n\
             company_id BIGINT PRIMARY KEY,\n\
             ticker TEXT NOT NULL UNIQUE,\n\
             name TEXT NOT NULL,\n\
             description TEXT,\n\
             created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP\n\
         );",
    )?;

    connection.execute_batch(&financials_ddl())?;

    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS exchange_rates (\n\
             from_currency TEXT NOT NULL,\n\
             to_currency TEXT NOT NULL,\n\
             rate DOUBLE NOT NULL,\n\
             fetch_date TEXT NOT NULL,\n\
             UNIQUE (from_currency, to_currency, fetch_date)\n\
         );",
    )?;

    Ok(())
}

/// Build the `financials` table DDL from the field vocabulary: one DOUBLE
/// column per field plus a `_currency` sibling for monetary fields.
fn financials_ddl() -> String {
    let mut columns = vec![String::from("company_id BIGINT PRIMARY KEY")];
    for spec in &FIELDS {
        columns.push(format!("{} DOUBLE", spec.column));
        if let Some(currency_column) = spec.currency_column() {
            columns.push(format!("{currency_column} TEXT"));
        }
    }
    columns.push(String::from("last_updated TEXT"));
    columns.push(String::from("data_source TEXT"));

    format!(
        "CREATE TABLE IF NOT EXISTS financials (\n    {}\n);",
        columns.join(",\n    ")
    )
}

/// Table names the store requires; used by the schema presence check.
pub const REQUIRED_TABLES: [&str; 3] = ["companies", "financials", "exchange_rates"];
