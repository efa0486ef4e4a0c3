//! # Orebook Store
//!
//! `DuckDB`-backed persistence for the financial fact engine.
//!
//! The store owns all write access to `financials` rows. Its central
//! operation is the staleness-gated upsert: a snapshot is written only when
//! it is due (forced, first-seen, or older than the freshness window), and
//! the write itself is one atomic `INSERT … ON CONFLICT DO UPDATE`
//! statement per company so partial rows are never observable.
//!
//! ## Tables
//!
//! | Table | Description |
//! |-------|-------------|
//! | `companies` | Tracked companies (stable id + ticker) |
//! | `financials` | One snapshot row per company, vocabulary-driven columns |
//! | `exchange_rates` | Directed currency pairs, unique per (from, to, date) |

pub mod migrations;
pub mod pool;

use std::fmt::{Display, Formatter};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use ::duckdb::ToSql;
use thiserror::Error;

use orebook_core::{field_spec, Company, FinancialSnapshot, RateEntry, Ticker, UtcDateTime};

pub use pool::{PooledReader, StorePool};

/// Snapshots younger than this are considered fresh and are not refreshed
/// unless the run is forced.
pub const FRESHNESS_WINDOW: Duration = Duration::from_secs(24 * 60 * 60);

/// Errors from store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    DuckDb(#[from] ::duckdb::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("database file not found: {path}")]
    DatabaseMissing { path: PathBuf },

    #[error("schema is missing required table '{table}'")]
    SchemaMissing { table: &'static str },

    #[error("unknown field '{name}'")]
    UnknownField { name: String },

    #[error("corrupt stored data: {0}")]
    Corrupt(String),
}

/// Store configuration.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub db_path: PathBuf,
    pub max_readers: usize,
}

impl StoreConfig {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
            max_readers: 4,
        }
    }
}

/// Company selection for a run or for inspection tooling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompanySelector {
    All,
    Id(i64),
    Range { offset: usize, limit: usize },
}

/// Outcome of a staleness-gated upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
    Skipped(SkipReason),
}

/// Why an upsert was skipped without touching storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Prior snapshot is within the freshness window.
    Fresh,
    /// Validated snapshot had no substantive fields.
    NoValidData,
}

impl Display for UpsertOutcome {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Inserted => f.write_str("inserted"),
            Self::Updated => f.write_str("updated"),
            Self::Skipped(SkipReason::Fresh) => f.write_str("skipped (fresh)"),
            Self::Skipped(SkipReason::NoValidData) => f.write_str("skipped (no valid data)"),
        }
    }
}

/// The persistence interface for companies, snapshots, and exchange rates.
#[derive(Clone, Debug)]
pub struct Store {
    pool: StorePool,
}

impl Store {
    /// Open an existing database, verifying the file and schema are
    /// present. Setup failures here abort the whole invocation.
    pub fn open(config: StoreConfig) -> Result<Self, StoreError> {
        if !config.db_path.exists() {
            return Err(StoreError::DatabaseMissing {
                path: config.db_path,
            });
        }

        let store = Self {
            pool: StorePool::new(config.db_path, config.max_readers),
        };
        store.verify_schema()?;
        Ok(store)
    }

    /// Create the database (and parent directories) and apply the schema.
    pub fn bootstrap(config: StoreConfig) -> Result<Self, StoreError> {
        if let Some(parent) = config.db_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let pool = StorePool::new(config.db_path, config.max_readers);
        pool.with_writer(migrations::apply_migrations)?;
        Ok(Self { pool })
    }

    fn verify_schema(&self) -> Result<(), StoreError> {
        let reader = self.pool.reader()?;
        let mut statement = reader.prepare(
            "SELECT table_name FROM information_schema.tables WHERE table_schema = 'main'",
        )?;
        let mut present = Vec::new();
        let mut rows = statement.query([])?;
        while let Some(row) = rows.next()? {
            present.push(row.get::<_, String>(0)?);
        }

        for table in migrations::REQUIRED_TABLES {
            if !present.iter().any(|name| name == table) {
                return Err(StoreError::SchemaMissing { table });
            }
        }
        Ok(())
    }

    /// Register a company. Identity is immutable; re-inserting an existing
    /// id only refreshes the descriptive payload.
    pub fn insert_company(&self, company: &Company) -> Result<(), StoreError> {
        self.pool.with_writer(|connection| {
            let params: [&dyn ToSql; 4] = [
                &company.id,
                &company.ticker.as_str(),
                &company.name,
                &company.description,
            ];
            connection.execute(
                "INSERT INTO companies (company_id, ticker, name, description) \
                 VALUES (?, ?, ?, ?) \
                 ON CONFLICT (company_id) DO UPDATE SET \
                 name = EXCLUDED.name, description = EXCLUDED.description",
                params.as_slice(),
            )?;
            Ok(())
        })?;
        Ok(())
    }

    /// List companies matching a selector, ordered by id.
    pub fn list_companies(&self, selector: CompanySelector) -> Result<Vec<Company>, StoreError> {
        let reader = self.pool.reader()?;
        let base = "SELECT company_id, ticker, name, description FROM companies";

        let (sql, params): (String, Vec<Box<dyn ToSql>>) = match selector {
            CompanySelector::All => (format!("{base} ORDER BY company_id"), Vec::new()),
            CompanySelector::Id(id) => (
                format!("{base} WHERE company_id = ? ORDER BY company_id"),
                vec![Box::new(id)],
            ),
            CompanySelector::Range { offset, limit } => (
                format!("{base} ORDER BY company_id LIMIT ? OFFSET ?"),
                vec![Box::new(limit as i64), Box::new(offset as i64)],
            ),
        };

        let refs: Vec<&dyn ToSql> = params.iter().map(AsRef::as_ref).collect();
        let mut statement = reader.prepare(&sql)?;
        let mut rows = statement.query(refs.as_slice())?;

        let mut companies = Vec::new();
        while let Some(row) = rows.next()? {
            let ticker_text: String = row.get(1)?;
            let ticker = Ticker::parse(&ticker_text)
                .map_err(|error| StoreError::Corrupt(format!("bad stored ticker: {error}")))?;
            companies.push(Company {
                id: row.get(0)?,
                ticker,
                name: row.get(2)?,
                description: row.get(3)?,
            });
        }
        Ok(companies)
    }

    /// Load all persisted exchange rates for the one-time-per-run bootstrap.
    pub fn load_rates(&self) -> Result<Vec<RateEntry>, StoreError> {
        let reader = self.pool.reader()?;
        let mut statement = reader.prepare(
            "SELECT from_currency, to_currency, rate, fetch_date FROM exchange_rates",
        )?;
        let mut rows = statement.query([])?;

        let mut entries = Vec::new();
        while let Some(row) = rows.next()? {
            entries.push(RateEntry {
                from_currency: row.get(0)?,
                to_currency: row.get(1)?,
                rate: row.get(2)?,
                fetch_date: row.get(3)?,
            });
        }
        Ok(entries)
    }

    /// Store or refresh one exchange rate row.
    pub fn upsert_rate(&self, entry: &RateEntry) -> Result<(), StoreError> {
        self.pool.with_writer(|connection| {
            let params: [&dyn ToSql; 4] = [
                &entry.from_currency,
                &entry.to_currency,
                &entry.rate,
                &entry.fetch_date,
            ];
            connection.execute(
                "INSERT INTO exchange_rates (from_currency, to_currency, rate, fetch_date) \
                 VALUES (?, ?, ?, ?) \
                 ON CONFLICT (from_currency, to_currency, fetch_date) \
                 DO UPDATE SET rate = EXCLUDED.rate",
                params.as_slice(),
            )?;
            Ok(())
        })?;
        Ok(())
    }

    /// `last_updated` of a company's snapshot, if one exists.
    pub fn last_updated(&self, company_id: i64) -> Result<Option<UtcDateTime>, StoreError> {
        let reader = self.pool.reader()?;
        let stored: Option<Option<String>> = no_rows_as_none(reader.query_row(
            "SELECT last_updated FROM financials WHERE company_id = ?",
            [&company_id as &dyn ToSql],
            |row| row.get(0),
        ))?;

        match stored.flatten() {
            Some(text) => {
                let parsed = UtcDateTime::parse(&text)
                    .map_err(|error| StoreError::Corrupt(format!("bad last_updated: {error}")))?;
                Ok(Some(parsed))
            }
            None => Ok(None),
        }
    }

    /// Staleness-gated, idempotent insert-or-update for one company.
    ///
    /// An update is needed iff `force` is set, no prior snapshot exists, or
    /// the prior snapshot is older than [`FRESHNESS_WINDOW`]. Only the
    /// validated fields present in `snapshot` enter the write set; absent
    /// fields are left untouched, never nulled. A snapshot with no
    /// substantive fields skips the write entirely.
    pub fn upsert_snapshot(
        &self,
        company_id: i64,
        snapshot: &FinancialSnapshot,
        now: UtcDateTime,
        force: bool,
    ) -> Result<UpsertOutcome, StoreError> {
        let prior = self.last_updated(company_id)?;

        if !force {
            if let Some(last) = prior {
                if last.age_at(now) < FRESHNESS_WINDOW {
                    return Ok(UpsertOutcome::Skipped(SkipReason::Fresh));
                }
            }
        }

        if !snapshot.has_data() {
            tracing::warn!(company_id, "no valid data, skipping write");
            return Ok(UpsertOutcome::Skipped(SkipReason::NoValidData));
        }

        // Column names come from the static field vocabulary, never from
        // input; all values are bound as parameters.
        let mut columns: Vec<String> = vec![String::from("company_id")];
        let mut params: Vec<Box<dyn ToSql>> = vec![Box::new(company_id)];

        for field in &snapshot.fields {
            columns.push(field.spec.column.to_owned());
            params.push(Box::new(field.value));
            if let Some(currency_column) = field.spec.currency_column() {
                columns.push(currency_column);
                params.push(Box::new(field.currency.clone()));
            }
        }

        columns.push(String::from("last_updated"));
        params.push(Box::new(now.format_rfc3339()));
        columns.push(String::from("data_source"));
        params.push(Box::new(snapshot.data_source.clone()));

        let placeholders = vec!["?"; columns.len()].join(", ");
        let assignments = columns
            .iter()
            .skip(1)
            .map(|column| format!("{column} = EXCLUDED.{column}"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "INSERT INTO financials ({}) VALUES ({placeholders}) \
             ON CONFLICT (company_id) DO UPDATE SET {assignments}",
            columns.join(", ")
        );

        self.pool.with_writer(|connection| {
            let refs: Vec<&dyn ToSql> = params.iter().map(AsRef::as_ref).collect();
            connection.execute(&sql, refs.as_slice())?;
            Ok(())
        })?;

        Ok(if prior.is_some() {
            UpsertOutcome::Updated
        } else {
            UpsertOutcome::Inserted
        })
    }

    /// Read one stored field value. The name must exist in the vocabulary.
    pub fn read_field(&self, company_id: i64, name: &str) -> Result<Option<f64>, StoreError> {
        let spec = field_spec(name).ok_or_else(|| StoreError::UnknownField {
            name: name.to_owned(),
        })?;

        let reader = self.pool.reader()?;
        let value: Option<Option<f64>> = no_rows_as_none(reader.query_row(
            // Vocabulary-validated column name.
            &format!("SELECT {} FROM financials WHERE company_id = ?", spec.column),
            [&company_id as &dyn ToSql],
            |row| row.get(0),
        ))?;
        Ok(value.flatten())
    }

    /// Read a snapshot's provenance string.
    pub fn read_data_source(&self, company_id: i64) -> Result<Option<String>, StoreError> {
        let reader = self.pool.reader()?;
        let value: Option<Option<String>> = no_rows_as_none(reader.query_row(
            "SELECT data_source FROM financials WHERE company_id = ?",
            [&company_id as &dyn ToSql],
            |row| row.get(0),
        ))?;
        Ok(value.flatten())
    }
}

fn no_rows_as_none<T>(result: Result<T, ::duckdb::Error>) -> Result<Option<T>, ::duckdb::Error> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(::duckdb::Error::QueryReturnedNoRows) => Ok(None),
        Err(error) => Err(error),
    }
}
