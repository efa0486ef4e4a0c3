//! `DuckDB` connection management.
//!
//! Reads run through a small pool of read-only connections so concurrent
//! company pipelines can query freely. Writes are serialized through a
//! single read-write connection behind a mutex; the store is a
//! single-writer resource by contract, so no other writer ever observes a
//! half-updated row.

use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use ::duckdb::Connection;

struct PoolInner {
    db_path: PathBuf,
    max_readers: usize,
    readers: Mutex<Vec<Connection>>,
    writer: Mutex<Option<Connection>>,
}

/// Connection manager with pooled readers and one serialized writer.
#[derive(Clone)]
pub struct StorePool {
    inner: Arc<PoolInner>,
}

impl std::fmt::Debug for StorePool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorePool")
            .field("db_path", &self.inner.db_path)
            .field("max_readers", &self.inner.max_readers)
            .finish_non_exhaustive()
    }
}

impl StorePool {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, max_readers: usize) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                db_path: path.into(),
                max_readers: max_readers.max(1),
                readers: Mutex::new(Vec::new()),
                writer: Mutex::new(None),
            }),
        }
    }

    #[must_use]
    pub fn db_path(&self) -> &Path {
        self.inner.db_path.as_path()
    }

    /// Acquire a pooled read connection.
    ///
    /// # Errors
    /// Returns an error if the database file cannot be opened.
    ///
    /// # Panics
    /// Panics if the pool mutex is poisoned.
    pub fn reader(&self) -> Result<PooledReader, ::duckdb::Error> {
        let popped = self
            .inner
            .readers
            .lock()
            .expect("reader pool mutex poisoned")
            .pop();

        let connection = match popped {
            Some(connection) => connection,
            None => open_connection(self.inner.db_path.as_path())?,
        };

        Ok(PooledReader {
            pool: Arc::clone(&self.inner),
            connection: Some(connection),
        })
    }

    /// Run a closure against the single write connection. All writers
    /// queue on the same mutex, so statements never interleave.
    ///
    /// # Panics
    /// Panics if the writer mutex is poisoned.
    pub fn with_writer<T>(
        &self,
        f: impl FnOnce(&Connection) -> Result<T, ::duckdb::Error>,
    ) -> Result<T, ::duckdb::Error> {
        let mut guard = self.inner.writer.lock().expect("writer mutex poisoned");
        if guard.is_none() {
            *guard = Some(open_connection(self.inner.db_path.as_path())?);
        }
        let connection = guard.as_ref().expect("writer connection just opened");
        f(connection)
    }
}

/// A pooled read connection that returns to the pool when dropped.
pub struct PooledReader {
    pool: Arc<PoolInner>,
    connection: Option<Connection>,
}

impl Deref for PooledReader {
    type Target = Connection;

    fn deref(&self) -> &Self::Target {
        self.connection
            .as_ref()
            .expect("pooled connection unexpectedly missing")
    }
}

impl DerefMut for PooledReader {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.connection
            .as_mut()
            .expect("pooled connection unexpectedly missing")
    }
}

impl Drop for PooledReader {
    fn drop(&mut self) {
        let Some(connection) = self.connection.take() else {
            return;
        };

        let mut readers = self
            .pool
            .readers
            .lock()
            .expect("reader pool mutex poisoned");
        if readers.len() < self.pool.max_readers {
            readers.push(connection);
        }
    }
}

fn open_connection(path: &Path) -> Result<Connection, ::duckdb::Error> {
    let connection = Connection::open(path)?;
    connection.execute_batch("PRAGMA disable_progress_bar;")?;
    Ok(connection)
}
