//! File-based run lease.
//!
//! At most one refresh run may touch the store at a time. The lease is a
//! zero-byte marker file created with `create_new`, so acquisition is a
//! single atomic filesystem operation. A marker older than the stale
//! threshold is treated as the residue of a crashed run and reclaimed.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, warn};

/// Leases older than this are assumed abandoned and may be reclaimed.
pub const STALE_LEASE_AFTER: Duration = Duration::from_secs(60 * 60);

/// Errors from lease acquisition.
#[derive(Debug, Error)]
pub enum LeaseError {
    #[error("another run holds the lease at {path}")]
    Conflict { path: PathBuf },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Exclusive run marker, released when dropped.
#[derive(Debug)]
pub struct RunLease {
    path: PathBuf,
}

impl RunLease {
    /// Acquire the lease, reclaiming a stale marker if one is present.
    pub fn acquire(path: impl Into<PathBuf>, stale_after: Duration) -> Result<Self, LeaseError> {
        let path = path.into();

        match try_create(&path) {
            Ok(()) => {
                debug!(path = %path.display(), "lease acquired");
                return Ok(Self { path });
            }
            Err(error) if error.kind() == ErrorKind::AlreadyExists => {}
            Err(error) => return Err(error.into()),
        }

        let age = marker_age(&path)?;
        if age < stale_after {
            return Err(LeaseError::Conflict { path });
        }

        warn!(
            path = %path.display(),
            age_secs = age.as_secs(),
            "reclaiming stale lease"
        );
        match fs::remove_file(&path) {
            Ok(()) => {}
            Err(error) if error.kind() == ErrorKind::NotFound => {}
            Err(error) => return Err(error.into()),
        }

        match try_create(&path) {
            Ok(()) => Ok(Self { path }),
            // Lost the reclaim race to another process.
            Err(error) if error.kind() == ErrorKind::AlreadyExists => {
                Err(LeaseError::Conflict { path })
            }
            Err(error) => Err(error.into()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RunLease {
    fn drop(&mut self) {
        match fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "lease released"),
            Err(error) if error.kind() == ErrorKind::NotFound => {}
            Err(error) => warn!(
                path = %self.path.display(),
                %error,
                "failed to release lease"
            ),
        }
    }
}

fn try_create(path: &Path) -> Result<(), std::io::Error> {
    fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map(|_| ())
}

fn marker_age(path: &Path) -> Result<Duration, std::io::Error> {
    let modified = fs::metadata(path)?.modified()?;
    // A marker with a future mtime reads as fresh, which errs on the side
    // of conflict rather than reclaim.
    Ok(modified.elapsed().unwrap_or_default())
}
