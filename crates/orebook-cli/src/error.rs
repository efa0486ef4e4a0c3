use thiserror::Error;

use orebook_engine::{EngineError, LeaseError};
use orebook_store::StoreError;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Validation(#[from] orebook_core::ValidationError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Exit code contract: 2 for setup failures (missing database or
    /// schema, bad arguments), 3 for a lease conflict, 10 otherwise.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Engine(EngineError::Lease(LeaseError::Conflict { .. })) => 3,
            Self::Engine(EngineError::Store(error)) | Self::Store(error) => {
                store_exit_code(error)
            }
            Self::Validation(_) => 2,
            Self::Engine(EngineError::Lease(LeaseError::Io(_))) | Self::Io(_) => 10,
        }
    }
}

fn store_exit_code(error: &StoreError) -> i32 {
    match error {
        StoreError::DatabaseMissing { .. } | StoreError::SchemaMissing { .. } => 2,
        _ => 10,
    }
}
