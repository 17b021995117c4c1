//! Repository abstractions for data access.
//!
//! Repositories provide a clean interface for database operations,
//! hiding the `SeaORM` implementation details from the rest of the application.
//! They implement the import review store traits, so the engine never sees a
//! `DbErr`.

pub mod ledger;
pub mod staging;

pub use ledger::LedgerRepository;
pub use staging::StagingRepository;

use sea_orm::DbErr;
use tally_core::import_review::{LedgerWriteError, StoreError};

/// Rows (or keys) per statement, well under PostgreSQL's bind parameter limit.
const CHUNK_SIZE: usize = 1000;

/// Error type for repository operations.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl From<RepositoryError> for StoreError {
    fn from(err: RepositoryError) -> Self {
        Self(err.to_string())
    }
}

impl From<RepositoryError> for LedgerWriteError {
    fn from(err: RepositoryError) -> Self {
        Self(err.to_string())
    }
}
