//! Import review error types.
//!
//! Validation errors are raised before any mutation. Store and ledger failures
//! arrive through the [`StoreError`] and [`LedgerWriteError`] boundary types so
//! the engine can tell a retryable finalize failure from a broken store.

use thiserror::Error;

/// Errors that can occur during import review operations.
#[derive(Debug, Error)]
pub enum ImportReviewError {
    // ========== Validation Errors ==========
    /// An import was requested with no candidate records.
    #[error("Import batch contains no transactions")]
    EmptyBatch,

    /// A selection change was requested with no keys.
    #[error("Selection change requires at least one key")]
    EmptySelection,

    // ========== Lookup Errors ==========
    /// No staged record of the tenant matched the request.
    #[error("Not found: {0}")]
    NotFound(String),

    // ========== Caller Bugs ==========
    /// A candidate reached the classifier without an external identifier.
    #[error("Candidate at index {index} has no external identifier")]
    MissingExternalId {
        /// Position of the offending candidate in the batch.
        index: usize,
    },

    // ========== Finalize Errors ==========
    /// The ledger writer rejected the accepted batch; staging was left intact.
    #[error("Ledger write failed, staged transactions were kept: {0}")]
    LedgerWrite(String),

    // ========== Storage Errors ==========
    /// The staging store failed.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl ImportReviewError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::EmptyBatch => "EMPTY_BATCH",
            Self::EmptySelection => "EMPTY_SELECTION",
            Self::NotFound(_) => "NOT_FOUND",
            Self::MissingExternalId { .. } => "CLASSIFIER_INPUT_ERROR",
            Self::LedgerWrite(_) => "FINALIZE_WRITE_FAILED",
            Self::Storage(_) => "STORAGE_ERROR",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - validation errors
            Self::EmptyBatch | Self::EmptySelection => 400,

            // 404 Not Found (also covers keys owned by another tenant)
            Self::NotFound(_) => 404,

            // 503 Service Unavailable - retry the same request
            Self::LedgerWrite(_) => 503,

            // 500 Internal Server Error
            Self::MissingExternalId { .. } | Self::Storage(_) => 500,
        }
    }

    /// Returns true if this error is retryable.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::LedgerWrite(_))
    }

    /// Returns true if this error is a programming error in the caller.
    #[must_use]
    pub fn is_caller_bug(&self) -> bool {
        matches!(self, Self::MissingExternalId { .. })
    }
}

/// Failure reported by a staging store or ledger lookup.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct StoreError(pub String);

impl From<StoreError> for ImportReviewError {
    fn from(err: StoreError) -> Self {
        Self::Storage(err.0)
    }
}

/// Failure reported by the ledger writer.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct LedgerWriteError(pub String);

impl From<LedgerWriteError> for ImportReviewError {
    fn from(err: LedgerWriteError) -> Self {
        Self::LedgerWrite(err.0)
    }
}
