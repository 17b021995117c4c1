//! Bank statement import review.
//!
//! Parsed statement records are classified against the permanent ledger and
//! the current staging area, parked for review with a server-side selection
//! flag, and finally accepted (selected rows) or discarded as a whole.
//!
//! # Modules
//!
//! - `types` - Candidate, staged and ledger record shapes, summaries
//! - `error` - Import review error taxonomy
//! - `classifier` - Batch duplicate classification
//! - `store` - Storage traits implemented by the database layer
//! - `selection` - Selection flag updates
//! - `finalizer` - Complete / discard transitions
//! - `query` - Review pages and summaries
//! - `service` - Facade used by the HTTP layer

pub mod classifier;
pub mod error;
pub mod finalizer;
pub mod query;
pub mod selection;
pub mod service;
pub mod store;
pub mod types;

#[cfg(any(test, feature = "test-util"))]
pub mod memory;

#[cfg(test)]
mod classifier_props;
#[cfg(test)]
mod tests;

pub use classifier::{DuplicateClassifier, MatchIndex};
pub use error::{ImportReviewError, LedgerWriteError, StoreError};
pub use finalizer::ReviewFinalizer;
pub use query::ReviewQueryService;
pub use selection::SelectionManager;
pub use service::ImportReviewService;
pub use store::{LedgerLookup, LedgerWriter, StagingStore};
pub use types::{
    AMOUNT_SCALE, CandidateTransaction, Classification, CompleteReviewResult, DuplicateStatus,
    ExistingTransaction, ImportResult, LedgerTransactionInput, NewStagedTransaction,
    ParsedStatement, ReviewFilter, ReviewItem, ReviewState, ReviewSummary, SelectionTarget,
    StagedPredicate, StagedTransaction,
};
