//! Import review facade.
//!
//! Wires the classifier, selection manager, finalizer and query service over
//! one staging store and exposes the operations the HTTP layer calls.

use std::sync::Arc;

use chrono::Utc;
use tally_shared::types::{PageRequest, PageResponse, TenantId, TransactionKey};
use tracing::{error, info};

use super::classifier::DuplicateClassifier;
use super::error::ImportReviewError;
use super::finalizer::ReviewFinalizer;
use super::query::ReviewQueryService;
use super::selection::SelectionManager;
use super::store::{LedgerLookup, LedgerWriter, StagingStore};
use super::types::{
    CandidateTransaction, CompleteReviewResult, ImportResult, NewStagedTransaction, ParsedStatement, ReviewFilter,
    ReviewItem, ReviewSummary,
};

/// Entry point of the import review engine.
#[derive(Clone)]
pub struct ImportReviewService {
    staging: Arc<dyn StagingStore>,
    ledger: Arc<dyn LedgerLookup>,
    selection: SelectionManager,
    finalizer: ReviewFinalizer,
    queries: ReviewQueryService,
}

impl ImportReviewService {
    /// Creates the service from its storage collaborators.
    #[must_use]
    pub fn new(
        staging: Arc<dyn StagingStore>,
        ledger: Arc<dyn LedgerLookup>,
        writer: Arc<dyn LedgerWriter>,
    ) -> Self {
        Self {
            selection: SelectionManager::new(Arc::clone(&staging)),
            finalizer: ReviewFinalizer::new(Arc::clone(&staging), writer),
            queries: ReviewQueryService::new(Arc::clone(&staging)),
            staging,
            ledger,
        }
    }

    /// Classifies a parsed statement and stages every candidate.
    ///
    /// New uploads merge into the tenant's single staging area. Parser errors
    /// are returned next to the counts; they never block the records that did
    /// parse.
    ///
    /// # Errors
    ///
    /// - `EmptyBatch` if the statement holds no transactions
    /// - `MissingExternalId` if a candidate has a blank external id
    /// - `Storage` if a lookup or the insert fails
    pub async fn import_batch(
        &self,
        tenant_id: TenantId,
        statement: ParsedStatement,
    ) -> Result<ImportResult, ImportReviewError> {
        let ParsedStatement {
            transactions: candidates,
            errors,
        } = statement;

        if candidates.is_empty() {
            return Err(ImportReviewError::EmptyBatch);
        }
        let candidates: Vec<_> = candidates
            .into_iter()
            .map(CandidateTransaction::with_stored_amount)
            .collect();

        let external_ids = DuplicateClassifier::collect_external_ids(&candidates).inspect_err(|e| {
            error!(tenant_id = %tenant_id, error = %e, "Candidate batch reached classifier without external id");
        })?;

        // Two lookups for the whole batch, run concurrently.
        let (ledger_matches, staged_matches) = tokio::try_join!(
            self.ledger.find_by_external_ids(tenant_id, &external_ids),
            self.staging.find_by_external_ids(tenant_id, &external_ids),
        )?;

        let ledger_index = DuplicateClassifier::index_latest(ledger_matches);
        let staged_index = DuplicateClassifier::index_latest(staged_matches);
        let classifications =
            DuplicateClassifier::classify(&candidates, &ledger_index, &staged_index);

        let result = ImportResult::tally(&classifications, errors);

        let imported_at = Utc::now();
        let records: Vec<NewStagedTransaction> = candidates
            .into_iter()
            .zip(classifications)
            .map(|(candidate, classification)| {
                NewStagedTransaction::from_candidate(tenant_id, candidate, classification, imported_at)
            })
            .collect();

        self.staging.insert_batch(records).await?;

        info!(
            tenant_id = %tenant_id,
            imported = result.imported_count,
            new = result.new_count,
            exact_duplicates = result.exact_duplicate_count,
            potential_duplicates = result.potential_duplicate_count,
            parse_errors = result.errors.len(),
            "Statement staged for review"
        );

        Ok(result)
    }

    /// Returns one page of the review, ordered date desc, payee asc.
    pub async fn get_review_page(
        &self,
        tenant_id: TenantId,
        page: PageRequest,
        filter: ReviewFilter,
    ) -> Result<PageResponse<ReviewItem>, ImportReviewError> {
        self.queries.get_review_page(tenant_id, page, filter).await
    }

    /// Returns the review's count summary.
    pub async fn get_summary(&self, tenant_id: TenantId) -> Result<ReviewSummary, ImportReviewError> {
        self.queries.get_summary(tenant_id).await
    }

    /// Sets the selection flag of specific staged records.
    pub async fn set_selection(
        &self,
        tenant_id: TenantId,
        keys: &[TransactionKey],
        selected: bool,
    ) -> Result<u64, ImportReviewError> {
        self.selection.set_selection(tenant_id, keys, selected).await
    }

    /// Selects every staged record of the tenant.
    pub async fn select_all(&self, tenant_id: TenantId) -> Result<u64, ImportReviewError> {
        self.selection.select_all(tenant_id).await
    }

    /// Deselects every staged record of the tenant.
    pub async fn deselect_all(&self, tenant_id: TenantId) -> Result<u64, ImportReviewError> {
        self.selection.deselect_all(tenant_id).await
    }

    /// Accepts the selected records into the ledger and clears staging.
    pub async fn complete_review(
        &self,
        tenant_id: TenantId,
    ) -> Result<CompleteReviewResult, ImportReviewError> {
        self.finalizer.complete_review(tenant_id).await
    }

    /// Discards the whole review.
    pub async fn delete_all_review(&self, tenant_id: TenantId) -> Result<u64, ImportReviewError> {
        self.finalizer.delete_all_review(tenant_id).await
    }
}
