//! Terminal transition of a review.
//!
//! `Open -> Finalizing -> Closed`. Completing a review reads the selected rows
//! from the store (never from the caller), hands them to the ledger writer in
//! one call, and only then purges the tenant's staging area. A failed ledger
//! write aborts before the purge so the review can be completed again.
//!
//! No lock is held across these steps. A concurrent `select_all` racing a
//! completion resolves per row to whichever statement commits last. Rows
//! staged by an import that commits after the selected rows were read are
//! purged without being accepted; `rejected_count` is derived from the purge
//! so those rows are reported as rejected rather than lost silently.

use std::sync::Arc;

use tally_shared::types::TenantId;
use tracing::{info, warn};

use super::error::ImportReviewError;
use super::store::{LedgerWriter, StagingStore};
use super::types::{CompleteReviewResult, LedgerTransactionInput, StagedPredicate};

/// Completes or discards a tenant's review.
#[derive(Clone)]
pub struct ReviewFinalizer {
    staging: Arc<dyn StagingStore>,
    writer: Arc<dyn LedgerWriter>,
}

impl ReviewFinalizer {
    /// Creates a finalizer over the given store and ledger writer.
    #[must_use]
    pub fn new(staging: Arc<dyn StagingStore>, writer: Arc<dyn LedgerWriter>) -> Self {
        Self { staging, writer }
    }

    /// Accepts every selected staged record and clears the staging area.
    ///
    /// # Errors
    ///
    /// - `LedgerWrite` (retryable) if the ledger writer fails; staging is kept
    /// - `Storage` if the staging store fails
    pub async fn complete_review(
        &self,
        tenant_id: TenantId,
    ) -> Result<CompleteReviewResult, ImportReviewError> {
        let total_before = self.staging.count(tenant_id, StagedPredicate::All).await?;
        let selected = self.staging.find_selected(tenant_id).await?;
        let accepted_count = selected.len() as u64;

        info!(
            tenant_id = %tenant_id,
            total = total_before,
            selected = accepted_count,
            "Finalizing import review"
        );

        if !selected.is_empty() {
            let batch: Vec<LedgerTransactionInput> = selected
                .into_iter()
                .map(|staged| staged.into_ledger_input())
                .collect();

            if let Err(e) = self.writer.write_batch(tenant_id, batch).await {
                warn!(
                    tenant_id = %tenant_id,
                    error = %e,
                    "Ledger write failed, staging area left intact"
                );
                return Err(e.into());
            }
        }

        let purged = self.staging.delete_all(tenant_id).await?;

        let result = CompleteReviewResult {
            accepted_count,
            rejected_count: purged.saturating_sub(accepted_count),
        };

        info!(
            tenant_id = %tenant_id,
            accepted = result.accepted_count,
            rejected = result.rejected_count,
            purged,
            "Import review completed"
        );

        Ok(result)
    }

    /// Clears the staging area without accepting anything.
    ///
    /// Idempotent: clearing an empty staging area succeeds with 0.
    pub async fn delete_all_review(&self, tenant_id: TenantId) -> Result<u64, ImportReviewError> {
        let deleted = self.staging.delete_all(tenant_id).await?;

        info!(tenant_id = %tenant_id, deleted, "Import review discarded");

        Ok(deleted)
    }
}
