//! Server-side selection state.
//!
//! The `is_selected` column is the only selection truth. Every change is a
//! single set-based update persisted before the call returns, so rows a client
//! never paged in are still covered by `select_all` / `deselect_all`.

use std::collections::HashSet;
use std::sync::Arc;

use tally_shared::types::{TenantId, TransactionKey};
use tracing::info;

use super::error::ImportReviewError;
use super::store::StagingStore;
use super::types::SelectionTarget;

/// Mutates the selection flag of staged records.
#[derive(Clone)]
pub struct SelectionManager {
    staging: Arc<dyn StagingStore>,
}

impl SelectionManager {
    /// Creates a selection manager over the given store.
    #[must_use]
    pub fn new(staging: Arc<dyn StagingStore>) -> Self {
        Self { staging }
    }

    /// Sets the selection flag of the given keys.
    ///
    /// Keys that do not belong to the tenant are ignored, exactly as if they
    /// did not exist. Returns the number of rows matched.
    ///
    /// # Errors
    ///
    /// - `EmptySelection` if `keys` is empty
    /// - `NotFound` if none of the keys matched a staged record of the tenant
    pub async fn set_selection(
        &self,
        tenant_id: TenantId,
        keys: &[TransactionKey],
        selected: bool,
    ) -> Result<u64, ImportReviewError> {
        if keys.is_empty() {
            return Err(ImportReviewError::EmptySelection);
        }

        let mut seen = HashSet::with_capacity(keys.len());
        let unique: Vec<TransactionKey> = keys.iter().copied().filter(|k| seen.insert(*k)).collect();
        let requested = unique.len();

        let matched = self
            .staging
            .update_selection(tenant_id, SelectionTarget::Keys(unique), selected)
            .await?;

        if matched == 0 {
            return Err(ImportReviewError::NotFound(
                "no staged transactions matched the given keys".to_string(),
            ));
        }

        info!(
            tenant_id = %tenant_id,
            requested,
            matched,
            selected,
            "Staged transaction selection changed"
        );

        Ok(matched)
    }

    /// Selects every staged record of the tenant.
    pub async fn select_all(&self, tenant_id: TenantId) -> Result<u64, ImportReviewError> {
        self.set_all(tenant_id, true).await
    }

    /// Deselects every staged record of the tenant.
    pub async fn deselect_all(&self, tenant_id: TenantId) -> Result<u64, ImportReviewError> {
        self.set_all(tenant_id, false).await
    }

    async fn set_all(&self, tenant_id: TenantId, selected: bool) -> Result<u64, ImportReviewError> {
        let matched = self
            .staging
            .update_selection(tenant_id, SelectionTarget::All, selected)
            .await?;

        info!(tenant_id = %tenant_id, matched, selected, "All staged transactions updated");

        Ok(matched)
    }
}
