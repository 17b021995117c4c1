//! Read side of the review: ordered pages and count summaries.

use std::sync::Arc;

use tally_shared::types::{PageRequest, PageResponse, TenantId};

use super::error::ImportReviewError;
use super::store::StagingStore;
use super::types::{
    DuplicateStatus, ReviewFilter, ReviewItem, ReviewState, ReviewSummary, StagedPredicate,
};

/// Paginated access and summary statistics over a tenant's staging area.
#[derive(Clone)]
pub struct ReviewQueryService {
    staging: Arc<dyn StagingStore>,
}

impl ReviewQueryService {
    /// Creates a query service over the given store.
    #[must_use]
    pub fn new(staging: Arc<dyn StagingStore>) -> Self {
        Self { staging }
    }

    /// Returns one page of staged records.
    ///
    /// `page` is expected to be normalized already (see [`PageRequest::new`]).
    pub async fn get_review_page(
        &self,
        tenant_id: TenantId,
        page: PageRequest,
        filter: ReviewFilter,
    ) -> Result<PageResponse<ReviewItem>, ImportReviewError> {
        let (rows, total) = self.staging.query_page(tenant_id, page, filter).await?;
        let items = rows.into_iter().map(ReviewItem::from).collect();

        Ok(PageResponse::new(items, page, total))
    }

    /// Computes the summary with count queries; no rows are loaded.
    pub async fn get_summary(&self, tenant_id: TenantId) -> Result<ReviewSummary, ImportReviewError> {
        let store = &self.staging;
        let (total_count, selected_count, new_count, exact_duplicate_count, potential_duplicate_count) =
            tokio::try_join!(
                store.count(tenant_id, StagedPredicate::All),
                store.count(tenant_id, StagedPredicate::Selected),
                store.count(tenant_id, StagedPredicate::Status(DuplicateStatus::New)),
                store.count(
                    tenant_id,
                    StagedPredicate::Status(DuplicateStatus::ExactDuplicate)
                ),
                store.count(
                    tenant_id,
                    StagedPredicate::Status(DuplicateStatus::PotentialDuplicate)
                ),
            )?;

        Ok(ReviewSummary {
            total_count,
            selected_count,
            new_count,
            exact_duplicate_count,
            potential_duplicate_count,
            state: if total_count == 0 {
                ReviewState::Closed
            } else {
                ReviewState::Open
            },
        })
    }
}
