//! Storage seams of the import review engine.
//!
//! Every method takes the tenant explicitly. Implementations must filter by it
//! and must run each bulk method as one atomic statement; the engine never
//! loops over rows to update or delete them.

use async_trait::async_trait;
use tally_shared::types::{PageRequest, TenantId};

use super::error::{LedgerWriteError, StoreError};
use super::types::{
    ExistingTransaction, LedgerTransactionInput, NewStagedTransaction, ReviewFilter,
    SelectionTarget, StagedPredicate, StagedTransaction,
};

/// Tenant-scoped persistent collection of staged records.
#[async_trait]
pub trait StagingStore: Send + Sync {
    /// Inserts all records atomically. Returns the number inserted.
    async fn insert_batch(&self, records: Vec<NewStagedTransaction>) -> Result<u64, StoreError>;

    /// Returns staged records whose external id is in `external_ids`.
    ///
    /// May return several records per external id; the classifier picks one.
    async fn find_by_external_ids(
        &self,
        tenant_id: TenantId,
        external_ids: &[String],
    ) -> Result<Vec<ExistingTransaction>, StoreError>;

    /// Reads one page ordered by date desc, payee asc, insertion order desc.
    ///
    /// Returns the page and the total number of rows matching `filter`.
    async fn query_page(
        &self,
        tenant_id: TenantId,
        page: PageRequest,
        filter: ReviewFilter,
    ) -> Result<(Vec<StagedTransaction>, u64), StoreError>;

    /// Returns every selected record of the tenant, unpaginated.
    async fn find_selected(&self, tenant_id: TenantId)
    -> Result<Vec<StagedTransaction>, StoreError>;

    /// Sets the selection flag of the targeted rows in one statement.
    ///
    /// Returns the number of rows matched.
    async fn update_selection(
        &self,
        tenant_id: TenantId,
        target: SelectionTarget,
        selected: bool,
    ) -> Result<u64, StoreError>;

    /// Deletes every staged record of the tenant. Returns the number deleted.
    async fn delete_all(&self, tenant_id: TenantId) -> Result<u64, StoreError>;

    /// Counts staged records of the tenant matching `predicate`.
    async fn count(&self, tenant_id: TenantId, predicate: StagedPredicate)
    -> Result<u64, StoreError>;
}

/// Read access to the permanent ledger for duplicate detection.
#[async_trait]
pub trait LedgerLookup: Send + Sync {
    /// Returns ledger records whose external id is in `external_ids`.
    async fn find_by_external_ids(
        &self,
        tenant_id: TenantId,
        external_ids: &[String],
    ) -> Result<Vec<ExistingTransaction>, StoreError>;
}

/// Writer that turns accepted records into permanent ledger transactions.
#[async_trait]
pub trait LedgerWriter: Send + Sync {
    /// Persists the batch (and its default allocations) in one call.
    ///
    /// Returns the number of ledger transactions created.
    async fn write_batch(
        &self,
        tenant_id: TenantId,
        records: Vec<LedgerTransactionInput>,
    ) -> Result<u64, LedgerWriteError>;
}
