//! Staging repository: the PostgreSQL implementation of the import review
//! staging store.
//!
//! Every method runs in its own tenant-scoped [`RlsConnection`] transaction.
//! Bulk operations are single set-based statements; inserts and key lookups
//! are split into chunks to stay under the bind parameter limit, still inside
//! one transaction.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait, NotSet, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Select, Set, sea_query::Expr,
};
use tally_core::import_review::{
    ExistingTransaction, NewStagedTransaction, ReviewFilter, SelectionTarget, StagedPredicate,
    StagedTransaction, StagingStore, StoreError,
};
use tally_shared::types::{PageRequest, TenantId, TransactionKey};

use super::{CHUNK_SIZE, RepositoryError};
use crate::entities::{sea_orm_active_enums::StagedDuplicateStatus, staged_transactions};
use crate::rls::RlsConnection;

/// Staging area repository.
#[derive(Debug, Clone)]
pub struct StagingRepository {
    db: DatabaseConnection,
}

impl StagingRepository {
    /// Creates a new staging repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Inserts classified records for one tenant in a single transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if any insert fails; nothing is written in that case.
    pub async fn insert(
        &self,
        tenant_id: TenantId,
        records: Vec<NewStagedTransaction>,
    ) -> Result<u64, RepositoryError> {
        if records.is_empty() {
            return Ok(0);
        }

        let rls = RlsConnection::new(&self.db, tenant_id).await?;
        let mut inserted = 0;

        for chunk in records.chunks(CHUNK_SIZE) {
            let models = chunk.iter().map(to_active_model);
            inserted += staged_transactions::Entity::insert_many(models)
                .exec_without_returning(rls.transaction())
                .await?;
        }

        rls.commit().await?;
        Ok(inserted)
    }

    /// Finds staged rows of the tenant with any of the given external ids.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn find_matches(
        &self,
        tenant_id: TenantId,
        external_ids: &[String],
    ) -> Result<Vec<ExistingTransaction>, RepositoryError> {
        if external_ids.is_empty() {
            return Ok(Vec::new());
        }

        let rls = RlsConnection::new(&self.db, tenant_id).await?;
        let mut matches = Vec::new();

        for chunk in external_ids.chunks(CHUNK_SIZE) {
            let rows = staged_transactions::Entity::find()
                .filter(staged_transactions::Column::TenantId.eq(tenant_id.into_inner()))
                .filter(staged_transactions::Column::ExternalId.is_in(chunk.iter().cloned()))
                .all(rls.transaction())
                .await?;
            matches.extend(rows.into_iter().filter_map(to_existing));
        }

        rls.commit().await?;
        Ok(matches)
    }

    /// Returns one page in review order plus the total matching the filter.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn page(
        &self,
        tenant_id: TenantId,
        page: PageRequest,
        filter: ReviewFilter,
    ) -> Result<(Vec<StagedTransaction>, u64), RepositoryError> {
        let rls = RlsConnection::new(&self.db, tenant_id).await?;

        let query = filtered(tenant_id, filter);
        let total = query.clone().count(rls.transaction()).await?;
        let rows = review_page(query, page).all(rls.transaction()).await?;

        rls.commit().await?;
        Ok((rows.into_iter().map(to_domain).collect(), total))
    }

    /// Returns every selected row of the tenant in insertion order.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn selected(
        &self,
        tenant_id: TenantId,
    ) -> Result<Vec<StagedTransaction>, RepositoryError> {
        let rls = RlsConnection::new(&self.db, tenant_id).await?;

        let rows = scoped(tenant_id)
            .filter(staged_transactions::Column::IsSelected.eq(true))
            .order_by_asc(staged_transactions::Column::Seq)
            .all(rls.transaction())
            .await?;

        rls.commit().await?;
        Ok(rows.into_iter().map(to_domain).collect())
    }

    /// Sets `is_selected` on the targeted rows and returns how many matched.
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails; no flag changes in that case.
    pub async fn set_selected(
        &self,
        tenant_id: TenantId,
        target: SelectionTarget,
        selected: bool,
    ) -> Result<u64, RepositoryError> {
        let rls = RlsConnection::new(&self.db, tenant_id).await?;

        let matched = match target {
            SelectionTarget::All => {
                update_selection(rls.transaction(), tenant_id, None, selected).await?
            }
            SelectionTarget::Keys(keys) => {
                let mut matched = 0;
                for chunk in keys.chunks(CHUNK_SIZE) {
                    matched +=
                        update_selection(rls.transaction(), tenant_id, Some(chunk), selected)
                            .await?;
                }
                matched
            }
        };

        rls.commit().await?;
        Ok(matched)
    }

    /// Deletes every staged row of the tenant.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    pub async fn purge(&self, tenant_id: TenantId) -> Result<u64, RepositoryError> {
        let rls = RlsConnection::new(&self.db, tenant_id).await?;

        let result = staged_transactions::Entity::delete_many()
            .filter(staged_transactions::Column::TenantId.eq(tenant_id.into_inner()))
            .exec(rls.transaction())
            .await?;

        rls.commit().await?;
        Ok(result.rows_affected)
    }

    /// Counts staged rows of the tenant matching a predicate.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn count_where(
        &self,
        tenant_id: TenantId,
        predicate: StagedPredicate,
    ) -> Result<u64, RepositoryError> {
        let rls = RlsConnection::new(&self.db, tenant_id).await?;

        let query = match predicate {
            StagedPredicate::All => scoped(tenant_id),
            StagedPredicate::Selected => {
                scoped(tenant_id).filter(staged_transactions::Column::IsSelected.eq(true))
            }
            StagedPredicate::Status(status) => scoped(tenant_id).filter(
                staged_transactions::Column::DuplicateStatus
                    .eq(StagedDuplicateStatus::from(status)),
            ),
        };
        let count = query.count(rls.transaction()).await?;

        rls.commit().await?;
        Ok(count)
    }
}

fn scoped(tenant_id: TenantId) -> Select<staged_transactions::Entity> {
    staged_transactions::Entity::find()
        .filter(staged_transactions::Column::TenantId.eq(tenant_id.into_inner()))
}

fn filtered(tenant_id: TenantId, filter: ReviewFilter) -> Select<staged_transactions::Entity> {
    let query = scoped(tenant_id);
    match filter.duplicate_status {
        Some(status) => query.filter(
            staged_transactions::Column::DuplicateStatus.eq(StagedDuplicateStatus::from(status)),
        ),
        None => query,
    }
}

/// Review order: date desc, payee asc, insertion order desc.
fn review_page(
    query: Select<staged_transactions::Entity>,
    page: PageRequest,
) -> Select<staged_transactions::Entity> {
    query
        .order_by_desc(staged_transactions::Column::Date)
        .order_by_asc(staged_transactions::Column::Payee)
        .order_by_desc(staged_transactions::Column::Seq)
        .offset(page.offset())
        .limit(page.limit())
}

async fn update_selection(
    txn: &DatabaseTransaction,
    tenant_id: TenantId,
    keys: Option<&[TransactionKey]>,
    selected: bool,
) -> Result<u64, RepositoryError> {
    let mut update = staged_transactions::Entity::update_many()
        .col_expr(staged_transactions::Column::IsSelected, Expr::value(selected))
        .filter(staged_transactions::Column::TenantId.eq(tenant_id.into_inner()));

    if let Some(keys) = keys {
        update = update.filter(
            staged_transactions::Column::Key.is_in(keys.iter().map(|k| k.into_inner())),
        );
    }

    let result = update.exec(txn).await?;
    Ok(result.rows_affected)
}

fn to_active_model(record: &NewStagedTransaction) -> staged_transactions::ActiveModel {
    staged_transactions::ActiveModel {
        key: Set(record.key.into_inner()),
        tenant_id: Set(record.tenant_id.into_inner()),
        seq: NotSet,
        date: Set(record.date),
        payee: Set(record.payee.clone()),
        amount: Set(record.amount),
        source: Set(record.source.clone()),
        external_id: Set(record.external_id.clone()),
        memo: Set(record.memo.clone()),
        duplicate_status: Set(record.duplicate_status.into()),
        duplicate_of_key: Set(record.duplicate_of_key.map(TransactionKey::into_inner)),
        is_selected: Set(record.is_selected),
        imported_at: Set(record.imported_at.into()),
    }
}

fn to_domain(model: staged_transactions::Model) -> StagedTransaction {
    StagedTransaction {
        key: TransactionKey::from_uuid(model.key),
        tenant_id: TenantId::from_uuid(model.tenant_id),
        seq: model.seq,
        date: model.date,
        payee: model.payee,
        amount: model.amount,
        source: model.source,
        external_id: model.external_id,
        memo: model.memo,
        duplicate_status: model.duplicate_status.into(),
        duplicate_of_key: model.duplicate_of_key.map(TransactionKey::from_uuid),
        is_selected: model.is_selected,
        imported_at: model.imported_at.with_timezone(&Utc),
    }
}

fn to_existing(model: staged_transactions::Model) -> Option<ExistingTransaction> {
    Some(ExistingTransaction {
        key: TransactionKey::from_uuid(model.key),
        external_id: model.external_id?,
        date: model.date,
        amount: model.amount,
        payee: model.payee,
        seq: model.seq,
    })
}

/// Groups records by tenant, keeping first-seen order.
fn by_tenant(records: Vec<NewStagedTransaction>) -> Vec<(TenantId, Vec<NewStagedTransaction>)> {
    let mut groups: Vec<(TenantId, Vec<NewStagedTransaction>)> = Vec::new();
    for record in records {
        match groups.iter_mut().find(|(tenant, _)| *tenant == record.tenant_id) {
            Some((_, group)) => group.push(record),
            None => groups.push((record.tenant_id, vec![record])),
        }
    }
    groups
}

#[async_trait]
impl StagingStore for StagingRepository {
    async fn insert_batch(&self, records: Vec<NewStagedTransaction>) -> Result<u64, StoreError> {
        let mut inserted = 0;
        for (tenant_id, group) in by_tenant(records) {
            inserted += self.insert(tenant_id, group).await?;
        }
        Ok(inserted)
    }

    async fn find_by_external_ids(
        &self,
        tenant_id: TenantId,
        external_ids: &[String],
    ) -> Result<Vec<ExistingTransaction>, StoreError> {
        Ok(self.find_matches(tenant_id, external_ids).await?)
    }

    async fn query_page(
        &self,
        tenant_id: TenantId,
        page: PageRequest,
        filter: ReviewFilter,
    ) -> Result<(Vec<StagedTransaction>, u64), StoreError> {
        Ok(self.page(tenant_id, page, filter).await?)
    }

    async fn find_selected(
        &self,
        tenant_id: TenantId,
    ) -> Result<Vec<StagedTransaction>, StoreError> {
        Ok(self.selected(tenant_id).await?)
    }

    async fn update_selection(
        &self,
        tenant_id: TenantId,
        target: SelectionTarget,
        selected: bool,
    ) -> Result<u64, StoreError> {
        Ok(self.set_selected(tenant_id, target, selected).await?)
    }

    async fn delete_all(&self, tenant_id: TenantId) -> Result<u64, StoreError> {
        Ok(self.purge(tenant_id).await?)
    }

    async fn count(
        &self,
        tenant_id: TenantId,
        predicate: StagedPredicate,
    ) -> Result<u64, StoreError> {
        Ok(self.count_where(tenant_id, predicate).await?)
    }
}
