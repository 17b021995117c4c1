//! Ledger repository: lookups against and writes into the permanent
//! `transactions` table.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, NotSet, QueryFilter, QueryOrder, Set,
    prelude::DateTimeWithTimeZone,
};
use tally_core::import_review::{
    ExistingTransaction, LedgerLookup, LedgerTransactionInput, LedgerWriteError, LedgerWriter,
    StoreError,
};
use tally_shared::types::{TenantId, TransactionKey};
use tracing::debug;
use uuid::Uuid;

use super::{CHUNK_SIZE, RepositoryError};
use crate::entities::{transaction_splits, transactions};
use crate::rls::RlsConnection;

/// Permanent ledger repository.
#[derive(Debug, Clone)]
pub struct LedgerRepository {
    db: DatabaseConnection,
}

impl LedgerRepository {
    /// Creates a new ledger repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Finds ledger transactions of the tenant with any of the given external ids.
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
            let rows = transactions::Entity::find()
                .filter(transactions::Column::TenantId.eq(tenant_id.into_inner()))
                .filter(transactions::Column::ExternalId.is_in(chunk.iter().cloned()))
                .all(rls.transaction())
                .await?;
            matches.extend(rows.into_iter().filter_map(to_existing));
        }

        rls.commit().await?;
        Ok(matches)
    }

    /// Inserts accepted transactions, each with one default split carrying
    /// the whole amount and no category.
    ///
    /// Headers and splits are written in one transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if any insert fails; nothing is written in that case.
    pub async fn insert_accepted(
        &self,
        tenant_id: TenantId,
        records: Vec<LedgerTransactionInput>,
    ) -> Result<u64, RepositoryError> {
        if records.is_empty() {
            return Ok(0);
        }

        let rls = RlsConnection::new(&self.db, tenant_id).await?;
        let now: DateTimeWithTimeZone = Utc::now().into();
        let mut written = 0;

        for chunk in records.chunks(CHUNK_SIZE) {
            let headers = chunk.iter().map(|record| transactions::ActiveModel {
                key: Set(record.key.into_inner()),
                tenant_id: Set(tenant_id.into_inner()),
                seq: NotSet,
                date: Set(record.date),
                payee: Set(record.payee.clone()),
                amount: Set(record.amount),
                source: Set(record.source.clone()),
                external_id: Set(record.external_id.clone()),
                memo: Set(record.memo.clone()),
                created_at: Set(now),
            });
            written += transactions::Entity::insert_many(headers)
                .exec_without_returning(rls.transaction())
                .await?;

            let splits = chunk
                .iter()
                .map(|record| default_split(tenant_id, record, now));
            transaction_splits::Entity::insert_many(splits)
                .exec_without_returning(rls.transaction())
                .await?;
        }

        rls.commit().await?;

        debug!(tenant_id = %tenant_id, written, "Ledger transactions inserted");
        Ok(written)
    }

    /// Lists the tenant's ledger transactions, most recent first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn list(&self, tenant_id: TenantId) -> Result<Vec<transactions::Model>, RepositoryError> {
        let rls = RlsConnection::new(&self.db, tenant_id).await?;

        let rows = transactions::Entity::find()
            .filter(transactions::Column::TenantId.eq(tenant_id.into_inner()))
            .order_by_desc(transactions::Column::Date)
            .order_by_desc(transactions::Column::Seq)
            .all(rls.transaction())
            .await?;

        rls.commit().await?;
        Ok(rows)
    }
}

fn default_split(
    tenant_id: TenantId,
    record: &LedgerTransactionInput,
    created_at: DateTimeWithTimeZone,
) -> transaction_splits::ActiveModel {
    transaction_splits::ActiveModel {
        id: Set(Uuid::now_v7()),
        transaction_key: Set(record.key.into_inner()),
        tenant_id: Set(tenant_id.into_inner()),
        amount: Set(record.amount),
        category: Set(None),
        memo: Set(None),
        created_at: Set(created_at),
    }
}

fn to_existing(model: transactions::Model) -> Option<ExistingTransaction> {
    Some(ExistingTransaction {
        key: TransactionKey::from_uuid(model.key),
        external_id: model.external_id?,
        date: model.date,
        amount: model.amount,
        payee: model.payee,
        seq: model.seq,
    })
}

#[async_trait]
impl LedgerLookup for LedgerRepository {
    async fn find_by_external_ids(
        &self,
        tenant_id: TenantId,
        external_ids: &[String],
    ) -> Result<Vec<ExistingTransaction>, StoreError> {
        Ok(self.find_matches(tenant_id, external_ids).await?)
    }
}

#[async_trait]
impl LedgerWriter for LedgerRepository {
    async fn write_batch(
        &self,
        tenant_id: TenantId,
        records: Vec<LedgerTransactionInput>,
    ) -> Result<u64, LedgerWriteError> {
        Ok(self.insert_accepted(tenant_id, records).await?)
    }
}
