//! In-memory staging store and ledger for tests.
//!
//! Each trait method takes the lock once, which gives every bulk operation the
//! same all-or-nothing behavior a single SQL statement has.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tally_shared::types::{PageRequest, TenantId};

use super::error::{LedgerWriteError, StoreError};
use super::store::{LedgerLookup, LedgerWriter, StagingStore};
use super::types::{
    ExistingTransaction, LedgerTransactionInput, NewStagedTransaction, ReviewFilter,
    SelectionTarget, StagedPredicate, StagedTransaction,
};

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, StoreError> {
    mutex
        .lock()
        .map_err(|_| StoreError("in-memory store lock poisoned".to_string()))
}

#[derive(Default)]
struct StagingState {
    rows: Vec<StagedTransaction>,
    next_seq: i64,
}

/// Staging store backed by a vector.
#[derive(Default)]
pub struct InMemoryStagingStore {
    state: Mutex<StagingState>,
    lookups: Mutex<u64>,
}

impl InMemoryStagingStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Returns a copy of every row of every tenant.
    #[must_use]
    pub fn snapshot(&self) -> Vec<StagedTransaction> {
        self.state
            .lock()
            .map(|state| state.rows.clone())
            .unwrap_or_default()
    }

    /// Number of `find_by_external_ids` calls served.
    #[must_use]
    pub fn lookup_count(&self) -> u64 {
        self.lookups.lock().map(|n| *n).unwrap_or_default()
    }
}

fn matches_predicate(row: &StagedTransaction, predicate: StagedPredicate) -> bool {
    match predicate {
        StagedPredicate::All => true,
        StagedPredicate::Selected => row.is_selected,
        StagedPredicate::Status(status) => row.duplicate_status == status,
    }
}

#[async_trait]
impl StagingStore for InMemoryStagingStore {
    async fn insert_batch(&self, records: Vec<NewStagedTransaction>) -> Result<u64, StoreError> {
        let mut state = lock(&self.state)?;
        let count = records.len() as u64;

        for record in records {
            state.next_seq += 1;
            let seq = state.next_seq;
            state.rows.push(StagedTransaction {
                key: record.key,
                tenant_id: record.tenant_id,
                seq,
                date: record.date,
                payee: record.payee,
                amount: record.amount,
                source: record.source,
                external_id: record.external_id,
                memo: record.memo,
                duplicate_status: record.duplicate_status,
                duplicate_of_key: record.duplicate_of_key,
                is_selected: record.is_selected,
                imported_at: record.imported_at,
            });
        }

        Ok(count)
    }

    async fn find_by_external_ids(
        &self,
        tenant_id: TenantId,
        external_ids: &[String],
    ) -> Result<Vec<ExistingTransaction>, StoreError> {
        *lock(&self.lookups)? += 1;
        let state = lock(&self.state)?;

        Ok(state
            .rows
            .iter()
            .filter(|row| row.tenant_id == tenant_id)
            .filter_map(|row| {
                let external_id = row.external_id.as_ref()?;
                external_ids.contains(external_id).then(|| ExistingTransaction {
                    key: row.key,
                    external_id: external_id.clone(),
                    date: row.date,
                    amount: row.amount,
                    payee: row.payee.clone(),
                    seq: row.seq,
                })
            })
            .collect())
    }

    async fn query_page(
        &self,
        tenant_id: TenantId,
        page: PageRequest,
        filter: ReviewFilter,
    ) -> Result<(Vec<StagedTransaction>, u64), StoreError> {
        let state = lock(&self.state)?;

        let mut rows: Vec<&StagedTransaction> = state
            .rows
            .iter()
            .filter(|row| row.tenant_id == tenant_id)
            .filter(|row| {
                filter
                    .duplicate_status
                    .is_none_or(|status| row.duplicate_status == status)
            })
            .collect();
        rows.sort_by(|a, b| {
            b.date
                .cmp(&a.date)
                .then_with(|| a.payee.cmp(&b.payee))
                .then_with(|| b.seq.cmp(&a.seq))
        });

        let total = rows.len() as u64;
        let offset = usize::try_from(page.offset()).unwrap_or(usize::MAX);
        let limit = usize::try_from(page.limit()).unwrap_or(usize::MAX);
        let items = rows.into_iter().skip(offset).take(limit).cloned().collect();

        Ok((items, total))
    }

    async fn find_selected(
        &self,
        tenant_id: TenantId,
    ) -> Result<Vec<StagedTransaction>, StoreError> {
        let state = lock(&self.state)?;
        Ok(state
            .rows
            .iter()
            .filter(|row| row.tenant_id == tenant_id && row.is_selected)
            .cloned()
            .collect())
    }

    async fn update_selection(
        &self,
        tenant_id: TenantId,
        target: SelectionTarget,
        selected: bool,
    ) -> Result<u64, StoreError> {
        let mut state = lock(&self.state)?;
        let mut matched = 0;

        for row in state.rows.iter_mut().filter(|row| row.tenant_id == tenant_id) {
            let hit = match &target {
                SelectionTarget::All => true,
                SelectionTarget::Keys(keys) => keys.contains(&row.key),
            };
            if hit {
                row.is_selected = selected;
                matched += 1;
            }
        }

        Ok(matched)
    }

    async fn delete_all(&self, tenant_id: TenantId) -> Result<u64, StoreError> {
        let mut state = lock(&self.state)?;
        let before = state.rows.len();
        state.rows.retain(|row| row.tenant_id != tenant_id);
        Ok((before - state.rows.len()) as u64)
    }

    async fn count(
        &self,
        tenant_id: TenantId,
        predicate: StagedPredicate,
    ) -> Result<u64, StoreError> {
        let state = lock(&self.state)?;
        Ok(state
            .rows
            .iter()
            .filter(|row| row.tenant_id == tenant_id && matches_predicate(row, predicate))
            .count() as u64)
    }
}

/// A permanent ledger row held by [`InMemoryLedger`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerRow {
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Insertion order.
    pub seq: i64,
    /// The accepted record.
    pub record: LedgerTransactionInput,
}

#[derive(Default)]
struct LedgerState {
    rows: Vec<LedgerRow>,
    next_seq: i64,
    fail_writes: Option<String>,
    write_calls: u64,
}

/// Permanent ledger lookup and writer backed by a vector.
#[derive(Default)]
pub struct InMemoryLedger {
    state: Mutex<LedgerState>,
}

impl InMemoryLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Seeds a row directly, as if accepted by an earlier review.
    pub fn seed(&self, tenant_id: TenantId, record: LedgerTransactionInput) {
        if let Ok(mut state) = self.state.lock() {
            state.next_seq += 1;
            let seq = state.next_seq;
            state.rows.push(LedgerRow {
                tenant_id,
                seq,
                record,
            });
        }
    }

    /// Makes subsequent writes fail with `reason`, or succeed again with `None`.
    pub fn fail_writes(&self, reason: Option<&str>) {
        if let Ok(mut state) = self.state.lock() {
            state.fail_writes = reason.map(str::to_string);
        }
    }

    /// Returns the rows of one tenant.
    #[must_use]
    pub fn rows(&self, tenant_id: TenantId) -> Vec<LedgerRow> {
        self.state
            .lock()
            .map(|state| {
                state
                    .rows
                    .iter()
                    .filter(|row| row.tenant_id == tenant_id)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Number of `write_batch` calls received, including failed ones.
    #[must_use]
    pub fn write_calls(&self) -> u64 {
        self.state.lock().map(|s| s.write_calls).unwrap_or_default()
    }
}

#[async_trait]
impl LedgerLookup for InMemoryLedger {
    async fn find_by_external_ids(
        &self,
        tenant_id: TenantId,
        external_ids: &[String],
    ) -> Result<Vec<ExistingTransaction>, StoreError> {
        let state = lock(&self.state)?;
        Ok(state
            .rows
            .iter()
            .filter(|row| row.tenant_id == tenant_id)
            .filter_map(|row| {
                let external_id = row.record.external_id.as_ref()?;
                external_ids.contains(external_id).then(|| ExistingTransaction {
                    key: row.record.key,
                    external_id: external_id.clone(),
                    date: row.record.date,
                    amount: row.record.amount,
                    payee: row.record.payee.clone(),
                    seq: row.seq,
                })
            })
            .collect())
    }
}

#[async_trait]
impl LedgerWriter for InMemoryLedger {
    async fn write_batch(
        &self,
        tenant_id: TenantId,
        records: Vec<LedgerTransactionInput>,
    ) -> Result<u64, LedgerWriteError> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| LedgerWriteError("in-memory ledger lock poisoned".to_string()))?;
        state.write_calls += 1;

        if let Some(reason) = &state.fail_writes {
            return Err(LedgerWriteError(reason.clone()));
        }

        let count = records.len() as u64;
        for record in records {
            state.next_seq += 1;
            let seq = state.next_seq;
            state.rows.push(LedgerRow {
                tenant_id,
                seq,
                record,
            });
        }

        Ok(count)
    }
}
