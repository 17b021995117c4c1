//! Import review scenarios against the in-memory store and ledger.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use rstest::rstest;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tally_shared::types::{PageRequest, TenantId, TransactionKey};

use super::error::{ImportReviewError, StoreError};
use super::memory::{InMemoryLedger, InMemoryStagingStore};
use super::service::ImportReviewService;
use super::store::StagingStore;
use super::types::{
    CandidateTransaction, Classification, DuplicateStatus, ExistingTransaction,
    LedgerTransactionInput, NewStagedTransaction, ParsedStatement, ReviewFilter, ReviewState,
    SelectionTarget, StagedPredicate, StagedTransaction,
};

struct Fixture {
    service: ImportReviewService,
    staging: Arc<InMemoryStagingStore>,
    ledger: Arc<InMemoryLedger>,
}

fn fixture() -> Fixture {
    let staging = InMemoryStagingStore::new();
    let ledger = InMemoryLedger::new();
    let service = ImportReviewService::new(staging.clone(), ledger.clone(), ledger.clone());
    Fixture {
        service,
        staging,
        ledger,
    }
}

fn date(month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, month, day).unwrap()
}

fn candidate(external_id: &str, day: u32, amount: Decimal, payee: &str) -> CandidateTransaction {
    CandidateTransaction {
        date: date(4, day),
        amount,
        payee: payee.to_string(),
        memo: None,
        source: Some("Checking.ofx".to_string()),
        external_id: external_id.to_string(),
    }
}

fn statement(transactions: Vec<CandidateTransaction>) -> ParsedStatement {
    ParsedStatement {
        transactions,
        errors: Vec::new(),
    }
}

/// `count` distinct candidates spread over the month.
fn batch(prefix: &str, count: usize) -> Vec<CandidateTransaction> {
    (0..count)
        .map(|i| {
            let day = u32::try_from(i % 28).unwrap() + 1;
            candidate(
                &format!("{prefix}-{i}"),
                day,
                Decimal::new(-i64::try_from(i).unwrap() - 100, 2),
                &format!("Payee {}", i % 7),
            )
        })
        .collect()
}

fn ledger_record(external_id: &str, day: u32, amount: Decimal, payee: &str) -> LedgerTransactionInput {
    LedgerTransactionInput {
        key: TransactionKey::new(),
        date: date(4, day),
        amount,
        payee: payee.to_string(),
        memo: None,
        source: Some("manual".to_string()),
        external_id: Some(external_id.to_string()),
    }
}

async fn page_keys(fx: &Fixture, tenant: TenantId, page: i64, size: i64) -> Vec<TransactionKey> {
    fx.service
        .get_review_page(tenant, PageRequest::new(page, size), ReviewFilter::default())
        .await
        .unwrap()
        .items
        .into_iter()
        .map(|item| item.key)
        .collect()
}

// ============================================================================
// Import & classification
// ============================================================================

#[tokio::test]
async fn test_import_classifies_against_ledger() {
    let fx = fixture();
    let tenant = TenantId::new();
    fx.ledger
        .seed(tenant, ledger_record("DUP", 3, dec!(-12.00), "Cafe"));
    fx.ledger
        .seed(tenant, ledger_record("NEAR", 4, dec!(-12.00), "Cafe"));

    let result = fx
        .service
        .import_batch(
            tenant,
            statement(vec![
                candidate("FRESH", 2, dec!(-5), "Bakery"),
                candidate("DUP", 3, dec!(-12), "Cafe"),
                candidate("NEAR", 4, dec!(-12.01), "Cafe"),
            ]),
        )
        .await
        .unwrap();

    assert_eq!(result.imported_count, 3);
    assert_eq!(result.new_count, 1);
    assert_eq!(result.exact_duplicate_count, 1);
    assert_eq!(result.potential_duplicate_count, 1);

    let summary = fx.service.get_summary(tenant).await.unwrap();
    assert_eq!(summary.total_count, 3);
    assert_eq!(summary.selected_count, 1);
    assert_eq!(summary.state, ReviewState::Open);

    let near = fx
        .staging
        .snapshot()
        .into_iter()
        .find(|row| row.external_id.as_deref() == Some("NEAR"))
        .unwrap();
    assert_eq!(near.duplicate_status, DuplicateStatus::PotentialDuplicate);
    assert!(!near.is_selected);
    assert!(near.duplicate_of_key.is_some());
}

#[tokio::test]
async fn test_second_upload_matches_staged_rows() {
    let fx = fixture();
    let tenant = TenantId::new();

    fx.service
        .import_batch(tenant, statement(vec![candidate("A", 1, dec!(10), "Payroll")]))
        .await
        .unwrap();
    let result = fx
        .service
        .import_batch(tenant, statement(vec![candidate("A", 1, dec!(10), "Payroll")]))
        .await
        .unwrap();

    assert_eq!(result.exact_duplicate_count, 1);
    let first_key = fx.staging.snapshot()[0].key;
    let second = &fx.staging.snapshot()[1];
    assert_eq!(second.duplicate_of_key, Some(first_key));
    assert_eq!(fx.service.get_summary(tenant).await.unwrap().total_count, 2);
}

#[tokio::test]
async fn test_import_uses_one_lookup_per_store() {
    let fx = fixture();
    let tenant = TenantId::new();

    fx.service
        .import_batch(tenant, statement(batch("LARGE", 500)))
        .await
        .unwrap();

    assert_eq!(fx.staging.lookup_count(), 1);
}

#[tokio::test]
async fn test_tie_break_picks_latest_inserted_match() {
    let fx = fixture();
    let tenant = TenantId::new();
    fx.ledger.seed(tenant, ledger_record("X", 9, dec!(1), "first"));
    let latest = ledger_record("X", 9, dec!(1), "second");
    let latest_key = latest.key;
    fx.ledger.seed(tenant, latest);

    fx.service
        .import_batch(tenant, statement(vec![candidate("X", 9, dec!(1), "second")]))
        .await
        .unwrap();

    let row = &fx.staging.snapshot()[0];
    assert_eq!(row.duplicate_of_key, Some(latest_key));
    assert_eq!(row.duplicate_status, DuplicateStatus::ExactDuplicate);
}

#[tokio::test]
async fn test_parser_errors_are_passed_through() {
    let fx = fixture();
    let result = fx
        .service
        .import_batch(
            TenantId::new(),
            ParsedStatement {
                transactions: vec![candidate("A", 1, dec!(1), "x")],
                errors: vec!["line 12: unparseable date".to_string()],
            },
        )
        .await
        .unwrap();

    assert_eq!(result.errors, vec!["line 12: unparseable date".to_string()]);
}

#[tokio::test]
async fn test_empty_batch_is_rejected() {
    let fx = fixture();
    let err = fx
        .service
        .import_batch(TenantId::new(), statement(vec![]))
        .await
        .unwrap_err();
    assert!(matches!(err, ImportReviewError::EmptyBatch));
}

#[tokio::test]
async fn test_missing_external_id_stages_nothing() {
    let fx = fixture();
    let err = fx
        .service
        .import_batch(
            TenantId::new(),
            statement(vec![candidate("A", 1, dec!(1), "x"), candidate("", 1, dec!(1), "x")]),
        )
        .await
        .unwrap_err();

    assert!(err.is_caller_bug());
    assert!(fx.staging.snapshot().is_empty());
}

// ============================================================================
// Tenant isolation
// ============================================================================

#[tokio::test]
async fn test_tenants_never_see_each_other() {
    let fx = fixture();
    let alice = TenantId::new();
    let bob = TenantId::new();
    fx.ledger.seed(bob, ledger_record("SHARED", 1, dec!(1), "x"));

    let result = fx
        .service
        .import_batch(alice, statement(vec![candidate("SHARED", 1, dec!(1), "x")]))
        .await
        .unwrap();
    assert_eq!(result.new_count, 1);

    fx.service
        .import_batch(bob, statement(batch("BOB", 3)))
        .await
        .unwrap();

    let alice_keys = page_keys(&fx, alice, 1, 50).await;
    assert_eq!(alice_keys.len(), 1);

    let bob_key = page_keys(&fx, bob, 1, 50).await[0];
    let err = fx
        .service
        .set_selection(alice, &[bob_key], false)
        .await
        .unwrap_err();
    assert!(matches!(err, ImportReviewError::NotFound(_)));

    fx.service.select_all(alice).await.unwrap();
    fx.service.deselect_all(alice).await.unwrap();
    assert_eq!(fx.service.get_summary(bob).await.unwrap().selected_count, 3);

    fx.service.complete_review(alice).await.unwrap();
    assert_eq!(fx.service.get_summary(bob).await.unwrap().total_count, 3);
    assert!(fx.ledger.rows(alice).is_empty());
}

// ============================================================================
// Selection
// ============================================================================

#[tokio::test]
async fn test_empty_key_list_is_rejected() {
    let fx = fixture();
    let tenant = TenantId::new();
    fx.service
        .import_batch(tenant, statement(batch("A", 2)))
        .await
        .unwrap();

    let err = fx.service.set_selection(tenant, &[], true).await.unwrap_err();
    assert!(matches!(err, ImportReviewError::EmptySelection));
    assert_eq!(fx.service.get_summary(tenant).await.unwrap().selected_count, 2);
}

#[tokio::test]
async fn test_unknown_keys_are_ignored_when_some_match() {
    let fx = fixture();
    let tenant = TenantId::new();
    fx.service
        .import_batch(tenant, statement(batch("A", 3)))
        .await
        .unwrap();
    let key = page_keys(&fx, tenant, 1, 50).await[0];

    let matched = fx
        .service
        .set_selection(tenant, &[key, key, TransactionKey::new()], false)
        .await
        .unwrap();

    assert_eq!(matched, 1);
    assert_eq!(fx.service.get_summary(tenant).await.unwrap().selected_count, 2);
}

#[tokio::test]
async fn test_potential_duplicate_can_be_opted_in() {
    let fx = fixture();
    let tenant = TenantId::new();
    fx.ledger.seed(tenant, ledger_record("X", 1, dec!(10), "Rent"));
    fx.service
        .import_batch(tenant, statement(vec![candidate("X", 1, dec!(11), "Rent")]))
        .await
        .unwrap();

    let page = fx
        .service
        .get_review_page(
            tenant,
            PageRequest::default(),
            ReviewFilter {
                duplicate_status: Some(DuplicateStatus::PotentialDuplicate),
            },
        )
        .await
        .unwrap();
    assert_eq!(page.items.len(), 1);
    assert!(!page.items[0].is_selected);

    fx.service
        .set_selection(tenant, &[page.items[0].key], true)
        .await
        .unwrap();
    let result = fx.service.complete_review(tenant).await.unwrap();

    assert_eq!(result.accepted_count, 1);
    assert_eq!(fx.ledger.rows(tenant).len(), 2);
}

// ============================================================================
// Queries
// ============================================================================

#[rstest]
#[case(0, 10, 1, 10)]
#[case(-3, 10, 1, 10)]
#[case(2, 0, 2, 50)]
#[case(1, 5000, 1, 1000)]
#[tokio::test]
async fn test_page_parameters_are_clamped(
    #[case] page: i64,
    #[case] size: i64,
    #[case] expected_page: u64,
    #[case] expected_size: u64,
) {
    let fx = fixture();
    let tenant = TenantId::new();
    fx.service
        .import_batch(tenant, statement(batch("A", 1200)))
        .await
        .unwrap();

    let response = fx
        .service
        .get_review_page(tenant, PageRequest::new(page, size), ReviewFilter::default())
        .await
        .unwrap();

    assert_eq!(response.meta.page_number, expected_page);
    assert_eq!(response.meta.page_size, expected_size);
    assert_eq!(response.meta.total_count, 1200);
    assert!(response.items.len() as u64 <= expected_size);
}

#[tokio::test]
async fn test_review_page_order() {
    let fx = fixture();
    let tenant = TenantId::new();
    fx.service
        .import_batch(
            tenant,
            statement(vec![
                candidate("1", 5, dec!(1), "Zoo"),
                candidate("2", 9, dec!(1), "Market"),
                candidate("3", 5, dec!(1), "Apple"),
                candidate("4", 1, dec!(1), "Apple"),
            ]),
        )
        .await
        .unwrap();

    let page = fx
        .service
        .get_review_page(tenant, PageRequest::default(), ReviewFilter::default())
        .await
        .unwrap();
    let order: Vec<(u32, &str)> = page
        .items
        .iter()
        .map(|item| (chrono::Datelike::day(&item.date), item.payee.as_str()))
        .collect();

    assert_eq!(order, vec![(9, "Market"), (5, "Apple"), (5, "Zoo"), (1, "Apple")]);
}

#[tokio::test]
async fn test_page_beyond_end_is_empty() {
    let fx = fixture();
    let tenant = TenantId::new();
    fx.service
        .import_batch(tenant, statement(batch("A", 12)))
        .await
        .unwrap();

    let response = fx
        .service
        .get_review_page(tenant, PageRequest::new(4, 5), ReviewFilter::default())
        .await
        .unwrap();

    assert!(response.items.is_empty());
    assert_eq!(response.meta.total_pages, 3);
    assert!(!response.meta.has_next_page);
}

#[tokio::test]
async fn test_summary_of_empty_staging_is_closed() {
    let fx = fixture();
    let summary = fx.service.get_summary(TenantId::new()).await.unwrap();
    assert_eq!(summary.total_count, 0);
    assert_eq!(summary.state, ReviewState::Closed);
}

#[tokio::test]
async fn test_reimport_of_sub_cent_amount_is_exact_duplicate() {
    let fx = fixture();
    let tenant = TenantId::new();
    let upload = || statement(vec![candidate("FX-1", 9, dec!(-3.14159), "Currency fee")]);

    fx.service.import_batch(tenant, upload()).await.unwrap();
    let staged = fx.staging.snapshot();
    assert_eq!(staged[0].amount, dec!(-3.1416));

    let second = fx.service.import_batch(tenant, upload()).await.unwrap();
    assert_eq!(second.exact_duplicate_count, 1);
    assert_eq!(second.potential_duplicate_count, 0);
}

// ============================================================================
// Finalize
// ============================================================================

#[tokio::test]
async fn test_select_all_covers_rows_never_paged_in() {
    let fx = fixture();
    let tenant = TenantId::new();
    fx.ledger.seed(tenant, ledger_record("A-0", 1, dec!(0), "dup"));
    fx.service
        .import_batch(tenant, statement(batch("A", 240)))
        .await
        .unwrap();

    // Only the first page is ever fetched.
    let first_page = page_keys(&fx, tenant, 1, 50).await;
    assert_eq!(first_page.len(), 50);

    fx.service.select_all(tenant).await.unwrap();
    let result = fx.service.complete_review(tenant).await.unwrap();

    assert_eq!(result.accepted_count, 240);
    assert_eq!(result.rejected_count, 0);
    assert_eq!(fx.ledger.rows(tenant).len(), 241);
    assert_eq!(fx.service.get_summary(tenant).await.unwrap().total_count, 0);
}

/// Seeds 50 ledger rows and uploads 250 fresh candidates plus exact copies of those 50.
async fn stage_250_new_50_exact(fx: &Fixture, tenant: TenantId) {
    let existing = batch("OLD", 50);
    for c in &existing {
        fx.ledger
            .seed(tenant, ledger_record(&c.external_id, 1, c.amount, &c.payee));
    }
    // Ledger rows sit on day 1; move the candidates there so all 50 compare exact.
    let exact: Vec<CandidateTransaction> = existing
        .into_iter()
        .map(|mut c| {
            c.date = date(4, 1);
            c
        })
        .collect();

    let mut upload = batch("NEW", 250);
    upload.extend(exact);
    let imported = fx
        .service
        .import_batch(tenant, statement(upload))
        .await
        .unwrap();
    assert_eq!(imported.new_count, 250);
    assert_eq!(imported.exact_duplicate_count, 50);
    assert_eq!(imported.potential_duplicate_count, 0);
}

#[tokio::test]
async fn test_defaults_accept_new_and_reject_exact_duplicates() {
    let fx = fixture();
    let tenant = TenantId::new();
    stage_250_new_50_exact(&fx, tenant).await;

    let result = fx.service.complete_review(tenant).await.unwrap();
    assert_eq!(result.accepted_count, 250);
    assert_eq!(result.rejected_count, 50);
    assert_eq!(fx.ledger.rows(tenant).len(), 300);
    assert!(fx.staging.snapshot().is_empty());
}

#[tokio::test]
async fn test_select_all_accepts_exact_duplicates_too() {
    let fx = fixture();
    let tenant = TenantId::new();
    stage_250_new_50_exact(&fx, tenant).await;

    fx.service.select_all(tenant).await.unwrap();
    let result = fx.service.complete_review(tenant).await.unwrap();

    assert_eq!(result.accepted_count, 300);
    assert_eq!(result.rejected_count, 0);
    assert_eq!(fx.ledger.rows(tenant).len(), 350);
    assert!(fx.staging.snapshot().is_empty());
    assert_eq!(fx.service.get_summary(tenant).await.unwrap().state, ReviewState::Closed);
}

#[tokio::test]
async fn test_partial_selection_across_pages() {
    let fx = fixture();
    let tenant = TenantId::new();
    fx.service
        .import_batch(tenant, statement(batch("A", 150)))
        .await
        .unwrap();

    fx.service.deselect_all(tenant).await.unwrap();
    let mut chosen = page_keys(&fx, tenant, 1, 100).await;
    chosen.extend(page_keys(&fx, tenant, 2, 100).await.into_iter().take(20));
    assert_eq!(chosen.len(), 120);

    fx.service.set_selection(tenant, &chosen[..60], true).await.unwrap();
    fx.service.set_selection(tenant, &chosen[60..], true).await.unwrap();

    let result = fx.service.complete_review(tenant).await.unwrap();
    assert_eq!(result.accepted_count, 120);
    assert_eq!(result.rejected_count, 30);

    let accepted: Vec<TransactionKey> = fx
        .ledger
        .rows(tenant)
        .into_iter()
        .map(|row| row.record.key)
        .collect();
    assert!(chosen.iter().all(|key| accepted.contains(key)));
    assert!(fx.staging.snapshot().is_empty());
}

#[tokio::test]
async fn test_complete_with_nothing_selected() {
    let fx = fixture();
    let tenant = TenantId::new();
    fx.service
        .import_batch(tenant, statement(batch("A", 4)))
        .await
        .unwrap();
    fx.service.deselect_all(tenant).await.unwrap();

    let result = fx.service.complete_review(tenant).await.unwrap();

    assert_eq!(result.accepted_count, 0);
    assert_eq!(result.rejected_count, 4);
    assert_eq!(fx.ledger.write_calls(), 0);
    assert_eq!(fx.service.get_summary(tenant).await.unwrap().total_count, 0);
}

#[tokio::test]
async fn test_complete_on_empty_staging() {
    let fx = fixture();
    let result = fx.service.complete_review(TenantId::new()).await.unwrap();
    assert_eq!(result.accepted_count, 0);
    assert_eq!(result.rejected_count, 0);
}

#[tokio::test]
async fn test_ledger_failure_keeps_staging() {
    let fx = fixture();
    let tenant = TenantId::new();
    fx.service
        .import_batch(tenant, statement(batch("A", 10)))
        .await
        .unwrap();
    fx.ledger.fail_writes(Some("connection reset"));

    let err = fx.service.complete_review(tenant).await.unwrap_err();
    assert!(matches!(err, ImportReviewError::LedgerWrite(_)));
    assert!(err.is_retryable());

    let summary = fx.service.get_summary(tenant).await.unwrap();
    assert_eq!(summary.total_count, 10);
    assert_eq!(summary.selected_count, 10);
    assert!(fx.ledger.rows(tenant).is_empty());

    fx.ledger.fail_writes(None);
    let result = fx.service.complete_review(tenant).await.unwrap();
    assert_eq!(result.accepted_count, 10);
}

#[tokio::test]
async fn test_delete_all_is_idempotent() {
    let fx = fixture();
    let tenant = TenantId::new();
    fx.service
        .import_batch(tenant, statement(batch("A", 7)))
        .await
        .unwrap();

    assert_eq!(fx.service.delete_all_review(tenant).await.unwrap(), 7);
    assert_eq!(fx.service.delete_all_review(tenant).await.unwrap(), 0);
    assert!(fx.ledger.rows(tenant).is_empty());
}

#[tokio::test]
async fn test_accepted_rows_keep_their_fields() {
    let fx = fixture();
    let tenant = TenantId::new();
    let mut c = candidate("KEEP", 6, dec!(-99.95), "Hardware Store");
    c.memo = Some("receipt 8812".to_string());
    fx.service
        .import_batch(tenant, statement(vec![c]))
        .await
        .unwrap();
    let staged_key = fx.staging.snapshot()[0].key;

    fx.service.complete_review(tenant).await.unwrap();

    let row = &fx.ledger.rows(tenant)[0];
    assert_eq!(row.record.key, staged_key);
    assert_eq!(row.record.amount, dec!(-99.95));
    assert_eq!(row.record.memo.as_deref(), Some("receipt 8812"));
    assert_eq!(row.record.source.as_deref(), Some("Checking.ofx"));
    assert_eq!(row.record.external_id.as_deref(), Some("KEEP"));
}

// ============================================================================
// Concurrent import during completion
// ============================================================================

/// Staging store that commits one extra import right after the selected rows
/// are read, the way a concurrent upload would.
struct LateImportStore {
    inner: Arc<InMemoryStagingStore>,
    late: Mutex<Option<NewStagedTransaction>>,
}

#[async_trait]
impl StagingStore for LateImportStore {
    async fn insert_batch(&self, records: Vec<NewStagedTransaction>) -> Result<u64, StoreError> {
        self.inner.insert_batch(records).await
    }

    async fn find_by_external_ids(
        &self,
        tenant_id: TenantId,
        external_ids: &[String],
    ) -> Result<Vec<ExistingTransaction>, StoreError> {
        self.inner.find_by_external_ids(tenant_id, external_ids).await
    }

    async fn query_page(
        &self,
        tenant_id: TenantId,
        page: PageRequest,
        filter: ReviewFilter,
    ) -> Result<(Vec<StagedTransaction>, u64), StoreError> {
        self.inner.query_page(tenant_id, page, filter).await
    }

    async fn find_selected(
        &self,
        tenant_id: TenantId,
    ) -> Result<Vec<StagedTransaction>, StoreError> {
        let selected = self.inner.find_selected(tenant_id).await?;
        let late = self.late.lock().unwrap().take();
        if let Some(record) = late {
            self.inner.insert_batch(vec![record]).await?;
        }
        Ok(selected)
    }

    async fn update_selection(
        &self,
        tenant_id: TenantId,
        target: SelectionTarget,
        selected: bool,
    ) -> Result<u64, StoreError> {
        self.inner.update_selection(tenant_id, target, selected).await
    }

    async fn delete_all(&self, tenant_id: TenantId) -> Result<u64, StoreError> {
        self.inner.delete_all(tenant_id).await
    }

    async fn count(
        &self,
        tenant_id: TenantId,
        predicate: StagedPredicate,
    ) -> Result<u64, StoreError> {
        self.inner.count(tenant_id, predicate).await
    }
}

#[tokio::test]
async fn test_rows_staged_during_completion_count_as_rejected() {
    let tenant = TenantId::new();
    let late = NewStagedTransaction::from_candidate(
        tenant,
        candidate("LATE", 20, dec!(-9.99), "Late merchant"),
        Classification::new_record(),
        Utc::now(),
    );
    let inner = InMemoryStagingStore::new();
    let staging = Arc::new(LateImportStore {
        inner: inner.clone(),
        late: Mutex::new(Some(late)),
    });
    let ledger = InMemoryLedger::new();
    let service = ImportReviewService::new(staging, ledger.clone(), ledger.clone());

    service
        .import_batch(tenant, statement(batch("EARLY", 4)))
        .await
        .unwrap();

    let result = service.complete_review(tenant).await.unwrap();

    assert_eq!(result.accepted_count, 4);
    assert_eq!(result.rejected_count, 1);
    assert_eq!(ledger.rows(tenant).len(), 4);
    assert!(inner.snapshot().is_empty());
}
