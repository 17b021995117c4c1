//! Import review domain types.
//!
//! Records flow through three shapes: a [`CandidateTransaction`] produced by the
//! statement parser, a [`NewStagedTransaction`] written to the staging area with
//! its classification, and a [`LedgerTransactionInput`] handed to the ledger
//! writer once the review is completed.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use tally_shared::types::{TenantId, TransactionKey};

/// Source label applied when the parser does not name one.
pub const DEFAULT_SOURCE: &str = "bank_import";

/// Decimal places kept for stored amounts (`NUMERIC(19, 4)`).
pub const AMOUNT_SCALE: u32 = 4;

/// Outcome of matching a candidate against existing records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateStatus {
    /// No existing record shares the external identifier.
    New,
    /// Same external identifier and identical date, amount and payee.
    ExactDuplicate,
    /// Same external identifier but at least one compared field differs.
    PotentialDuplicate,
}

impl DuplicateStatus {
    /// Default value of the selection flag for a freshly staged record.
    ///
    /// Only new records are pre-selected; duplicates must be opted in.
    #[must_use]
    pub const fn selected_by_default(self) -> bool {
        matches!(self, Self::New)
    }

    /// Returns the wire/database name of the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::ExactDuplicate => "exact_duplicate",
            Self::PotentialDuplicate => "potential_duplicate",
        }
    }
}

impl fmt::Display for DuplicateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DuplicateStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "new" => Ok(Self::New),
            "exact_duplicate" => Ok(Self::ExactDuplicate),
            "potential_duplicate" => Ok(Self::PotentialDuplicate),
            other => Err(format!("unknown duplicate status: {other}")),
        }
    }
}

/// A transaction produced by the statement parser, not yet classified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateTransaction {
    /// Posting date.
    pub date: NaiveDate,
    /// Signed amount as reported by the bank.
    pub amount: Decimal,
    /// Payee or description line.
    pub payee: String,
    /// Optional memo.
    #[serde(default)]
    pub memo: Option<String>,
    /// Optional source label (account or file name).
    #[serde(default)]
    pub source: Option<String>,
    /// Bank-supplied stable identifier; required and non-empty.
    pub external_id: String,
}

impl CandidateTransaction {
    /// Rounds the amount to [`AMOUNT_SCALE`] places, half away from zero, so
    /// the value compared during classification is the value that gets stored.
    #[must_use]
    pub fn with_stored_amount(mut self) -> Self {
        self.amount = self
            .amount
            .round_dp_with_strategy(AMOUNT_SCALE, RoundingStrategy::MidpointAwayFromZero);
        self
    }
}

/// Parser output: the records it could read and the lines it could not.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedStatement {
    /// Successfully parsed candidates.
    pub transactions: Vec<CandidateTransaction>,
    /// Human-readable parse errors, reported back alongside the import result.
    #[serde(default)]
    pub errors: Vec<String>,
}

/// An existing record (permanent or staged) considered as a duplicate match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExistingTransaction {
    /// Key of the existing record.
    pub key: TransactionKey,
    /// External identifier the record was matched on.
    pub external_id: String,
    /// Posting date.
    pub date: NaiveDate,
    /// Amount.
    pub amount: Decimal,
    /// Payee.
    pub payee: String,
    /// Insertion order within its store; higher means inserted later.
    pub seq: i64,
}

/// Classification of one candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    /// Duplicate status.
    pub status: DuplicateStatus,
    /// Key of the matched record, if any.
    pub duplicate_of_key: Option<TransactionKey>,
}

impl Classification {
    /// Classification of a candidate with no match.
    #[must_use]
    pub const fn new_record() -> Self {
        Self {
            status: DuplicateStatus::New,
            duplicate_of_key: None,
        }
    }

    /// Default selection flag for this classification.
    #[must_use]
    pub const fn is_selected(&self) -> bool {
        self.status.selected_by_default()
    }
}

/// A classified record ready to be inserted into the staging area.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewStagedTransaction {
    /// Key assigned at creation.
    pub key: TransactionKey,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Posting date.
    pub date: NaiveDate,
    /// Payee.
    pub payee: String,
    /// Amount.
    pub amount: Decimal,
    /// Source label.
    pub source: String,
    /// External identifier.
    pub external_id: Option<String>,
    /// Memo.
    pub memo: Option<String>,
    /// Duplicate status, fixed at creation.
    pub duplicate_status: DuplicateStatus,
    /// Key of the matched record, informational only.
    pub duplicate_of_key: Option<TransactionKey>,
    /// Initial selection flag.
    pub is_selected: bool,
    /// Creation timestamp.
    pub imported_at: DateTime<Utc>,
}

impl NewStagedTransaction {
    /// Builds a staged record from a candidate and its classification.
    ///
    /// The selection flag is derived from the classification here so it is
    /// persisted together with the row.
    #[must_use]
    pub fn from_candidate(
        tenant_id: TenantId,
        candidate: CandidateTransaction,
        classification: Classification,
        imported_at: DateTime<Utc>,
    ) -> Self {
        Self {
            key: TransactionKey::new(),
            tenant_id,
            date: candidate.date,
            payee: candidate.payee,
            amount: candidate.amount,
            source: candidate
                .source
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_SOURCE.to_string()),
            external_id: Some(candidate.external_id),
            memo: candidate.memo,
            duplicate_status: classification.status,
            duplicate_of_key: classification.duplicate_of_key,
            is_selected: classification.is_selected(),
            imported_at,
        }
    }
}

/// A record currently held in the staging area.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedTransaction {
    /// Key assigned at creation.
    pub key: TransactionKey,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Insertion order within the staging area.
    pub seq: i64,
    /// Posting date.
    pub date: NaiveDate,
    /// Payee.
    pub payee: String,
    /// Amount.
    pub amount: Decimal,
    /// Source label.
    pub source: String,
    /// External identifier.
    pub external_id: Option<String>,
    /// Memo.
    pub memo: Option<String>,
    /// Duplicate status.
    pub duplicate_status: DuplicateStatus,
    /// Key of the matched record.
    pub duplicate_of_key: Option<TransactionKey>,
    /// Authoritative selection flag.
    pub is_selected: bool,
    /// Creation timestamp.
    pub imported_at: DateTime<Utc>,
}

impl StagedTransaction {
    /// Maps an accepted record to a ledger creation request, keeping its key.
    #[must_use]
    pub fn into_ledger_input(self) -> LedgerTransactionInput {
        LedgerTransactionInput {
            key: self.key,
            date: self.date,
            amount: self.amount,
            payee: self.payee,
            memo: self.memo,
            source: Some(self.source),
            external_id: self.external_id,
        }
    }
}

/// Row of a review page as shown to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewItem {
    /// Record key.
    pub key: TransactionKey,
    /// Posting date.
    pub date: NaiveDate,
    /// Payee.
    pub payee: String,
    /// Amount.
    pub amount: Decimal,
    /// Duplicate status.
    pub duplicate_status: DuplicateStatus,
    /// Key of the matched record.
    pub duplicate_of_key: Option<TransactionKey>,
    /// Server-side selection flag.
    pub is_selected: bool,
}

impl From<StagedTransaction> for ReviewItem {
    fn from(staged: StagedTransaction) -> Self {
        Self {
            key: staged.key,
            date: staged.date,
            payee: staged.payee,
            amount: staged.amount,
            duplicate_status: staged.duplicate_status,
            duplicate_of_key: staged.duplicate_of_key,
            is_selected: staged.is_selected,
        }
    }
}

/// Request to create one permanent ledger transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerTransactionInput {
    /// Key carried over from the staged record.
    pub key: TransactionKey,
    /// Posting date.
    pub date: NaiveDate,
    /// Amount.
    pub amount: Decimal,
    /// Payee.
    pub payee: String,
    /// Memo.
    pub memo: Option<String>,
    /// Source label.
    pub source: Option<String>,
    /// External identifier.
    pub external_id: Option<String>,
}

/// Which staged rows a selection update applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionTarget {
    /// Only the listed keys (within the tenant).
    Keys(Vec<TransactionKey>),
    /// Every staged row of the tenant.
    All,
}

/// Predicate for counting staged rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StagedPredicate {
    /// Every staged row.
    All,
    /// Rows whose selection flag is set.
    Selected,
    /// Rows with the given duplicate status.
    Status(DuplicateStatus),
}

/// Optional narrowing of a review page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReviewFilter {
    /// Only rows with this duplicate status.
    pub duplicate_status: Option<DuplicateStatus>,
}

/// Lifecycle state of a tenant's review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewState {
    /// Staging holds rows awaiting a decision.
    Open,
    /// Staging is empty.
    Closed,
}

/// Count summary of a tenant's staging area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewSummary {
    /// All staged rows.
    pub total_count: u64,
    /// Rows currently selected.
    pub selected_count: u64,
    /// Rows classified as new.
    pub new_count: u64,
    /// Rows classified as exact duplicates.
    pub exact_duplicate_count: u64,
    /// Rows classified as potential duplicates.
    pub potential_duplicate_count: u64,
    /// Open while rows remain staged.
    pub state: ReviewState,
}

/// Result of importing one parsed statement.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportResult {
    /// Rows written to staging.
    pub imported_count: u64,
    /// Rows classified as new.
    pub new_count: u64,
    /// Rows classified as exact duplicates.
    pub exact_duplicate_count: u64,
    /// Rows classified as potential duplicates.
    pub potential_duplicate_count: u64,
    /// Parser errors passed through unchanged.
    pub errors: Vec<String>,
}

impl ImportResult {
    /// Tallies classifications into an import result.
    #[must_use]
    pub fn tally(classifications: &[Classification], errors: Vec<String>) -> Self {
        let mut result = Self {
            errors,
            ..Self::default()
        };
        for classification in classifications {
            result.imported_count += 1;
            match classification.status {
                DuplicateStatus::New => result.new_count += 1,
                DuplicateStatus::ExactDuplicate => result.exact_duplicate_count += 1,
                DuplicateStatus::PotentialDuplicate => result.potential_duplicate_count += 1,
            }
        }
        result
    }
}

/// Result of completing a review.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompleteReviewResult {
    /// Selected rows handed to the ledger writer.
    pub accepted_count: u64,
    /// Rows discarded without being accepted.
    pub rejected_count: u64,
}
