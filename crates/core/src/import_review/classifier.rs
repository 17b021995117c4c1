//! Batch duplicate classification.
//!
//! Classification is two-pass: the caller fetches every existing record that
//! shares an external id with the batch (one lookup against the ledger, one
//! against staging), then [`DuplicateClassifier::classify`] decides each
//! candidate from in-memory maps. The number of storage round trips does not
//! depend on the batch size.

use std::collections::{HashMap, HashSet};

use super::error::ImportReviewError;
use super::types::{CandidateTransaction, Classification, DuplicateStatus, ExistingTransaction};

/// Map from external id to the single existing record it matches.
pub type MatchIndex = HashMap<String, ExistingTransaction>;

/// Stateless duplicate classifier.
pub struct DuplicateClassifier;

impl DuplicateClassifier {
    /// Collects the distinct external ids of a batch, in first-seen order.
    ///
    /// # Errors
    ///
    /// Returns `MissingExternalId` for the first candidate whose external id is
    /// empty or blank. Such input is a bug in the caller, not a data condition.
    pub fn collect_external_ids(
        candidates: &[CandidateTransaction],
    ) -> Result<Vec<String>, ImportReviewError> {
        let mut seen = HashSet::with_capacity(candidates.len());
        let mut ids = Vec::with_capacity(candidates.len());

        for (index, candidate) in candidates.iter().enumerate() {
            if candidate.external_id.trim().is_empty() {
                return Err(ImportReviewError::MissingExternalId { index });
            }
            if seen.insert(candidate.external_id.as_str()) {
                ids.push(candidate.external_id.clone());
            }
        }

        Ok(ids)
    }

    /// Reduces lookup results to one record per external id.
    ///
    /// The record with the latest date wins; equal dates fall back to the
    /// highest insertion order. The result does not depend on input order.
    #[must_use]
    pub fn index_latest(records: Vec<ExistingTransaction>) -> MatchIndex {
        let mut index: MatchIndex = HashMap::with_capacity(records.len());

        for record in records {
            let replace = index
                .get(&record.external_id)
                .is_none_or(|current| Self::is_more_recent(&record, current));
            if replace {
                index.insert(record.external_id.clone(), record);
            }
        }

        index
    }

    fn is_more_recent(candidate: &ExistingTransaction, current: &ExistingTransaction) -> bool {
        (candidate.date, candidate.seq) > (current.date, current.seq)
    }

    /// Compares a candidate with its match on date, amount and payee.
    #[must_use]
    pub fn compare(
        candidate: &CandidateTransaction,
        existing: &ExistingTransaction,
    ) -> DuplicateStatus {
        if candidate.date == existing.date
            && candidate.amount == existing.amount
            && candidate.payee == existing.payee
        {
            DuplicateStatus::ExactDuplicate
        } else {
            DuplicateStatus::PotentialDuplicate
        }
    }

    /// Classifies one candidate. Ledger matches take precedence over staging.
    #[must_use]
    pub fn classify_one(
        candidate: &CandidateTransaction,
        ledger: &MatchIndex,
        staged: &MatchIndex,
    ) -> Classification {
        ledger
            .get(&candidate.external_id)
            .or_else(|| staged.get(&candidate.external_id))
            .map_or_else(Classification::new_record, |existing| Classification {
                status: Self::compare(candidate, existing),
                duplicate_of_key: Some(existing.key),
            })
    }

    /// Classifies a batch, returning one classification per candidate in order.
    #[must_use]
    pub fn classify(
        candidates: &[CandidateTransaction],
        ledger: &MatchIndex,
        staged: &MatchIndex,
    ) -> Vec<Classification> {
        candidates
            .iter()
            .map(|candidate| Self::classify_one(candidate, ledger, staged))
            .collect()
    }
}
