//! Property-based tests for the duplicate classifier.
//!
//! - Match selection is independent of lookup result order
//! - Only new candidates are pre-selected
//! - Exact duplicates agree with their match on date, amount and payee

use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal::Decimal;
use tally_shared::types::TransactionKey;

use super::classifier::{DuplicateClassifier, MatchIndex};
use super::types::{CandidateTransaction, DuplicateStatus, ExistingTransaction};

/// Strategy for a small pool of external ids so collisions are common.
fn external_id() -> impl Strategy<Value = String> {
    (0u8..6).prop_map(|n| format!("FITID-{n}"))
}

fn date() -> impl Strategy<Value = NaiveDate> {
    (1u32..=28).prop_map(|day| NaiveDate::from_ymd_opt(2026, 1, day).unwrap())
}

fn amount() -> impl Strategy<Value = Decimal> {
    (-5i64..5).prop_map(|cents| Decimal::new(cents, 2))
}

fn payee() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("Corner Grocery".to_string()),
        Just("Power Co".to_string()),
        Just("Payroll".to_string()),
    ]
}

fn existing_rows() -> impl Strategy<Value = Vec<ExistingTransaction>> {
    prop::collection::vec((external_id(), date(), amount(), payee()), 0..24).prop_map(|rows| {
        rows.into_iter()
            .enumerate()
            .map(|(seq, (external_id, date, amount, payee))| ExistingTransaction {
                key: TransactionKey::new(),
                external_id,
                date,
                amount,
                payee,
                seq: i64::try_from(seq).unwrap(),
            })
            .collect()
    })
}

fn candidates() -> impl Strategy<Value = Vec<CandidateTransaction>> {
    prop::collection::vec((external_id(), date(), amount(), payee()), 1..16).prop_map(|rows| {
        rows.into_iter()
            .map(|(external_id, date, amount, payee)| CandidateTransaction {
                date,
                amount,
                payee,
                memo: None,
                source: None,
                external_id,
            })
            .collect()
    })
}

fn keys(index: &MatchIndex) -> Vec<(String, TransactionKey)> {
    let mut keys: Vec<_> = index
        .iter()
        .map(|(id, row)| (id.clone(), row.key))
        .collect();
    keys.sort();
    keys
}

proptest! {
    /// The latest-dated row wins, highest seq on ties, whatever the input order.
    #[test]
    fn test_index_latest_is_order_independent(rows in existing_rows()) {
        let mut reversed = rows.clone();
        reversed.reverse();

        let forward = DuplicateClassifier::index_latest(rows.clone());
        let backward = DuplicateClassifier::index_latest(reversed);
        prop_assert_eq!(keys(&forward), keys(&backward));

        for (id, chosen) in &forward {
            for row in rows.iter().filter(|r| &r.external_id == id) {
                prop_assert!((chosen.date, chosen.seq) >= (row.date, row.seq));
            }
        }
    }

    #[test]
    fn test_selection_default_follows_status(
        batch in candidates(),
        ledger_rows in existing_rows(),
        staged_rows in existing_rows(),
    ) {
        let ledger = DuplicateClassifier::index_latest(ledger_rows);
        let staged = DuplicateClassifier::index_latest(staged_rows);

        let classifications = DuplicateClassifier::classify(&batch, &ledger, &staged);
        prop_assert_eq!(classifications.len(), batch.len());

        for (candidate, classification) in batch.iter().zip(&classifications) {
            prop_assert_eq!(
                classification.is_selected(),
                classification.status == DuplicateStatus::New
            );

            let matched = ledger
                .get(&candidate.external_id)
                .or_else(|| staged.get(&candidate.external_id));
            prop_assert_eq!(classification.duplicate_of_key, matched.map(|m| m.key));

            if let Some(m) = matched {
                let same = m.date == candidate.date
                    && m.amount == candidate.amount
                    && m.payee == candidate.payee;
                prop_assert_eq!(
                    classification.status == DuplicateStatus::ExactDuplicate,
                    same
                );
            } else {
                prop_assert_eq!(classification.status, DuplicateStatus::New);
            }
        }
    }
}
