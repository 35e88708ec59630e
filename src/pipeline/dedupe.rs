//! Content addresses for transactions, and the duplicate filter built on them.

use crate::model::{Amount, Status, Transaction, TransactionType};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fmt::{Display, Formatter};

/// The hex-encoded SHA-256 of `date|description|amount|type`, where the amount is always written
/// with exactly two decimal places.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Fingerprint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

pub fn fingerprint(
    date: &str,
    description: &str,
    amount: Amount,
    r#type: &TransactionType,
) -> Fingerprint {
    let mut hasher = Sha256::new();
    hasher.update(format!("{date}|{description}|{amount}|{}", r#type.as_str()).as_bytes());
    Fingerprint(hex::encode(hasher.finalize()))
}

/// The fingerprints of the transactions already recorded in the ledger, each computed from its own
/// description.
#[derive(Debug, Default, Clone)]
pub struct Snapshot {
    fingerprints: HashSet<Fingerprint>,
}

impl Snapshot {
    pub fn new(existing: &[Transaction]) -> Self {
        Self {
            fingerprints: existing
                .iter()
                .map(|tx| fingerprint(tx.date(), tx.description(), tx.amount(), tx.r#type()))
                .collect(),
        }
    }

    pub fn contains(&self, fingerprint: &Fingerprint) -> bool {
        self.fingerprints.contains(fingerprint)
    }

    pub fn len(&self) -> usize {
        self.fingerprints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fingerprints.is_empty()
    }

    /// Whether `tx` is already in the ledger under either its description or its suggested
    /// description.
    fn matches(&self, tx: &Transaction) -> bool {
        let fp = |description: &str| fingerprint(tx.date(), description, tx.amount(), tx.r#type());
        if self.contains(&fp(tx.description())) {
            return true;
        }
        !tx.suggested_description().is_empty() && self.contains(&fp(tx.suggested_description()))
    }
}

/// Moves every candidate that is not in `Error` to `Skipped` if it matches `snapshot`, otherwise to
/// `Added`. Order and length are preserved.
pub fn filter(candidates: &mut [Transaction], snapshot: &Snapshot) {
    for tx in candidates
        .iter_mut()
        .filter(|tx| tx.status() != Status::Error)
    {
        let status = if snapshot.matches(tx) {
            Status::Skipped
        } else {
            Status::Added
        };
        tx.set_status(status);
    }
}
