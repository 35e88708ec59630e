//! Stores the `Added` rows of a classified batch in the ledger and learns mappings from the edits
//! the user made to them.

use crate::api::LedgerWriter;
use crate::db::MappingStore;
use crate::model::{NameMapping, Status, Transaction};
use crate::Result;
use anyhow::bail;
use serde::Serialize;
use tracing::{debug, error, warn};

/// The outcome of submitting a batch.
#[derive(Debug, Default, Clone, Eq, PartialEq, Serialize)]
pub struct SubmitReport {
    added: usize,
    failed: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    first_error: Option<String>,
}

impl SubmitReport {
    pub fn added(&self) -> usize {
        self.added
    }

    pub fn failed(&self) -> usize {
        self.failed
    }

    pub fn first_error(&self) -> Option<&str> {
        self.first_error.as_deref()
    }

    /// A one-line description suitable for showing to the user.
    pub fn message(&self) -> String {
        let first_error = self.first_error().unwrap_or_default();
        match (self.added, self.failed) {
            (added, 0) => format!("Saved {added} transaction(s)"),
            (0, failed) => {
                format!("All {failed} transaction(s) failed to save. First error: {first_error}")
            }
            (added, failed) => {
                format!("Saved {added}, but {failed} failed. First error: {first_error}")
            }
        }
    }

    /// Turns a batch in which every store failed into an error. Partial success is still `Ok`.
    pub fn into_result(self) -> Result<Self> {
        if self.added == 0 && self.failed > 0 {
            bail!("{}", self.message());
        }
        Ok(self)
    }

    fn record_failure(&mut self, e: &anyhow::Error) {
        self.failed += 1;
        if self.first_error.is_none() {
            self.first_error = Some(format!("{e:#}"));
        }
    }
}

/// Stores every `Added` row of `batch`, one at a time, in order. After each successful store a
/// mapping is learned when the user changed the description of a mapped row or gave it a budget
/// or category. Mapping failures are logged and otherwise ignored.
pub async fn submit(
    batch: &[Transaction],
    writer: &dyn LedgerWriter,
    mappings: Option<&dyn MappingStore>,
) -> SubmitReport {
    let mut report = SubmitReport::default();
    for tx in batch.iter().filter(|tx| tx.status() == Status::Added) {
        if let Err(e) = writer.store_transaction(tx).await {
            error!(
                "Failed to store '{}' dated {}: {e:#}",
                tx.description(),
                tx.date()
            );
            report.record_failure(&e);
            continue;
        }
        report.added += 1;

        let Some(mapping) = learned_mapping(tx) else {
            continue;
        };
        let Some(store) = mappings else {
            debug!(
                "No mapping store, not learning '{}'",
                mapping.original_name()
            );
            continue;
        };
        if let Err(e) = store.upsert(&mapping).await {
            warn!(
                "Failed to save mapping for {:?} -> {:?}, budget: {:?}, category: {:?}: {e:#}",
                mapping.original_name(),
                mapping.new_name(),
                mapping.budget_name(),
                mapping.category_name()
            );
        }
    }
    report
}

/// The mapping to remember after `tx` was stored, if any.
fn learned_mapping(tx: &Transaction) -> Option<NameMapping> {
    let original = tx.original_description();
    if original.is_empty() {
        return None;
    }
    let edited = original != tx.description()
        || !tx.budget_name().is_empty()
        || !tx.category_name().is_empty();
    edited.then(|| {
        NameMapping::new(
            original,
            tx.description(),
            tx.budget_name(),
            tx.category_name(),
        )
    })
}
