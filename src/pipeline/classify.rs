use crate::model::{Status, Transaction};

/// Puts `account_id` on the side of each `Added` transaction that the local account occupies:
/// the source of a withdrawal, otherwise the destination. Rows in any other status are untouched.
pub fn classify(candidates: &mut [Transaction], account_id: &str) {
    for tx in candidates
        .iter_mut()
        .filter(|tx| tx.status() == Status::Added)
    {
        if tx.r#type().is_withdrawal() {
            tx.source_id = account_id.to_string();
        } else {
            tx.destination_id = account_id.to_string();
        }
    }
}
