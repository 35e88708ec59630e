use crate::api::Mode;
use crate::commands::{open_store_or_degrade, Out};
use crate::db::MappingStore;
use crate::model::Transaction;
use crate::submit::SubmitReport;
use crate::{api, utils, Config, Result};
use std::path::Path;

/// Stores the `Added` rows of the batch in `file`, as written by `import`, in the ledger.
///
/// The user may edit descriptions, budgets and categories in the file before submitting. Those
/// edits are remembered as mappings for future imports.
///
/// # Errors
/// - The file cannot be read or is not a batch.
/// - Every row that was sent failed to store. Partial failures are reported in the message.
pub async fn submit(config: &Config, mode: Mode, file: &Path) -> Result<Out<SubmitReport>> {
    let batch: Vec<Transaction> = utils::deserialize(file).await?;
    let ledger = api::ledger(config, mode)?;
    let store = open_store_or_degrade(config).await;

    let report = crate::submit::submit(
        &batch,
        ledger.writer().as_ref(),
        store.as_ref().map(|db| db as &dyn MappingStore),
    )
    .await;
    if let Some(db) = store {
        db.close().await;
    }

    let report = report.into_result()?;
    Ok(Out::new(report.message(), report))
}
