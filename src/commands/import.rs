use crate::api::Mode;
use crate::commands::{open_store_or_degrade, Out};
use crate::db::MappingStore;
use crate::model::Transaction;
use crate::pipeline::{AccountId, Importer, Source, Summary};
use crate::parser::FileKind;
use crate::{api, utils, Config, Result};
use anyhow::Context;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

/// Runs `file` through the import pipeline for the ledger account `account_id`.
///
/// The classified batch is written as pretty JSON to `output` when given, otherwise it is returned
/// as the structured output of the command. Either way it is suitable as input to `submit`.
///
/// # Errors
/// - The account id is not numeric, or the file type is not supported. Nothing is read or fetched
///   in that case.
/// - Any aborting `ImportError` from the pipeline.
pub async fn import(
    config: &Config,
    mode: Mode,
    account_id: &str,
    file: &Path,
    output: Option<&Path>,
) -> Result<Out<Vec<Transaction>>> {
    let account_id = AccountId::from_str(account_id)?;
    let source = Source::from_path(file).await?;

    let ledger = api::ledger(config, mode)?;
    let vision = match source.kind() {
        FileKind::Image => Some(api::vision(config, mode)?),
        FileKind::Csv => None,
    };

    let store = open_store_or_degrade(config).await.map(Arc::new);
    let mut importer = Importer::new(
        ledger.reader(),
        store.clone().map(|db| db as Arc<dyn MappingStore>),
        config.lookback_days(),
    );
    if let Some(extractor) = vision {
        importer = importer.with_vision(extractor, config.vision_model());
    }

    let result = importer.run(&source, &account_id).await;
    if let Some(db) = &store {
        db.close().await;
    }
    let batch = result.with_context(|| format!("Unable to import {}", file.display()))?;

    let summary = Summary::of(&batch);
    let message = format!(
        "Imported {} row(s) from {}: {} to add, {} duplicate(s) skipped, {} error(s)",
        batch.len(),
        file.display(),
        summary.added,
        summary.skipped,
        summary.errors
    );

    match output {
        Some(path) => {
            let json =
                serde_json::to_string_pretty(&batch).context("Unable to serialize the batch")?;
            utils::write(path, json).await?;
            Ok(format!("{message}. The batch was written to {}", path.display()).into())
        }
        None => Ok(Out::new(message, batch)),
    }
}
