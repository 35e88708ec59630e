use crate::api::Mode;
use crate::commands::Out;
use crate::model::Account;
use crate::{api, Config, Result};
use anyhow::Context;

/// Lists the asset accounts that statements can be imported into.
pub async fn accounts(config: &Config, mode: Mode) -> Result<Out<Vec<Account>>> {
    let ledger = api::ledger(config, mode)?;
    let accounts = ledger
        .reader()
        .get_accounts()
        .await
        .context("Unable to fetch accounts")?;
    Ok(Out::new(
        format!("Found {} asset account(s)", accounts.len()),
        accounts,
    ))
}
