use crate::api::Mode;
use crate::commands::Out;
use crate::model::Labels;
use crate::{api, Config, Result};
use anyhow::Context;

/// Lists the budgets and categories that can be assigned to transactions before submitting them.
pub async fn labels(config: &Config, mode: Mode) -> Result<Out<Labels>> {
    let reader = api::ledger(config, mode)?.reader();
    let budgets = reader
        .get_budgets()
        .await
        .context("Unable to fetch budgets")?;
    let categories = reader
        .get_categories()
        .await
        .context("Unable to fetch categories")?;
    Ok(Out::new(
        format!(
            "Found {} budget(s) and {} categor{}",
            budgets.len(),
            categories.len(),
            if categories.len() == 1 { "y" } else { "ies" }
        ),
        Labels::new(budgets, categories),
    ))
}
