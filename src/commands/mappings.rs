use crate::commands::Out;
use crate::db::MappingStore;
use crate::model::NameMappings;
use crate::{Config, Result};

/// Lists the learned description mappings.
pub async fn mappings(config: &Config) -> Result<Out<NameMappings>> {
    let db = config.open_store().await?;
    let result = db.get().await;
    db.close().await;
    let mappings = result?;
    Ok(Out::new(
        format!("Found {} learned mapping(s)", mappings.len()),
        mappings,
    ))
}
