use crate::commands::Out;
use crate::config::{Credentials, Settings};
use crate::{Config, Result};
use anyhow::Context;
use std::path::Path;

/// Creates the home directory with an initial `config.json` built from `settings` and an empty
/// mapping store.
///
/// # Errors
/// - Returns an error if any file operations fail, or if the directory was already initialized.
pub async fn init(home: &Path, settings: Settings) -> Result<Out<()>> {
    let config = Config::create(home, settings, Credentials::default())
        .await
        .context("Unable to create the firefly-importer home directory and config")?;
    Ok(format!(
        "Successfully created the firefly-importer home at {}",
        config.root().display()
    )
    .into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_init() {
        let dir = TempDir::new().unwrap();
        let home = dir.path().join("home");
        let out = init(&home, Settings::default()).await.unwrap();
        assert!(out.message().starts_with("Successfully created"));
        assert!(home.join("config.json").is_file());
        assert!(home.join("mappings.sqlite").is_file());

        // running it twice must not clobber the mapping store
        assert!(init(&home, Settings::default()).await.is_err());
    }
}
