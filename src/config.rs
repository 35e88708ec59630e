//! Configuration file handling.
//!
//! The configuration file is stored at `$FIREFLY_IMPORTER_HOME/config.json` and holds the
//! non-secret settings: where the ledger and the vision service live, which model to use, and how
//! far back to look for duplicates. Credentials are never written to it; they arrive through
//! `Credentials`, which the CLI fills from flags or environment variables.

use crate::db::Db;
use crate::error::Secret;
use crate::{utils, Result};
use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const APP_NAME: &str = "firefly-importer";
const CONFIG_VERSION: u8 = 1;
const CONFIG_JSON: &str = "config.json";
const MAPPINGS_SQLITE: &str = "mappings.sqlite";

pub(crate) const DEFAULT_FIREFLY_URL: &str = "https://firefly.havek.es/api/v1";
pub(crate) const DEFAULT_VISION_MODEL: &str = "gpt-4o";
pub(crate) const DEFAULT_LOOKBACK_DAYS: u32 = 30;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// The `Config` object represents the configuration of the app. You instantiate it by providing
/// the path to `$FIREFLY_IMPORTER_HOME` and from there it loads `config.json`.
#[derive(Debug, Clone)]
pub struct Config {
    root: PathBuf,
    config_path: PathBuf,
    config_file: ConfigFile,
    sqlite_path: PathBuf,
    credentials: Credentials,
}

/// The secrets needed to reach the ledger and the vision service.
#[derive(Debug, Default, Clone)]
pub struct Credentials {
    firefly_token: Secret,
    vision_api_key: Secret,
}

impl Credentials {
    pub fn new(firefly_token: impl Into<String>, vision_api_key: impl Into<String>) -> Self {
        Self {
            firefly_token: Secret::new(firefly_token),
            vision_api_key: Secret::new(vision_api_key),
        }
    }
}

/// The user-chosen settings written to `config.json` by `Config::create`.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Settings {
    firefly_url: String,
    vision_api_url: Option<String>,
    vision_model: String,
    lookback_days: u32,
}

impl Settings {
    pub fn new(
        firefly_url: impl Into<String>,
        vision_api_url: Option<String>,
        vision_model: impl Into<String>,
        lookback_days: u32,
    ) -> Self {
        Self {
            firefly_url: firefly_url.into(),
            vision_api_url: vision_api_url.filter(|url| !url.trim().is_empty()),
            vision_model: vision_model.into(),
            lookback_days,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::new(
            DEFAULT_FIREFLY_URL,
            None,
            DEFAULT_VISION_MODEL,
            DEFAULT_LOOKBACK_DAYS,
        )
    }
}

impl Config {
    /// Creates the home directory, writes an initial `config.json` from `settings` and creates an
    /// empty mapping store.
    ///
    /// # Errors
    /// - Returns an error if any file operation fails or if a mapping store already exists.
    pub async fn create(
        dir: impl Into<PathBuf>,
        settings: Settings,
        credentials: Credentials,
    ) -> Result<Self> {
        let maybe_relative = dir.into();
        utils::make_dir(&maybe_relative)
            .await
            .context("Unable to create the firefly-importer home directory")?;
        let root = utils::canonicalize(&maybe_relative).await?;
        let config_path = root.join(CONFIG_JSON);

        let config_file = ConfigFile {
            firefly_url: settings.firefly_url,
            vision_api_url: settings.vision_api_url,
            vision_model: settings.vision_model,
            lookback_days: settings.lookback_days,
            ..ConfigFile::default()
        };
        config_file.validate()?;
        config_file.save(&config_path).await?;

        let sqlite_path = root.join(MAPPINGS_SQLITE);
        let db = Db::init(&sqlite_path, config_file.query_logging)
            .await
            .context("Unable to create the mapping store")?;
        db.close().await;

        Ok(Self {
            root,
            config_path,
            config_file,
            sqlite_path,
            credentials,
        })
    }

    /// Validates that the home directory and `config.json` exist, then loads `config.json`. The
    /// mapping store is not opened here; see `Config::open_store`.
    pub async fn load(home: impl Into<PathBuf>, credentials: Credentials) -> Result<Self> {
        let maybe_relative = home.into();
        if !maybe_relative.is_dir() {
            bail!(
                "The firefly-importer home is missing '{}', run the init command first",
                maybe_relative.display()
            );
        }
        let root = utils::canonicalize(&maybe_relative).await?;

        let config_path = root.join(CONFIG_JSON);
        if !config_path.is_file() {
            bail!("The config file is missing '{}'", config_path.display())
        }
        let config_file = ConfigFile::load(&config_path).await?;

        Ok(Self {
            sqlite_path: root.join(MAPPINGS_SQLITE),
            root,
            config_path,
            config_file,
            credentials,
        })
    }

    /// Opens the mapping store, applying any pending schema migrations.
    pub(crate) async fn open_store(&self) -> Result<Db> {
        Db::load(&self.sqlite_path, self.config_file.query_logging)
            .await
            .context("Unable to open the mapping store")
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn sqlite_path(&self) -> &Path {
        &self.sqlite_path
    }

    pub fn firefly_url(&self) -> &str {
        &self.config_file.firefly_url
    }

    pub(crate) fn firefly_token(&self) -> &Secret {
        &self.credentials.firefly_token
    }

    pub fn vision_api_url(&self) -> Option<&str> {
        self.config_file.vision_api_url.as_deref()
    }

    pub(crate) fn vision_api_key(&self) -> &Secret {
        &self.credentials.vision_api_key
    }

    pub fn vision_model(&self) -> &str {
        &self.config_file.vision_model
    }

    pub fn lookback_days(&self) -> u32 {
        self.config_file.lookback_days
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.config_file.request_timeout_secs)
    }

    pub fn query_logging(&self) -> bool {
        self.config_file.query_logging
    }
}

/// Represents the serialization and deserialization format of the configuration file.
///
/// Example configuration:
/// ```json
/// {
///   "app_name": "firefly-importer",
///   "config_version": 1,
///   "firefly_url": "https://firefly.example.com/api/v1",
///   "vision_api_url": "http://localhost:11434",
///   "vision_model": "gpt-4o",
///   "lookback_days": 30,
///   "request_timeout_secs": 30,
///   "query_logging": false
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
struct ConfigFile {
    /// Application name, should always be "firefly-importer"
    app_name: String,

    config_version: u8,

    /// Base URL of the Firefly III API, including the `/api/v1` suffix
    #[serde(default = "default_firefly_url")]
    firefly_url: String,

    /// Base URL of an OpenAI-compatible service. Image imports fail without it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    vision_api_url: Option<String>,

    #[serde(default = "default_vision_model")]
    vision_model: String,

    /// How many days of existing ledger history are checked for duplicates
    #[serde(default = "default_lookback_days")]
    lookback_days: u32,

    #[serde(default = "default_request_timeout_secs")]
    request_timeout_secs: u64,

    /// Log every SQL statement sent to the mapping store at debug level
    #[serde(default)]
    query_logging: bool,
}

fn default_firefly_url() -> String {
    DEFAULT_FIREFLY_URL.to_string()
}

fn default_vision_model() -> String {
    DEFAULT_VISION_MODEL.to_string()
}

fn default_lookback_days() -> u32 {
    DEFAULT_LOOKBACK_DAYS
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            app_name: APP_NAME.to_string(),
            config_version: CONFIG_VERSION,
            firefly_url: default_firefly_url(),
            vision_api_url: None,
            vision_model: default_vision_model(),
            lookback_days: DEFAULT_LOOKBACK_DAYS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            query_logging: false,
        }
    }
}

impl ConfigFile {
    async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config: ConfigFile = utils::deserialize(path).await?;
        config.validate()?;
        Ok(config)
    }

    async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let data = serde_json::to_string_pretty(self).context("Unable to serialize config")?;
        utils::write(path, data)
            .await
            .context("Unable to write config file")
    }

    fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            self.app_name == APP_NAME,
            "Invalid app_name in config file: expected '{}', got '{}'",
            APP_NAME,
            self.app_name
        );
        anyhow::ensure!(
            !self.firefly_url.trim().is_empty(),
            "The firefly_url in the config file must not be empty"
        );
        anyhow::ensure!(
            self.request_timeout_secs > 0,
            "The request_timeout_secs in the config file must be greater than zero"
        );
        Ok(())
    }
}
