//! The SQLite store of learned description mappings.

mod migrations;

use crate::model::{NameMapping, NameMappings};
use crate::Result;
use anyhow::{bail, Context};
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{ConnectOptions, SqlitePool};
use std::path::Path;
use tracing::debug;

/// Read and write access to learned mappings.
#[async_trait::async_trait]
pub trait MappingStore: Send + Sync {
    /// Returns a snapshot of every mapping.
    async fn get(&self) -> Result<NameMappings>;

    /// Inserts `mapping`, or replaces the mapping with the same `original_name`.
    async fn upsert(&self, mapping: &NameMapping) -> Result<()>;
}

#[derive(Debug, Clone)]
pub(crate) struct Db {
    pool: SqlitePool,
}

impl Db {
    /// Creates a new SQLite file at `path` and initializes the schema. Fails if the file exists.
    pub(crate) async fn init(path: impl AsRef<Path>, query_logging: bool) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            bail!("A mapping store already exists at '{}'", path.display());
        }
        let db = Self::connect(path, true, query_logging).await?;
        migrations::bootstrap(&db.pool).await?;
        migrations::run(&db.pool, 0, migrations::LATEST).await?;
        debug!("Created the mapping store at {}", path.display());
        Ok(db)
    }

    /// Opens the existing SQLite file at `path` and brings its schema up to date.
    pub(crate) async fn load(path: impl AsRef<Path>, query_logging: bool) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            bail!("The mapping store is missing '{}'", path.display());
        }
        let db = Self::connect(path, false, query_logging).await?;
        migrations::bootstrap(&db.pool).await?;
        let version = migrations::current_version(&db.pool).await?;
        if version > migrations::LATEST {
            bail!(
                "The mapping store has schema version {version} which is newer than this program \
                supports ({})",
                migrations::LATEST
            );
        }
        migrations::run(&db.pool, version, migrations::LATEST).await?;
        Ok(db)
    }

    async fn connect(path: &Path, create: bool, query_logging: bool) -> Result<Self> {
        let mut options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(create);
        if !query_logging {
            options = options.disable_statement_logging();
        }
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .with_context(|| format!("Unable to open SQLite file '{}'", path.display()))?;
        Ok(Self { pool })
    }

    /// Closes the connection pool. Further use of this `Db` fails.
    pub(crate) async fn close(&self) {
        self.pool.close().await
    }
}

#[async_trait::async_trait]
impl MappingStore for Db {
    async fn get(&self) -> Result<NameMappings> {
        let rows: Vec<(String, String, String, String)> = sqlx::query_as(
            "SELECT original_name, new_name, budget_name, category_name FROM name_mappings",
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to query name mappings")?;
        Ok(rows
            .into_iter()
            .map(|(original, new, budget, category)| {
                NameMapping::new(original, new, budget, category)
            })
            .collect())
    }

    async fn upsert(&self, mapping: &NameMapping) -> Result<()> {
        sqlx::query(
            "INSERT INTO name_mappings \
                (original_name, new_name, budget_name, category_name, updated_at) \
             VALUES (?, ?, ?, ?, ?) \
             ON CONFLICT(original_name) DO UPDATE SET \
                new_name = excluded.new_name, \
                budget_name = excluded.budget_name, \
                category_name = excluded.category_name, \
                updated_at = excluded.updated_at",
        )
        .bind(mapping.original_name())
        .bind(mapping.new_name())
        .bind(mapping.budget_name())
        .bind(mapping.category_name())
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to upsert the mapping for '{}'", mapping.original_name()))?;
        Ok(())
    }
}
