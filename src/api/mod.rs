//! The remote services used by an import: the Firefly III ledger and the vision extraction
//! service. Each is reached through a narrow trait so that the pipeline can run against in-memory
//! implementations in tests and in `Mode::Test`.

mod firefly;
mod test_client;
mod vision;

pub use test_client::{TestLedger, TestVision};
pub use vision::{ChatRequest, ChatResponse, Choice, ChoiceMessage, ContentPart, ImageUrl};

use crate::error::ImportError;
use crate::model::{Account, Label, Transaction};
use crate::{Config, Result};
use firefly::FireflyClient;
use std::sync::Arc;
use vision::VisionClient;

/// When this environment variable is set to a non-empty value, in-memory services are used
/// instead of live ones.
pub const TEST_MODE_ENV: &str = "FIREFLY_IMPORTER_IN_TEST_MODE";

/// Read access to the ledger.
#[async_trait::async_trait]
pub trait LedgerReader: Send + Sync {
    /// Returns the asset accounts that statements can be imported into.
    async fn get_accounts(&self) -> Result<Vec<Account>>;

    /// Returns the transactions of `account_id` dated within the last `days_offset` days, with
    /// dates truncated to `YYYY-MM-DD`.
    async fn get_recent_transactions(
        &self,
        account_id: &str,
        days_offset: u32,
    ) -> Result<Vec<Transaction>>;

    /// Returns all budgets.
    async fn get_budgets(&self) -> Result<Vec<Label>>;

    /// Returns all categories.
    async fn get_categories(&self) -> Result<Vec<Label>>;
}

/// Write access to the ledger.
#[async_trait::async_trait]
pub trait LedgerWriter: Send + Sync {
    /// Stores a single transaction.
    async fn store_transaction(&self, transaction: &Transaction) -> Result<()>;
}

/// Read and write access to the same ledger.
#[derive(Clone)]
pub struct LedgerClients {
    reader: Arc<dyn LedgerReader>,
    writer: Arc<dyn LedgerWriter>,
}

impl LedgerClients {
    pub fn new<L>(ledger: Arc<L>) -> Self
    where
        L: LedgerReader + LedgerWriter + 'static,
    {
        Self {
            reader: ledger.clone(),
            writer: ledger,
        }
    }

    pub fn reader(&self) -> Arc<dyn LedgerReader> {
        self.reader.clone()
    }

    pub fn writer(&self) -> Arc<dyn LedgerWriter> {
        self.writer.clone()
    }
}

/// Sends a chat-completion request with an image to a vision model.
#[async_trait::async_trait]
pub trait VisionExtractor: Send + Sync {
    async fn complete(
        &self,
        request: &ChatRequest,
    ) -> std::result::Result<ChatResponse, ImportError>;
}

/// Whether live services or in-memory test services are used.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq)]
pub enum Mode {
    #[default]
    Firefly,
    Test,
}

impl Mode {
    /// Returns `Mode::Test` when `FIREFLY_IMPORTER_IN_TEST_MODE` is set and non-empty.
    pub fn from_env() -> Self {
        match std::env::var(TEST_MODE_ENV) {
            Ok(value) if !value.is_empty() => Mode::Test,
            _ => Mode::Firefly,
        }
    }
}

/// Creates the ledger clients for `mode`.
pub fn ledger(config: &Config, mode: Mode) -> Result<LedgerClients> {
    Ok(match mode {
        Mode::Firefly => LedgerClients::new(Arc::new(FireflyClient::new(
            config.firefly_url(),
            config.firefly_token().clone(),
            config.request_timeout(),
        )?)),
        Mode::Test => LedgerClients::new(Arc::new(TestLedger::seeded())),
    })
}

/// Creates the vision extractor for `mode`.
///
/// # Errors
/// - `ImportError::Config` in `Mode::Firefly` when no vision API URL is configured.
pub fn vision(
    config: &Config,
    mode: Mode,
) -> std::result::Result<Arc<dyn VisionExtractor>, ImportError> {
    Ok(match mode {
        Mode::Firefly => Arc::new(VisionClient::new(
            config.vision_api_url().unwrap_or_default(),
            config.vision_api_key().clone(),
            config.request_timeout(),
        )?),
        Mode::Test => Arc::new(TestVision::default()),
    })
}
