//! In-memory implementations of the ledger and vision traits.
//!
//! Note: these are compiled even in the "production" version of this app so that the whole app can
//! run, top-to-bottom, without a Firefly III instance or a vision model.

use crate::api::{ChatRequest, ChatResponse, LedgerReader, LedgerWriter, VisionExtractor};
use crate::error::ImportError;
use crate::model::{Account, Amount, Label, Status, Transaction};
use crate::Result;
use anyhow::{anyhow, bail};
use rust_decimal::Decimal;
use std::collections::{HashSet, VecDeque};
use tokio::sync::Mutex;

/// A ledger held in memory. By default it is seeded with two asset accounts, a few budgets and
/// categories, and a handful of existing transactions.
#[derive(Debug, Default)]
pub struct TestLedger {
    accounts: Vec<Account>,
    existing: Vec<Transaction>,
    budgets: Vec<Label>,
    categories: Vec<Label>,
    failing_descriptions: HashSet<String>,
    snapshot_failure: Option<String>,
    state: Mutex<LedgerState>,
}

#[derive(Debug, Default)]
struct LedgerState {
    stored: Vec<Transaction>,
    snapshot_requests: Vec<(String, u32)>,
}

impl TestLedger {
    /// An otherwise empty ledger holding `accounts` and the `existing` transactions, which are
    /// returned for every account and every lookback.
    pub fn new(accounts: Vec<Account>, existing: Vec<Transaction>) -> Self {
        Self {
            accounts,
            existing,
            ..Default::default()
        }
    }

    pub fn with_labels(mut self, budgets: Vec<Label>, categories: Vec<Label>) -> Self {
        self.budgets = budgets;
        self.categories = categories;
        self
    }

    /// Makes `store_transaction` fail for any transaction with this description.
    pub fn failing_on(mut self, description: impl Into<String>) -> Self {
        self.failing_descriptions.insert(description.into());
        self
    }

    /// Makes `get_recent_transactions` fail with `message`.
    pub fn failing_snapshot(mut self, message: impl Into<String>) -> Self {
        self.snapshot_failure = Some(message.into());
        self
    }

    /// The transactions stored so far, in the order they were stored.
    pub async fn stored(&self) -> Vec<Transaction> {
        self.state.lock().await.stored.clone()
    }

    /// The `(account_id, days_offset)` arguments of every snapshot request so far.
    pub async fn snapshot_requests(&self) -> Vec<(String, u32)> {
        self.state.lock().await.snapshot_requests.clone()
    }

    /// The ledger used by `Mode::Test`.
    pub fn seeded() -> Self {
        let amount = |s: &str| Amount::new(s.parse::<Decimal>().unwrap_or_default());
        Self::new(
            vec![
                Account::new("1", "Checking", "asset"),
                Account::new("2", "Savings", "asset"),
            ],
            vec![
                Transaction::new("2023-10-01", "Rent", amount("1500.00"), "withdrawal")
                    .with_counterparties("Checking", "Landlord")
                    .with_status(Status::Added),
                Transaction::new("2023-10-02", "Internet", amount("60.00"), "withdrawal")
                    .with_counterparties("Checking", "ISP")
                    .with_status(Status::Added),
            ],
        )
        .with_labels(
            vec![Label::new("1", "Living"), Label::new("2", "Fun")],
            vec![
                Label::new("1", "Groceries"),
                Label::new("2", "Utilities"),
                Label::new("3", "Salary"),
            ],
        )
    }
}

#[async_trait::async_trait]
impl LedgerReader for TestLedger {
    async fn get_accounts(&self) -> Result<Vec<Account>> {
        Ok(self.accounts.clone())
    }

    async fn get_recent_transactions(
        &self,
        account_id: &str,
        days_offset: u32,
    ) -> Result<Vec<Transaction>> {
        self.state
            .lock()
            .await
            .snapshot_requests
            .push((account_id.to_string(), days_offset));
        if let Some(message) = &self.snapshot_failure {
            return Err(anyhow!("{message}"));
        }
        Ok(self.existing.clone())
    }

    async fn get_budgets(&self) -> Result<Vec<Label>> {
        Ok(self.budgets.clone())
    }

    async fn get_categories(&self) -> Result<Vec<Label>> {
        Ok(self.categories.clone())
    }
}

#[async_trait::async_trait]
impl LedgerWriter for TestLedger {
    async fn store_transaction(&self, transaction: &Transaction) -> Result<()> {
        if self.failing_descriptions.contains(transaction.description()) {
            bail!("Unexpected status code 422: rejected '{}'", transaction.description());
        }
        self.state.lock().await.stored.push(transaction.clone());
        Ok(())
    }
}

/// The reply `TestVision::default()` gives to every request.
const CANNED_REPLY: &str = r#"[
{"date":"2023-10-01","description":"Rent","amount":1500.00,"type":"withdrawal"},
{"date":"2023-10-03","description":"Coffee Shop","amount":4.50,"type":"withdrawal"}
]"#;

/// A vision service that plays back scripted responses and records what it was sent.
#[derive(Debug)]
pub struct TestVision {
    script: Mutex<VecDeque<std::result::Result<ChatResponse, ImportError>>>,
    fallback: ChatResponse,
    requests: Mutex<Vec<ChatRequest>>,
}

impl TestVision {
    /// Answers each request with the next element of `script`. Once the script runs out every
    /// request gets an empty array.
    pub fn new(script: Vec<std::result::Result<ChatResponse, ImportError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback: ChatResponse::with_content("[]"),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Answers every request with a single choice holding `content`.
    pub fn replying(content: impl Into<String>) -> Self {
        Self {
            fallback: ChatResponse::with_content(content),
            ..Self::new(Vec::new())
        }
    }

    /// The requests received so far.
    pub async fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().await.clone()
    }
}

impl Default for TestVision {
    fn default() -> Self {
        Self::replying(CANNED_REPLY)
    }
}

#[async_trait::async_trait]
impl VisionExtractor for TestVision {
    async fn complete(
        &self,
        request: &ChatRequest,
    ) -> std::result::Result<ChatResponse, ImportError> {
        self.requests.lock().await.push(request.clone());
        match self.script.lock().await.pop_front() {
            Some(next) => next,
            None => Ok(self.fallback.clone()),
        }
    }
}
