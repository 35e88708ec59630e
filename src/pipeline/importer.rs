use crate::api::{LedgerReader, VisionExtractor};
use crate::db::MappingStore;
use crate::error::ImportError;
use crate::model::{NameMappings, Status, Transaction};
use crate::parser::{parse_csv, parse_image, FileKind};
use crate::pipeline::{apply_mappings, classify, filter, Snapshot};
use crate::{utils, Result};
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// The ledger's identifier of the local account, e.g. `"42"`. Always numeric.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct AccountId(String);

impl AccountId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for AccountId {
    type Err = ImportError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() || !trimmed.chars().all(|c| c.is_ascii_digit()) {
            return Err(ImportError::AccountId(s.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }
}

impl Display for AccountId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The raw contents of a statement file together with the parser that reads it.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Source {
    kind: FileKind,
    bytes: Vec<u8>,
}

impl Source {
    pub fn new(kind: FileKind, bytes: Vec<u8>) -> Self {
        Self { kind, bytes }
    }

    /// Picks the parser from the extension of `path`, then reads the file.
    pub async fn from_path(path: &Path) -> Result<Self> {
        let kind = FileKind::from_path(path)?;
        let bytes = utils::read_bytes(path).await?;
        Ok(Self::new(kind, bytes))
    }

    pub fn kind(&self) -> FileKind {
        self.kind
    }
}

/// How many rows of a classified batch ended up in each status.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq)]
pub struct Summary {
    pub added: usize,
    pub skipped: usize,
    pub errors: usize,
}

impl Summary {
    pub fn of(batch: &[Transaction]) -> Self {
        batch.iter().fold(Self::default(), |mut s, tx| {
            match tx.status() {
                Status::Added => s.added += 1,
                Status::Skipped => s.skipped += 1,
                Status::Error => s.errors += 1,
                Status::Pending => {}
            }
            s
        })
    }
}

/// Runs statements through parse, mapping, dedup and classification for one account at a time.
/// Holds no state between runs apart from its collaborators.
pub struct Importer {
    ledger: Arc<dyn LedgerReader>,
    mappings: Option<Arc<dyn MappingStore>>,
    vision: Option<(Arc<dyn VisionExtractor>, String)>,
    lookback_days: u32,
}

impl Importer {
    /// `mappings` is `None` when the mapping store could not be opened; imports then run without
    /// suggestions.
    pub fn new(
        ledger: Arc<dyn LedgerReader>,
        mappings: Option<Arc<dyn MappingStore>>,
        lookback_days: u32,
    ) -> Self {
        Self {
            ledger,
            mappings,
            vision: None,
            lookback_days,
        }
    }

    /// Enables image statements, sent to `extractor` using `model`.
    pub fn with_vision(mut self, extractor: Arc<dyn VisionExtractor>, model: impl Into<String>) -> Self {
        self.vision = Some((extractor, model.into()));
        self
    }

    /// Produces the classified batch for `source`, in the order the source lists its rows.
    ///
    /// # Errors
    /// - `ImportError::Parse` if a CSV source is empty or unreadable.
    /// - `ImportError::Config`, `Service`, `EmptyResponse`, `Decode` or `Transport` if an image
    ///   cannot be extracted.
    /// - `ImportError::Snapshot` if the existing transactions cannot be fetched.
    pub async fn run(
        &self,
        source: &Source,
        account_id: &AccountId,
    ) -> std::result::Result<Vec<Transaction>, ImportError> {
        let mut batch = match source.kind {
            FileKind::Csv => parse_csv(source.bytes.as_slice())?,
            FileKind::Image => {
                let (extractor, model) = self.vision.as_ref().ok_or_else(|| {
                    ImportError::Config(String::from("vision API URL is required"))
                })?;
                parse_image(extractor.as_ref(), &source.bytes, model).await?
            }
        };
        debug!("Parsed {} candidate rows", batch.len());

        let mappings = self.mapping_snapshot().await;
        let suggested = apply_mappings(&mut batch, &mappings);
        debug!("Applied learned mappings to {suggested} rows");

        let existing = self
            .ledger
            .get_recent_transactions(account_id.as_str(), self.lookback_days)
            .await
            .map_err(ImportError::Snapshot)?;
        let snapshot = Snapshot::new(&existing);
        debug!(
            "Checking against {} existing transactions from the last {} days",
            snapshot.len(),
            self.lookback_days
        );

        filter(&mut batch, &snapshot);
        classify(&mut batch, account_id.as_str());

        let summary = Summary::of(&batch);
        info!(
            "Import for account {account_id}: {} added, {} skipped, {} errors",
            summary.added, summary.skipped, summary.errors
        );
        Ok(batch)
    }

    /// Reads the mapping store once. Any failure degrades to an empty table.
    async fn mapping_snapshot(&self) -> NameMappings {
        let Some(store) = &self.mappings else {
            debug!("No mapping store, continuing without learned mappings");
            return NameMappings::new();
        };
        match store.get().await {
            Ok(mappings) => mappings,
            Err(e) => {
                warn!("Unable to read learned mappings, continuing without them: {e:#}");
                NameMappings::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ChatResponse, TestLedger, TestVision};
    use crate::model::{Account, Amount, NameMapping};
    use anyhow::anyhow;

    const CSV: &str = "Date,Description,Amount,Type\n\
        2023-10-01,Rent,-1500.00,withdrawal\n\
        2023-10-02,Groceries,120.50,Withdrawal\n\
        2023-10-03,AMZN MKTP US,19.99,withdrawal\n\
        2023-10-04,Payroll,2500,deposit\n\
        invalid,bad_row,amount,error\n";

    struct MemoryStore(NameMappings);

    #[async_trait::async_trait]
    impl MappingStore for MemoryStore {
        async fn get(&self) -> Result<NameMappings> {
            Ok(self.0.clone())
        }

        async fn upsert(&self, _: &NameMapping) -> Result<()> {
            Ok(())
        }
    }

    struct BrokenStore;

    #[async_trait::async_trait]
    impl MappingStore for BrokenStore {
        async fn get(&self) -> Result<NameMappings> {
            Err(anyhow!("database is locked"))
        }

        async fn upsert(&self, _: &NameMapping) -> Result<()> {
            Err(anyhow!("database is locked"))
        }
    }

    fn existing() -> Vec<Transaction> {
        let amount = |s: &str| Amount::from_str(s).unwrap();
        vec![
            Transaction::new("2023-10-01", "Rent", amount("1500"), "withdrawal")
                .with_status(Status::Added),
            Transaction::new("2023-10-03", "Amazon", amount("19.99"), "withdrawal")
                .with_status(Status::Added),
        ]
    }

    fn ledger() -> Arc<TestLedger> {
        Arc::new(TestLedger::new(
            vec![Account::new("42", "Checking", "asset")],
            existing(),
        ))
    }

    fn csv() -> Source {
        Source::new(FileKind::Csv, CSV.as_bytes().to_vec())
    }

    fn account() -> AccountId {
        AccountId::from_str("42").unwrap()
    }

    fn statuses(batch: &[Transaction]) -> Vec<Status> {
        batch.iter().map(|t| t.status()).collect()
    }

    #[test]
    fn test_account_id() {
        assert_eq!("42", AccountId::from_str(" 42 ").unwrap().as_str());
        for bad in ["", "  ", "abc", "12a", "-1", "1.5"] {
            assert!(
                matches!(AccountId::from_str(bad), Err(ImportError::AccountId(_))),
                "{bad:?}"
            );
        }
    }

    #[tokio::test]
    async fn test_run_csv_with_mappings() {
        let mappings: NameMappings = vec![NameMapping::new(
            "AMZN MKTP US",
            "Amazon",
            "Household",
            "Shopping",
        )]
        .into_iter()
        .collect();
        let ledger = ledger();
        let importer = Importer::new(
            ledger.clone(),
            Some(Arc::new(MemoryStore(mappings))),
            30,
        );

        let batch = importer.run(&csv(), &account()).await.unwrap();

        assert_eq!(5, batch.len());
        assert_eq!(
            vec![
                Status::Skipped,
                Status::Added,
                Status::Skipped,
                Status::Added,
                Status::Error
            ],
            statuses(&batch)
        );
        // the mapped row was recognized through its suggested description
        assert_eq!("AMZN MKTP US", batch[2].description());
        assert_eq!("Amazon", batch[2].suggested_description());
        assert_eq!("Shopping", batch[2].suggested_category());

        assert_eq!("42", batch[1].source_id());
        assert_eq!("42", batch[3].destination_id());
        assert_eq!("", batch[0].source_id());
        assert!(batch[4].description().contains("Invalid date format"));

        assert_eq!(
            vec![(String::from("42"), 30)],
            ledger.snapshot_requests().await
        );
    }

    #[tokio::test]
    async fn test_broken_store_degrades() {
        let importer = Importer::new(ledger(), Some(Arc::new(BrokenStore)), 30);
        let batch = importer.run(&csv(), &account()).await.unwrap();
        // without the mapping the Amazon row is new
        assert_eq!(Status::Added, batch[2].status());
        assert_eq!("", batch[2].suggested_description());

        let importer = Importer::new(ledger(), None, 30);
        let batch = importer.run(&csv(), &account()).await.unwrap();
        assert_eq!(Status::Added, batch[2].status());
    }

    #[tokio::test]
    async fn test_snapshot_failure_aborts() {
        let ledger = Arc::new(TestLedger::default().failing_snapshot("connection refused"));
        let importer = Importer::new(ledger, None, 30);
        match importer.run(&csv(), &account()).await {
            Err(ImportError::Snapshot(e)) => assert_eq!("connection refused", e.to_string()),
            other => panic!("expected a snapshot error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_empty_csv_aborts() {
        let importer = Importer::new(ledger(), None, 30);
        let source = Source::new(FileKind::Csv, Vec::new());
        assert!(matches!(
            importer.run(&source, &account()).await,
            Err(ImportError::Parse(_))
        ));
    }

    #[tokio::test]
    async fn test_run_image() {
        let vision = Arc::new(TestVision::replying(
            r#"[{"date":"2023-10-01","description":"Rent","amount":1500,"type":"withdrawal"},
                {"date":"2023-10-09","description":"Refund","amount":12.3,"type":"deposit"}]"#,
        ));
        let importer = Importer::new(ledger(), None, 7).with_vision(vision.clone(), "llava");
        let source = Source::new(FileKind::Image, b"png bytes".to_vec());

        let batch = importer.run(&source, &account()).await.unwrap();
        assert_eq!(vec![Status::Skipped, Status::Added], statuses(&batch));
        assert_eq!("42", batch[1].destination_id());
        assert_eq!("llava", vision.requests().await[0].model);
    }

    #[tokio::test]
    async fn test_image_without_vision_is_config_error() {
        let importer = Importer::new(ledger(), None, 30);
        let source = Source::new(FileKind::Image, b"jpg".to_vec());
        assert!(matches!(
            importer.run(&source, &account()).await,
            Err(ImportError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_image_failure_has_no_partial_results() {
        let vision = Arc::new(TestVision::new(vec![Ok(ChatResponse::with_content(
            "Here are your transactions: []",
        ))]));
        let importer = Importer::new(ledger(), None, 30).with_vision(vision, "m");
        let source = Source::new(FileKind::Image, b"jpg".to_vec());
        assert!(matches!(
            importer.run(&source, &account()).await,
            Err(ImportError::Decode { .. })
        ));
    }

    #[tokio::test]
    async fn test_source_from_path() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("statement.CSV");
        utils::write(&path, CSV).await.unwrap();
        let source = Source::from_path(&path).await.unwrap();
        assert_eq!(FileKind::Csv, source.kind());

        let pdf = dir.path().join("statement.pdf");
        utils::write(&pdf, "%PDF").await.unwrap();
        let err = Source::from_path(&pdf).await.unwrap_err();
        assert!(err.to_string().contains("unsupported file type"));
    }

    #[test]
    fn test_summary() {
        let batch = vec![
            Transaction::default().with_status(Status::Added),
            Transaction::default().with_status(Status::Added),
            Transaction::default().with_status(Status::Skipped),
            Transaction::default().with_status(Status::Error),
        ];
        assert_eq!(
            Summary {
                added: 2,
                skipped: 1,
                errors: 1
            },
            Summary::of(&batch)
        );
    }
}
