use crate::model::Amount;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// The processing state of a transaction. Parsers produce `Pending` (or `Error` for rows that
/// could not be parsed), the deduplicator moves `Pending` rows to `Added` or `Skipped`. `Error` is
/// sticky: nothing downstream of the parsers assigns or clears it.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub enum Status {
    #[default]
    Pending,
    Added,
    #[serde(rename = "Skipped (Duplicate)")]
    Skipped,
    Error,
}

serde_plain::derive_display_from_serialize!(Status);
serde_plain::derive_fromstr_from_deserialize!(Status);

/// The direction of a transaction, always lower-case, e.g. `withdrawal` or `deposit`. Values that
/// the ledger knows about but the importer does not produce, such as `transfer`, pass through.
#[derive(Debug, Default, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize)]
#[serde(transparent)]
pub struct TransactionType(String);

impl TransactionType {
    pub const WITHDRAWAL: &'static str = "withdrawal";
    pub const DEPOSIT: &'static str = "deposit";

    /// Trims and lower-cases `value`.
    pub fn new(value: impl AsRef<str>) -> Self {
        Self(value.as_ref().trim().to_lowercase())
    }

    pub fn withdrawal() -> Self {
        Self(Self::WITHDRAWAL.to_string())
    }

    pub fn deposit() -> Self {
        Self(Self::DEPOSIT.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_withdrawal(&self) -> bool {
        self.0 == Self::WITHDRAWAL
    }
}

impl<'de> Deserialize<'de> for TransactionType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(TransactionType::new(s))
    }
}

impl Display for TransactionType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TransactionType {
    fn from(value: &str) -> Self {
        TransactionType::new(value)
    }
}

/// A single transaction as it moves through the import pipeline. This is also the shape of the
/// classified batch that is written out as JSON and read back in for submission.
#[derive(Default, Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Transaction {
    /// `YYYY-MM-DD`.
    #[serde(default)]
    pub(crate) date: String,
    #[serde(default)]
    pub(crate) description: String,
    /// Set only when a learned mapping was applied, to preserve the pre-mapping description.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub(crate) original_description: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub(crate) suggested_description: String,
    #[serde(default)]
    pub(crate) amount: Amount,
    #[serde(default, rename = "type")]
    pub(crate) r#type: TransactionType,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub(crate) source_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub(crate) source_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub(crate) destination_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub(crate) destination_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub(crate) budget_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub(crate) suggested_budget: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub(crate) category_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub(crate) suggested_category: String,
    #[serde(default)]
    pub(crate) status: Status,
}

impl Transaction {
    /// Creates a `Pending` transaction from the four fields that every source provides.
    pub fn new(
        date: impl Into<String>,
        description: impl Into<String>,
        amount: Amount,
        r#type: impl Into<TransactionType>,
    ) -> Self {
        Self {
            date: date.into(),
            description: description.into(),
            amount,
            r#type: r#type.into(),
            status: Status::Pending,
            ..Default::default()
        }
    }

    /// Creates an `Error` row. `description` tells the user what went wrong with the input row.
    pub fn error(date: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            date: date.into(),
            description: description.into(),
            status: Status::Error,
            ..Default::default()
        }
    }

    pub fn date(&self) -> &str {
        &self.date
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn original_description(&self) -> &str {
        &self.original_description
    }

    pub fn suggested_description(&self) -> &str {
        &self.suggested_description
    }

    pub fn amount(&self) -> Amount {
        self.amount
    }

    pub fn r#type(&self) -> &TransactionType {
        &self.r#type
    }

    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    pub fn destination_name(&self) -> &str {
        &self.destination_name
    }

    pub fn destination_id(&self) -> &str {
        &self.destination_id
    }

    pub fn budget_name(&self) -> &str {
        &self.budget_name
    }

    pub fn suggested_budget(&self) -> &str {
        &self.suggested_budget
    }

    pub fn category_name(&self) -> &str {
        &self.category_name
    }

    pub fn suggested_category(&self) -> &str {
        &self.suggested_category
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn set_status(&mut self, status: Status) {
        self.status = status
    }

    pub fn with_status(mut self, status: Status) -> Self {
        self.status = status;
        self
    }

    pub fn with_counterparties(
        mut self,
        source_name: impl Into<String>,
        destination_name: impl Into<String>,
    ) -> Self {
        self.source_name = source_name.into();
        self.destination_name = destination_name.into();
        self
    }

    pub fn with_labels(
        mut self,
        budget_name: impl Into<String>,
        category_name: impl Into<String>,
    ) -> Self {
        self.budget_name = budget_name.into();
        self.category_name = category_name.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_original_description(mut self, original: impl Into<String>) -> Self {
        self.original_description = original.into();
        self
    }
}
