use std::fmt::{Debug, Display, Formatter};
use thiserror::Error;

pub type Error = anyhow::Error;
pub type Result<T> = std::result::Result<T, Error>;

/// The ways in which an import request can abort before producing a classified batch. Row-level
/// problems in a CSV file are not represented here; those become `Status::Error` rows.
#[derive(Error, Debug)]
pub enum ImportError {
    /// The statement stream was empty or could not be read.
    #[error("unable to parse statement: {0}")]
    Parse(String),

    /// Something required by the request is not configured, e.g. the extraction service URL.
    #[error("configuration error: {0}")]
    Config(String),

    /// The extraction service answered with a non-success status.
    #[error("vision API returned non-success status {status}: {body}")]
    Service { status: u16, body: String },

    /// The extraction service answered successfully but with an empty choice list.
    #[error("no content parsed by vision API")]
    EmptyResponse,

    /// The extraction service reply was not a JSON array of transactions.
    #[error("failed to parse JSON from vision response: {reason}, raw content: {raw}")]
    Decode { reason: String, raw: String },

    /// The extraction service could not be reached, or its envelope could not be read.
    #[error("vision API request failed: {0}")]
    Transport(String),

    /// The existing-transaction snapshot could not be fetched so no dedup can happen.
    #[error("failed to fetch recent transactions: {0:#}")]
    Snapshot(#[source] anyhow::Error),

    /// The account identifier is missing or malformed.
    #[error("invalid account id '{0}': account_id must be a valid numeric ID")]
    AccountId(String),

    /// The file extension does not map to a parser.
    #[error("unsupported file type: {0:?}")]
    UnsupportedFile(String),
}

/// A credential that must never show up in logs or error messages.
#[derive(Clone, Default, Eq, PartialEq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The raw value, for use in an `Authorization` header.
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<String> for Secret {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl Debug for Secret {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.0.is_empty() {
            f.write_str("Secret(<empty>)")
        } else {
            f.write_str("Secret(<redacted>)")
        }
    }
}

impl Display for Secret {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("<redacted>")
    }
}
