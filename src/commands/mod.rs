//! Command handlers for the firefly-importer CLI.
//!
//! This module contains implementations for all CLI subcommands.

mod accounts;
mod import;
mod init;
mod labels;
mod mappings;
mod submit;

use crate::db::Db;
use crate::Config;
use serde::Serialize;
use std::fmt::Debug;
use tracing::{info, warn};

pub use accounts::accounts;
pub use import::import;
pub use init::init;
pub use labels::labels;
pub use mappings::mappings;
pub use submit::submit;

/// The output type for a command: a message for the user and, optionally, structured data.
#[derive(Debug, Clone, Serialize)]
pub struct Out<T>
where
    T: Serialize + Clone + Debug,
{
    /// A message that can be printed to the user regarding the outcome of the command execution.
    message: String,

    /// Any structured data that needs to be output from the call.
    structure: Option<T>,
}

impl<T, S> From<S> for Out<T>
where
    T: Debug + Clone + Serialize,
    S: Into<String>,
{
    fn from(value: S) -> Self {
        Out::new_message(value)
    }
}

impl<T> Out<T>
where
    T: Serialize + Clone + Debug,
{
    /// Create a new `Out` object that has `Some(structure)`.
    pub fn new<S>(message: S, structure: T) -> Self
    where
        S: Into<String>,
    {
        Self {
            message: message.into(),
            structure: Some(structure),
        }
    }

    /// Create a new `Out` object that has `None` for `structure`.
    pub fn new_message<S>(message: S) -> Self
    where
        S: Into<String>,
    {
        Self {
            message: message.into(),
            structure: None,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn structure(&self) -> Option<&T> {
        self.structure.as_ref()
    }

    /// Logs the message with `info!` and prints the structured data, if any, as pretty JSON to
    /// stdout so that it can be redirected to a file.
    pub fn print(&self) {
        info!("{}", self.message);
        if let Some(structure) = self.structure() {
            match serde_json::to_string_pretty(structure) {
                Ok(json) => println!("{json}"),
                Err(e) => warn!("Unable to serialize the command output: {e}"),
            }
        }
    }
}

/// Opens the mapping store, or logs why it could not be opened and returns `None`.
async fn open_store_or_degrade(config: &Config) -> Option<Db> {
    match config.open_store().await {
        Ok(db) => Some(db),
        Err(e) => {
            warn!("Continuing without learned mappings: {e:#}");
            None
        }
    }
}
