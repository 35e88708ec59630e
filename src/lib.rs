//! Imports bank statements into a Firefly III ledger.
//!
//! A statement, either a CSV export or an image that is read by a vision model, is parsed into
//! candidate transactions. Descriptions learned from earlier submits are suggested, rows that the
//! ledger already holds are skipped, and the rest are attached to the account the statement
//! belongs to. The user reviews that batch and then submits it.

pub mod api;
pub mod args;
pub mod commands;
mod config;
pub mod db;
mod error;
pub mod model;
pub mod parser;
pub mod pipeline;
pub mod submit;
mod utils;

#[cfg(test)]
mod test;

pub use api::Mode;
pub use config::{Config, Credentials, Settings};
pub use error::{Error, ImportError, Result, Secret};
