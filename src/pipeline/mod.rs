//! The import pipeline: candidates from a parser get learned-mapping suggestions, are checked
//! against the ledger for duplicates and finally have the local account filled in.
//!
//! ```text
//! parse -> apply_mappings -> filter (against a Snapshot) -> classify
//! ```
mod classify;
mod dedupe;
mod importer;
mod suggest;

pub use classify::classify;
pub use dedupe::{filter, fingerprint, Fingerprint, Snapshot};
pub use importer::{AccountId, Importer, Source, Summary};
pub use suggest::apply_mappings;
