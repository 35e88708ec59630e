//! Types that represent the core data model, such as `Transaction` and `NameMapping`.
mod account;
mod amount;
mod mapping;
mod transaction;

pub use account::{Account, Label, Labels};
pub use amount::{Amount, AmountError};
pub use mapping::{NameMapping, NameMappings};
pub use transaction::{Status, Transaction, TransactionType};
