//! Transaction records and the durable, deduplicated ledger.

pub mod record;
pub mod store;

pub use record::{filter_unseen, TransactionRecord};
pub use store::{Commit, LedgerStore};
