//! Transaction history and reconciliation for a crypto point-of-sale terminal.

pub mod builder;
pub mod context;
pub mod error;
pub mod gateway;
pub mod ledger;
pub mod notice;
pub mod persistence;
pub mod settings;
pub mod sync;

pub use context::{AppContext, ContextParts, LedgerEvent, Submitted};
pub use error::{Severity, StoreError, TxError, WalletError};
pub use ledger::{LedgerStore, TransactionRecord};
pub use notice::Notice;
