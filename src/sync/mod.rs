pub mod engine;
pub mod runtime;
pub mod source;

pub use engine::{ItemState, SyncEngine, SyncProgress};
pub use runtime::{SyncOrchestrator, TimerQueue};
pub use source::{OfflineSource, TransactionFeed};
