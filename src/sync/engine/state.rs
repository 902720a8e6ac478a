use crate::ledger::TransactionRecord;
use crate::settings::SyncPolicy;
use crate::sync::engine::types::{ItemState, SessionId};

#[derive(Debug, Clone)]
pub struct SyncItem {
    pub record: TransactionRecord,
    pub state: ItemState,
}

/// The ephemeral sync session. Never persisted.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: SessionId,
    pub items: Vec<SyncItem>,
}

impl Session {
    pub fn all_synchronized(&self) -> bool {
        self.items.iter().all(|i| i.state == ItemState::Synchronized)
    }
}

#[derive(Debug)]
pub struct EngineState {
    pub policy: SyncPolicy,

    /// At most one live session
    pub session: Option<Session>,

    pub next_session: SessionId,
}
