use std::time::Duration;

use crate::ledger::TransactionRecord;

pub type SessionId = u64;

/// Lifecycle of one candidate inside a sync session.
///
/// Only `Pending -> Syncing -> Synchronized` is allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ItemState {
    Pending,
    Syncing,
    Synchronized,
}

impl ItemState {
    pub fn next(self) -> Option<ItemState> {
        match self {
            ItemState::Pending => Some(ItemState::Syncing),
            ItemState::Syncing => Some(ItemState::Synchronized),
            ItemState::Synchronized => None,
        }
    }
}

/// Work scheduled on the timer queue on behalf of the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TimerTask {
    /// Move item `index` one state forward.
    Advance { session: SessionId, index: usize },
    /// Overall session deadline.
    Deadline { session: SessionId },
}

impl TimerTask {
    pub fn session(&self) -> SessionId {
        match self {
            TimerTask::Advance { session, .. } | TimerTask::Deadline { session } => *session,
        }
    }
}

#[derive(Debug, Clone)]
pub enum SyncEvent {
    /// Start a session over candidates already filtered against the ledger.
    Initiate { candidates: Vec<TransactionRecord> },
    TimerFired(TimerTask),
    /// The sync view was closed.
    Dismissed,
}

#[derive(Debug, Clone)]
pub enum SyncCommand {
    Schedule { after: Duration, task: TimerTask },
    Report(SyncProgress),
    Merge {
        session: SessionId,
        records: Vec<TransactionRecord>,
    },
}

/// Progress notifications published to subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncProgress {
    NothingPending,
    Started {
        session: SessionId,
        hashes: Vec<String>,
    },
    Item {
        session: SessionId,
        index: usize,
        hash: String,
        state: ItemState,
    },
    Merged {
        session: SessionId,
        added: usize,
        warning: Option<String>,
    },
    Aborted { session: SessionId },
}

impl SyncProgress {
    /// True once the session will produce no further progress.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SyncProgress::NothingPending | SyncProgress::Merged { .. } | SyncProgress::Aborted { .. }
        )
    }
}
