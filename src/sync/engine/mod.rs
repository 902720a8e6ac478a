//! Offline batch reconciliation engine.
//!
//! This module implements the **Functional Core** of the sync subsystem.
//! It acts as a pure state machine:
//! - **Input**: `SyncEvent` (sync requested, a timer fired, the view was dismissed).
//! - **Output**: `Vec<SyncCommand>` (timers to schedule, progress to publish, batches to merge).
//!
//! # Architecture guarantees
//! * **No IO**: The engine never touches the ledger or the snapshot; merges are commands.
//! * **No Timers**: Delays are requested through `SyncCommand::Schedule` and come back as events.
//! * **Deterministic**: Given the same policy and sequence of events, the output is always identical.

mod logic;
pub mod state;
pub mod types;


pub use crate::sync::engine::types::{
    ItemState, SessionId, SyncCommand, SyncEvent, SyncProgress, TimerTask,
};

use crate::settings::SyncPolicy;

use state::EngineState;

/// Drives each candidate through `pending -> syncing -> synchronized`
/// and decides when the session is merged.
#[derive(Debug)]
pub struct SyncEngine {
    state: EngineState,
}

impl SyncEngine {
    pub fn new(policy: SyncPolicy) -> Self {
        Self {
            state: EngineState {
                policy,
                session: None,
                next_session: 1,
            },
        }
    }

    /// Consumes an event and returns the commands the orchestrator must execute.
    pub fn handle_event(&mut self, event: SyncEvent) -> Vec<SyncCommand> {
        match event {
            SyncEvent::Initiate { candidates } => logic::on_initiate(&mut self.state, candidates),
            SyncEvent::TimerFired(task) => logic::on_timer(&mut self.state, task),
            SyncEvent::Dismissed => logic::on_dismissed(&mut self.state),
        }
    }

    pub fn policy(&self) -> &SyncPolicy {
        &self.state.policy
    }

    pub fn is_active(&self) -> bool {
        self.state.session.is_some()
    }

    /// Per-item states of the live session, in candidate order.
    pub fn snapshot(&self) -> Vec<(String, ItemState)> {
        self.state
            .session
            .iter()
            .flat_map(|s| s.items.iter())
            .map(|i| (i.record.hash.clone(), i.state))
            .collect()
    }
}
