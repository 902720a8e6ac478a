use std::time::Duration;

use crate::ledger::TransactionRecord;
use crate::settings::{DismissBehavior, MergeTrigger};
use crate::sync::engine::state::{EngineState, Session, SyncItem};
use crate::sync::engine::types::{ItemState, SessionId, SyncCommand, SyncProgress, TimerTask};

/// Delay scaled by the 1-based position of the item.
fn staggered(base: Duration, index: usize) -> Duration {
    let factor = u32::try_from(index + 1).unwrap_or(u32::MAX);
    base.saturating_mul(factor)
}

pub fn on_initiate(state: &mut EngineState, candidates: Vec<TransactionRecord>) -> Vec<SyncCommand> {
    let mut cmds = Vec::new();
    if let Some(old) = state.session.take() {
        log::info!("[SYNC] session {} replaced by a new sync request", old.id);
        cmds.push(SyncCommand::Report(SyncProgress::Aborted { session: old.id }));
    }

    if candidates.is_empty() {
        log::info!("[SYNC] no pending items");
        cmds.push(SyncCommand::Report(SyncProgress::NothingPending));
        return cmds;
    }

    let id = state.next_session;
    state.next_session += 1;

    log::info!("[SYNC] session {}: {} candidates", id, candidates.len());

    cmds.push(SyncCommand::Report(SyncProgress::Started {
        session: id,
        hashes: candidates.iter().map(|r| r.hash.clone()).collect(),
    }));

    for index in 0..candidates.len() {
        cmds.push(SyncCommand::Schedule {
            after: staggered(state.policy.syncing_stagger, index),
            task: TimerTask::Advance { session: id, index },
        });
    }

    if state.policy.merge_trigger == MergeTrigger::Timeout {
        cmds.push(SyncCommand::Schedule {
            after: state.policy.merge_timeout,
            task: TimerTask::Deadline { session: id },
        });
    }

    state.session = Some(Session {
        id,
        items: candidates
            .into_iter()
            .map(|record| SyncItem {
                record,
                state: ItemState::Pending,
            })
            .collect(),
    });

    cmds
}

pub fn on_timer(state: &mut EngineState, task: TimerTask) -> Vec<SyncCommand> {
    let live = state.session.as_ref().map(|s| s.id);
    if live != Some(task.session()) {
        log::trace!("[SYNC] stale timer {:?} ignored", task);
        return Vec::new();
    }

    match task {
        TimerTask::Advance { session, index } => on_advance(state, session, index),
        TimerTask::Deadline { session } => {
            log::debug!("[SYNC] session {} deadline reached", session);
            merge_session(state)
        }
    }
}

fn on_advance(state: &mut EngineState, session: SessionId, index: usize) -> Vec<SyncCommand> {
    let policy = state.policy.clone();
    let Some(s) = state.session.as_mut() else {
        return Vec::new();
    };
    let Some(item) = s.items.get_mut(index) else {
        log::warn!("[SYNC] timer for unknown item {} in session {}", index, session);
        return Vec::new();
    };
    let Some(next) = item.state.next() else {
        return Vec::new();
    };

    item.state = next;
    log::debug!("[SYNC] session {} item {} -> {:?}", session, index, next);

    let mut cmds = vec![SyncCommand::Report(SyncProgress::Item {
        session,
        index,
        hash: item.record.hash.clone(),
        state: next,
    })];

    match next {
        ItemState::Syncing => {
            // Synchronized lands at confirm_stagger * (index + 1) from session start.
            let remaining = staggered(policy.confirm_stagger, index)
                .saturating_sub(staggered(policy.syncing_stagger, index));
            cmds.push(SyncCommand::Schedule {
                after: remaining,
                task: TimerTask::Advance { session, index },
            });
        }
        ItemState::Synchronized => {
            if policy.merge_trigger == MergeTrigger::AllSynchronized && s.all_synchronized() {
                cmds.extend(merge_session(state));
            }
        }
        ItemState::Pending => {}
    }

    cmds
}

fn merge_session(state: &mut EngineState) -> Vec<SyncCommand> {
    let Some(session) = state.session.take() else {
        return Vec::new();
    };

    for (index, item) in session.items.iter().enumerate() {
        if item.state != ItemState::Synchronized {
            log::warn!(
                "[SYNC] session {} item {} ({}) merged while still {:?}",
                session.id,
                index,
                item.record.hash,
                item.state
            );
        }
    }

    vec![SyncCommand::Merge {
        session: session.id,
        records: session.items.into_iter().map(|i| i.record).collect(),
    }]
}

pub fn on_dismissed(state: &mut EngineState) -> Vec<SyncCommand> {
    match state.policy.on_dismiss {
        DismissBehavior::Continue => {
            if let Some(s) = &state.session {
                log::debug!("[SYNC] view dismissed, session {} continues in background", s.id);
            }
            Vec::new()
        }
        DismissBehavior::Abort => match state.session.take() {
            Some(s) => {
                log::info!("[SYNC] session {} aborted, {} items left unmerged", s.id, s.items.len());
                vec![SyncCommand::Report(SyncProgress::Aborted { session: s.id })]
            }
            None => Vec::new(),
        },
    }
}
