use std::time::Instant;

use tokio::sync::broadcast;

use crate::ledger::{filter_unseen, LedgerStore};
use crate::settings::SyncPolicy;
use crate::sync::engine::{SyncCommand, SyncEngine, SyncEvent, SyncProgress};
use crate::sync::runtime::timers::TimerQueue;
use crate::sync::source::OfflineSource;

const PROGRESS_CAPACITY: usize = 256;

/// **SyncOrchestrator**
///
/// The **Imperative Shell** around the `SyncEngine`. It:
/// 1. **Filters** the offline source against the ledger and starts a session.
/// 2. **Owns the timer queue** and feeds fired timers back into the engine.
/// 3. **Executes side effects** emitted by the engine: scheduling, publishing
///    progress, and merging the finished batch into the ledger.
///
/// Everything runs on the caller's thread; the ledger is only mutated inside
/// `process_engine`, one merge per scheduling turn.
pub struct SyncOrchestrator {
    engine: SyncEngine,
    timers: TimerQueue,
    progress: broadcast::Sender<SyncProgress>,

    /// Start time for logging relative timestamps.
    t0: Instant,
}

impl SyncOrchestrator {
    pub fn new(policy: SyncPolicy, timers: TimerQueue) -> Self {
        let (progress, _) = broadcast::channel(PROGRESS_CAPACITY);
        Self {
            engine: SyncEngine::new(policy),
            timers,
            progress,
            t0: Instant::now(),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SyncProgress> {
        self.progress.subscribe()
    }

    pub fn engine(&self) -> &SyncEngine {
        &self.engine
    }

    pub fn is_idle(&self) -> bool {
        self.timers.is_empty() && !self.engine.is_active()
    }

    /// Starts a sync session. Returns the number of candidates.
    pub fn initiate(&mut self, source: &dyn OfflineSource, ledger: &mut LedgerStore) -> usize {
        let known = source.fetch_known_transactions();
        let candidates = filter_unseen(ledger.all(), &known);
        let count = candidates.len();

        self.info(&format!(
            "sync requested: {} known, {} not in ledger",
            known.len(),
            count
        ));

        // Any previous session is replaced; its timers go with it.
        self.timers.clear();
        self.process_engine(SyncEvent::Initiate { candidates }, ledger);
        count
    }

    /// The sync view was closed.
    pub fn dismiss(&mut self, ledger: &mut LedgerStore) {
        self.process_engine(SyncEvent::Dismissed, ledger);
        if !self.engine.is_active() {
            self.timers.clear();
        }
    }

    /// Fires every timer that is due now. Returns how many fired.
    pub fn fire_due(&mut self, ledger: &mut LedgerStore) -> usize {
        let due = self.timers.pop_due();
        let n = due.len();
        for task in due {
            self.process_engine(SyncEvent::TimerFired(task), ledger);
        }
        n
    }

    /// Sleeps through the timer queue until the session converges.
    pub async fn drive(&mut self, ledger: &mut LedgerStore) {
        while let Some(due) = self.timers.next_due() {
            match self.timers.deadline(due) {
                Some(at) => {
                    tokio::time::sleep_until(tokio::time::Instant::from_std(at)).await;
                    self.fire_due(ledger);
                }
                None => {
                    self.step(ledger);
                }
            }
        }
        self.debug("timer queue drained");
    }

    /// Fires the next batch of timers.
    ///
    /// A virtual clock jumps straight to the next deadline; a real clock only
    /// fires what is already due. Returns false when nothing fired.
    pub fn step(&mut self, ledger: &mut LedgerStore) -> bool {
        let fired = self.timers.advance_to_next();
        if fired.is_empty() {
            return false;
        }
        for task in fired {
            self.process_engine(SyncEvent::TimerFired(task), ledger);
        }
        true
    }

    /// Runs the timer queue to completion.
    ///
    /// Instant on a virtual clock. On a real clock the calling thread sleeps
    /// between deadlines; inside an async runtime use `drive` instead.
    pub fn run_until_idle(&mut self, ledger: &mut LedgerStore) {
        let mut sanity = 0;
        while let Some(due) = self.timers.next_due() {
            if !self.step(ledger) {
                if let Some(at) = self.timers.deadline(due) {
                    std::thread::sleep(at.saturating_duration_since(Instant::now()));
                }
            }

            sanity += 1;
            if sanity > 10_000 {
                log::warn!("[ORCH] run_until_idle exceeded 10000 iterations, breaking");
                break;
            }
        }
    }

    /// Feeds an event into the engine and executes all resulting commands.
    fn process_engine(&mut self, event: SyncEvent, ledger: &mut LedgerStore) {
        self.trace(&format!("engine.handle_event({:?})", event));

        let cmds = self.engine.handle_event(event);
        for cmd in cmds {
            self.execute_command(cmd, ledger);
        }
    }

    fn execute_command(&mut self, cmd: SyncCommand, ledger: &mut LedgerStore) {
        match cmd {
            SyncCommand::Schedule { after, task } => {
                self.trace(&format!("cmd: Schedule({:?} in {:?})", task, after));
                self.timers.schedule(after, task);
            }

            SyncCommand::Report(progress) => {
                self.trace(&format!("cmd: Report({:?})", progress));
                self.publish(progress);
            }

            SyncCommand::Merge { session, records } => {
                let commit = ledger.merge_batch(&records);
                self.info(&format!(
                    "session {} merged: {} new of {} candidates",
                    session,
                    commit.added.len(),
                    records.len()
                ));

                // The session is over; leftover item timers are meaningless.
                self.timers.clear();
                self.publish(SyncProgress::Merged {
                    session,
                    added: commit.added.len(),
                    warning: commit.warning.map(|e| e.to_string()),
                });
            }
        }
    }

    fn publish(&self, progress: SyncProgress) {
        // No subscribers is fine.
        let _ = self.progress.send(progress);
    }

    fn t(&self) -> u128 {
        self.t0.elapsed().as_millis()
    }

    fn info(&self, msg: &str) {
        log::info!("[ORCH] {:>6}ms: {}", self.t(), msg);
    }

    fn debug(&self, msg: &str) {
        log::debug!("[ORCH] {:>6}ms: {}", self.t(), msg);
    }

    fn trace(&self, msg: &str) {
        log::trace!("[ORCH] {:>6}ms: {}", self.t(), msg);
    }
}

// Helper methods for testing interaction
#[cfg(test)]
impl SyncOrchestrator {
    pub fn timers_mut(&mut self) -> &mut TimerQueue {
        &mut self.timers
    }
}
