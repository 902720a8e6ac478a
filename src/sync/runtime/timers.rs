use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use crate::sync::engine::TimerTask;

/// Where "now" comes from.
#[derive(Debug, Clone, Copy)]
pub enum Clock {
    /// Wall clock anchored at queue creation.
    Real(Instant),
    /// Advanced only by `advance_to_next`. Used by tests and dry runs.
    Virtual(Duration),
}

/// Delay-ordered task queue.
///
/// Deadlines are offsets from the queue's origin. Tasks due at the same
/// instant fire in the order they were scheduled.
#[derive(Debug)]
pub struct TimerQueue {
    clock: Clock,
    seq: u64,
    tasks: BTreeMap<(Duration, u64), TimerTask>,
}

impl TimerQueue {
    pub fn real() -> Self {
        Self::with_clock(Clock::Real(Instant::now()))
    }

    pub fn manual() -> Self {
        Self::with_clock(Clock::Virtual(Duration::ZERO))
    }

    fn with_clock(clock: Clock) -> Self {
        Self {
            clock,
            seq: 0,
            tasks: BTreeMap::new(),
        }
    }

    pub fn now(&self) -> Duration {
        match self.clock {
            Clock::Real(origin) => origin.elapsed(),
            Clock::Virtual(now) => now,
        }
    }

    /// Instant at which `offset` is due, for real-time sleeping.
    pub fn deadline(&self, offset: Duration) -> Option<Instant> {
        match self.clock {
            Clock::Real(origin) => Some(origin + offset),
            Clock::Virtual(_) => None,
        }
    }

    pub fn schedule(&mut self, after: Duration, task: TimerTask) {
        let due = self.now() + after;
        self.seq += 1;
        self.tasks.insert((due, self.seq), task);
    }

    pub fn next_due(&self) -> Option<Duration> {
        self.tasks.keys().next().map(|(due, _)| *due)
    }

    /// Removes and returns every task due at or before now.
    pub fn pop_due(&mut self) -> Vec<TimerTask> {
        let now = self.now();
        let mut fired = Vec::new();

        while let Some(entry) = self.tasks.first_entry() {
            if entry.key().0 > now {
                break;
            }
            fired.push(entry.remove());
        }
        fired
    }

    /// Virtual clock only: jumps to the earliest deadline and pops the tasks due then.
    pub fn advance_to_next(&mut self) -> Vec<TimerTask> {
        if let (Clock::Virtual(now), Some(due)) = (&mut self.clock, self.tasks.keys().next()) {
            *now = (*now).max(due.0);
        }
        self.pop_due()
    }

    pub fn clear(&mut self) {
        self.tasks.clear();
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}
