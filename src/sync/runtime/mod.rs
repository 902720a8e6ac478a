pub mod orchestrator;
pub mod timers;


pub use orchestrator::SyncOrchestrator;
pub use timers::{Clock, TimerQueue};
