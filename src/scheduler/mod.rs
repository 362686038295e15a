//! Polling mechanisms.
//!
//! Both mechanisms drive the same [`FeedCycle`]: the periodic poller hands it
//! to the platform job host, the foreground session runs it from its own
//! fixed-delay loop. The active-service registry decides which one may run.

pub mod cycle;
pub mod foreground;
pub mod outcome;
pub mod periodic;

pub use cycle::FeedCycle;
pub use foreground::{ForegroundSession, SessionState};
pub use outcome::{CycleOutcome, CycleReport};
pub use periodic::{POLLING_JOB_NAME, PeriodicPoller, PollerState};
