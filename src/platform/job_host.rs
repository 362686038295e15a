//! Periodic background jobs.
//!
//! [`JobHost`] mirrors what a mobile OS offers for recurring background work:
//! unique named jobs, a fixed interval, a network constraint and a backoff
//! policy applied when a run asks to be retried. [`TokioJobHost`] implements
//! it in-process with one tokio task per job name.

use crate::error::{NotifyError, Result};
use crate::scheduler::outcome::CycleOutcome;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Work executed on every fire of a periodic job.
#[async_trait]
pub trait JobRunner: Send + Sync {
    /// Run once. `cancel` fires when the job is cancelled or replaced.
    async fn run(&self, cancel: CancellationToken) -> CycleOutcome;
}

/// Delay applied after a run reports [`CycleOutcome::Retry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackoffPolicy {
    /// `initial * attempt`.
    Linear(Duration),
}

impl BackoffPolicy {
    /// Delay before retry number `attempt` (1-based).
    #[must_use]
    pub fn delay(self, attempt: u32) -> Duration {
        let attempt = attempt.max(1);
        match self {
            Self::Linear(initial) => initial.saturating_mul(attempt),
        }
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::Linear(Duration::from_secs(30))
    }
}

/// What to do when a job with the same name already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExistingJobPolicy {
    /// Leave the running job untouched.
    Keep,
    /// Replace it with the new definition.
    Update,
}

/// Definition of a unique periodic job.
#[derive(Clone)]
pub struct PeriodicJobSpec {
    pub name: String,
    pub interval: Duration,
    pub requires_network: bool,
    pub backoff: BackoffPolicy,
    pub runner: Arc<dyn JobRunner>,
}

impl std::fmt::Debug for PeriodicJobSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PeriodicJobSpec")
            .field("name", &self.name)
            .field("interval", &self.interval)
            .field("requires_network", &self.requires_network)
            .field("backoff", &self.backoff)
            .finish_non_exhaustive()
    }
}

/// Host-side scheduler for recurring background work.
///
/// A host never runs two fires of the same job name concurrently.
pub trait JobHost: Send + Sync {
    fn schedule_periodic(&self, spec: PeriodicJobSpec, policy: ExistingJobPolicy) -> Result<()>;

    /// Cancel a job. Unknown names are ignored.
    fn cancel(&self, name: &str) -> Result<()>;

    /// Whether the job will fire again.
    fn is_scheduled(&self, name: &str) -> bool;
}

struct JobHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// In-process [`JobHost`] driven by tokio timers.
///
/// The first fire happens immediately. `Success` waits the interval, `Retry`
/// waits the backoff delay (capped at `max_backoff`), `FatalFailure`
/// suspends the job until it is scheduled again. The network constraint is
/// assumed satisfied.
pub struct TokioJobHost {
    jobs: Mutex<HashMap<String, JobHandle>>,
    max_backoff: Duration,
}

impl Default for TokioJobHost {
    fn default() -> Self {
        Self::new(Duration::from_secs(3600))
    }
}

impl TokioJobHost {
    #[must_use]
    pub fn new(max_backoff: Duration) -> Self {
        Self {
            jobs: Mutex::new(HashMap::new()),
            max_backoff,
        }
    }

    fn lock_jobs(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, JobHandle>>> {
        self.jobs
            .lock()
            .map_err(|_| NotifyError::Scheduler("job table lock poisoned".to_owned()))
    }
}

impl JobHost for TokioJobHost {
    fn schedule_periodic(&self, spec: PeriodicJobSpec, policy: ExistingJobPolicy) -> Result<()> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| NotifyError::Scheduler(format!("no tokio runtime for job host: {e}")))?;

        let mut jobs = self.lock_jobs()?;
        if let Some(existing) = jobs.get(&spec.name) {
            if policy == ExistingJobPolicy::Keep && !existing.task.is_finished() {
                debug!(job = %spec.name, "job already scheduled; keeping it");
                return Ok(());
            }
        }
        let previous = jobs.remove(&spec.name).map(|previous| {
            previous.cancel.cancel();
            debug!(job = %spec.name, "replacing scheduled job");
            previous.task
        });

        if spec.requires_network {
            debug!(job = %spec.name, "network constraint assumed satisfied");
        }
        info!(
            job = %spec.name,
            interval_secs = spec.interval.as_secs(),
            "periodic job scheduled"
        );

        let cancel = CancellationToken::new();
        let name = spec.name.clone();
        let task = runtime.spawn(drive(spec, cancel.clone(), self.max_backoff, previous));
        jobs.insert(name, JobHandle { cancel, task });
        Ok(())
    }

    fn cancel(&self, name: &str) -> Result<()> {
        if let Some(handle) = self.lock_jobs()?.remove(name) {
            handle.cancel.cancel();
            info!(job = name, "periodic job cancelled");
        }
        Ok(())
    }

    fn is_scheduled(&self, name: &str) -> bool {
        self.jobs.lock().is_ok_and(|jobs| {
            jobs.get(name)
                .is_some_and(|h| !h.cancel.is_cancelled() && !h.task.is_finished())
        })
    }
}

impl Drop for TokioJobHost {
    fn drop(&mut self) {
        if let Ok(jobs) = self.jobs.get_mut() {
            for handle in jobs.values() {
                handle.cancel.cancel();
            }
        }
    }
}

/// Fire loop of one job. A replaced job's loop is awaited first so fires of
/// the same name never overlap.
async fn drive(
    spec: PeriodicJobSpec,
    cancel: CancellationToken,
    max_backoff: Duration,
    previous: Option<JoinHandle<()>>,
) {
    if let Some(previous) = previous {
        let _ = previous.await;
    }

    let mut attempt: u32 = 0;
    loop {
        if cancel.is_cancelled() {
            break;
        }

        let outcome = spec.runner.run(cancel.child_token()).await;
        let delay = match outcome {
            CycleOutcome::Success => {
                attempt = 0;
                spec.interval
            }
            CycleOutcome::Retry => {
                attempt = attempt.saturating_add(1);
                let delay = spec.backoff.delay(attempt).min(max_backoff);
                warn!(job = %spec.name, attempt, delay_secs = delay.as_secs(), "job will retry");
                delay
            }
            CycleOutcome::FatalFailure => {
                error!(job = %spec.name, "job failed; suspended until rescheduled");
                return;
            }
        };

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(delay) => {}
        }
    }
    debug!(job = %spec.name, "job loop stopped");
}
