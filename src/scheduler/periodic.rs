//! Host-scheduled periodic polling.

use super::cycle::FeedCycle;
use super::outcome::CycleOutcome;
use crate::config::{PollingConfig, PollingPolicyConfig};
use crate::error::Result;
use crate::platform::{BackoffPolicy, ExistingJobPolicy, JobHost, JobRunner, PeriodicJobSpec};
use crate::registry::{ActiveService, ServiceMechanism, ServiceRegistry};
use crate::store::PollingSettings;
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

/// Unique name of the polling job.
pub const POLLING_JOB_NAME: &str = "notification_polling_worker";

/// Lifecycle of the periodic job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerState {
    Idle,
    Scheduled,
    Running,
}

/// Owns the periodic polling job and its persisted configuration.
pub struct PeriodicPoller {
    job_host: Arc<dyn JobHost>,
    registry: Arc<ServiceRegistry>,
    settings: PollingSettings,
    cycle: Arc<FeedCycle>,
    policy: PollingPolicyConfig,
    running: Arc<AtomicBool>,
}

impl PeriodicPoller {
    /// Create the poller and attach it to the registry as the polling mechanism.
    pub fn new(
        job_host: Arc<dyn JobHost>,
        registry: Arc<ServiceRegistry>,
        settings: PollingSettings,
        cycle: Arc<FeedCycle>,
        policy: PollingPolicyConfig,
    ) -> Arc<Self> {
        let poller = Arc::new(Self {
            job_host,
            registry: Arc::clone(&registry),
            settings,
            cycle,
            policy,
            running: Arc::new(AtomicBool::new(false)),
        });
        let hook: Arc<dyn ServiceMechanism> = poller.clone();
        registry.attach(ActiveService::Polling, Arc::downgrade(&hook));
        poller
    }

    /// Make polling the active service, persist `config` and (re)register the job.
    pub fn start(&self, config: &PollingConfig) -> Result<()> {
        self.registry.set_active(ActiveService::Polling)?;
        self.settings.save_config(config)?;
        self.schedule(config, ExistingJobPolicy::Update)?;
        info!(url = %config.feed_url, interval_minutes = config.interval_minutes, "notification polling started");
        Ok(())
    }

    /// Cancel the job and, when polling held the registry slot, release it
    /// and clear the enabled flag.
    ///
    /// Safe to call at any time; an in-flight cycle sees its token fire.
    pub fn stop(&self) -> Result<()> {
        self.job_host.cancel(POLLING_JOB_NAME)?;
        if self.registry.release(ActiveService::Polling)? {
            self.settings.set_polling_enabled(false)?;
            info!("notification polling stopped");
        } else {
            debug!("polling was not the active service");
        }
        Ok(())
    }

    /// Re-register the job after a process restart.
    ///
    /// Returns `true` when polling was enabled and active and a job was
    /// scheduled from the persisted configuration.
    pub fn restore(&self) -> Result<bool> {
        if !self.settings.polling_enabled()?
            || self.registry.get_active()? != ActiveService::Polling
        {
            return Ok(false);
        }
        let Some(config) = self.settings.load_config()? else {
            warn!("polling enabled but no usable configuration persisted");
            return Ok(false);
        };
        self.schedule(&config, ExistingJobPolicy::Update)?;
        info!(url = %config.feed_url, "notification polling restored");
        Ok(true)
    }

    #[must_use]
    pub fn state(&self) -> PollerState {
        if self.running.load(Ordering::SeqCst) {
            PollerState::Running
        } else if self.job_host.is_scheduled(POLLING_JOB_NAME) {
            PollerState::Scheduled
        } else {
            PollerState::Idle
        }
    }

    /// Interval actually requested from the host, raised to the host minimum.
    #[must_use]
    pub fn effective_interval(&self, config: &PollingConfig) -> Duration {
        let minutes = config
            .interval_minutes
            .max(self.policy.min_interval_minutes);
        if minutes != config.interval_minutes {
            debug!(
                requested = config.interval_minutes,
                applied = minutes,
                "polling interval raised to host minimum"
            );
        }
        Duration::from_secs(u64::from(minutes) * 60)
    }

    fn schedule(&self, config: &PollingConfig, policy: ExistingJobPolicy) -> Result<()> {
        let job = PollingJob {
            cycle: Arc::clone(&self.cycle),
            registry: Arc::clone(&self.registry),
            url: config.feed_url.clone(),
            running: Arc::clone(&self.running),
        };
        self.job_host.schedule_periodic(
            PeriodicJobSpec {
                name: POLLING_JOB_NAME.to_owned(),
                interval: self.effective_interval(config),
                requires_network: true,
                backoff: BackoffPolicy::Linear(Duration::from_secs(self.policy.retry_backoff_secs)),
                runner: Arc::new(job),
            },
            policy,
        )
    }
}

impl ServiceMechanism for PeriodicPoller {
    fn deactivate(&self) -> Result<()> {
        self.job_host.cancel(POLLING_JOB_NAME)
    }
}

/// What the host runs on each fire; carries the url it was scheduled with.
struct PollingJob {
    cycle: Arc<FeedCycle>,
    registry: Arc<ServiceRegistry>,
    url: Url,
    running: Arc<AtomicBool>,
}

#[async_trait]
impl JobRunner for PollingJob {
    async fn run(&self, cancel: CancellationToken) -> CycleOutcome {
        self.running.store(true, Ordering::SeqCst);
        let report = self
            .cycle
            .run_as(&self.registry, ActiveService::Polling, &self.url, &cancel)
            .await;
        self.running.store(false, Ordering::SeqCst);
        report.outcome
    }
}
