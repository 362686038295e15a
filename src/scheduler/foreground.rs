//! Long-lived fixed-delay polling loop.
//!
//! While the session is active a single tokio task runs a cycle, then sleeps
//! for the interval, indefinitely. Starting again replaces the loop: the old
//! one is cancelled and the new one waits for it to finish before its first
//! cycle, so two cycles never overlap.

use super::cycle::FeedCycle;
use crate::config::{ForegroundConfig, PollingConfig};
use crate::delivery::dispatcher::STATUS_NOTIFICATION_ID;
use crate::delivery::{ChannelSpec, Importance};
use crate::error::{NotifyError, Result};
use crate::platform::{NotificationRenderer, StatusNotification};
use crate::registry::{ActiveService, ServiceMechanism, ServiceRegistry};
use crate::store::PollingSettings;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Stopped,
    Active,
}

struct ActiveLoop {
    cancel: CancellationToken,
    task: JoinHandle<()>,
    config: PollingConfig,
}

pub struct ForegroundSession {
    registry: Arc<ServiceRegistry>,
    settings: PollingSettings,
    cycle: Arc<FeedCycle>,
    renderer: Arc<dyn NotificationRenderer>,
    config: ForegroundConfig,
    active: Mutex<Option<ActiveLoop>>,
}

impl ForegroundSession {
    /// Create the session and attach it to the registry as the foreground mechanism.
    pub fn new(
        registry: Arc<ServiceRegistry>,
        settings: PollingSettings,
        cycle: Arc<FeedCycle>,
        renderer: Arc<dyn NotificationRenderer>,
        config: ForegroundConfig,
    ) -> Arc<Self> {
        let session = Arc::new(Self {
            registry: Arc::clone(&registry),
            settings,
            cycle,
            renderer,
            config,
            active: Mutex::new(None),
        });
        let hook: Arc<dyn ServiceMechanism> = session.clone();
        registry.attach(ActiveService::ForegroundSession, Arc::downgrade(&hook));
        session
    }

    /// Activate the session with `config`, superseding any running loop.
    ///
    /// `channel_id` overrides the channel of the status notification. The
    /// status notification is posted before the registry is touched, so a
    /// failed start leaves the previous mechanism running.
    pub fn start(&self, config: PollingConfig, channel_id: Option<String>) -> Result<()> {
        let runtime = current_runtime()?;
        self.show_status(&config, channel_id)?;
        if let Err(e) = self.activate(&config) {
            if self.state() == SessionState::Stopped {
                if let Err(clear) = self.renderer.clear_status(STATUS_NOTIFICATION_ID) {
                    warn!("cannot clear status notification: {clear}");
                }
            }
            return Err(e);
        }
        self.spawn_loop(&runtime, config)
    }

    /// Stop the loop and remove the status notification.
    ///
    /// The slot and the enabled flag are cleared only when the session held
    /// the slot; another active mechanism keeps its persisted state.
    pub fn stop(&self) -> Result<()> {
        self.halt()?;
        if self.registry.release(ActiveService::ForegroundSession)? {
            self.settings.set_polling_enabled(false)?;
            info!("foreground notification session stopped");
        } else {
            debug!("foreground session was not the active service");
        }
        Ok(())
    }

    /// Relaunch the loop after a restart when the session was the active service.
    pub fn restore(&self) -> Result<bool> {
        if self.registry.get_active()? != ActiveService::ForegroundSession {
            return Ok(false);
        }
        let Some(config) = self.settings.load_config()? else {
            warn!("foreground session active but no usable configuration persisted");
            return Ok(false);
        };
        let runtime = current_runtime()?;
        self.show_status(&config, None)?;
        self.spawn_loop(&runtime, config)?;
        Ok(true)
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        match self.active.lock() {
            Ok(active) if active.as_ref().is_some_and(|l| !l.task.is_finished()) => {
                SessionState::Active
            }
            _ => SessionState::Stopped,
        }
    }

    /// Configuration of the running loop.
    #[must_use]
    pub fn current_config(&self) -> Option<PollingConfig> {
        self.active
            .lock()
            .ok()
            .and_then(|active| active.as_ref().map(|l| l.config.clone()))
    }

    fn activate(&self, config: &PollingConfig) -> Result<()> {
        self.registry.set_active(ActiveService::ForegroundSession)?;
        self.settings.save_config(config)
    }

    fn spawn_loop(&self, runtime: &Handle, config: PollingConfig) -> Result<()> {
        let mut active = self.lock_active()?;
        let previous = active.take().map(|prev| {
            prev.cancel.cancel();
            debug!("superseding running foreground loop");
            prev.task
        });

        let cancel = CancellationToken::new();
        let task = runtime.spawn(run_loop(
            Arc::clone(&self.cycle),
            Arc::clone(&self.registry),
            config.feed_url.clone(),
            config.interval(),
            cancel.clone(),
            previous,
        ));
        info!(
            url = %config.feed_url,
            interval_minutes = config.interval_minutes,
            "foreground notification session started"
        );
        *active = Some(ActiveLoop {
            cancel,
            task,
            config,
        });
        Ok(())
    }

    fn show_status(&self, config: &PollingConfig, channel_id: Option<String>) -> Result<()> {
        let channel_id = channel_id.unwrap_or_else(|| self.config.status_channel_id.clone());
        let channel = ChannelSpec::new(&channel_id, self.config.status_title.clone(), Importance::Low)
            .with_description("Channel for notification service")
            .with_sound(false)
            .with_vibration(false);
        self.renderer.create_channel(&channel)?;
        self.renderer.show_status(&StatusNotification {
            id: STATUS_NOTIFICATION_ID,
            channel_id,
            title: self.config.status_title.clone(),
            text: format!(
                "Checking for notifications every {} minutes",
                config.interval_minutes
            ),
        })
    }

    /// Cancel the loop and clear the status notification.
    fn halt(&self) -> Result<()> {
        let previous = self.lock_active()?.take();
        if let Some(prev) = previous {
            prev.cancel.cancel();
            debug!("foreground loop cancelled");
        }
        self.renderer.clear_status(STATUS_NOTIFICATION_ID)
    }

    fn lock_active(&self) -> Result<std::sync::MutexGuard<'_, Option<ActiveLoop>>> {
        self.active
            .lock()
            .map_err(|_| NotifyError::Scheduler("foreground session lock poisoned".to_owned()))
    }
}

fn current_runtime() -> Result<Handle> {
    Handle::try_current().map_err(|e| {
        NotifyError::Scheduler(format!("no tokio runtime for foreground session: {e}"))
    })
}

impl ServiceMechanism for ForegroundSession {
    fn deactivate(&self) -> Result<()> {
        self.halt()
    }
}

async fn run_loop(
    cycle: Arc<FeedCycle>,
    registry: Arc<ServiceRegistry>,
    url: Url,
    interval: Duration,
    cancel: CancellationToken,
    previous: Option<JoinHandle<()>>,
) {
    if let Some(previous) = previous {
        let _ = previous.await;
    }

    loop {
        if cancel.is_cancelled() {
            break;
        }

        let report = cycle
            .run_as(&registry, ActiveService::ForegroundSession, &url, &cancel)
            .await;
        if let Some(error) = report.error {
            warn!(outcome = %report.outcome, "foreground cycle failed: {error}");
        }

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }
    }
    debug!(%url, "foreground loop exited");
}
