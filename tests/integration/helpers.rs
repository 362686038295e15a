//! Shared helpers for integration tests.

use async_trait::async_trait;
use bytes::Bytes;
use notification_master::config::NotifierConfig;
use notification_master::delivery::{ChannelSpec, RenderRequest};
use notification_master::feed::FeedSource;
use notification_master::host::{HostCapabilities, NotificationPlugin};
use notification_master::platform::{ImageLoader, NotificationRenderer, StatusNotification, TokioJobHost};
use notification_master::store::{JsonFileStore, PollingSettings};
use notification_master::{NotifyError, Result};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;

/// Renderer that records every call.
#[derive(Default)]
pub(crate) struct RecordingRenderer {
    pub renders: Mutex<Vec<RenderRequest>>,
    pub channels: Mutex<Vec<ChannelSpec>>,
    pub statuses: Mutex<Vec<StatusNotification>>,
    pub cleared: Mutex<Vec<i32>>,
    pub denied: bool,
    pub status_fails: bool,
}

impl RecordingRenderer {
    pub(crate) fn denying() -> Self {
        Self {
            denied: true,
            ..Self::default()
        }
    }

    pub(crate) fn failing_status() -> Self {
        Self {
            status_fails: true,
            ..Self::default()
        }
    }

    pub(crate) fn renders(&self) -> Vec<RenderRequest> {
        self.renders.lock().expect("lock renders").clone()
    }

    pub(crate) fn titles(&self) -> Vec<String> {
        self.renders().into_iter().map(|r| r.title).collect()
    }
}

impl NotificationRenderer for RecordingRenderer {
    fn render(&self, request: &RenderRequest) -> Result<()> {
        if self.denied {
            return Err(NotifyError::Render("permission denied".to_owned()));
        }
        self.renders
            .lock()
            .expect("lock renders")
            .push(request.clone());
        Ok(())
    }

    fn create_channel(&self, channel: &ChannelSpec) -> Result<()> {
        self.channels
            .lock()
            .expect("lock channels")
            .push(channel.clone());
        Ok(())
    }

    fn permission_granted(&self) -> bool {
        !self.denied
    }

    fn request_permission(&self) -> Result<bool> {
        Ok(!self.denied)
    }

    fn show_status(&self, status: &StatusNotification) -> Result<()> {
        if self.status_fails {
            return Err(NotifyError::Render("status notification rejected".to_owned()));
        }
        self.statuses
            .lock()
            .expect("lock statuses")
            .push(status.clone());
        Ok(())
    }

    fn clear_status(&self, id: i32) -> Result<()> {
        self.cleared.lock().expect("lock cleared").push(id);
        Ok(())
    }
}

/// Images are never needed by the scripted tests.
pub(crate) struct NoImages;

#[async_trait]
impl ImageLoader for NoImages {
    async fn load(&self, url: &Url) -> Result<Bytes> {
        Err(NotifyError::Network {
            status: Some(404),
            message: format!("no image at {url}"),
        })
    }
}

/// Feed source that answers every fetch with the same body after `delay`
/// and records which urls were fetched and how many fetches overlapped.
pub(crate) struct ScriptedFeed {
    body: &'static str,
    delay: Duration,
    pub fetched: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl ScriptedFeed {
    pub(crate) fn new(body: &'static str) -> Self {
        Self::slow(body, Duration::ZERO)
    }

    pub(crate) fn slow(body: &'static str, delay: Duration) -> Self {
        Self {
            body,
            delay,
            fetched: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub(crate) fn fetched(&self) -> Vec<String> {
        self.fetched.lock().expect("lock fetched").clone()
    }

    pub(crate) fn fetches_of(&self, url: &str) -> usize {
        self.fetched().iter().filter(|u| u.as_str() == url).count()
    }
}

#[async_trait]
impl FeedSource for ScriptedFeed {
    async fn fetch(&self, url: &Url) -> Result<Bytes> {
        let _guard = InFlight::enter(&self.in_flight, &self.max_in_flight);
        self.fetched
            .lock()
            .expect("lock fetched")
            .push(url.to_string());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(Bytes::from_static(self.body.as_bytes()))
    }
}

/// Counts a fetch as in flight until dropped, including when cancelled.
struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize, max: &AtomicUsize) -> Self {
        let now = counter.fetch_add(1, Ordering::SeqCst) + 1;
        max.fetch_max(now, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// A plugin wired to recording fakes and a settings file in a temp dir.
pub(crate) struct Harness {
    pub plugin: Arc<NotificationPlugin>,
    pub renderer: Arc<RecordingRenderer>,
    pub feed: Arc<ScriptedFeed>,
    pub jobs: Arc<TokioJobHost>,
    pub dir: tempfile::TempDir,
}

impl Harness {
    pub(crate) fn new(feed: ScriptedFeed) -> Self {
        Self::with_renderer(feed, RecordingRenderer::default())
    }

    pub(crate) fn with_renderer(feed: ScriptedFeed, renderer: RecordingRenderer) -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        Self::in_dir(dir, Arc::new(feed), Arc::new(renderer))
    }

    /// Build a plugin over an existing settings directory, as after a restart.
    pub(crate) fn in_dir(
        dir: tempfile::TempDir,
        feed: Arc<ScriptedFeed>,
        renderer: Arc<RecordingRenderer>,
    ) -> Self {
        let jobs = Arc::new(TokioJobHost::default());
        let store = JsonFileStore::open(dir.path().join("settings.json")).expect("open store");
        let plugin = NotificationPlugin::new(
            &NotifierConfig::default(),
            HostCapabilities {
                renderer: renderer.clone(),
                images: Arc::new(NoImages),
                feed: feed.clone(),
                jobs: jobs.clone(),
                store: Arc::new(store),
            },
        );
        Self {
            plugin: Arc::new(plugin),
            renderer,
            feed,
            jobs,
            dir,
        }
    }

    pub(crate) fn settings_path(&self) -> PathBuf {
        self.dir.path().join("settings.json")
    }

    /// Settings as they are on disk right now.
    pub(crate) fn persisted(&self) -> PollingSettings {
        let store = JsonFileStore::open(self.settings_path()).expect("reopen store");
        PollingSettings::new(Arc::new(store))
    }
}

pub(crate) const EMPTY_FEED: &str = r#"{"notifications":[]}"#;
