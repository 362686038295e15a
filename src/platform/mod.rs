//! Platform capabilities the core consumes.
//!
//! The OS notification APIs, image fetching and background job scheduling
//! are reached only through the traits here. Each target supplies its own
//! adapter; [`create_renderer`] returns the one for the current build, which
//! on headless hosts is the tracing-only [`stub::LogRenderer`].

use crate::config::FeedConfig;
use crate::delivery::channels::ChannelSpec;
use crate::delivery::dispatcher::RenderRequest;
use crate::error::{NotifyError, Result};
use async_trait::async_trait;
use bytes::Bytes;
use url::Url;

pub mod job_host;
pub mod stub;

pub use job_host::{
    BackoffPolicy, ExistingJobPolicy, JobHost, JobRunner, PeriodicJobSpec, TokioJobHost,
};

/// Persistent "service running" notification shown by a foreground session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusNotification {
    pub id: i32,
    pub channel_id: String,
    pub title: String,
    pub text: String,
}

/// Native notification surface.
///
/// Rendering the same id twice updates the visible notification in place.
pub trait NotificationRenderer: Send + Sync {
    /// Post or update one notification.
    fn render(&self, request: &RenderRequest) -> Result<()>;

    /// Create or update a channel.
    fn create_channel(&self, channel: &ChannelSpec) -> Result<()>;

    /// Whether notifications may currently be posted.
    fn permission_granted(&self) -> bool;

    /// Ask the user for permission; returns the resulting grant state.
    fn request_permission(&self) -> Result<bool>;

    /// Show the ongoing status notification of a foreground session.
    fn show_status(&self, status: &StatusNotification) -> Result<()>;

    /// Remove a status notification by id.
    fn clear_status(&self, id: i32) -> Result<()>;
}

/// Fetches images for image-style notifications.
#[async_trait]
pub trait ImageLoader: Send + Sync {
    async fn load(&self, url: &Url) -> Result<Bytes>;
}

/// [`ImageLoader`] over `reqwest`, bounded by the feed timeouts.
#[derive(Clone)]
pub struct HttpImageLoader {
    client: reqwest::Client,
}

impl HttpImageLoader {
    /// # Errors
    ///
    /// Returns [`NotifyError::Config`] if the HTTP client cannot be built.
    pub fn new(config: &FeedConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout())
            .read_timeout(config.read_timeout())
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| NotifyError::Config(format!("cannot build image HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ImageLoader for HttpImageLoader {
    async fn load(&self, url: &Url) -> Result<Bytes> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| NotifyError::Network {
                status: None,
                message: format!("image request failed: {e}"),
            })?;
        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Network {
                status: Some(status.as_u16()),
                message: format!("image request to {url} failed"),
            });
        }
        response.bytes().await.map_err(|e| NotifyError::Network {
            status: None,
            message: format!("image body read failed: {e}"),
        })
    }
}

/// Create the renderer for the current platform.
#[must_use]
pub fn create_renderer() -> Box<dyn NotificationRenderer> {
    Box::new(stub::LogRenderer::default())
}
