//! Turns notifications into render calls.

use super::channels::{ChannelRegistry, ChannelSpec, Priority};
use crate::error::Result;
use crate::feed::NotificationRecord;
use crate::platform::{ImageLoader, NotificationRenderer};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicI32, Ordering};
use tracing::{debug, warn};
use url::Url;

/// Id of the ongoing status notification; never handed out by the counter.
pub const STATUS_NOTIFICATION_ID: i32 = 1001;

static NEXT_NOTIFICATION_ID: AtomicI32 = AtomicI32::new(1);

/// Next process-unique notification id (always > 0).
#[must_use]
pub fn next_notification_id() -> i32 {
    loop {
        let id = NEXT_NOTIFICATION_ID
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |id| {
                Some(if id == i32::MAX { 1 } else { id + 1 })
            })
            .unwrap_or(1);
        if id != STATUS_NOTIFICATION_ID {
            return id;
        }
    }
}

/// A tap action that opens an in-app route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationAction {
    pub title: String,
    pub route: String,
}

/// Progress of the image attached to an image-style notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageState {
    Pending,
    Loaded(Bytes),
    Failed,
}

/// Visual style of a render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderStyle {
    Plain,
    BigText(String),
    Image { url: String, state: ImageState },
    Actions(Vec<NotificationAction>),
}

impl RenderStyle {
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Plain => "plain",
            Self::BigText(_) => "big_text",
            Self::Image { .. } => "image",
            Self::Actions(_) => "actions",
        }
    }
}

/// One call into [`NotificationRenderer::render`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderRequest {
    pub id: i32,
    /// Resolved channel.
    pub channel_id: String,
    /// Channel the caller asked for, before resolution.
    pub channel_hint: Option<String>,
    pub title: String,
    pub message: String,
    pub style: RenderStyle,
    pub priority: Priority,
    pub auto_cancel: bool,
}

/// Content a caller wants shown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    Plain,
    BigText(String),
    Image(String),
    Actions(Vec<NotificationAction>),
}

/// A notification before id assignment and channel resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Explicit id; reusing one updates the existing notification.
    pub id: Option<i32>,
    pub title: String,
    pub message: String,
    pub channel_hint: Option<String>,
    pub priority: Priority,
    pub auto_cancel: bool,
    pub content: Content,
}

impl Notification {
    #[must_use]
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: None,
            title: title.into(),
            message: message.into(),
            channel_hint: None,
            priority: Priority::Default,
            auto_cancel: true,
            content: Content::Plain,
        }
    }

    #[must_use]
    pub fn with_content(mut self, content: Content) -> Self {
        self.content = content;
        self
    }

    #[must_use]
    pub fn with_channel(mut self, channel: Option<String>) -> Self {
        self.channel_hint = channel;
        self
    }
}

impl From<&NotificationRecord> for Notification {
    /// Image wins over expanded text; neither means plain.
    fn from(record: &NotificationRecord) -> Self {
        let content = match (&record.image_url, &record.expanded_text) {
            (Some(url), _) => Content::Image(url.clone()),
            (None, Some(text)) => Content::BigText(text.clone()),
            (None, None) => Content::Plain,
        };
        Self::new(record.title.clone(), record.message.clone())
            .with_channel(record.channel_hint.clone())
            .with_content(content)
    }
}

/// Per-batch delivery counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub delivered: usize,
    pub failed: usize,
}

/// Renders notifications through the platform renderer.
pub struct DeliveryDispatcher {
    renderer: Arc<dyn NotificationRenderer>,
    images: Arc<dyn ImageLoader>,
    channels: ChannelRegistry,
}

impl DeliveryDispatcher {
    /// Create a dispatcher and register the built-in channels with the renderer.
    pub fn new(renderer: Arc<dyn NotificationRenderer>, images: Arc<dyn ImageLoader>) -> Self {
        let channels = ChannelRegistry::with_builtin();
        for spec in ChannelSpec::builtin() {
            if let Err(e) = renderer.create_channel(&spec) {
                warn!(channel = %spec.id, "failed to create built-in channel: {e}");
            }
        }
        Self {
            renderer,
            images,
            channels,
        }
    }

    #[must_use]
    pub fn channels(&self) -> &ChannelRegistry {
        &self.channels
    }

    #[must_use]
    pub fn renderer(&self) -> &Arc<dyn NotificationRenderer> {
        &self.renderer
    }

    /// Create a channel with the renderer, then make it resolvable.
    pub fn create_channel(&self, spec: ChannelSpec) -> Result<()> {
        self.renderer.create_channel(&spec)?;
        self.channels.register(spec);
        Ok(())
    }

    /// Render one feed record.
    pub fn deliver(&self, record: &NotificationRecord) -> Result<i32> {
        self.show(Notification::from(record))
    }

    /// Render records in order. A failed render is logged and skipped.
    pub fn deliver_all(&self, records: &[NotificationRecord]) -> DeliveryReport {
        let mut report = DeliveryReport::default();
        for record in records {
            match self.deliver(record) {
                Ok(_) => report.delivered += 1,
                Err(e) => {
                    warn!(title = %record.title, "notification not delivered: {e}");
                    report.failed += 1;
                }
            }
        }
        report
    }

    /// Render a notification and return its id.
    ///
    /// Image content renders immediately with a pending image; the image is
    /// fetched on a detached task which re-renders the same id when it
    /// resolves or fails.
    pub fn show(&self, notification: Notification) -> Result<i32> {
        let id = notification.id.unwrap_or_else(next_notification_id);
        let channel_id = self
            .channels
            .resolve(notification.channel_hint.as_deref());

        let image_url = match &notification.content {
            Content::Image(url) => Some(url.clone()),
            _ => None,
        };
        let style = match notification.content {
            Content::Plain => RenderStyle::Plain,
            Content::BigText(text) => RenderStyle::BigText(text),
            Content::Image(url) => RenderStyle::Image {
                url,
                state: ImageState::Pending,
            },
            Content::Actions(actions) => RenderStyle::Actions(actions),
        };

        let request = RenderRequest {
            id,
            channel_id,
            channel_hint: notification.channel_hint,
            title: notification.title,
            message: notification.message,
            style,
            priority: notification.priority,
            auto_cancel: notification.auto_cancel,
        };
        self.renderer.render(&request)?;
        debug!(id, channel = %request.channel_id, style = request.style.kind(), "notification rendered");

        if let Some(url) = image_url {
            self.spawn_image_follow_up(request, url);
        }
        Ok(id)
    }

    fn spawn_image_follow_up(&self, request: RenderRequest, url: String) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!(id = request.id, "no async runtime; image will not be loaded");
            return;
        };
        let renderer = Arc::clone(&self.renderer);
        let images = Arc::clone(&self.images);
        runtime.spawn(async move {
            let state = match Url::parse(&url) {
                Ok(parsed) => match images.load(&parsed).await {
                    Ok(bytes) => ImageState::Loaded(bytes),
                    Err(e) => {
                        warn!(id = request.id, %url, "image load failed: {e}");
                        ImageState::Failed
                    }
                },
                Err(e) => {
                    warn!(id = request.id, %url, "invalid image url: {e}");
                    ImageState::Failed
                }
            };
            let update = RenderRequest {
                style: RenderStyle::Image { url, state },
                ..request
            };
            if let Err(e) = renderer.render(&update) {
                warn!(id = update.id, "image follow-up render failed: {e}");
            }
        });
    }
}
