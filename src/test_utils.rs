//! Shared fakes for unit tests.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use crate::delivery::{ChannelSpec, DeliveryDispatcher, RenderRequest};
use crate::error::{NotifyError, Result};
use crate::feed::FeedSource;
use crate::platform::{ImageLoader, NotificationRenderer, StatusNotification};
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use url::Url;

/// Renderer that records every call.
#[derive(Default)]
pub struct RecordingRenderer {
    pub renders: Mutex<Vec<RenderRequest>>,
    pub channels: Mutex<Vec<String>>,
    pub statuses: Mutex<Vec<StatusNotification>>,
    pub cleared: Mutex<Vec<i32>>,
    /// Renders with these titles are rejected.
    pub fail_titles: Vec<String>,
    /// Status notifications are rejected.
    pub fail_status: bool,
}

impl RecordingRenderer {
    pub fn rendered_titles(&self) -> Vec<String> {
        self.renders
            .lock()
            .expect("lock renders")
            .iter()
            .map(|r| r.title.clone())
            .collect()
    }

    pub fn render_count(&self) -> usize {
        self.renders.lock().expect("lock renders").len()
    }
}

impl NotificationRenderer for RecordingRenderer {
    fn render(&self, request: &RenderRequest) -> Result<()> {
        if self.fail_titles.contains(&request.title) {
            return Err(NotifyError::Render("rejected".to_owned()));
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
            .push(channel.id.clone());
        Ok(())
    }

    fn permission_granted(&self) -> bool {
        true
    }

    fn request_permission(&self) -> Result<bool> {
        Ok(true)
    }

    fn show_status(&self, status: &StatusNotification) -> Result<()> {
        if self.fail_status {
            return Err(NotifyError::Render("status rejected".to_owned()));
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

/// Image loader returning fixed bytes, or a 404 when `None`.
pub struct FixedImages(pub Option<Bytes>);

#[async_trait]
impl ImageLoader for FixedImages {
    async fn load(&self, _url: &Url) -> Result<Bytes> {
        self.0.clone().ok_or_else(|| NotifyError::Network {
            status: Some(404),
            message: "missing".to_owned(),
        })
    }
}

/// Feed source replaying one canned answer.
pub struct StaticFeed {
    answer: Box<dyn Fn() -> Result<Bytes> + Send + Sync>,
    pub fetches: AtomicUsize,
}

impl StaticFeed {
    pub fn body(body: &'static str) -> Self {
        Self {
            answer: Box::new(move || Ok(Bytes::from_static(body.as_bytes()))),
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            answer: Box::new(move || {
                Err(NotifyError::Network {
                    status: Some(status),
                    message: "scripted failure".to_owned(),
                })
            }),
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FeedSource for StaticFeed {
    async fn fetch(&self, _url: &Url) -> Result<Bytes> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        (self.answer)()
    }
}

pub fn dispatcher(renderer: Arc<RecordingRenderer>) -> Arc<DeliveryDispatcher> {
    Arc::new(DeliveryDispatcher::new(
        renderer,
        Arc::new(FixedImages(None)),
    ))
}

pub fn feed_url() -> Url {
    Url::parse("https://feed.example.com/pending").expect("valid url")
}
