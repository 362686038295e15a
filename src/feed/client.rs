//! HTTP feed fetching.

use crate::config::FeedConfig;
use crate::error::{NotifyError, Result};
use async_trait::async_trait;
use bytes::Bytes;
use tracing::debug;
use url::Url;

/// Source of raw feed bodies.
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// GET the feed at `url` and return its body.
    ///
    /// Non-2xx answers and transport failures are [`NotifyError::Network`].
    async fn fetch(&self, url: &Url) -> Result<Bytes>;
}

/// `reqwest`-backed [`FeedSource`] with bounded connect and read timeouts.
#[derive(Clone)]
pub struct FeedClient {
    client: reqwest::Client,
}

impl FeedClient {
    /// Build a client from feed settings.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::Config`] if the TLS backend cannot initialise.
    pub fn new(config: &FeedConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout())
            .read_timeout(config.read_timeout())
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| NotifyError::Config(format!("cannot build feed HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl FeedSource for FeedClient {
    async fn fetch(&self, url: &Url) -> Result<Bytes> {
        debug!(%url, "fetching notification feed");
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Network {
                status: Some(status.as_u16()),
                message: format!("feed request to {url} failed"),
            });
        }

        let body = response.bytes().await.map_err(transport_error)?;
        debug!(%url, bytes = body.len(), "feed fetched");
        Ok(body)
    }
}

fn transport_error(e: reqwest::Error) -> NotifyError {
    let message = if e.is_timeout() {
        format!("feed request timed out: {e}")
    } else if e.is_connect() {
        format!("cannot connect to feed: {e}")
    } else {
        format!("feed request failed: {e}")
    };
    NotifyError::Network {
        status: e.status().map(|s| s.as_u16()),
        message,
    }
}
