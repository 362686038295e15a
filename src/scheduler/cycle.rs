//! One fetch-parse-deliver pass.

use super::outcome::CycleReport;
use crate::delivery::DeliveryDispatcher;
use crate::feed::{FeedParser, FeedSource};
use crate::registry::{ActiveService, ServiceRegistry};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use url::Url;

/// Shared pipeline used by both the periodic job and the foreground loop.
pub struct FeedCycle {
    source: Arc<dyn FeedSource>,
    parser: FeedParser,
    dispatcher: Arc<DeliveryDispatcher>,
}

impl FeedCycle {
    #[must_use]
    pub fn new(
        source: Arc<dyn FeedSource>,
        parser: FeedParser,
        dispatcher: Arc<DeliveryDispatcher>,
    ) -> Self {
        Self {
            source,
            parser,
            dispatcher,
        }
    }

    #[must_use]
    pub fn dispatcher(&self) -> &Arc<DeliveryDispatcher> {
        &self.dispatcher
    }

    /// Run a cycle on behalf of `service`.
    ///
    /// When the registry no longer names `service` the cycle is skipped
    /// without fetching; an unreadable registry is fatal.
    pub async fn run_as(
        &self,
        registry: &ServiceRegistry,
        service: ActiveService,
        url: &Url,
        cancel: &CancellationToken,
    ) -> CycleReport {
        match registry.authorizes(service) {
            Ok(true) => self.run(url, cancel).await,
            Ok(false) => {
                debug!(?service, "service not authorized; skipping cycle");
                CycleReport::skipped()
            }
            Err(e) => {
                error!("cannot read active service: {e}");
                CycleReport::fatal(e.to_string())
            }
        }
    }

    /// Run one cycle against `url`.
    ///
    /// The token is checked before the fetch and before delivery; a fired
    /// token ends the cycle with `Retry`. Network errors are `Retry`, a parse
    /// error under the strict policy is `FatalFailure`, render failures only
    /// count against `failed`.
    pub async fn run(&self, url: &Url, cancel: &CancellationToken) -> CycleReport {
        if cancel.is_cancelled() {
            return CycleReport::retry("cancelled before fetch");
        }

        debug!(%url, "polling feed");
        let fetched = tokio::select! {
            _ = cancel.cancelled() => {
                return CycleReport::retry("cancelled during fetch");
            }
            result = self.source.fetch(url) => result,
        };

        let body = match fetched {
            Ok(body) => body,
            Err(e) if e.is_retryable() => {
                warn!(%url, "feed fetch failed, will retry: {e}");
                return CycleReport::retry(e.to_string());
            }
            Err(e) => {
                error!(%url, "feed fetch failed: {e}");
                return CycleReport::fatal(e.to_string());
            }
        };

        let feed = match self.parser.parse(&body) {
            Ok(feed) => feed,
            Err(e) => {
                error!(%url, "feed could not be decoded: {e}");
                return CycleReport::fatal(e.to_string());
            }
        };

        if cancel.is_cancelled() {
            return CycleReport::retry("cancelled before delivery");
        }

        let delivery = self.dispatcher.deliver_all(&feed.records);
        let report = CycleReport::success(feed.len(), delivery.delivered, delivery.failed);
        if report.fetched > 0 {
            info!(
                fetched = report.fetched,
                delivered = report.delivered,
                failed = report.failed,
                "feed cycle complete"
            );
        } else {
            debug!("feed cycle complete, nothing pending");
        }
        report
    }
}
