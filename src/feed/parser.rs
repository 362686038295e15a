//! Feed body decoding.

use super::model::{FeedResponse, NotificationRecord, WireFeed};
use crate::config::{FeedConfig, ParseFailurePolicy};
use crate::delivery::channels::HIGH_PRIORITY_CHANNEL_ID;
use crate::error::{NotifyError, Result};
use tracing::{debug, warn};

/// Title of the notification raised for an undecodable feed body.
pub const DIAGNOSTIC_TITLE: &str = "Notification feed unreadable";
const DIAGNOSTIC_MESSAGE: &str = "Received response but couldn't parse it";

/// Decodes feed bodies into [`FeedResponse`]s.
#[derive(Debug, Clone)]
pub struct FeedParser {
    policy: ParseFailurePolicy,
    diagnostic_body_chars: usize,
}

impl Default for FeedParser {
    fn default() -> Self {
        Self::from_config(&FeedConfig::default())
    }
}

impl FeedParser {
    #[must_use]
    pub fn new(policy: ParseFailurePolicy, diagnostic_body_chars: usize) -> Self {
        Self {
            policy,
            diagnostic_body_chars,
        }
    }

    #[must_use]
    pub fn from_config(config: &FeedConfig) -> Self {
        Self::new(config.parse_failure_policy, config.diagnostic_body_chars)
    }

    /// Decode a raw body.
    ///
    /// Empty or whitespace-only bodies mean nothing is pending. A body that
    /// fails to decode becomes a single diagnostic record under
    /// [`ParseFailurePolicy::Diagnostic`].
    ///
    /// # Errors
    ///
    /// [`NotifyError::Parse`] for an undecodable body under
    /// [`ParseFailurePolicy::Fail`].
    pub fn parse(&self, body: &[u8]) -> Result<FeedResponse> {
        if body.iter().all(u8::is_ascii_whitespace) {
            debug!("empty feed body");
            return Ok(FeedResponse::default());
        }

        let decoded = std::str::from_utf8(body)
            .map_err(|e| e.to_string())
            .and_then(|text| serde_json::from_str::<WireFeed>(text).map_err(|e| e.to_string()));

        match decoded {
            Ok(wire) => {
                let response = FeedResponse::from(wire);
                debug!(records = response.len(), "decoded feed");
                Ok(response)
            }
            Err(reason) => match self.policy {
                ParseFailurePolicy::Fail => Err(NotifyError::Parse(reason)),
                ParseFailurePolicy::Diagnostic => {
                    warn!("feed body could not be decoded, raising diagnostic: {reason}");
                    Ok(FeedResponse {
                        records: vec![self.diagnostic_record(body, &reason)],
                    })
                }
            },
        }
    }

    fn diagnostic_record(&self, body: &[u8], reason: &str) -> NotificationRecord {
        let raw = String::from_utf8_lossy(body);
        let mut excerpt: String = raw.chars().take(self.diagnostic_body_chars).collect();
        if raw.chars().nth(self.diagnostic_body_chars).is_some() {
            excerpt.push_str("...");
        }
        NotificationRecord::new(DIAGNOSTIC_TITLE, DIAGNOSTIC_MESSAGE)
            .with_expanded_text(format!("Response body: {excerpt}\n\nError: {reason}"))
            .with_channel_hint(HIGH_PRIORITY_CHANNEL_ID)
    }
}
