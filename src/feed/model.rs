//! Feed wire types.
//!
//! ```json
//! { "notifications": [
//!     { "title": "T", "message": "M", "bigText": "B", "channelId": "high", "imageUrl": "https://..." }
//! ] }
//! ```

use serde::{Deserialize, Serialize};

/// One pending notification, delivered once and then discarded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub title: String,
    pub message: String,
    #[serde(rename = "bigText", default, skip_serializing_if = "Option::is_none")]
    pub expanded_text: Option<String>,
    #[serde(rename = "channelId", default, skip_serializing_if = "Option::is_none")]
    pub channel_hint: Option<String>,
    #[serde(rename = "imageUrl", default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl NotificationRecord {
    #[must_use]
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            expanded_text: None,
            channel_hint: None,
            image_url: None,
        }
    }

    #[must_use]
    pub fn with_expanded_text(mut self, text: impl Into<String>) -> Self {
        self.expanded_text = Some(text.into());
        self
    }

    #[must_use]
    pub fn with_channel_hint(mut self, hint: impl Into<String>) -> Self {
        self.channel_hint = Some(hint.into());
        self
    }

    #[must_use]
    pub fn with_image_url(mut self, url: impl Into<String>) -> Self {
        self.image_url = Some(url.into());
        self
    }

    /// Blank optional fields are treated as absent.
    pub(crate) fn normalized(mut self) -> Self {
        fn blank_to_none(value: Option<String>) -> Option<String> {
            value.filter(|v| !v.trim().is_empty())
        }
        self.expanded_text = blank_to_none(self.expanded_text);
        self.channel_hint = blank_to_none(self.channel_hint);
        self.image_url = blank_to_none(self.image_url);
        self
    }
}

/// Records of one feed fetch, in feed order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FeedResponse {
    #[serde(rename = "notifications")]
    pub records: Vec<NotificationRecord>,
}

impl FeedResponse {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }
}

/// Wire shape; `notifications` may be missing or `null`.
#[derive(Debug, Deserialize)]
pub(crate) struct WireFeed {
    #[serde(default)]
    pub notifications: Option<Vec<NotificationRecord>>,
}

impl From<WireFeed> for FeedResponse {
    fn from(wire: WireFeed) -> Self {
        Self {
            records: wire
                .notifications
                .unwrap_or_default()
                .into_iter()
                .map(NotificationRecord::normalized)
                .collect(),
        }
    }
}
