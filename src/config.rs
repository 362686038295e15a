//! Configuration types for feed polling and notification delivery.

use crate::error::{NotifyError, Result};
use crate::host::contract::ErrorCode;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Polling interval used when the caller does not supply one.
pub const DEFAULT_POLLING_INTERVAL_MINUTES: u32 = 15;

/// Top-level configuration loaded from `config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifierConfig {
    /// Feed fetch and decode settings.
    pub feed: FeedConfig,
    /// Periodic job settings.
    pub polling: PollingPolicyConfig,
    /// Foreground session settings.
    pub foreground: ForegroundConfig,
}

/// What to do when a non-empty feed body cannot be decoded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseFailurePolicy {
    /// Deliver one diagnostic notification carrying the truncated body.
    #[default]
    Diagnostic,
    /// Surface the parse error and end the cycle as a fatal failure.
    Fail,
}

/// Feed client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// TCP/TLS connect timeout in seconds.
    pub connect_timeout_secs: u64,
    /// Read timeout in seconds.
    pub read_timeout_secs: u64,
    /// Policy for bodies that fail to decode.
    pub parse_failure_policy: ParseFailurePolicy,
    /// Characters of the raw body kept in a diagnostic notification.
    pub diagnostic_body_chars: usize,
    /// `User-Agent` header sent with feed requests.
    pub user_agent: String,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 30,
            read_timeout_secs: 30,
            parse_failure_policy: ParseFailurePolicy::Diagnostic,
            diagnostic_body_chars: 500,
            user_agent: concat!("notification-master/", env!("CARGO_PKG_VERSION")).to_owned(),
        }
    }
}

impl FeedConfig {
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    #[must_use]
    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }
}

/// Periodic job policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingPolicyConfig {
    /// Interval applied when a start request omits one.
    pub default_interval_minutes: u32,
    /// Smallest interval the job host accepts; shorter requests are raised to it.
    pub min_interval_minutes: u32,
    /// Initial linear backoff after a retryable cycle failure.
    pub retry_backoff_secs: u64,
    /// Upper bound for the backoff delay.
    pub max_backoff_secs: u64,
}

impl Default for PollingPolicyConfig {
    fn default() -> Self {
        Self {
            default_interval_minutes: DEFAULT_POLLING_INTERVAL_MINUTES,
            min_interval_minutes: 15,
            retry_backoff_secs: 30,
            max_backoff_secs: 3600,
        }
    }
}

/// Foreground session settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ForegroundConfig {
    /// Channel used for the persistent status notification.
    pub status_channel_id: String,
    /// Title of the persistent status notification.
    pub status_title: String,
}

impl Default for ForegroundConfig {
    fn default() -> Self {
        Self {
            status_channel_id: "notification_master_service_channel".to_owned(),
            status_title: "Notification Service".to_owned(),
        }
    }
}

impl NotifierConfig {
    /// Load configuration from a TOML file, falling back to defaults for missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| NotifyError::Config(e.to_string()))
    }

    /// Load from `path` when it exists, otherwise return defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing file cannot be parsed.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| NotifyError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns the default config file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        crate::app_dirs::config_file()
    }
}

/// Feed location and cadence for one polling mechanism.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollingConfig {
    /// Remote feed endpoint.
    pub feed_url: Url,
    /// Minutes between cycles.
    pub interval_minutes: u32,
}

impl PollingConfig {
    /// Validate a caller-supplied url and interval.
    ///
    /// A missing interval falls back to [`DEFAULT_POLLING_INTERVAL_MINUTES`].
    ///
    /// # Errors
    ///
    /// `INVALID_URL` when the url is empty, malformed, or not http(s);
    /// `INVALID_ARGUMENT` when the interval is zero.
    pub fn new(feed_url: &str, interval_minutes: Option<u32>) -> Result<Self> {
        let feed_url = parse_feed_url(feed_url)?;
        let interval_minutes = interval_minutes.unwrap_or(DEFAULT_POLLING_INTERVAL_MINUTES);
        if interval_minutes == 0 {
            return Err(NotifyError::invalid(
                ErrorCode::InvalidArgument,
                "intervalMinutes must be a positive integer",
            ));
        }
        Ok(Self {
            feed_url,
            interval_minutes,
        })
    }

    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_secs(u64::from(self.interval_minutes) * 60)
    }
}

/// Parse and validate a feed url.
///
/// # Errors
///
/// Returns `INVALID_URL` for empty, unparseable, or non-http(s) input.
pub fn parse_feed_url(raw: &str) -> Result<Url> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(NotifyError::invalid(
            ErrorCode::InvalidUrl,
            "Polling URL cannot be null or empty",
        ));
    }
    let url = Url::parse(trimmed)
        .map_err(|e| NotifyError::invalid(ErrorCode::InvalidUrl, format!("Invalid URL: {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(NotifyError::invalid(
            ErrorCode::InvalidUrl,
            format!("URL scheme `{other}` is not supported (expected http or https)"),
        )),
    }
}
