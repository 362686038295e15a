//! Error types for the notification polling and delivery subsystem.

use crate::host::contract::ErrorCode;

/// Top-level error type for the notification subsystem.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// Feed endpoint unreachable, timed out, or answered with a non-2xx status.
    #[error("network error{}: {message}", status.map(|s| format!(" (HTTP {s})")).unwrap_or_default())]
    Network {
        /// HTTP status code when the server answered.
        status: Option<u16>,
        /// Human-readable cause.
        message: String,
    },

    /// Feed body could not be decoded.
    #[error("parse error: {0}")]
    Parse(String),

    /// The host refused or failed to render a notification.
    #[error("render error: {0}")]
    Render(String),

    /// Argument validation failure at the RPC boundary.
    #[error("{code}: {message}")]
    InvalidArgument {
        /// Stable error code surfaced to the host application.
        code: ErrorCode,
        /// Human-readable cause.
        message: String,
    },

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// Persisted settings read/write error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Job host or runner error.
    #[error("scheduler error: {0}")]
    Scheduler(String),

    /// Work was abandoned because its cancellation token fired.
    #[error("cancelled: {0}")]
    Cancelled(String),

    /// Channel send/receive error.
    #[error("channel error: {0}")]
    Channel(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl NotifyError {
    /// Build an [`NotifyError::InvalidArgument`] with the given code.
    pub fn invalid(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            code,
            message: message.into(),
        }
    }

    /// Returns `true` when the failed work may succeed if attempted again later.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network { .. } | Self::Cancelled(_))
    }
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, NotifyError>;
