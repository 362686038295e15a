//! Versioned method-call envelopes exchanged with the host application.

use serde::{Deserialize, Serialize};

/// Contract version for call/response/event envelopes.
pub const EVENT_VERSION: u32 = 1;

/// Methods the plugin answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MethodName {
    GetPlatformVersion,
    RequestNotificationPermission,
    CheckNotificationPermission,
    ShowNotification,
    ShowBigTextNotification,
    ShowImageNotification,
    ShowNotificationWithActions,
    CreateCustomChannel,
    StartNotificationPolling,
    StopNotificationPolling,
    StartForegroundService,
    StopForegroundService,
    SetFirebaseAsActiveService,
    GetActiveNotificationService,
}

impl MethodName {
    pub const ALL: [Self; 14] = [
        Self::GetPlatformVersion,
        Self::RequestNotificationPermission,
        Self::CheckNotificationPermission,
        Self::ShowNotification,
        Self::ShowBigTextNotification,
        Self::ShowImageNotification,
        Self::ShowNotificationWithActions,
        Self::CreateCustomChannel,
        Self::StartNotificationPolling,
        Self::StopNotificationPolling,
        Self::StartForegroundService,
        Self::StopForegroundService,
        Self::SetFirebaseAsActiveService,
        Self::GetActiveNotificationService,
    ];

    /// Render method name to wire format.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::GetPlatformVersion => "getPlatformVersion",
            Self::RequestNotificationPermission => "requestNotificationPermission",
            Self::CheckNotificationPermission => "checkNotificationPermission",
            Self::ShowNotification => "showNotification",
            Self::ShowBigTextNotification => "showBigTextNotification",
            Self::ShowImageNotification => "showImageNotification",
            Self::ShowNotificationWithActions => "showNotificationWithActions",
            Self::CreateCustomChannel => "createCustomChannel",
            Self::StartNotificationPolling => "startNotificationPolling",
            Self::StopNotificationPolling => "stopNotificationPolling",
            Self::StartForegroundService => "startForegroundService",
            Self::StopForegroundService => "stopForegroundService",
            Self::SetFirebaseAsActiveService => "setFirebaseAsActiveService",
            Self::GetActiveNotificationService => "getActiveNotificationService",
        }
    }

    /// Parse a method name from wire format.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|name| name.as_str() == raw)
    }

    /// Whether a successful call may change the active notification service.
    #[must_use]
    pub fn changes_service(self) -> bool {
        matches!(
            self,
            Self::StartNotificationPolling
                | Self::StopNotificationPolling
                | Self::StartForegroundService
                | Self::StopForegroundService
                | Self::SetFirebaseAsActiveService
        )
    }
}

/// Stable error codes surfaced to the host application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    InvalidUrl,
    InvalidActions,
    InvalidChannel,
    InvalidArgument,
    NotImplemented,
    NotificationError,
    ChannelError,
    PollingError,
    ServiceError,
    PermissionError,
}

impl ErrorCode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InvalidUrl => "INVALID_URL",
            Self::InvalidActions => "INVALID_ACTIONS",
            Self::InvalidChannel => "INVALID_CHANNEL",
            Self::InvalidArgument => "INVALID_ARGUMENT",
            Self::NotImplemented => "NOT_IMPLEMENTED",
            Self::NotificationError => "NOTIFICATION_ERROR",
            Self::ChannelError => "CHANNEL_ERROR",
            Self::PollingError => "POLLING_ERROR",
            Self::ServiceError => "SERVICE_ERROR",
            Self::PermissionError => "PERMISSION_ERROR",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error half of a failed [`MethodResponse`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: ErrorCode,
    pub message: String,
}

impl ErrorBody {
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ErrorBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

/// A versioned method call from host application -> plugin.
///
/// `method` stays a plain string so unknown names reach the router and get a
/// `NOT_IMPLEMENTED` answer instead of failing envelope decoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodCall {
    pub v: u32,
    pub request_id: String,
    pub method: String,
    #[serde(default)]
    pub args: serde_json::Value,
}

impl MethodCall {
    /// Build a v1 call envelope.
    #[must_use]
    pub fn new(request_id: impl Into<String>, method: MethodName, args: serde_json::Value) -> Self {
        Self {
            v: EVENT_VERSION,
            request_id: request_id.into(),
            method: method.as_str().to_owned(),
            args,
        }
    }

    /// Validate envelope version and required identifiers.
    pub fn validate(&self) -> Result<(), ErrorBody> {
        if self.v != EVENT_VERSION {
            return Err(ErrorBody::new(
                ErrorCode::InvalidArgument,
                format!(
                    "unsupported contract version {}; expected {}",
                    self.v, EVENT_VERSION
                ),
            ));
        }
        if self.request_id.trim().is_empty() {
            return Err(ErrorBody::new(
                ErrorCode::InvalidArgument,
                "request_id cannot be empty",
            ));
        }
        Ok(())
    }
}

/// A versioned response envelope from plugin -> host application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodResponse {
    pub v: u32,
    pub request_id: String,
    pub ok: bool,
    pub result: serde_json::Value,
    pub error: Option<ErrorBody>,
}

impl MethodResponse {
    /// Build a successful response envelope.
    #[must_use]
    pub fn ok(request_id: impl Into<String>, result: serde_json::Value) -> Self {
        Self {
            v: EVENT_VERSION,
            request_id: request_id.into(),
            ok: true,
            result,
            error: None,
        }
    }

    /// Build an error response envelope.
    #[must_use]
    pub fn error(request_id: impl Into<String>, error: ErrorBody) -> Self {
        Self {
            v: EVENT_VERSION,
            request_id: request_id.into(),
            ok: false,
            result: serde_json::Value::Null,
            error: Some(error),
        }
    }

    /// Error code of a failed response.
    #[must_use]
    pub fn error_code(&self) -> Option<ErrorCode> {
        self.error.as_ref().map(|e| e.code)
    }
}

/// A versioned event envelope from plugin -> host application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub v: u32,
    pub event_id: String,
    pub event: String,
    pub payload: serde_json::Value,
}

impl EventEnvelope {
    /// Build a v1 event envelope.
    #[must_use]
    pub fn new(
        event_id: impl Into<String>,
        event: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            v: EVENT_VERSION,
            event_id: event_id.into(),
            event: event.into(),
            payload,
        }
    }
}
