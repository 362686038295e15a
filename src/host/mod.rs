//! Host-facing method channel for embedding applications.

pub mod channel;
pub mod contract;
pub mod plugin;
pub mod stdio;

pub use channel::{MethodClient, MethodServer, method_channel};
pub use contract::{ErrorBody, ErrorCode, MethodCall, MethodName, MethodResponse};
pub use plugin::{HostCapabilities, MethodHandler, NotificationPlugin};
