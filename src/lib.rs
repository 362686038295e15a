//! Notification Master: feed polling and local notification delivery.
//!
//! A remote endpoint publishes pending notifications as a JSON feed. This
//! crate fetches that feed on a schedule and renders each record through the
//! host's notification surface:
//!
//! Feed client → Feed parser → Delivery dispatcher → Renderer
//!
//! # Architecture
//!
//! - **Feed**: HTTP fetch via `reqwest` and tolerant JSON decoding
//! - **Delivery**: channel resolution, id assignment and styled renders
//! - **Registry**: which mechanism (periodic job, foreground loop or
//!   external push) currently owns delivery
//! - **Scheduler**: the periodic job and the foreground loop, both running
//!   the same fetch-parse-deliver cycle
//! - **Host**: the method-call surface an embedding application drives

pub mod app_dirs;
pub mod config;
pub mod delivery;
pub mod error;
pub mod feed;
pub mod host;
pub mod platform;
pub mod registry;
pub mod scheduler;
pub mod store;

#[cfg(test)]
pub(crate) mod test_utils;

pub use config::{NotifierConfig, PollingConfig};
pub use error::{NotifyError, Result};
pub use host::{HostCapabilities, NotificationPlugin};
pub use registry::ActiveService;
