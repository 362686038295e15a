//! Local rendering of notifications.

pub mod channels;
pub mod dispatcher;

pub use channels::{ChannelRegistry, ChannelSpec, Importance, Priority};
pub use dispatcher::{
    Content, DeliveryDispatcher, DeliveryReport, ImageState, Notification, NotificationAction,
    RenderRequest, RenderStyle,
};
