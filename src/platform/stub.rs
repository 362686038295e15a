//! Tracing-only renderer for headless hosts.

use super::{NotificationRenderer, StatusNotification};
use crate::delivery::channels::ChannelSpec;
use crate::delivery::dispatcher::RenderRequest;
use crate::error::{NotifyError, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::info;

/// Renderer that logs every call instead of drawing anything.
///
/// Permission starts granted; when revoked, `render` fails the way a
/// platform without notification permission would.
pub struct LogRenderer {
    granted: AtomicBool,
}

impl Default for LogRenderer {
    fn default() -> Self {
        Self {
            granted: AtomicBool::new(true),
        }
    }
}

impl LogRenderer {
    #[must_use]
    pub fn with_permission(granted: bool) -> Self {
        Self {
            granted: AtomicBool::new(granted),
        }
    }
}

impl NotificationRenderer for LogRenderer {
    fn render(&self, request: &RenderRequest) -> Result<()> {
        if !self.permission_granted() {
            return Err(NotifyError::Render(
                "notification permission not granted".to_owned(),
            ));
        }
        info!(
            id = request.id,
            channel = %request.channel_id,
            style = request.style.kind(),
            title = %request.title,
            "notification"
        );
        Ok(())
    }

    fn create_channel(&self, channel: &ChannelSpec) -> Result<()> {
        info!(channel = %channel.id, importance = ?channel.importance, "channel created");
        Ok(())
    }

    fn permission_granted(&self) -> bool {
        self.granted.load(Ordering::SeqCst)
    }

    fn request_permission(&self) -> Result<bool> {
        Ok(self.permission_granted())
    }

    fn show_status(&self, status: &StatusNotification) -> Result<()> {
        info!(id = status.id, title = %status.title, text = %status.text, "status notification");
        Ok(())
    }

    fn clear_status(&self, id: i32) -> Result<()> {
        info!(id, "status notification cleared");
        Ok(())
    }
}
