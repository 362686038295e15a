//! Notification channels and priority levels.

use serde::Serialize;
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::debug;

pub const DEFAULT_CHANNEL_ID: &str = "default_channel";
pub const HIGH_PRIORITY_CHANNEL_ID: &str = "high_priority_channel";
pub const SILENT_CHANNEL_ID: &str = "silent_channel";

/// ARGB blue, the light colour used when a caller enables lights without one.
pub const DEFAULT_LIGHT_COLOR: u32 = 0xFF00_00FF;

/// Channel importance as understood by the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Importance {
    Min,
    Low,
    Default,
    High,
}

/// Importance codes accepted by `createCustomChannel`.
///
/// `0` default, `1` high, `2` low, `3` min, `4` silent. Silent is low
/// importance with sound turned off; unknown codes fall back to default.
#[must_use]
pub fn importance_from_code(code: i64) -> (Importance, bool) {
    match code {
        1 => (Importance::High, true),
        2 => (Importance::Low, true),
        3 => (Importance::Min, true),
        4 => (Importance::Low, false),
        _ => (Importance::Default, true),
    }
}

/// A presentation category notifications are posted to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelSpec {
    pub id: String,
    pub name: String,
    pub description: String,
    pub importance: Importance,
    pub lights: bool,
    pub light_color: Option<u32>,
    pub vibration: bool,
    pub sound: bool,
}

impl ChannelSpec {
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, importance: Importance) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            importance,
            lights: true,
            light_color: Some(DEFAULT_LIGHT_COLOR),
            vibration: true,
            sound: true,
        }
    }

    /// Build from an importance code, see [`importance_from_code`].
    #[must_use]
    pub fn from_importance_code(
        id: impl Into<String>,
        name: impl Into<String>,
        code: i64,
    ) -> Self {
        let (importance, sound) = importance_from_code(code);
        Self::new(id, name, importance).with_sound(sound)
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[must_use]
    pub fn with_lights(mut self, enabled: bool, color: Option<u32>) -> Self {
        self.lights = enabled;
        self.light_color = if enabled {
            Some(color.unwrap_or(DEFAULT_LIGHT_COLOR))
        } else {
            None
        };
        self
    }

    #[must_use]
    pub fn with_vibration(mut self, enabled: bool) -> Self {
        self.vibration = enabled;
        self
    }

    #[must_use]
    pub fn with_sound(mut self, enabled: bool) -> Self {
        self.sound = enabled;
        self
    }

    /// Channels present from startup.
    #[must_use]
    pub fn builtin() -> Vec<Self> {
        vec![
            Self::new(DEFAULT_CHANNEL_ID, "Default Channel", Importance::Default)
                .with_description("Default notification channel"),
            Self::new(
                HIGH_PRIORITY_CHANNEL_ID,
                "High Priority Channel",
                Importance::High,
            )
            .with_description("Channel for important notifications")
            .with_lights(true, Some(0xFFFF_0000)),
            Self::new(SILENT_CHANNEL_ID, "Silent Channel", Importance::Low)
                .with_description("Channel for silent notifications")
                .with_lights(false, None)
                .with_vibration(false)
                .with_sound(false),
        ]
    }
}

/// Per-notification priority, used by renderers without channel support.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Min,
    Low,
    #[default]
    Default,
    High,
    Max,
}

impl Priority {
    /// Map the `-2..=2` wire range; anything else is `Default`.
    #[must_use]
    pub fn from_code(code: i64) -> Self {
        match code {
            -2 => Self::Min,
            -1 => Self::Low,
            1 => Self::High,
            2 => Self::Max,
            _ => Self::Default,
        }
    }
}

/// Channels known to this process, keyed by id.
#[derive(Debug)]
pub struct ChannelRegistry {
    channels: RwLock<HashMap<String, ChannelSpec>>,
}

impl Default for ChannelRegistry {
    fn default() -> Self {
        Self::with_builtin()
    }
}

impl ChannelRegistry {
    #[must_use]
    pub fn with_builtin() -> Self {
        let channels = ChannelSpec::builtin()
            .into_iter()
            .map(|spec| (spec.id.clone(), spec))
            .collect();
        Self {
            channels: RwLock::new(channels),
        }
    }

    /// Add or replace a channel.
    pub fn register(&self, spec: ChannelSpec) {
        if let Ok(mut channels) = self.channels.write() {
            debug!(channel = %spec.id, "channel registered");
            channels.insert(spec.id.clone(), spec);
        }
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<ChannelSpec> {
        self.channels.read().ok()?.get(id).cloned()
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Channel a notification with `hint` is posted to.
    ///
    /// Unregistered or missing hints resolve to [`DEFAULT_CHANNEL_ID`].
    #[must_use]
    pub fn resolve(&self, hint: Option<&str>) -> String {
        match hint {
            Some(id) if self.contains(id) => id.to_owned(),
            Some(id) => {
                debug!(hint = id, "unregistered channel hint; using default channel");
                DEFAULT_CHANNEL_ID.to_owned()
            }
            None => DEFAULT_CHANNEL_ID.to_owned(),
        }
    }
}
