//! Centralized filesystem locations for the notification host.
//!
//! Uses the [`dirs`] crate for platform-appropriate directory resolution.
//!
//! | Purpose | macOS | Linux |
//! |---------|-------|-------|
//! | Data | `~/Library/Application Support/notification-master/` | `~/.local/share/notification-master/` |
//! | Config | `~/Library/Application Support/notification-master/` | `~/.config/notification-master/` |
//!
//! # Environment Overrides
//!
//! - `NOTIFIER_DATA_DIR` overrides [`data_dir`]
//! - `NOTIFIER_CONFIG_DIR` overrides [`config_dir`]

use std::path::PathBuf;

const APP_DIR_NAME: &str = "notification-master";

/// Application data root directory.
///
/// Holds the persisted key-value settings (`settings.json`).
#[must_use]
pub fn data_dir() -> PathBuf {
    if let Some(override_dir) = std::env::var_os("NOTIFIER_DATA_DIR") {
        return PathBuf::from(override_dir);
    }
    dirs::data_dir()
        .map(|d| d.join(APP_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from("/tmp/notification-master-data"))
}

/// Application config directory, home of `config.toml`.
#[must_use]
pub fn config_dir() -> PathBuf {
    if let Some(override_dir) = std::env::var_os("NOTIFIER_CONFIG_DIR") {
        return PathBuf::from(override_dir);
    }
    dirs::config_dir()
        .map(|d| d.join(APP_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from("/tmp/notification-master-config"))
}

/// Persisted settings file (`data_dir()/settings.json`).
#[must_use]
pub fn settings_file() -> PathBuf {
    data_dir().join("settings.json")
}

/// Config file (`config_dir()/config.toml`).
#[must_use]
pub fn config_file() -> PathBuf {
    config_dir().join("config.toml")
}
