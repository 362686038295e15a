//! Typed view over the persisted polling keys.

use super::{KeyValueStore, StoredValue};
use crate::config::{DEFAULT_POLLING_INTERVAL_MINUTES, PollingConfig};
use crate::error::Result;
use crate::registry::ActiveService;
use std::sync::Arc;
use tracing::warn;

pub const KEY_POLLING_ENABLED: &str = "polling_enabled";
pub const KEY_POLLING_URL: &str = "polling_url";
pub const KEY_POLLING_INTERVAL_MINUTES: &str = "polling_interval_minutes";
pub const KEY_ACTIVE_SERVICE: &str = "active_notification_service";

/// Reads and writes [`PollingConfig`] and the active-service marker.
#[derive(Clone)]
pub struct PollingSettings {
    store: Arc<dyn KeyValueStore>,
}

impl PollingSettings {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Persist a polling configuration and mark polling enabled.
    pub fn save_config(&self, config: &PollingConfig) -> Result<()> {
        self.store.set(
            KEY_POLLING_URL,
            StoredValue::Text(config.feed_url.to_string()),
        )?;
        self.store.set(
            KEY_POLLING_INTERVAL_MINUTES,
            StoredValue::Int(i64::from(config.interval_minutes)),
        )?;
        self.store
            .set(KEY_POLLING_ENABLED, StoredValue::Bool(true))
    }

    /// Last persisted configuration, regardless of the enabled flag.
    ///
    /// Returns `None` when no url was ever stored or the stored url no longer
    /// validates.
    pub fn load_config(&self) -> Result<Option<PollingConfig>> {
        let Some(url) = self
            .store
            .get(KEY_POLLING_URL)?
            .and_then(|v| v.as_text().map(str::to_owned))
        else {
            return Ok(None);
        };

        let interval = self
            .store
            .get(KEY_POLLING_INTERVAL_MINUTES)?
            .and_then(|v| v.as_int())
            .and_then(|v| u32::try_from(v).ok())
            .filter(|v| *v > 0)
            .unwrap_or(DEFAULT_POLLING_INTERVAL_MINUTES);

        match PollingConfig::new(&url, Some(interval)) {
            Ok(config) => Ok(Some(config)),
            Err(e) => {
                warn!("ignoring persisted polling url `{url}`: {e}");
                Ok(None)
            }
        }
    }

    pub fn polling_enabled(&self) -> Result<bool> {
        Ok(self
            .store
            .get(KEY_POLLING_ENABLED)?
            .and_then(|v| v.as_bool())
            .unwrap_or(false))
    }

    pub fn set_polling_enabled(&self, enabled: bool) -> Result<()> {
        self.store
            .set(KEY_POLLING_ENABLED, StoredValue::Bool(enabled))
    }

    /// Persisted active service, [`ActiveService::None`] when never set.
    pub fn active_service(&self) -> Result<ActiveService> {
        let value = self.store.get(KEY_ACTIVE_SERVICE)?;
        let service = match value {
            None => ActiveService::None,
            Some(StoredValue::Int(code)) => ActiveService::from_code(code).unwrap_or_else(|| {
                warn!("unknown active service code {code}; treating as none");
                ActiveService::None
            }),
            Some(StoredValue::Text(raw)) => ActiveService::parse(&raw).unwrap_or_else(|| {
                warn!("unknown active service `{raw}`; treating as none");
                ActiveService::None
            }),
            Some(StoredValue::Bool(_)) => ActiveService::None,
        };
        Ok(service)
    }

    pub fn set_active_service(&self, service: ActiveService) -> Result<()> {
        self.store
            .set(KEY_ACTIVE_SERVICE, StoredValue::Int(service.code()))
    }
}
