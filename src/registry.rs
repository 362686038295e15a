//! Single-active-service registry.
//!
//! At most one delivery mechanism is authorized at a time. Selecting a new one
//! first deactivates whichever mechanism held the slot, then persists the new
//! value. Runners consult [`ServiceRegistry::authorizes`] before every cycle.

use crate::error::{NotifyError, Result};
use crate::store::PollingSettings;
use std::collections::HashMap;
use std::sync::{Mutex, Weak};
use tracing::{debug, info, warn};

/// The delivery mechanism currently allowed to run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ActiveService {
    #[default]
    None,
    Polling,
    ForegroundSession,
    /// Push delivery managed outside this process.
    ExternalPush,
}

impl ActiveService {
    /// Wire name returned by `getActiveNotificationService`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Polling => "polling",
            Self::ForegroundSession => "foreground",
            Self::ExternalPush => "firebase",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "none" => Some(Self::None),
            "polling" => Some(Self::Polling),
            "foreground" => Some(Self::ForegroundSession),
            "firebase" | "push" => Some(Self::ExternalPush),
            _ => None,
        }
    }

    /// Persisted integer form.
    #[must_use]
    pub fn code(self) -> i64 {
        match self {
            Self::None => 0,
            Self::Polling => 1,
            Self::ForegroundSession => 2,
            Self::ExternalPush => 3,
        }
    }

    #[must_use]
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::None),
            1 => Some(Self::Polling),
            2 => Some(Self::ForegroundSession),
            3 => Some(Self::ExternalPush),
            _ => None,
        }
    }
}

impl std::fmt::Display for ActiveService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A mechanism the registry can shut down when another one takes over.
///
/// Implementations must not call back into the registry from `deactivate`.
pub trait ServiceMechanism: Send + Sync {
    /// Cancel scheduled work, stop loops and clear persistent UI.
    fn deactivate(&self) -> Result<()>;
}

/// Process-wide arbiter of the active delivery mechanism.
pub struct ServiceRegistry {
    settings: PollingSettings,
    mechanisms: Mutex<HashMap<ActiveService, Weak<dyn ServiceMechanism>>>,
    transition: Mutex<()>,
}

impl ServiceRegistry {
    #[must_use]
    pub fn new(settings: PollingSettings) -> Self {
        Self {
            settings,
            mechanisms: Mutex::new(HashMap::new()),
            transition: Mutex::new(()),
        }
    }

    /// Register the deactivation hook for `service`.
    ///
    /// The registry holds only a weak reference, so runners that own an
    /// `Arc<ServiceRegistry>` do not form a cycle with it.
    pub fn attach(&self, service: ActiveService, mechanism: Weak<dyn ServiceMechanism>) {
        if let Ok(mut mechanisms) = self.mechanisms.lock() {
            mechanisms.insert(service, mechanism);
        } else {
            warn!(%service, "mechanism table poisoned; hook not attached");
        }
    }

    /// Persisted active service, `None` if never set.
    pub fn get_active(&self) -> Result<ActiveService> {
        self.settings.active_service()
    }

    /// Whether a cycle of `service` may execute right now.
    pub fn authorizes(&self, service: ActiveService) -> Result<bool> {
        Ok(service != ActiveService::None && self.get_active()? == service)
    }

    /// Make `service` the active mechanism.
    ///
    /// Selecting the current value is a no-op. Otherwise the previous
    /// mechanism is deactivated before the new value is persisted. Returns
    /// `true` when the active service changed.
    pub fn set_active(&self, service: ActiveService) -> Result<bool> {
        let _guard = self.lock_transition()?;
        let current = self.settings.active_service()?;
        if current == service {
            debug!(%service, "active service unchanged");
            return Ok(false);
        }

        self.deactivate(current);
        self.settings.set_active_service(service)?;
        info!(from = %current, to = %service, "active notification service changed");
        Ok(true)
    }

    /// Clear the slot if `service` still holds it, without running its
    /// deactivation hook. Used by a mechanism that has already stopped itself.
    pub fn release(&self, service: ActiveService) -> Result<bool> {
        let _guard = self.lock_transition()?;
        if self.settings.active_service()? != service {
            return Ok(false);
        }
        self.settings.set_active_service(ActiveService::None)?;
        info!(from = %service, "active notification service released");
        Ok(true)
    }

    fn deactivate(&self, service: ActiveService) {
        let hook = match self.mechanisms.lock() {
            Ok(mechanisms) => mechanisms.get(&service).and_then(Weak::upgrade),
            Err(_) => None,
        };
        match hook {
            Some(mechanism) => {
                if let Err(e) = mechanism.deactivate() {
                    warn!(%service, "failed to deactivate previous service: {e}");
                } else {
                    debug!(%service, "deactivated previous service");
                }
            }
            None if matches!(service, ActiveService::None | ActiveService::ExternalPush) => {}
            None => debug!(%service, "no live mechanism to deactivate"),
        }
    }

    fn lock_transition(&self) -> Result<std::sync::MutexGuard<'_, ()>> {
        self.transition
            .lock()
            .map_err(|_| NotifyError::Storage("service registry lock poisoned".to_owned()))
    }
}
