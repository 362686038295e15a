//! Persisted key-value settings.
//!
//! The host supplies durable storage through [`KeyValueStore`]; the polling
//! subsystem only ever touches it through the typed [`PollingSettings`] view.

pub mod file;
pub mod memory;
pub mod settings;

pub use file::JsonFileStore;
pub use memory::MemoryStore;
pub use settings::PollingSettings;

use crate::error::Result;
use serde::{Deserialize, Serialize};

/// A single persisted value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoredValue {
    Bool(bool),
    Int(i64),
    Text(String),
}

impl StoredValue {
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(value) => Some(*value),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value),
            _ => None,
        }
    }
}

/// Durable key-value storage provided by the host.
pub trait KeyValueStore: Send + Sync {
    /// Read a value, `None` when the key was never set.
    fn get(&self, key: &str) -> Result<Option<StoredValue>>;
    /// Insert or overwrite a value.
    fn set(&self, key: &str, value: StoredValue) -> Result<()>;
    /// Delete a value. Removing an absent key is not an error.
    fn remove(&self, key: &str) -> Result<()>;
}
