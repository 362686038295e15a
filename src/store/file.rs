//! JSON-file backed store.
//!
//! The whole map is loaded once at open and rewritten on every mutation via a
//! temp file + rename, so a crash mid-write leaves the previous file intact.

use super::{KeyValueStore, StoredValue};
use crate::error::{NotifyError, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::warn;

pub struct JsonFileStore {
    path: PathBuf,
    values: Mutex<BTreeMap<String, StoredValue>>,
}

impl JsonFileStore {
    /// Open (or lazily create) the store at `path`.
    ///
    /// A malformed file is logged and treated as empty; it is replaced on the
    /// next write.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let values = read_values(&path)?;
        Ok(Self {
            path,
            values: Mutex::new(values),
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn mutate(&self, apply: impl FnOnce(&mut BTreeMap<String, StoredValue>)) -> Result<()> {
        let mut values = self
            .values
            .lock()
            .map_err(|_| NotifyError::Storage("settings lock poisoned".to_owned()))?;
        let mut next = values.clone();
        apply(&mut next);
        write_values(&self.path, &next)?;
        *values = next;
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<StoredValue>> {
        let values = self
            .values
            .lock()
            .map_err(|_| NotifyError::Storage("settings lock poisoned".to_owned()))?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: StoredValue) -> Result<()> {
        self.mutate(|values| {
            values.insert(key.to_owned(), value);
        })
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.mutate(|values| {
            values.remove(key);
        })
    }
}

fn read_values(path: &Path) -> Result<BTreeMap<String, StoredValue>> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
        Err(e) => {
            return Err(NotifyError::Storage(format!(
                "cannot read settings at {}: {e}",
                path.display()
            )));
        }
    };

    match serde_json::from_slice(&bytes) {
        Ok(values) => Ok(values),
        Err(e) => {
            warn!(
                "ignoring malformed settings file at {}: {e}",
                path.display()
            );
            Ok(BTreeMap::new())
        }
    }
}

fn write_values(path: &Path, values: &BTreeMap<String, StoredValue>) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| NotifyError::Storage(format!("cannot create settings dir: {e}")))?;
    }

    let tmp_path = path.with_extension("tmp");
    let json = serde_json::to_vec_pretty(values)
        .map_err(|e| NotifyError::Storage(format!("cannot serialize settings: {e}")))?;
    std::fs::write(&tmp_path, json)
        .map_err(|e| NotifyError::Storage(format!("cannot write settings temp file: {e}")))?;
    std::fs::rename(&tmp_path, path)
        .map_err(|e| NotifyError::Storage(format!("cannot finalize settings file: {e}")))?;
    Ok(())
}
