//! Key-value preference storage.
//!
//! The only consumer is the deny-list, which keeps a single list of
//! strings under one key. Preferences are stored as a flat JSON object at
//! `<data_dir>/preferences.json`.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use anyhow::{Context, Result};
use serde_json::Value;

pub trait PreferenceStore: Send + Sync {
    /// The list stored under `key`, or `None` if the key was never written.
    fn string_list(&self, key: &str) -> Result<Option<Vec<String>>>;

    fn set_string_list(&self, key: &str, values: &[String]) -> Result<()>;
}

pub struct JsonFilePreferences {
    path: PathBuf,
    // Serializes read-modify-write cycles on the file.
    write_lock: Mutex<()>,
}

impl JsonFilePreferences {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    fn load(&self) -> Result<BTreeMap<String, Value>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let contents = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read preferences: {}", self.path.display()))?;
        if contents.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse preferences: {}", self.path.display()))
    }
}

impl PreferenceStore for JsonFilePreferences {
    fn string_list(&self, key: &str) -> Result<Option<Vec<String>>> {
        match self.load()?.remove(key) {
            Some(value) => {
                let list = serde_json::from_value(value)
                    .with_context(|| format!("Preference '{}' is not a list of strings", key))?;
                Ok(Some(list))
            }
            None => Ok(None),
        }
    }

    fn set_string_list(&self, key: &str, values: &[String]) -> Result<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut prefs = self.load()?;
        prefs.insert(key.to_string(), serde_json::to_value(values)?);

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(&prefs)?;
        std::fs::write(&self.path, contents)
            .with_context(|| format!("Failed to write preferences: {}", self.path.display()))?;
        Ok(())
    }
}

/// Process-local preferences, for tests and throwaway sessions.
#[derive(Default)]
pub struct MemoryPreferences {
    values: Mutex<HashMap<String, Vec<String>>>,
}

impl MemoryPreferences {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for MemoryPreferences {
    fn string_list(&self, key: &str) -> Result<Option<Vec<String>>> {
        let values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(values.get(key).cloned())
    }

    fn set_string_list(&self, key: &str, values: &[String]) -> Result<()> {
        let mut stored = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        stored.insert(key.to_string(), values.to_vec());
        Ok(())
    }
}
