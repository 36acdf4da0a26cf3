//! Durable storage for the two session keys.
//!
//! Only the bearer token and the serialized identity survive the process.
//! Writes and removals are batched so both keys always change together.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Key holding the serialized identity JSON.
pub const USER_KEY: &str = "darkwatch_user";
/// Key holding the bearer token string.
pub const TOKEN_KEY: &str = "darkwatch_token";

/// Key/value persistence used by the session store.
pub trait SessionStorage: Send + Sync {
    fn load(&self, key: &str) -> Option<String>;
    fn save(&self, entries: &[(&str, &str)]) -> Result<()>;
    fn remove(&self, keys: &[&str]) -> Result<()>;
}

/// JSON object on disk, rewritten through a temporary file on every change.
#[derive(Debug)]
pub struct FileSessionStorage {
    path: PathBuf,
}

impl FileSessionStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> HashMap<String, String> {
        match fs::read_to_string(&self.path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!("Ignoring corrupted session file {}: {}", self.path.display(), e);
                HashMap::new()
            }),
            Err(_) => HashMap::new(),
        }
    }

    fn write_all(&self, entries: &HashMap<String, String>) -> Result<()> {
        if entries.is_empty() {
            if self.path.exists() {
                fs::remove_file(&self.path).with_context(|| {
                    format!("Failed to remove session file {}", self.path.display())
                })?;
            }
            return Ok(());
        }

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create session directory {}", parent.display())
            })?;
        }

        let tmp_path = self.path.with_extension("json.tmp");
        let content = serde_json::to_string_pretty(entries).context("Failed to encode session")?;
        fs::write(&tmp_path, content)
            .with_context(|| format!("Failed to write {}", tmp_path.display()))?;
        fs::rename(&tmp_path, &self.path)
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;
        Ok(())
    }
}

impl SessionStorage for FileSessionStorage {
    fn load(&self, key: &str) -> Option<String> {
        self.read_all().remove(key)
    }

    fn save(&self, entries: &[(&str, &str)]) -> Result<()> {
        let mut stored = self.read_all();
        for (key, value) in entries {
            stored.insert(key.to_string(), value.to_string());
        }
        self.write_all(&stored)
    }

    fn remove(&self, keys: &[&str]) -> Result<()> {
        let mut stored = self.read_all();
        let before = stored.len();
        stored.retain(|key, _| !keys.contains(&key.as_str()));
        if stored.len() == before && !self.path.exists() {
            return Ok(());
        }
        self.write_all(&stored)
    }
}

/// Process-local storage, for embedding and tests.
#[derive(Debug, Default)]
pub struct MemorySessionStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemorySessionStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries(entries: &[(&str, &str)]) -> Self {
        let storage = Self::new();
        for (key, value) in entries {
            storage.lock().insert(key.to_string(), value.to_string());
        }
        storage
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        // a poisoned map is still a valid map
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl SessionStorage for MemorySessionStorage {
    fn load(&self, key: &str) -> Option<String> {
        self.lock().get(key).cloned()
    }

    fn save(&self, entries: &[(&str, &str)]) -> Result<()> {
        let mut stored = self.lock();
        for (key, value) in entries {
            stored.insert(key.to_string(), value.to_string());
        }
        Ok(())
    }

    fn remove(&self, keys: &[&str]) -> Result<()> {
        self.lock().retain(|key, _| !keys.contains(&key.as_str()));
        Ok(())
    }
}
