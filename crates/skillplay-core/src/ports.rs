//! Boundaries to the outside world: durable storage, the page location and
//! the clipboard. Each has an in-memory implementation so the controller and
//! history can be exercised headlessly.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use tracing::warn;

use crate::error::{PlaygroundError, Result};
use crate::paths;
use crate::run_config::{RunConfig, StoredConfig};

pub const LAST_CONFIG_KEY: &str = "last-config";
pub const HISTORY_KEY: &str = "history";

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ---------------------------------------------------------------------------
// PersistencePort
// ---------------------------------------------------------------------------

/// Keyed string storage, the durable half of the playground's state.
pub trait PersistencePort: Send + Sync {
    fn load(&self, key: &str) -> Result<Option<String>>;
    fn save(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// One JSON file per key under `<root>/.skillplay/store/`.
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl PersistencePort for FileStore {
    fn load(&self, key: &str) -> Result<Option<String>> {
        crate::io::read_if_exists(&paths::store_entry(&self.root, key))
    }

    fn save(&self, key: &str, value: &str) -> Result<()> {
        crate::io::atomic_write(&paths::store_entry(&self.root, key), value.as_bytes())
    }

    fn remove(&self, key: &str) -> Result<()> {
        crate::io::remove_if_exists(&paths::store_entry(&self.root, key))
    }
}

/// In-memory storage. `set_failing(true)` makes every call error, the way a
/// browser store does when quota is exhausted or access is denied.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
    failing: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Seed or overwrite an entry directly, bypassing the failure switch.
    pub fn insert_raw(&self, key: &str, value: &str) {
        lock(&self.entries).insert(key.to_string(), value.to_string());
    }

    pub fn get_raw(&self, key: &str) -> Option<String> {
        lock(&self.entries).get(key).cloned()
    }

    fn check(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(PlaygroundError::Storage("storage unavailable".into()));
        }
        Ok(())
    }
}

impl PersistencePort for MemoryStore {
    fn load(&self, key: &str) -> Result<Option<String>> {
        self.check()?;
        Ok(self.get_raw(key))
    }

    fn save(&self, key: &str, value: &str) -> Result<()> {
        self.check()?;
        self.insert_raw(key, value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.check()?;
        lock(&self.entries).remove(key);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Last-used configuration
// ---------------------------------------------------------------------------

/// Best-effort save of the last-used configuration. Failures are logged and dropped.
pub fn save_last_config(port: &dyn PersistencePort, config: &RunConfig) {
    let result = serde_json::to_string(&StoredConfig::from(config))
        .map_err(PlaygroundError::from)
        .and_then(|json| port.save(LAST_CONFIG_KEY, &json));
    if let Err(e) = result {
        warn!(error = %e, "failed to persist last configuration");
    }
}

/// Load the last-used configuration; unreadable or corrupt records read as absent.
pub fn load_last_config(port: &dyn PersistencePort) -> Option<StoredConfig> {
    match port.load(LAST_CONFIG_KEY) {
        Ok(Some(raw)) => StoredConfig::parse(&raw),
        Ok(None) => None,
        Err(e) => {
            warn!(error = %e, "failed to read last configuration");
            None
        }
    }
}

// ---------------------------------------------------------------------------
// ShareLinkPort
// ---------------------------------------------------------------------------

/// The page location: where share links point and where shared state is read.
pub trait ShareLinkPort: Send + Sync {
    fn origin(&self) -> String;
    /// Current query string including the leading `?`, if any.
    fn query(&self) -> Option<String>;
    fn replace_query(&self, query: &str) -> Result<()>;
}

pub struct MemoryLocation {
    origin: String,
    query: Mutex<Option<String>>,
}

impl MemoryLocation {
    pub fn new(origin: impl Into<String>, query: Option<String>) -> Self {
        Self {
            origin: origin.into(),
            query: Mutex::new(query),
        }
    }
}

impl ShareLinkPort for MemoryLocation {
    fn origin(&self) -> String {
        self.origin.clone()
    }

    fn query(&self) -> Option<String> {
        lock(&self.query).clone()
    }

    fn replace_query(&self, query: &str) -> Result<()> {
        *lock(&self.query) = Some(query.to_string());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// ClipboardPort
// ---------------------------------------------------------------------------

pub trait ClipboardPort: Send + Sync {
    fn write_text(&self, text: &str) -> Result<()>;
}

#[derive(Default)]
pub struct MemoryClipboard {
    contents: Mutex<Option<String>>,
    failing: AtomicBool,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn contents(&self) -> Option<String> {
        lock(&self.contents).clone()
    }
}

impl ClipboardPort for MemoryClipboard {
    fn write_text(&self, text: &str) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(PlaygroundError::Clipboard("permission denied".into()));
        }
        *lock(&self.contents) = Some(text.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn file_store_roundtrip_and_remove() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path());
        assert_eq!(store.load("history").unwrap(), None);
        store.save("history", "[]").unwrap();
        assert_eq!(store.load("history").unwrap().as_deref(), Some("[]"));
        assert!(dir.path().join(".skillplay/store/history.json").exists());
        store.remove("history").unwrap();
        assert_eq!(store.load("history").unwrap(), None);
    }

    #[test]
    fn memory_store_failure_switch() {
        let store = MemoryStore::new();
        store.save("k", "v").unwrap();
        store.set_failing(true);
        assert!(store.load("k").is_err());
        assert!(store.save("k", "w").is_err());
        store.set_failing(false);
        assert_eq!(store.load("k").unwrap().as_deref(), Some("v"));
    }

    #[test]
    fn last_config_roundtrip() {
        let store = MemoryStore::new();
        let config = RunConfig::new("weather", "claude-sonnet").with_param("days", "3");
        save_last_config(&store, &config);
        let stored = load_last_config(&store).unwrap();
        assert_eq!(stored, StoredConfig::from(&config));
    }

    #[test]
    fn last_config_failures_are_swallowed() {
        let store = MemoryStore::new();
        store.set_failing(true);
        save_last_config(&store, &RunConfig::new("weather", "m"));
        assert!(load_last_config(&store).is_none());
    }

    #[test]
    fn corrupt_last_config_reads_as_absent() {
        let store = MemoryStore::new();
        store.insert_raw(LAST_CONFIG_KEY, "{{{");
        assert!(load_last_config(&store).is_none());
    }

    #[test]
    fn memory_location_replace_query() {
        let loc = MemoryLocation::new("https://skillplay.dev/playground", None);
        assert_eq!(loc.query(), None);
        loc.replace_query("?skill=weather").unwrap();
        assert_eq!(loc.query().as_deref(), Some("?skill=weather"));
    }
}
