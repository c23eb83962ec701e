//! Client session identity.
//!
//! The backend scopes documents and chat history by a session id that the
//! client makes up once and then keeps across restarts.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use ragchat_config::{expand_tilde, StorageConfig};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Key the session id is stored under
pub const SESSION_KEY: &str = "rag_session_id";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Small persistent string map
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// Store backed by a JSON object file
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> Result<BTreeMap<String, String>, StoreError> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let content = std::fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        Ok(serde_json::from_str(&content)?)
    }

    fn write_map(&self, map: &BTreeMap<String, String>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(map)?;
        std::fs::write(&self.path, content)?;

        // Set restrictive permissions (Unix only)
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            let _ = std::fs::set_permissions(&self.path, perms);
        }

        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let _guard = self.lock.lock();
        Ok(self.read_map()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let _guard = self.lock.lock();
        let mut map = self.read_map()?;
        map.insert(key.to_string(), value.to_string());
        self.write_map(&map)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let _guard = self.lock.lock();
        let mut map = self.read_map()?;
        if map.remove(key).is_some() {
            self.write_map(&map)?;
        }
        Ok(())
    }
}

/// Non-persistent store
#[derive(Debug, Default)]
pub struct MemoryStore {
    map: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.map.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.map.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.map.lock().remove(key);
        Ok(())
    }
}

/// Pick the store described by the storage config
pub fn open_store(config: &StorageConfig) -> Box<dyn KeyValueStore> {
    match config.state_file.as_deref().and_then(expand_tilde) {
        Some(path) => {
            debug!("Using state file {:?}", path);
            Box::new(FileStore::new(path))
        }
        None => {
            info!("No state file configured, session id will not persist");
            Box::new(MemoryStore::new())
        }
    }
}

pub struct SessionIdentity;

impl SessionIdentity {
    /// Return the stored session id, creating and storing one on first use.
    ///
    /// Storage failures are logged and the generated id is used in memory.
    pub fn get_or_create(store: &dyn KeyValueStore) -> String {
        match store.get(SESSION_KEY) {
            Ok(Some(id)) if !id.trim().is_empty() => return id,
            Ok(_) => {}
            Err(e) => warn!("Could not read session id: {}", e),
        }

        let id = Uuid::new_v4().to_string();
        match store.set(SESSION_KEY, &id) {
            Ok(()) => info!("Created new session {}", id),
            Err(e) => warn!("Could not persist session id, using it for this run only: {}", e),
        }
        id
    }

    /// Forget the stored id; the next `get_or_create` makes a new one
    pub fn reset(store: &dyn KeyValueStore) -> Result<(), StoreError> {
        store.remove(SESSION_KEY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_id_is_stable() {
        let store = MemoryStore::new();
        let first = SessionIdentity::get_or_create(&store);
        let second = SessionIdentity::get_or_create(&store);
        assert_eq!(first, second);
        assert!(Uuid::parse_str(&first).is_ok());
    }

    #[test]
    fn test_reset_yields_new_id() {
        let store = MemoryStore::new();
        let first = SessionIdentity::get_or_create(&store);
        SessionIdentity::reset(&store).unwrap();
        let second = SessionIdentity::get_or_create(&store);
        assert_ne!(first, second);
    }

    #[test]
    fn test_file_store_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("state.json");

        let first = SessionIdentity::get_or_create(&FileStore::new(&path));
        let second = SessionIdentity::get_or_create(&FileStore::new(&path));
        assert_eq!(first, second);

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains(SESSION_KEY));
    }

    #[test]
    fn test_file_store_keeps_other_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("state.json"));
        store.set("theme", "dark").unwrap();
        SessionIdentity::get_or_create(&store);
        SessionIdentity::reset(&store).unwrap();

        assert_eq!(store.get("theme").unwrap().as_deref(), Some("dark"));
        assert_eq!(store.get(SESSION_KEY).unwrap(), None);
    }

    #[test]
    fn test_unreadable_store_falls_back_to_memory_id() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "not json").unwrap();
        let store = FileStore::new(&path);

        let first = SessionIdentity::get_or_create(&store);
        assert!(!first.is_empty());
        // the corrupt file is left alone
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "not json");
    }

    #[test]
    fn test_open_store_without_file_is_memory() {
        let store = open_store(&StorageConfig { state_file: None });
        store.set("k", "v").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));
    }
}
