use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

const STORE_FILE: &str = "store.json";

/// Logical keys of the persisted client state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StoreKey {
    BridgeUrl,
    Secret,
    DisplayName,
    DefaultRecipients,
    Draft,
    History,
}

impl StoreKey {
    pub const ALL: [StoreKey; 6] = [
        StoreKey::BridgeUrl,
        StoreKey::Secret,
        StoreKey::DisplayName,
        StoreKey::DefaultRecipients,
        StoreKey::Draft,
        StoreKey::History,
    ];

    /// Keys owned by the session; cleared on logout.
    pub const SESSION: [StoreKey; 3] = [
        StoreKey::Secret,
        StoreKey::DisplayName,
        StoreKey::DefaultRecipients,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StoreKey::BridgeUrl => "bridge_url",
            StoreKey::Secret => "secret",
            StoreKey::DisplayName => "display_name",
            StoreKey::DefaultRecipients => "default_recipients",
            StoreKey::Draft => "draft",
            StoreKey::History => "history",
        }
    }
}

/// String key/value persistence behind the session store.
pub trait KeyValueStore {
    fn get(&self, key: StoreKey) -> Option<String>;
    fn set(&mut self, key: StoreKey, value: String) -> Result<()>;
    fn delete(&mut self, key: StoreKey) -> Result<()>;
}

/// Volatile store, used by tests and one-shot runs.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: BTreeMap<StoreKey, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: StoreKey) -> Option<String> {
        self.entries.get(&key).cloned()
    }

    fn set(&mut self, key: StoreKey, value: String) -> Result<()> {
        self.entries.insert(key, value);
        Ok(())
    }

    fn delete(&mut self, key: StoreKey) -> Result<()> {
        self.entries.remove(&key);
        Ok(())
    }
}

/// Memory store whose writes to one key always fail.
#[cfg(test)]
#[derive(Debug)]
pub(crate) struct FailingStore {
    inner: MemoryStore,
    fail_on: StoreKey,
}

#[cfg(test)]
impl FailingStore {
    pub(crate) fn new(fail_on: StoreKey) -> Self {
        Self {
            inner: MemoryStore::new(),
            fail_on,
        }
    }
}

#[cfg(test)]
impl KeyValueStore for FailingStore {
    fn get(&self, key: StoreKey) -> Option<String> {
        self.inner.get(key)
    }

    fn set(&mut self, key: StoreKey, value: String) -> Result<()> {
        if key == self.fail_on {
            anyhow::bail!("disk full");
        }
        self.inner.set(key, value)
    }

    fn delete(&mut self, key: StoreKey) -> Result<()> {
        self.inner.delete(key)
    }
}

/// Store backed by a single JSON object in the state directory.
///
/// Every mutation rewrites the file. The file holds the session secret, so
/// it is created with `0600` permissions.
pub struct FileStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl FileStore {
    /// Load from disk, or start empty.
    pub fn load(state_dir: &Path) -> Result<Self> {
        let path = state_dir.join(STORE_FILE);
        let entries = if path.exists() {
            let data = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            serde_json::from_str(&data)
                .with_context(|| format!("invalid store file {}", path.display()))?
        } else {
            BTreeMap::new()
        };
        Ok(Self { path, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self) -> Result<()> {
        let data = serde_json::to_string_pretty(&self.entries)?;
        std::fs::write(&self.path, data)
            .with_context(|| format!("failed to write {}", self.path.display()))?;
        #[cfg(unix)]
        {
            std::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))
                .with_context(|| format!("failed to set permissions on {}", self.path.display()))?;
        }
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: StoreKey) -> Option<String> {
        self.entries.get(key.as_str()).cloned()
    }

    fn set(&mut self, key: StoreKey, value: String) -> Result<()> {
        self.entries.insert(key.as_str().to_string(), value);
        self.save()
    }

    fn delete(&mut self, key: StoreKey) -> Result<()> {
        if self.entries.remove(key.as_str()).is_some() {
            self.save()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_set_get_delete() {
        let mut store = MemoryStore::new();
        assert_eq!(store.get(StoreKey::Draft), None);
        store.set(StoreKey::Draft, "555".into()).unwrap();
        assert_eq!(store.get(StoreKey::Draft).as_deref(), Some("555"));
        store.delete(StoreKey::Draft).unwrap();
        assert_eq!(store.get(StoreKey::Draft), None);
    }

    #[test]
    fn file_store_persists_across_loads() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut store = FileStore::load(dir.path()).unwrap();
            store.set(StoreKey::Secret, "s3cret".into()).unwrap();
            store.set(StoreKey::Draft, "5551234567".into()).unwrap();
            store.delete(StoreKey::Draft).unwrap();
        }
        let store = FileStore::load(dir.path()).unwrap();
        assert_eq!(store.get(StoreKey::Secret).as_deref(), Some("s3cret"));
        assert_eq!(store.get(StoreKey::Draft), None);
    }

    #[test]
    fn file_store_uses_readable_key_names() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::load(dir.path()).unwrap();
        store
            .set(StoreKey::DefaultRecipients, "[]".into())
            .unwrap();
        let raw = std::fs::read_to_string(store.path()).unwrap();
        assert!(raw.contains("\"default_recipients\""));
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(STORE_FILE), "not json").unwrap();
        let err = FileStore::load(dir.path()).err().unwrap();
        assert!(err.to_string().contains("invalid store file"));
    }

    #[cfg(unix)]
    #[test]
    fn file_store_is_private() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::load(dir.path()).unwrap();
        store.set(StoreKey::Secret, "x".into()).unwrap();
        let meta = std::fs::metadata(store.path()).unwrap();
        assert_eq!(meta.permissions().mode() & 0o777, 0o600);
    }

    #[test]
    fn key_names_are_unique() {
        let mut names: Vec<_> = StoreKey::ALL.iter().map(|k| k.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), StoreKey::ALL.len());
    }
}
