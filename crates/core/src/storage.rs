//! Key/value storage backing the credential store
//!
//! The browser frontend keeps its session in local storage; these types play
//! the same role for native clients. Access is synchronous and process-local.

use crate::{CoreError, CoreResult};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// Synchronous string key/value store
pub trait SessionStorage: Send + Sync {
    fn get_item(&self, key: &str) -> Option<String>;
    fn set_item(&self, key: &str, value: &str) -> CoreResult<()>;
    fn remove_item(&self, key: &str) -> CoreResult<()>;

    /// Remove several keys as one write where the backend supports it
    fn remove_items(&self, keys: &[&str]) -> CoreResult<()> {
        for key in keys {
            self.remove_item(key)?;
        }
        Ok(())
    }
}

/// Process-local storage that forgets everything on exit
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SessionStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        self.entries().get(key).cloned()
    }

    fn set_item(&self, key: &str, value: &str) -> CoreResult<()> {
        self.entries().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> CoreResult<()> {
        self.entries().remove(key);
        Ok(())
    }

    fn remove_items(&self, keys: &[&str]) -> CoreResult<()> {
        let mut entries = self.entries();
        for key in keys {
            entries.remove(*key);
        }
        Ok(())
    }
}

/// Storage persisted as a JSON object in a single file.
///
/// Entries are cached in memory; every mutation rewrites the whole file.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileStorage {
    /// Open the file at `path`, starting empty if it does not exist yet
    pub fn open(path: impl Into<PathBuf>) -> CoreResult<Self> {
        let path = path.into();
        let entries = if path.exists() {
            let content = std::fs::read_to_string(&path)
                .map_err(|e| CoreError::storage(path.display().to_string(), e.to_string()))?;
            if content.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&content)?
            }
        } else {
            BTreeMap::new()
        };

        debug!(path = %path.display(), entries = entries.len(), "Opened session storage");

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    fn entries(&self) -> MutexGuard<'_, BTreeMap<String, String>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply `change` to a copy of the entries, persist the copy and only
    /// then replace the cache. A failed write leaves the cache untouched.
    fn commit<F>(&self, change: F) -> CoreResult<()>
    where
        F: FnOnce(&mut BTreeMap<String, String>) -> bool,
    {
        let mut entries = self.entries();
        let mut updated = entries.clone();
        if !change(&mut updated) {
            return Ok(());
        }

        self.flush(&updated)?;
        *entries = updated;
        Ok(())
    }

    /// Write `entries` to a sibling temp file and rename it over the session
    /// file, so readers never observe a partial write.
    fn flush(&self, entries: &BTreeMap<String, String>) -> CoreResult<()> {
        let storage_err = |e: std::io::Error| {
            CoreError::storage(self.path.display().to_string(), e.to_string())
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(storage_err)?;
            }
        }

        let content = serde_json::to_string_pretty(entries)?;
        let tmp_path = temp_path(&self.path);

        let written = write_private(&tmp_path, &content)
            .and_then(|()| std::fs::rename(&tmp_path, &self.path));
        if let Err(e) = written {
            // Best effort: the temp file is useless once the rename failed.
            let _ = std::fs::remove_file(&tmp_path);
            return Err(storage_err(e));
        }

        Ok(())
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Write `content` to `path`, readable by the owner only on Unix
fn write_private(path: &Path, content: &str) -> std::io::Result<()> {
    std::fs::write(path, content)?;

    // Tokens are secrets: owner read/write only
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    }

    Ok(())
}

impl SessionStorage for FileStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        self.entries().get(key).cloned()
    }

    fn set_item(&self, key: &str, value: &str) -> CoreResult<()> {
        self.commit(|entries| {
            entries.insert(key.to_string(), value.to_string());
            true
        })
    }

    fn remove_item(&self, key: &str) -> CoreResult<()> {
        self.commit(|entries| entries.remove(key).is_some())
    }

    fn remove_items(&self, keys: &[&str]) -> CoreResult<()> {
        self.commit(|entries| {
            let before = entries.len();
            for key in keys {
                entries.remove(*key);
            }
            entries.len() != before
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_memory_storage_set_get_remove() {
        let storage = MemoryStorage::new();
        assert_eq!(storage.get_item("token"), None);

        storage.set_item("token", "abc").unwrap();
        assert_eq!(storage.get_item("token").as_deref(), Some("abc"));

        storage.remove_item("token").unwrap();
        assert_eq!(storage.get_item("token"), None);
    }

    #[test]
    fn test_memory_storage_remove_items() {
        let storage = MemoryStorage::new();
        storage.set_item("a", "1").unwrap();
        storage.set_item("b", "2").unwrap();
        storage.set_item("c", "3").unwrap();

        storage.remove_items(&["a", "b"]).unwrap();
        assert_eq!(storage.get_item("a"), None);
        assert_eq!(storage.get_item("b"), None);
        assert_eq!(storage.get_item("c").as_deref(), Some("3"));
    }

    #[test]
    fn test_file_storage_persists_across_opens() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("session.json");

        let storage = FileStorage::open(&path).unwrap();
        storage.set_item("token", "abc").unwrap();
        storage.set_item("refresh_token", "def").unwrap();
        drop(storage);

        let reopened = FileStorage::open(&path).unwrap();
        assert_eq!(reopened.get_item("token").as_deref(), Some("abc"));
        assert_eq!(reopened.get_item("refresh_token").as_deref(), Some("def"));

        reopened.remove_items(&["token", "refresh_token"]).unwrap();
        let emptied = FileStorage::open(&path).unwrap();
        assert_eq!(emptied.get_item("token"), None);
        assert_eq!(emptied.get_item("refresh_token"), None);
    }

    #[test]
    fn test_file_storage_rejects_corrupt_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "not json").unwrap();

        let result = FileStorage::open(&path);
        assert!(matches!(result, Err(CoreError::Serialization { .. })));
    }

    #[test]
    fn test_file_storage_treats_blank_file_as_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "\n").unwrap();

        let storage = FileStorage::open(&path).unwrap();
        assert_eq!(storage.get_item("token"), None);
    }

    #[test]
    fn test_file_storage_failed_write_keeps_cache() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session.json");

        let storage = FileStorage::open(&path).unwrap();
        storage.set_item("token", "T1").unwrap();
        storage.set_item("refresh_token", "R1").unwrap();

        // A directory in place of the file makes every later write fail
        std::fs::remove_file(&path).unwrap();
        std::fs::create_dir(&path).unwrap();

        let result = storage.set_item("token", "T2");
        assert!(matches!(result, Err(CoreError::Storage { .. })));
        assert_eq!(storage.get_item("token").as_deref(), Some("T1"));

        let result = storage.remove_items(&["token", "refresh_token"]);
        assert!(matches!(result, Err(CoreError::Storage { .. })));
        assert_eq!(storage.get_item("token").as_deref(), Some("T1"));
        assert_eq!(storage.get_item("refresh_token").as_deref(), Some("R1"));

        assert!(!dir.path().join("session.json.tmp").exists());
    }

    #[test]
    fn test_file_storage_write_replaces_whole_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session.json");

        let storage = FileStorage::open(&path).unwrap();
        storage.set_item("token", "T1").unwrap();
        storage.remove_item("token").unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.trim(), "{}");
        assert!(!dir.path().join("session.json.tmp").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_file_storage_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "{}").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

        let storage = FileStorage::open(&path).unwrap();
        storage.set_item("refresh_token", "R1").unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
