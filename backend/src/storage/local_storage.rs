//! # Local Storage
//!
//! Device-side key/value persistence. The parent session lives here so a
//! parent does not have to re-enter the access code on every launch.
//!
//! `FileLocalStorage` keeps one file per key inside a directory;
//! `MemoryLocalStorage` is used for embedding and tests.

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::{debug, info};
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use super::paths;
use super::traits::LocalStorage;

/// Local storage with one file per key
#[derive(Clone)]
pub struct FileLocalStorage {
    directory: PathBuf,
}

impl FileLocalStorage {
    pub fn new<P: AsRef<Path>>(directory: P) -> Result<Self> {
        let directory = directory.as_ref().to_path_buf();
        if !directory.exists() {
            fs::create_dir_all(&directory)
                .with_context(|| format!("Failed to create local storage at {:?}", directory))?;
            info!("Created local storage directory: {:?}", directory);
        }
        Ok(Self { directory })
    }

    fn item_path(&self, key: &str) -> Result<PathBuf> {
        paths::validate_key(key)?;
        Ok(self.directory.join(key))
    }
}

#[async_trait]
impl LocalStorage for FileLocalStorage {
    async fn get_item(&self, key: &str) -> Result<Option<String>> {
        let path = self.item_path(key)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to read local item {:?}", path)),
        }
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let path = self.item_path(key)?;

        // Atomic write using temp file
        let temp_path = path.with_extension("tmp");
        tokio::fs::write(&temp_path, value)
            .await
            .with_context(|| format!("Failed to write local item {:?}", temp_path))?;
        tokio::fs::rename(&temp_path, &path)
            .await
            .with_context(|| format!("Failed to replace local item {:?}", path))?;

        debug!("Stored local item {}", key);
        Ok(())
    }

    async fn remove_items(&self, keys: &[&str]) -> Result<()> {
        for key in keys {
            let path = self.item_path(key)?;
            match tokio::fs::remove_file(&path).await {
                Ok(()) => debug!("Removed local item {}", key),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(e).with_context(|| format!("Failed to remove local item {:?}", path))
                }
            }
        }
        Ok(())
    }
}

/// Local storage kept in process memory
#[derive(Clone, Default)]
pub struct MemoryLocalStorage {
    items: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryLocalStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LocalStorage for MemoryLocalStorage {
    async fn get_item(&self, key: &str) -> Result<Option<String>> {
        let items = self
            .items
            .lock()
            .map_err(|_| anyhow::anyhow!("Local storage lock poisoned"))?;
        Ok(items.get(key).cloned())
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let mut items = self
            .items
            .lock()
            .map_err(|_| anyhow::anyhow!("Local storage lock poisoned"))?;
        items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove_items(&self, keys: &[&str]) -> Result<()> {
        let mut items = self
            .items
            .lock()
            .map_err(|_| anyhow::anyhow!("Local storage lock poisoned"))?;
        for key in keys {
            items.remove(*key);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_file_storage_round_trip_and_remove() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileLocalStorage::new(temp_dir.path().join("local")).unwrap();

        assert_eq!(storage.get_item("parentAccessCode").await.unwrap(), None);

        storage.set_item("parentAccessCode", "ABCDEFG$").await.unwrap();
        assert_eq!(
            storage.get_item("parentAccessCode").await.unwrap(),
            Some("ABCDEFG$".to_string())
        );

        storage
            .remove_items(&["parentAccessCode", "parentSession"])
            .await
            .unwrap();
        assert_eq!(storage.get_item("parentAccessCode").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_file_storage_overwrite_leaves_no_temp_file() {
        let temp_dir = TempDir::new().unwrap();
        let directory = temp_dir.path().join("local");
        let storage = FileLocalStorage::new(&directory).unwrap();

        storage.set_item("parentSession", "first").await.unwrap();
        storage.set_item("parentSession", "second").await.unwrap();

        assert_eq!(
            storage.get_item("parentSession").await.unwrap(),
            Some("second".to_string())
        );
        assert!(!directory.join("parentSession.tmp").exists());

        // Removing twice is not an error
        storage.remove_items(&["parentSession"]).await.unwrap();
        storage.remove_items(&["parentSession"]).await.unwrap();
        assert_eq!(storage.get_item("parentSession").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_file_storage_rejects_path_like_keys() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileLocalStorage::new(temp_dir.path()).unwrap();

        assert!(storage.set_item("../escape", "x").await.is_err());
    }

    #[tokio::test]
    async fn test_memory_storage() {
        let storage = MemoryLocalStorage::new();
        storage.set_item("parentSession", "{}").await.unwrap();
        assert_eq!(storage.get_item("parentSession").await.unwrap(), Some("{}".to_string()));

        storage.remove_items(&["parentSession"]).await.unwrap();
        assert_eq!(storage.get_item("parentSession").await.unwrap(), None);
    }
}
