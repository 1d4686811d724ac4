//! Local filesystem storage provider.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

use crate::provider::{NamedProvider, ObjectInfo, StorageOps};
use invest_common::{Error, Result, StorageKey};

/// Local filesystem storage provider.
///
/// Every key maps to a file below the root directory, one directory level
/// per key segment.
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    /// Create a new local provider with the given root directory.
    ///
    /// # Postconditions
    /// - Root directory is created if it doesn't exist
    ///
    /// # Errors
    /// - Root exists but is not a directory
    /// - Permission denied
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();

        if root.exists() && !root.is_dir() {
            return Err(Error::InvalidInput(format!(
                "Storage root is not a directory: {}",
                root.display()
            )));
        }
        std::fs::create_dir_all(&root)?;

        Ok(Self { root })
    }

    /// Default root: `<data dir>/invest/storage`.
    pub fn default_root() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("invest")
            .join("storage")
    }

    /// Root directory objects are stored under.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn to_fs_path(&self, key: &StorageKey) -> PathBuf {
        let mut path = self.root.clone();
        for segment in key.segments() {
            path.push(segment);
        }
        path
    }

    fn object_info(key: StorageKey, fs_meta: &std::fs::Metadata) -> ObjectInfo {
        let modified: DateTime<Utc> = fs_meta
            .modified()
            .map(|t| t.into())
            .unwrap_or_else(|_| Utc::now());

        ObjectInfo {
            key,
            size: fs_meta.len(),
            modified,
            etag: Some(format!(
                "{}-{}",
                modified
                    .timestamp_nanos_opt()
                    .unwrap_or_else(|| modified.timestamp()),
                fs_meta.len()
            )),
        }
    }

    /// Metadata of the file behind `key`, or `None` if there is no file.
    async fn file_metadata(&self, key: &StorageKey) -> Result<Option<std::fs::Metadata>> {
        match fs::metadata(self.to_fs_path(key)).await {
            Ok(meta) if meta.is_file() => Ok(Some(meta)),
            Ok(_) => Ok(None),
            // A file where a parent directory would be also means no object
            Err(err)
                if matches!(
                    err.kind(),
                    std::io::ErrorKind::NotFound | std::io::ErrorKind::NotADirectory
                ) =>
            {
                Ok(None)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Stored key that `key` would nest under or shadow, if any.
    async fn conflicting_key(&self, key: &StorageKey) -> Result<Option<StorageKey>> {
        for ancestor in key.ancestors() {
            match fs::metadata(self.to_fs_path(&ancestor)).await {
                Ok(meta) if meta.is_file() => return Ok(Some(ancestor)),
                Ok(_) => {}
                // Nothing can exist below a missing directory
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
                Err(err) => return Err(err.into()),
            }
        }

        match fs::metadata(self.to_fs_path(key)).await {
            Ok(meta) if meta.is_dir() => {
                let below = self.list(Some(key)).await?;
                match below.into_iter().next() {
                    Some(info) => Ok(Some(info.key)),
                    None => Err(Error::Storage(format!(
                        "Directory without objects occupies key {}",
                        key
                    ))),
                }
            }
            Ok(_) => Ok(None),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// Remove directories left empty above a deleted key.
    async fn prune_empty_parents(&self, key: &StorageKey) {
        let ancestors: Vec<StorageKey> = key.ancestors().collect();
        for ancestor in ancestors.iter().rev() {
            // Fails once a directory still has entries
            if fs::remove_dir(self.to_fs_path(ancestor)).await.is_err() {
                break;
            }
        }
    }
}

impl NamedProvider for LocalStorage {
    const NAME: &'static str = "local";
    const DESCRIPTION: &'static str = "Files below a local root directory";

    fn from_config(options: &Value) -> Result<Self> {
        let root = match options.get("root") {
            None | Some(Value::Null) => Self::default_root(),
            Some(Value::String(root)) if !root.is_empty() => PathBuf::from(root),
            Some(_) => {
                return Err(Error::InvalidInput(
                    "Local provider 'root' must be a non-empty string".to_string(),
                ))
            }
        };
        Self::new(root)
    }
}

#[async_trait]
impl StorageOps for LocalStorage {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn put(&self, key: &StorageKey, data: Vec<u8>) -> Result<ObjectInfo> {
        if let Some(conflict) = self.conflicting_key(key).await? {
            return Err(Error::InvalidInput(format!(
                "Key {} conflicts with stored key {}",
                key, conflict
            )));
        }

        let fs_path = self.to_fs_path(key);
        if let Some(parent) = fs_path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&fs_path, &data).await?;
        debug!("Wrote {} bytes to {}", data.len(), fs_path.display());

        let fs_meta = fs::metadata(&fs_path).await?;
        Ok(Self::object_info(key.clone(), &fs_meta))
    }

    async fn get(&self, key: &StorageKey) -> Result<Vec<u8>> {
        if self.file_metadata(key).await?.is_none() {
            return Err(Error::NotFound(format!("Object not found: {}", key)));
        }
        Ok(fs::read(self.to_fs_path(key)).await?)
    }

    async fn exists(&self, key: &StorageKey) -> Result<bool> {
        Ok(self.file_metadata(key).await?.is_some())
    }

    async fn delete(&self, key: &StorageKey) -> Result<()> {
        if self.file_metadata(key).await?.is_none() {
            return Err(Error::NotFound(format!("Object not found: {}", key)));
        }
        fs::remove_file(self.to_fs_path(key)).await?;
        self.prune_empty_parents(key).await;
        Ok(())
    }

    async fn list(&self, prefix: Option<&StorageKey>) -> Result<Vec<ObjectInfo>> {
        let mut results = Vec::new();
        let mut pending: Vec<(PathBuf, Vec<String>)> = vec![(self.root.clone(), Vec::new())];

        while let Some((dir, segments)) = pending.pop() {
            let mut entries = fs::read_dir(&dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                let Some(name) = entry.file_name().to_str().map(String::from) else {
                    continue;
                };
                let mut child = segments.clone();
                child.push(name);

                let fs_meta = entry.metadata().await?;
                if fs_meta.is_dir() {
                    pending.push((entry.path(), child));
                } else if fs_meta.is_file() {
                    // Files that don't form a valid key were not written by us
                    let Ok(key) = StorageKey::from_segments(child) else {
                        continue;
                    };
                    if prefix.map_or(true, |p| key.starts_with(p)) {
                        results.push(Self::object_info(key, &fs_meta));
                    }
                }
            }
        }

        results.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn key(s: &str) -> StorageKey {
        StorageKey::parse(s).unwrap()
    }

    #[tokio::test]
    async fn test_local_put_get() {
        let temp = TempDir::new().unwrap();
        let storage = LocalStorage::new(temp.path()).unwrap();
        let data = b"Hello, Local!".to_vec();

        storage.put(&key("/quotes/AAPL.csv"), data.clone()).await.unwrap();

        assert_eq!(storage.get(&key("/quotes/AAPL.csv")).await.unwrap(), data);
        assert!(temp.path().join("quotes").join("AAPL.csv").is_file());
    }

    #[tokio::test]
    async fn test_local_directory_is_not_an_object() {
        let temp = TempDir::new().unwrap();
        let storage = LocalStorage::new(temp.path()).unwrap();
        storage.put(&key("/quotes/AAPL.csv"), vec![1]).await.unwrap();

        assert!(!storage.exists(&key("/quotes")).await.unwrap());
        assert!(matches!(
            storage.get(&key("/quotes")).await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_local_delete() {
        let temp = TempDir::new().unwrap();
        let storage = LocalStorage::new(temp.path()).unwrap();
        storage.put(&key("/a"), vec![1]).await.unwrap();

        storage.delete(&key("/a")).await.unwrap();
        assert!(!storage.exists(&key("/a")).await.unwrap());
        assert!(matches!(
            storage.delete(&key("/a")).await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_local_delete_prunes_empty_directories() {
        let temp = TempDir::new().unwrap();
        let storage = LocalStorage::new(temp.path()).unwrap();
        storage.put(&key("/quotes/2021/AAPL"), vec![1]).await.unwrap();

        storage.delete(&key("/quotes/2021/AAPL")).await.unwrap();
        assert!(!temp.path().join("quotes").exists());
        assert!(temp.path().is_dir());

        // The former directory path is free to hold an object again
        storage.put(&key("/quotes"), vec![2]).await.unwrap();
        assert_eq!(storage.get(&key("/quotes")).await.unwrap(), vec![2]);
    }

    #[tokio::test]
    async fn test_local_etag_changes_on_same_length_rewrite() {
        let temp = TempDir::new().unwrap();
        let storage = LocalStorage::new(temp.path()).unwrap();

        let first = storage.put(&key("/a"), vec![1, 2]).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        let second = storage.put(&key("/a"), vec![3, 4]).await.unwrap();

        assert_ne!(first.etag, second.etag);
    }

    #[tokio::test]
    async fn test_local_list_nested() {
        let temp = TempDir::new().unwrap();
        let storage = LocalStorage::new(temp.path()).unwrap();

        storage.put(&key("/quotes/MSFT"), vec![1]).await.unwrap();
        storage.put(&key("/quotes/2021/AAPL"), vec![2]).await.unwrap();
        storage.put(&key("/reports/q1"), vec![3]).await.unwrap();

        let listed = storage.list(Some(&key("/quotes"))).await.unwrap();
        let keys: Vec<String> = listed.iter().map(|i| i.key.to_string()).collect();
        assert_eq!(keys, vec!["/quotes/2021/AAPL", "/quotes/MSFT"]);

        assert_eq!(storage.list(None).await.unwrap().len(), 3);
    }

    #[test]
    fn test_from_config_root() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("nested");
        let storage =
            LocalStorage::from_config(&json!({ "root": root.to_string_lossy() })).unwrap();
        assert_eq!(storage.root(), root.as_path());
        assert!(root.is_dir());
    }

    #[test]
    fn test_from_config_rejects_bad_root() {
        assert!(matches!(
            LocalStorage::from_config(&json!({ "root": 42 })),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            LocalStorage::from_config(&json!({ "root": "" })),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_root_must_be_directory() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("file");
        std::fs::write(&file, b"x").unwrap();
        assert!(LocalStorage::new(&file).is_err());
    }
}
