//! In-memory storage provider.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

use crate::provider::{NamedProvider, ObjectInfo, StorageOps};
use invest_common::{Error, Result, StorageKey};

#[derive(Debug, Clone)]
struct Object {
    data: Vec<u8>,
    info: ObjectInfo,
}

/// In-memory storage provider.
///
/// Useful for testing and development. All data is lost on drop.
#[derive(Default)]
pub struct MemoryStorage {
    objects: RwLock<BTreeMap<StorageKey, Object>>,
}

impl MemoryStorage {
    /// Create a new empty memory provider.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, BTreeMap<StorageKey, Object>>> {
        self.objects
            .read()
            .map_err(|_| Error::Storage("memory storage lock poisoned".to_string()))
    }

    /// Stored key that `key` would nest under or shadow, if any.
    fn conflicting_key(
        objects: &BTreeMap<StorageKey, Object>,
        key: &StorageKey,
    ) -> Option<StorageKey> {
        if let Some(ancestor) = key.ancestors().find(|a| objects.contains_key(a)) {
            return Some(ancestor);
        }
        // Descendants sort directly after the key itself
        objects
            .range((Bound::Excluded(key), Bound::Unbounded))
            .next()
            .map(|(next, _)| next)
            .filter(|next| next.starts_with(key))
            .cloned()
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, BTreeMap<StorageKey, Object>>> {
        self.objects
            .write()
            .map_err(|_| Error::Storage("memory storage lock poisoned".to_string()))
    }
}

impl NamedProvider for MemoryStorage {
    const NAME: &'static str = "memory";
    const DESCRIPTION: &'static str = "Volatile in-process storage";

    fn from_config(_options: &Value) -> Result<Self> {
        Ok(Self::new())
    }
}

#[async_trait]
impl StorageOps for MemoryStorage {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn put(&self, key: &StorageKey, data: Vec<u8>) -> Result<ObjectInfo> {
        let mut objects = self.write()?;
        if let Some(conflict) = Self::conflicting_key(&objects, key) {
            return Err(Error::InvalidInput(format!(
                "Key {} conflicts with stored key {}",
                key, conflict
            )));
        }

        let info = ObjectInfo {
            key: key.clone(),
            size: data.len() as u64,
            modified: Utc::now(),
            etag: Some(Uuid::new_v4().to_string()),
        };
        objects.insert(
            key.clone(),
            Object {
                data,
                info: info.clone(),
            },
        );
        Ok(info)
    }

    async fn get(&self, key: &StorageKey) -> Result<Vec<u8>> {
        self.read()?
            .get(key)
            .map(|object| object.data.clone())
            .ok_or_else(|| Error::NotFound(format!("Object not found: {}", key)))
    }

    async fn exists(&self, key: &StorageKey) -> Result<bool> {
        Ok(self.read()?.contains_key(key))
    }

    async fn delete(&self, key: &StorageKey) -> Result<()> {
        self.write()?
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| Error::NotFound(format!("Object not found: {}", key)))
    }

    async fn list(&self, prefix: Option<&StorageKey>) -> Result<Vec<ObjectInfo>> {
        // BTreeMap iteration is already key-ordered
        Ok(self
            .read()?
            .values()
            .filter(|object| prefix.map_or(true, |p| object.info.key.starts_with(p)))
            .map(|object| object.info.clone())
            .collect())
    }
}
