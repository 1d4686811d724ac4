//! Storage capability definition.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use invest_common::{Result, StorageKey};

/// Information about a stored object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectInfo {
    /// Key the object is stored under.
    pub key: StorageKey,
    /// Size in bytes.
    pub size: u64,
    /// Last modification time.
    pub modified: DateTime<Utc>,
    /// Revision tag, changes on every write (within the backend's
    /// timestamp resolution).
    pub etag: Option<String>,
}

/// Capability every storage backend implements.
///
/// Implementations are shared across tasks as `Arc<dyn StorageOps>`.
#[async_trait]
pub trait StorageOps: Send + Sync {
    /// Name the provider is registered under (e.g., "memory", "local").
    fn name(&self) -> &str;

    /// Store `data` under `key`, replacing any previous object.
    ///
    /// A key cannot hold an object while also being a prefix of another
    /// object's key, so `/a` and `/a/b` never coexist.
    ///
    /// # Errors
    /// - `InvalidInput` naming the conflicting key if `key` is a prefix of a
    ///   stored key or a stored key is a prefix of `key`
    ///
    /// # Postconditions
    /// - `get(key)` returns `data`
    /// - Returned info reflects the new object
    async fn put(&self, key: &StorageKey, data: Vec<u8>) -> Result<ObjectInfo>;

    /// Read the object stored under `key`.
    ///
    /// # Errors
    /// - `NotFound` if no object exists
    async fn get(&self, key: &StorageKey) -> Result<Vec<u8>>;

    /// Check whether an object exists under `key`.
    async fn exists(&self, key: &StorageKey) -> Result<bool>;

    /// Remove the object stored under `key`.
    ///
    /// # Errors
    /// - `NotFound` if no object exists
    async fn delete(&self, key: &StorageKey) -> Result<()>;

    /// List objects whose key starts with `prefix`, or all objects.
    ///
    /// Results are sorted by key.
    async fn list(&self, prefix: Option<&StorageKey>) -> Result<Vec<ObjectInfo>>;
}

/// A provider type that declares the name it is selected by.
///
/// Registering a `NamedProvider` binds `NAME` to `from_config`, so a
/// configuration value can pick the implementation at startup.
pub trait NamedProvider: StorageOps + Sized + 'static {
    /// Registry name of the provider.
    const NAME: &'static str;

    /// One-line human readable description.
    const DESCRIPTION: &'static str = "";

    /// Construct the provider from its option object.
    ///
    /// `options` is `Value::Null` when no options were configured.
    fn from_config(options: &Value) -> Result<Self>;
}

/// Factory signature stored in a [`ProviderDescriptor`].
pub type DescriptorFactory = fn(&Value) -> Result<Arc<dyn StorageOps>>;

/// Static registration entry for a provider.
#[derive(Clone, Copy)]
pub struct ProviderDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    pub factory: DescriptorFactory,
}

impl ProviderDescriptor {
    /// Descriptor for a [`NamedProvider`] type.
    pub const fn of<P: NamedProvider>() -> Self {
        Self {
            name: P::NAME,
            description: P::DESCRIPTION,
            factory: build::<P>,
        }
    }
}

impl std::fmt::Debug for ProviderDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderDescriptor")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

fn build<P: NamedProvider>(options: &Value) -> Result<Arc<dyn StorageOps>> {
    Ok(Arc::new(P::from_config(options)?))
}
