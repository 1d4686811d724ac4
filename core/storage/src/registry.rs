//! Provider registry for resolving a configured name to a storage backend.

use serde_json::Value;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::local::LocalStorage;
use crate::memory::MemoryStorage;
use crate::provider::{NamedProvider, ProviderDescriptor, StorageOps};
use invest_common::{Error, ProviderName, Result};

/// Factory function type for creating providers.
///
/// Receives the provider's option object (`Value::Null` when unset).
pub type ProviderFactory = Box<dyn Fn(&Value) -> Result<Arc<dyn StorageOps>> + Send + Sync>;

/// Providers compiled into this crate, registered by
/// [`create_default_registry`].
pub static BUILTIN_PROVIDERS: &[ProviderDescriptor] = &[
    ProviderDescriptor::of::<MemoryStorage>(),
    ProviderDescriptor::of::<LocalStorage>(),
];

struct ProviderBinding {
    description: String,
    factory: ProviderFactory,
}

/// Registry of storage provider factories.
///
/// Bindings are added during startup and never replaced; afterwards the
/// registry is only read.
#[derive(Default)]
pub struct ProviderRegistry {
    bindings: HashMap<ProviderName, ProviderBinding>,
}

impl ProviderRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider factory.
    ///
    /// # Preconditions
    /// - `name` must be a valid [`ProviderName`]
    /// - `name` must be unique within the registry
    ///
    /// # Errors
    /// - `InvalidInput` if the name is not a valid provider name
    /// - `DuplicateProvider` if the name is already registered; the
    ///   existing binding is kept
    pub fn register(&mut self, name: impl Into<String>, factory: ProviderFactory) -> Result<()> {
        self.bind(name.into(), String::new(), factory)
    }

    /// Register a [`NamedProvider`] under its declared name.
    pub fn register_provider<P: NamedProvider>(&mut self) -> Result<()> {
        self.register_descriptor(&ProviderDescriptor::of::<P>())
    }

    /// Register a static descriptor.
    pub fn register_descriptor(&mut self, descriptor: &ProviderDescriptor) -> Result<()> {
        let factory = descriptor.factory;
        self.bind(
            descriptor.name.to_string(),
            descriptor.description.to_string(),
            Box::new(move |options: &Value| factory(options)),
        )
    }

    fn bind(&mut self, name: String, description: String, factory: ProviderFactory) -> Result<()> {
        let name = ProviderName::new(name)?;
        match self.bindings.entry(name) {
            Entry::Occupied(entry) => Err(Error::DuplicateProvider {
                name: entry.key().to_string(),
            }),
            Entry::Vacant(entry) => {
                debug!("Registered storage provider '{}'", entry.key());
                entry.insert(ProviderBinding {
                    description,
                    factory,
                });
                Ok(())
            }
        }
    }

    /// Resolve a provider by name with no options.
    ///
    /// # Errors
    /// - `UnknownProvider` listing the registered names
    /// - Any error returned by the provider's factory
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn StorageOps>> {
        self.resolve_with(name, &Value::Null)
    }

    /// Resolve a provider by name, passing it `options`.
    pub fn resolve_with(&self, name: &str, options: &Value) -> Result<Arc<dyn StorageOps>> {
        let binding = self.bindings.get(name).ok_or_else(|| {
            warn!("Storage provider '{}' is not registered", name);
            Error::UnknownProvider {
                name: name.to_string(),
                available: self.providers(),
            }
        })?;

        let provider = (binding.factory)(options)?;
        info!("Resolved storage provider '{}'", name);
        Ok(provider)
    }

    /// Registered provider names, sorted.
    pub fn providers(&self) -> Vec<String> {
        let mut names: Vec<String> = self.bindings.keys().map(|n| n.to_string()).collect();
        names.sort();
        names
    }

    /// Registered providers with their descriptions, sorted by name.
    pub fn describe(&self) -> Vec<(String, String)> {
        let mut entries: Vec<(String, String)> = self
            .bindings
            .iter()
            .map(|(name, binding)| (name.to_string(), binding.description.clone()))
            .collect();
        entries.sort();
        entries
    }

    /// Check if a provider is registered.
    pub fn has_provider(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    /// Number of registered providers.
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Whether no provider is registered.
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

/// Create a registry holding every entry of [`BUILTIN_PROVIDERS`].
pub fn create_default_registry() -> Result<ProviderRegistry> {
    let mut registry = ProviderRegistry::new();
    for descriptor in BUILTIN_PROVIDERS {
        registry.register_descriptor(descriptor)?;
    }
    Ok(registry)
}
