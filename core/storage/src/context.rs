//! Runtime context selecting the storage provider.
//!
//! Settings come from an optional JSON file, then environment variables
//! override individual fields:
//!
//! - `STORAGE_PROVIDER`: registry name of the provider
//! - `STORAGE_ROOT`: stored as the `root` option (used by `local`)

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use crate::provider::StorageOps;
use crate::registry::ProviderRegistry;
use invest_common::Result;

/// Environment variable naming the storage provider.
pub const STORAGE_PROVIDER: &str = "STORAGE_PROVIDER";

/// Environment variable overriding the `root` provider option.
pub const STORAGE_ROOT: &str = "STORAGE_ROOT";

/// Provider used when nothing is configured.
pub const DEFAULT_PROVIDER: &str = "memory";

/// Storage section of the configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Registry name of the provider.
    pub provider: String,
    /// Provider-specific options.
    pub options: Value,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            provider: DEFAULT_PROVIDER.to_string(),
            options: Value::Null,
        }
    }
}

/// Startup context holding the storage selection.
#[derive(Debug, Clone, Default)]
pub struct Context {
    settings: StorageSettings,
}

impl Context {
    /// Create a context from explicit settings.
    pub fn new(settings: StorageSettings) -> Self {
        Self { settings }
    }

    /// Defaults overridden by the process environment.
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Defaults overridden by `lookup`, which plays the role of the
    /// environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self::default().with_overrides(lookup)
    }

    /// Load settings from a JSON file.
    ///
    /// # Errors
    /// - File cannot be read
    /// - File is not valid settings JSON
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&raw)
    }

    /// Parse settings from a JSON document.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(Self::new(serde_json::from_str(json)?))
    }

    /// Apply the process environment on top of the current settings.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply `STORAGE_PROVIDER` / `STORAGE_ROOT` as returned by `lookup`.
    ///
    /// Blank values are ignored.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_blank = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        if let Some(provider) = non_blank(STORAGE_PROVIDER) {
            self.settings.provider = provider;
        }
        if let Some(root) = non_blank(STORAGE_ROOT) {
            self.set_option("root", Value::String(root));
        }
        self
    }

    /// Select `provider`, regardless of file or environment.
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.settings.provider = provider.into();
        self
    }

    fn set_option(&mut self, key: &str, value: Value) {
        if !self.settings.options.is_object() {
            if !self.settings.options.is_null() {
                warn!("Replacing non-object storage options to set '{}'", key);
            }
            self.settings.options = Value::Object(Map::new());
        }
        if let Value::Object(options) = &mut self.settings.options {
            options.insert(key.to_string(), value);
        }
    }

    /// Name of the configured storage provider.
    pub fn storage_provider(&self) -> &str {
        &self.settings.provider
    }

    /// Options passed to the provider factory.
    pub fn options(&self) -> &Value {
        &self.settings.options
    }

    /// Effective settings after file and environment overrides.
    pub fn settings(&self) -> &StorageSettings {
        &self.settings
    }

    /// Resolve the configured provider in `registry`.
    ///
    /// # Errors
    /// - `UnknownProvider` if the configured name is not registered
    /// - Provider construction errors
    pub fn open_storage(&self, registry: &ProviderRegistry) -> Result<Arc<dyn StorageOps>> {
        info!("Opening storage provider '{}'", self.settings.provider);
        registry.resolve_with(&self.settings.provider, &self.settings.options)
    }
}
