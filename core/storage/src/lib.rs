//! Pluggable storage for invest.
//!
//! Storage backends implement [`StorageOps`] and are registered by name in a
//! [`ProviderRegistry`]. At startup the [`Context`] reads the configured
//! provider name (`STORAGE_PROVIDER`) and resolves it to a concrete backend,
//! so code using storage never names an implementation.
//!
//! Providers declare their registry name through [`NamedProvider`]; the
//! built-in ones are listed in [`BUILTIN_PROVIDERS`].

pub mod context;
pub mod global;
pub mod local;
pub mod memory;
pub mod provider;
pub mod registry;
pub mod startup;

#[cfg(test)]
mod contract_tests;

pub use context::{Context, StorageSettings, STORAGE_PROVIDER, STORAGE_ROOT};
pub use global::{global, install_global};
pub use local::LocalStorage;
pub use memory::MemoryStorage;
pub use provider::{DescriptorFactory, NamedProvider, ObjectInfo, ProviderDescriptor, StorageOps};
pub use registry::{create_default_registry, ProviderFactory, ProviderRegistry, BUILTIN_PROVIDERS};
pub use startup::StartupRegistry;
