//! Common utilities and types shared across the invest storage crates.
//!
//! This module provides the error type and the validated identifiers
//! (provider names, storage keys) used by the registry and the providers.

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{ProviderName, StorageKey};
