//! Process-wide provider registry.
//!
//! The registry is installed once during startup and read-only afterwards,
//! so lookups need no locking.

use std::sync::OnceLock;
use tracing::debug;

use crate::registry::{create_default_registry, ProviderRegistry};
use invest_common::{Error, Result};

static GLOBAL: OnceLock<ProviderRegistry> = OnceLock::new();

/// Install `registry` as the process-wide registry.
///
/// # Errors
/// - `AlreadyInitialized` if a registry was installed before, including
///   the default one installed lazily by [`global`]
pub fn install_global(registry: ProviderRegistry) -> Result<&'static ProviderRegistry> {
    let mut installed = false;
    let global = GLOBAL.get_or_init(|| {
        installed = true;
        registry
    });

    if installed {
        debug!("Installed global registry with {} providers", global.len());
        Ok(global)
    } else {
        Err(Error::AlreadyInitialized)
    }
}

/// The process-wide registry.
///
/// Falls back to the built-in providers when nothing was installed.
pub fn global() -> Result<&'static ProviderRegistry> {
    if let Some(registry) = GLOBAL.get() {
        return Ok(registry);
    }
    let defaults = create_default_registry()?;
    Ok(GLOBAL.get_or_init(|| defaults))
}
