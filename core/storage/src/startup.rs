//! Lock-guarded registration phase for multi-threaded startup.

use std::sync::{Mutex, MutexGuard};

use crate::provider::NamedProvider;
use crate::registry::{ProviderFactory, ProviderRegistry};
use invest_common::{Error, Result};

/// Registration phase shared between threads.
///
/// Collects bindings behind a mutex; [`StartupRegistry::freeze`] ends the
/// phase and hands out the plain, lock-free [`ProviderRegistry`].
#[derive(Default)]
pub struct StartupRegistry {
    inner: Mutex<ProviderRegistry>,
}

impl StartupRegistry {
    /// Start with an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing registry, e.g. the built-in providers.
    pub fn from_registry(registry: ProviderRegistry) -> Self {
        Self {
            inner: Mutex::new(registry),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, ProviderRegistry>> {
        self.inner
            .lock()
            .map_err(|_| Error::Storage("provider registration lock poisoned".to_string()))
    }

    /// Same contract as [`ProviderRegistry::register`].
    pub fn register(&self, name: impl Into<String>, factory: ProviderFactory) -> Result<()> {
        self.lock()?.register(name, factory)
    }

    /// Same contract as [`ProviderRegistry::register_provider`].
    pub fn register_provider<P: NamedProvider>(&self) -> Result<()> {
        self.lock()?.register_provider::<P>()
    }

    /// End the registration phase.
    pub fn freeze(self) -> Result<ProviderRegistry> {
        self.inner
            .into_inner()
            .map_err(|_| Error::Storage("provider registration lock poisoned".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStorage;
    use crate::registry::create_default_registry;
    use std::sync::Arc;

    #[test]
    fn test_concurrent_registration() {
        let startup = StartupRegistry::new();

        let outcomes: Vec<Result<()>> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|i| {
                    let startup = &startup;
                    scope.spawn(move || {
                        // Threads 0 and 1 race for the same name
                        let name = format!("provider-{}", i.max(1));
                        startup.register(name, Box::new(|_| Ok(Arc::new(MemoryStorage::new()))))
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().expect("registration thread panicked"))
                .collect()
        });

        let duplicates = outcomes
            .iter()
            .filter(|r| matches!(r, Err(Error::DuplicateProvider { .. })))
            .count();
        assert_eq!(duplicates, 1);

        let registry = startup.freeze().unwrap();
        assert_eq!(registry.len(), 7);
        assert_eq!(registry.resolve("provider-1").unwrap().name(), "memory");
    }

    #[test]
    fn test_extends_builtins() {
        let startup = StartupRegistry::from_registry(create_default_registry().unwrap());
        assert!(matches!(
            startup.register_provider::<MemoryStorage>(),
            Err(Error::DuplicateProvider { .. })
        ));

        let registry = startup.freeze().unwrap();
        assert_eq!(registry.providers(), vec!["local", "memory"]);
    }
}
