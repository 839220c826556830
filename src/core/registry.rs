use crate::core::dropbox;
use crate::domain::model::StorageOpts;
use crate::domain::ports::Storage;
use crate::utils::error::{Result, StoreError};
use std::collections::HashMap;
use std::fmt;

pub type StorageFactory = fn(&StorageOpts) -> Result<Box<dyn Storage>>;

/// Selects a storage backend by its (case-sensitive) name.
#[derive(Clone, Default)]
pub struct Registry {
    factories: HashMap<String, StorageFactory>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with every backend this crate ships.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry
            .factories
            .insert(dropbox::BACKEND_NAME.to_string(), dropbox::new_storage);
        registry
    }

    pub fn register(&mut self, name: &str, factory: StorageFactory) -> Result<()> {
        if self.factories.contains_key(name) {
            return Err(StoreError::ConfigError {
                message: format!("storage backend {:?} already registered", name),
            });
        }
        self.factories.insert(name.to_string(), factory);
        Ok(())
    }

    pub fn dial(&self, name: &str, opts: &StorageOpts) -> Result<Box<dyn Storage>> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| StoreError::ConfigError {
                message: format!("unknown storage backend {:?}", name),
            })?;
        tracing::debug!("Dialing storage backend {}", name);
        factory(opts)
    }

    pub fn backends(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("backends", &self.backends())
            .finish()
    }
}
