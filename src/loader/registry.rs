//! Registry of template modules known at startup

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use super::{ModuleLoader, TemplateModule};
use crate::error::ImportError;

/// Builds a fresh instance of a registered module
pub type ModuleFactory = Arc<dyn Fn() -> TemplateModule + Send + Sync>;

/// Errors that can occur while registering modules
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Duplicate module registration
    #[error("duplicate template module: {locator}")]
    Duplicate { locator: String },
}

/// Maps locators to statically known template modules
///
/// Locators the registry does not know are handed to the fallback loader,
/// if one is configured.
#[derive(Default)]
pub struct ModuleRegistry {
    modules: HashMap<String, ModuleFactory>,
    fallback: Option<Box<dyn ModuleLoader>>,
}

impl ModuleRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Delegate unknown locators to `loader`
    pub fn with_fallback(mut self, loader: impl ModuleLoader + 'static) -> Self {
        self.fallback = Some(Box::new(loader));
        self
    }

    /// Register a module factory under a locator
    pub fn register<F>(&mut self, locator: impl Into<String>, factory: F) -> Result<(), RegistryError>
    where
        F: Fn() -> TemplateModule + Send + Sync + 'static,
    {
        let locator = locator.into();
        if self.modules.contains_key(&locator) {
            return Err(RegistryError::Duplicate { locator });
        }
        self.modules.insert(locator, Arc::new(factory));
        Ok(())
    }
}

#[async_trait]
impl ModuleLoader for ModuleRegistry {
    async fn import(&self, locator: &str) -> Result<TemplateModule, ImportError> {
        if let Some(factory) = self.modules.get(locator) {
            tracing::debug!(locator, "importing registered template module");
            return Ok(factory());
        }
        match &self.fallback {
            Some(loader) => loader.import(locator).await,
            None => Err(ImportError::NotFound {
                locator: locator.to_string(),
            }),
        }
    }
}
