//! Handler bundle loading
//!
//! A locator names a template module. A [`ModuleLoader`] turns the locator
//! into a [`TemplateModule`], and [`load`] interprets the module's default
//! export as a [`HandlerBundle`], producing a diagnostic for each way this
//! can fail.
//!
//! Modules are imported fresh on every call; nothing is cached.

mod file;
mod registry;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::bundle::{HandlerBundle, Producer};
use crate::error::{non_empty, Diagnostic, ImportError};
use crate::hooks::{ExecuteHooks, TemplateReference};

pub use file::FileModuleLoader;
pub use registry::{ModuleFactory, ModuleRegistry, RegistryError};

/// The single value a template module exports
#[derive(Clone)]
pub enum ModuleDefault {
    /// A producer together with any of its guards and reporters
    Bundle(HandlerBundle),
    /// A bare producer without guards
    Producer(Arc<dyn Producer>),
    /// Something that is neither; the payload names what was found
    Invalid(String),
}

impl fmt::Debug for ModuleDefault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bundle(bundle) => f.debug_tuple("Bundle").field(bundle).finish(),
            Self::Producer(_) => f.write_str("Producer"),
            Self::Invalid(kind) => f.debug_tuple("Invalid").field(kind).finish(),
        }
    }
}

/// An imported template module
#[derive(Debug, Clone, Default)]
pub struct TemplateModule {
    pub default: Option<ModuleDefault>,
}

impl TemplateModule {
    pub fn new(default: ModuleDefault) -> Self {
        Self {
            default: Some(default),
        }
    }

    /// A module that exports nothing
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn bundle(bundle: HandlerBundle) -> Self {
        Self::new(ModuleDefault::Bundle(bundle))
    }

    pub fn producer(producer: Arc<dyn Producer>) -> Self {
        Self::new(ModuleDefault::Producer(producer))
    }
}

/// Resolves locators to template modules
#[async_trait]
pub trait ModuleLoader: Send + Sync {
    async fn import(&self, locator: &str) -> Result<TemplateModule, ImportError>;
}

/// Stage at which loading a bundle failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStage {
    Import,
    NoDefault,
    InvalidDefaultType,
}

impl fmt::Display for LoadStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Import => "import",
            Self::NoDefault => "no default export",
            Self::InvalidDefaultType => "invalid default export",
        };
        f.write_str(name)
    }
}

/// A failed load: where it failed and what to tell the caller
#[derive(Debug, Clone, PartialEq)]
pub struct LoadFailure {
    pub stage: LoadStage,
    pub diagnostic: Diagnostic,
}

/// Import the module named by `reference.locator` and extract its handler bundle
pub async fn load(
    reference: &TemplateReference,
    loader: &dyn ModuleLoader,
    hooks: &ExecuteHooks,
) -> Result<HandlerBundle, LoadFailure> {
    let locator = reference.locator.as_str();

    let module = match loader.import(locator).await {
        Ok(module) => module,
        Err(err) => {
            tracing::warn!(locator, error = %err, "unable to import template module");
            let message = non_empty((hooks.on_import_error)(&err, reference))
                .unwrap_or_else(|| format!("Unable to import template module {}: {}", locator, err));
            return Err(LoadFailure {
                stage: LoadStage::Import,
                diagnostic: message.into(),
            });
        }
    };

    match module.default {
        Some(ModuleDefault::Bundle(bundle)) => Ok(bundle),
        Some(ModuleDefault::Producer(producer)) => Ok(HandlerBundle::new(producer)),
        Some(ModuleDefault::Invalid(kind)) => {
            tracing::warn!(locator, kind = kind.as_str(), "module default export has no usable shape");
            let message = non_empty((hooks.on_invalid_default_type)(reference))
                .unwrap_or_else(|| format!("module.default is not an array or function: {}", locator));
            Err(LoadFailure {
                stage: LoadStage::InvalidDefaultType,
                diagnostic: message.into(),
            })
        }
        None => {
            tracing::warn!(locator, "module has no default export");
            let message = non_empty((hooks.on_no_module_default)(reference))
                .unwrap_or_else(|| format!("No module.default found in {}", locator));
            Err(LoadFailure {
                stage: LoadStage::NoDefault,
                diagnostic: message.into(),
            })
        }
    }
}
