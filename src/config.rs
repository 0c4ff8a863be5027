//! Orchestrator configuration
//!
//! Settings come from an optional TOML file and are then overridden by
//! command line flags:
//!
//! ```toml
//! default_module = "builtin:debug"
//! default_template_identity = "create-password"
//! allow_arbitrary_modules = false
//! module_root = "./templates"
//!
//! [modules]
//! authn-email = "builtin:authn-email"
//! welcome = "welcome.toml"
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;

use crate::envelope::Policy;
use crate::health::{self, ModuleStatus};
use crate::loader::{FileModuleLoader, ModuleLoader, ModuleRegistry, RegistryError};
use crate::modules;

/// Errors that can occur when loading configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse config TOML: {0}")]
    ParseError(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Module used when an envelope names none
    pub default_module: Option<String>,
    /// Variant used when an envelope names none
    pub default_template_identity: Option<String>,
    /// Accept explicit `templateModuleURL` locators in envelopes
    pub allow_arbitrary_modules: bool,
    /// Directory that file-based module locators are relative to
    pub module_root: Option<PathBuf>,
    /// Pre-defined modules: name -> locator
    pub modules: BTreeMap<String, String>,
}

impl OrchestratorConfig {
    /// Load configuration from TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Load configuration from TOML string
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Add a module given as `<locator>[<delim><name>]`
    ///
    /// Without a name the module is known by the file name of its locator.
    pub fn add_module_spec(&mut self, spec: &str, delim: &str) {
        let (locator, name) = match spec.split_once(delim) {
            Some((locator, name)) if !name.is_empty() => (locator, name.to_string()),
            Some((locator, _)) => (locator, default_module_name(locator)),
            None => (spec, default_module_name(spec)),
        };
        self.modules.insert(name, locator.to_string());
    }

    /// The default module, falling back to the debug module
    pub fn effective_default_module(&self) -> &str {
        self.default_module.as_deref().unwrap_or(modules::DEBUG)
    }

    /// Module loader: built-in modules first, then files below the module root
    pub fn loader(&self) -> Result<ModuleRegistry, RegistryError> {
        let root = self.module_root.clone().unwrap_or_else(|| PathBuf::from("."));
        let mut registry = ModuleRegistry::new().with_fallback(FileModuleLoader::new(root));
        modules::register_builtins(&mut registry)?;
        Ok(registry)
    }

    /// Health-check the named modules, and the default one only when configured
    pub async fn check_modules(&self, loader: &dyn ModuleLoader) -> Vec<ModuleStatus> {
        health::check_modules(&self.modules, self.default_module.as_deref(), loader).await
    }

    /// Build the envelope resolution policy for this configuration
    pub fn to_policy(&self) -> Policy {
        let allow = self.allow_arbitrary_modules;
        let named = Arc::new(self.modules.clone());
        let default_module = self.effective_default_module().to_string();
        let default_identity = self.default_template_identity.clone();

        Policy::new()
            .allow_arbitrary_module(move |_| allow)
            .named_template_module_url(move |name| named.get(name).cloned())
            .default_template_module_url(move |_| Some(default_module.clone()))
            .default_template_identity(move |_| default_identity.clone())
            .on_arbitrary_module_not_allowed(|url| {
                Some(format!(
                    "arbitrary template modules are disabled, can only use pre-defined modules (not {})",
                    url
                ))
            })
    }
}

fn default_module_name(locator: &str) -> String {
    Path::new(locator)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| locator.to_string())
}
