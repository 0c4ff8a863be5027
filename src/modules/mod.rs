//! Template modules compiled into the binary

pub mod debug;
pub mod email;

use std::sync::Arc;

use crate::loader::{ModuleRegistry, RegistryError, TemplateModule};

/// Echoes content back as JSON; the fallback default module
pub const DEBUG: &str = "builtin:debug";

/// Account authentication e-mails
pub const AUTHN_EMAIL: &str = "builtin:authn-email";

/// Register every built-in module
pub fn register_builtins(registry: &mut ModuleRegistry) -> Result<(), RegistryError> {
    registry.register(DEBUG, || TemplateModule::producer(Arc::new(debug::render)))?;
    registry.register(AUTHN_EMAIL, || TemplateModule::bundle(email::bundle()))?;
    Ok(())
}

/// A registry holding only the built-in modules
pub fn builtin_registry() -> Result<ModuleRegistry, RegistryError> {
    let mut registry = ModuleRegistry::new();
    register_builtins(&mut registry)?;
    Ok(registry)
}
