//! Health checks for configured template modules

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::error::Diagnostic;
use crate::hooks::{ExecuteHooks, TemplateReference};
use crate::loader::{load, LoadStage, ModuleLoader};

/// Name under which the default module is reported
pub const DEFAULT_MODULE_NAME: &str = "DEFAULT";

#[derive(Debug, Clone, PartialEq)]
pub enum ModuleHealth {
    Healthy,
    Failing { stage: LoadStage, diagnostic: Diagnostic },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModuleStatus {
    pub name: String,
    pub locator: String,
    pub health: ModuleHealth,
}

impl ModuleStatus {
    pub fn is_healthy(&self) -> bool {
        self.health == ModuleHealth::Healthy
    }
}

/// Load every configured module, and the default one, and report the outcome
///
/// Import failures carry the full error report, including source context for
/// template syntax errors.
pub async fn check_modules(
    modules: &BTreeMap<String, String>,
    default_module: Option<&str>,
    loader: &dyn ModuleLoader,
) -> Vec<ModuleStatus> {
    let hooks = ExecuteHooks::new().on_import_error(|err, reference| Some(err.report(&reference.locator)));

    let entries = modules
        .iter()
        .map(|(name, locator)| (name.as_str(), locator.as_str()))
        .chain(default_module.map(|locator| (DEFAULT_MODULE_NAME, locator)));

    let mut statuses = Vec::new();
    for (name, locator) in entries {
        let reference = TemplateReference::new(locator, Value::Object(Map::new()));
        let health = match load(&reference, loader, &hooks).await {
            Ok(_) => ModuleHealth::Healthy,
            Err(failure) => ModuleHealth::Failing {
                stage: failure.stage,
                diagnostic: failure.diagnostic,
            },
        };
        tracing::debug!(name, locator, healthy = health == ModuleHealth::Healthy, "checked template module");
        statuses.push(ModuleStatus {
            name: name.to_string(),
            locator: locator.to_string(),
            health,
        });
    }
    statuses
}
