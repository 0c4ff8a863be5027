//! Template execution: load, validate, produce
//!
//! ```text
//! Loading ──> Validating ──> Producing ──> Done
//!    │             │              │
//!    └─────────────┴──────────────┴──> Failed
//! ```
//!
//! Each stage either hands over to the next one or stops with a diagnostic.

use std::fmt;

use crate::error::{non_empty, Diagnostic};
use crate::hooks::{ExecuteHooks, TemplateReference};
use crate::loader::{load, ModuleLoader};
use crate::validate::validate;

/// Where an execution currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionState {
    Loading,
    Validating,
    Producing,
    Done,
    Failed,
}

impl fmt::Display for ExecutionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Loading => "loading",
            Self::Validating => "validating",
            Self::Producing => "producing",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Runs template references against the modules of a loader
pub struct TemplateExecutor<'a> {
    loader: &'a dyn ModuleLoader,
    hooks: &'a ExecuteHooks,
}

impl<'a> TemplateExecutor<'a> {
    pub fn new(loader: &'a dyn ModuleLoader, hooks: &'a ExecuteHooks) -> Self {
        Self { loader, hooks }
    }

    /// Render a reference, or return the diagnostic of the stage that stopped it
    ///
    /// The handler bundle is loaded for this call only and dropped afterwards.
    /// Producer errors become diagnostics through `on_execute_error`.
    pub async fn execute(&self, reference: &TemplateReference) -> Result<String, Diagnostic> {
        let locator = reference.locator.as_str();
        let mut state = ExecutionState::Loading;
        tracing::debug!(locator, %state, "executing template module");

        let bundle = match load(reference, self.loader, self.hooks).await {
            Ok(bundle) => bundle,
            Err(failure) => {
                tracing::debug!(locator, stage = %failure.stage, "template module did not load");
                self.transition(locator, state, ExecutionState::Failed);
                return Err(failure.diagnostic);
            }
        };

        state = self.transition(locator, state, ExecutionState::Validating);
        if let Some(diagnostic) = validate(&bundle, reference, self.hooks) {
            self.transition(locator, state, ExecutionState::Failed);
            return Err(diagnostic);
        }

        state = self.transition(locator, state, ExecutionState::Producing);
        match bundle.producer.produce(&reference.content, reference.variant()).await {
            Ok(output) => {
                self.transition(locator, state, ExecutionState::Done);
                Ok(output)
            }
            Err(err) => {
                tracing::warn!(locator, error = %err, "template producer failed");
                self.transition(locator, state, ExecutionState::Failed);
                let message = non_empty((self.hooks.on_execute_error)(&err, reference))
                    .unwrap_or_else(|| format!("Unable to execute template module {}: {}", locator, err));
                Err(message.into())
            }
        }
    }

    fn transition(&self, locator: &str, from: ExecutionState, to: ExecutionState) -> ExecutionState {
        tracing::debug!(locator, %from, %to, "template execution state");
        to
    }
}

/// Execute a single reference; see [`TemplateExecutor::execute`]
pub async fn execute(
    reference: &TemplateReference,
    loader: &dyn ModuleLoader,
    hooks: &ExecuteHooks,
) -> Result<String, Diagnostic> {
    TemplateExecutor::new(loader, hooks).execute(reference).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundle::HandlerBundle;
    use crate::error::ProduceError;
    use crate::guard::required_fields_guard;
    use crate::loader::{ModuleRegistry, TemplateModule};
    use serde_json::{json, Value};

    fn registry() -> ModuleRegistry {
        let mut registry = ModuleRegistry::new();
        registry
            .register("echo", || {
                TemplateModule::bundle(
                    HandlerBundle::from_fn(|content: &Value, variant: Option<&str>| {
                        Ok(format!("{}:{}", variant.unwrap_or("-"), content["body"]))
                    })
                    .with_content_guards(required_fields_guard(&["body"])),
                )
            })
            .unwrap();
        registry
            .register("failing", || {
                TemplateModule::bundle(HandlerBundle::from_fn(|_: &Value, _: Option<&str>| {
                    Err(ProduceError::message("boom"))
                }))
            })
            .unwrap();
        registry
    }

    #[tokio::test]
    async fn test_execute_returns_producer_output_verbatim() {
        let reference = TemplateReference::new("echo", json!({"body": "x"})).with_variant("v");
        let out = execute(&reference, &registry(), &ExecuteHooks::default()).await;
        assert_eq!(out, Ok(r#"v:"x""#.to_string()));
    }

    #[tokio::test]
    async fn test_execute_stops_on_validation() {
        let reference = TemplateReference::new("echo", json!({"heading": 1}));
        let out = execute(&reference, &registry(), &ExecuteHooks::default()).await;
        assert_eq!(
            out.unwrap_err(),
            r#"body properties expected in object: {"heading":1}"#
        );
    }

    #[tokio::test]
    async fn test_execute_stops_on_load() {
        let reference = TemplateReference::new("missing", json!({}));
        let out = execute(&reference, &registry(), &ExecuteHooks::default()).await;
        assert_eq!(
            out.unwrap_err(),
            "Unable to import template module missing: module not found: missing"
        );
    }

    #[tokio::test]
    async fn test_execute_converts_producer_errors() {
        let reference = TemplateReference::new("failing", json!({}));
        let out = execute(&reference, &registry(), &ExecuteHooks::default()).await;
        assert_eq!(out.unwrap_err(), "Unable to execute template module failing: boom");

        let hooks = ExecuteHooks::new().on_execute_error(|err, _| Some(format!("render failed: {}", err)));
        let out = execute(&reference, &registry(), &hooks).await;
        assert_eq!(out.unwrap_err(), "render failed: boom");
    }
}
