//! Per-call template references and the diagnostic override hooks
//!
//! Every failure point of the pipeline first offers its hook the chance to
//! produce a custom diagnostic. A hook returning `None` (or an empty string)
//! selects the stage's fixed default message.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::error::{ImportError, ProduceError};

/// A request to render `content` with the module found at `locator`
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateReference {
    pub locator: String,
    pub content: Value,
    pub variant: Option<String>,
}

impl TemplateReference {
    pub fn new(locator: impl Into<String>, content: Value) -> Self {
        Self {
            locator: locator.into(),
            content,
            variant: None,
        }
    }

    pub fn with_variant(mut self, variant: impl Into<String>) -> Self {
        self.variant = Some(variant.into());
        self
    }

    pub fn variant(&self) -> Option<&str> {
        self.variant.as_deref()
    }
}

pub type ReferenceHook = Arc<dyn Fn(&TemplateReference) -> Option<String> + Send + Sync>;
pub type ImportErrorHook = Arc<dyn Fn(&ImportError, &TemplateReference) -> Option<String> + Send + Sync>;
pub type ExecuteErrorHook = Arc<dyn Fn(&ProduceError, &TemplateReference) -> Option<String> + Send + Sync>;

/// What to do when a guard fails and nothing reports the failure
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GuardFailureMode {
    /// Render anyway with the rejected content
    #[default]
    Passthrough,
    /// Stop with a generic rejection diagnostic
    Block,
}

/// Diagnostic overrides for the load, validate and produce stages
#[derive(Clone)]
pub struct ExecuteHooks {
    pub on_import_error: ImportErrorHook,
    pub on_no_module_default: ReferenceHook,
    pub on_invalid_default_type: ReferenceHook,
    pub on_variant_guard_failure: ReferenceHook,
    pub on_content_guard_failure: ReferenceHook,
    pub on_execute_error: ExecuteErrorHook,
    pub guard_failure_mode: GuardFailureMode,
}

fn no_reference_override() -> ReferenceHook {
    Arc::new(|_: &TemplateReference| None)
}

impl Default for ExecuteHooks {
    fn default() -> Self {
        Self {
            on_import_error: Arc::new(|_: &ImportError, _: &TemplateReference| None),
            on_no_module_default: no_reference_override(),
            on_invalid_default_type: no_reference_override(),
            on_variant_guard_failure: no_reference_override(),
            on_content_guard_failure: no_reference_override(),
            on_execute_error: Arc::new(|_: &ProduceError, _: &TemplateReference| None),
            guard_failure_mode: GuardFailureMode::default(),
        }
    }
}

impl ExecuteHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_import_error<F>(mut self, hook: F) -> Self
    where
        F: Fn(&ImportError, &TemplateReference) -> Option<String> + Send + Sync + 'static,
    {
        self.on_import_error = Arc::new(hook);
        self
    }

    pub fn on_no_module_default<F>(mut self, hook: F) -> Self
    where
        F: Fn(&TemplateReference) -> Option<String> + Send + Sync + 'static,
    {
        self.on_no_module_default = Arc::new(hook);
        self
    }

    pub fn on_invalid_default_type<F>(mut self, hook: F) -> Self
    where
        F: Fn(&TemplateReference) -> Option<String> + Send + Sync + 'static,
    {
        self.on_invalid_default_type = Arc::new(hook);
        self
    }

    pub fn on_variant_guard_failure<F>(mut self, hook: F) -> Self
    where
        F: Fn(&TemplateReference) -> Option<String> + Send + Sync + 'static,
    {
        self.on_variant_guard_failure = Arc::new(hook);
        self
    }

    pub fn on_content_guard_failure<F>(mut self, hook: F) -> Self
    where
        F: Fn(&TemplateReference) -> Option<String> + Send + Sync + 'static,
    {
        self.on_content_guard_failure = Arc::new(hook);
        self
    }

    pub fn on_execute_error<F>(mut self, hook: F) -> Self
    where
        F: Fn(&ProduceError, &TemplateReference) -> Option<String> + Send + Sync + 'static,
    {
        self.on_execute_error = Arc::new(hook);
        self
    }

    pub fn with_guard_failure_mode(mut self, mode: GuardFailureMode) -> Self {
        self.guard_failure_mode = mode;
        self
    }
}

impl fmt::Debug for ExecuteHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecuteHooks")
            .field("guard_failure_mode", &self.guard_failure_mode)
            .finish_non_exhaustive()
    }
}
