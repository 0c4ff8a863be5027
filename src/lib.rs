//! Template Orchestrator - render JSON envelopes through pluggable template modules
//!
//! A request names a template module (directly, by a pre-defined name, or not
//! at all so the default applies), an optional template variant and the
//! content to render. The pipeline loads the module's handler bundle,
//! validates the content with the bundle's guards and runs the producer.
//! Every failure along the way comes back as a plain-text [`Diagnostic`].
//!
//! # Example
//!
//! ```rust
//! use template_orchestrator::{modules, transform, Policy};
//!
//! let registry = modules::builtin_registry().unwrap();
//! let policy = Policy::new().default_template_module_url(|_| Some(modules::DEBUG.to_string()));
//!
//! let runtime = tokio::runtime::Runtime::new().unwrap();
//! let output = runtime.block_on(transform(br#"{"content":{"a":1}}"#, &registry, &policy));
//! assert_eq!(output.unwrap(), r#"{"a":1}"#);
//! ```

pub mod bundle;
pub mod config;
pub mod envelope;
pub mod error;
pub mod executor;
pub mod guard;
pub mod health;
pub mod hooks;
pub mod html;
pub mod loader;
pub mod modules;
pub mod template;
pub mod validate;

pub use bundle::{HandlerBundle, Producer};
pub use config::{ConfigError, OrchestratorConfig};
pub use envelope::{parse_envelope, resolve, transform, JsonEnvelope, Policy};
pub use error::{Diagnostic, ImportError, ProduceError, TemplateSyntaxError};
pub use executor::{execute, ExecutionState, TemplateExecutor};
pub use guard::{required_fields_guard, variant_identity_guard, VariantGuards};
pub use health::{check_modules, ModuleHealth, ModuleStatus};
pub use hooks::{ExecuteHooks, GuardFailureMode, TemplateReference};
pub use loader::{
    load, FileModuleLoader, LoadFailure, LoadStage, ModuleDefault, ModuleLoader, ModuleRegistry, TemplateModule,
};
pub use validate::validate;
