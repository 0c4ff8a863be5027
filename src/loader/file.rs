//! Declarative template modules read from TOML files
//!
//! ```toml
//! [default]
//! template = "<html><body>${body}</body></html>"
//! required = ["body"]
//! escape = "html"
//! ```
//!
//! A module with several templates declares them per variant instead:
//!
//! ```toml
//! [default.variants.content1]
//! template = "Template 1: ${heading1}, ${body1}"
//! required = ["body1"]
//! ```

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use super::{ModuleDefault, ModuleLoader, TemplateModule};
use crate::bundle::HandlerBundle;
use crate::error::{ImportError, ProduceError};
use crate::guard::{required_fields_guard, ContentGuard, VariantGuards};
use crate::template::{Escape, TextTemplate};

/// Loads template modules from `.toml` files below a root directory
///
/// Locators are paths relative to the root. Absolute paths and paths that
/// climb out of the root are refused.
#[derive(Debug, Clone)]
pub struct FileModuleLoader {
    root: PathBuf,
}

impl FileModuleLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Map a locator to a file below the root
    fn resolve(&self, locator: &str) -> Result<PathBuf, ImportError> {
        let relative = Path::new(locator);
        let contained = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        let is_toml = relative.extension().is_some_and(|ext| ext == "toml");

        if !contained || !is_toml {
            return Err(ImportError::OutsideRoot {
                locator: locator.to_string(),
            });
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ModuleLoader for FileModuleLoader {
    async fn import(&self, locator: &str) -> Result<TemplateModule, ImportError> {
        let path = self.resolve(locator)?;
        tracing::debug!(locator, path = %path.display(), "reading template module file");

        let source = tokio::fs::read_to_string(&path).await.map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                ImportError::NotFound {
                    locator: locator.to_string(),
                }
            } else {
                ImportError::Io { path, source }
            }
        })?;

        parse_module(&source)
    }
}

#[derive(Deserialize)]
struct DefaultSpec {
    template: Option<String>,
    required: Option<Vec<String>>,
    #[serde(default)]
    escape: Escape,
    variants: Option<toml::Table>,
}

#[derive(Deserialize)]
struct VariantSpec {
    template: String,
    #[serde(default)]
    required: Vec<String>,
}

/// Interpret the text of a module file
pub(crate) fn parse_module(source: &str) -> Result<TemplateModule, ImportError> {
    let mut table: toml::Table = toml::from_str(source)?;

    let spec = match table.remove("default") {
        None => return Ok(TemplateModule::empty()),
        Some(value @ toml::Value::Table(_)) => value.try_into::<DefaultSpec>()?,
        Some(other) => {
            return Ok(TemplateModule::new(ModuleDefault::Invalid(
                other.type_str().to_string(),
            )))
        }
    };

    let default = match (spec.variants, spec.template) {
        (Some(variants), _) => ModuleDefault::Bundle(variant_bundle(variants, spec.escape)?),
        (None, Some(text)) => {
            let template = parse_template("default", &text)?;
            let escape = spec.escape;
            let bundle = HandlerBundle::from_fn(move |content: &Value, _: Option<&str>| {
                Ok(template.render(content, escape))
            });
            match spec.required {
                Some(fields) => ModuleDefault::Bundle(bundle.with_content_guards(required_fields_guard(&fields))),
                None => ModuleDefault::Bundle(bundle),
            }
        }
        (None, None) => ModuleDefault::Invalid("table without template".to_string()),
    };

    Ok(TemplateModule::new(default))
}

fn variant_bundle(variants: toml::Table, escape: Escape) -> Result<HandlerBundle, ImportError> {
    let mut known = Vec::new();
    let mut templates = HashMap::new();
    let mut guards: HashMap<String, ContentGuard> = HashMap::new();

    for (id, value) in variants {
        let spec: VariantSpec = value.try_into()?;
        let template = parse_template(&format!("variants.{}", id), &spec.template)?;
        guards.insert(id.clone(), required_fields_guard(&spec.required).0);
        templates.insert(id.clone(), template);
        known.push(id);
    }

    let expected = known.join(", ");
    let producer = move |content: &Value, variant: Option<&str>| -> Result<String, ProduceError> {
        let template = variant.and_then(|v| templates.get(v)).ok_or_else(|| {
            ProduceError::message(format!(
                "template ID '{}' invalid, expected: {}",
                variant.unwrap_or("undefined"),
                expected
            ))
        })?;
        Ok(template.render(content, escape))
    };

    Ok(HandlerBundle::new(Arc::new(producer)).with_variant_guards(VariantGuards::new(&known, guards)))
}

fn parse_template(name: &str, text: &str) -> Result<TextTemplate, ImportError> {
    let template = TextTemplate::parse(text).map_err(|error| ImportError::Syntax {
        name: name.to_string(),
        text: text.to_string(),
        error,
    })?;
    tracing::trace!(name, fields = ?template.fields().collect::<Vec<_>>(), "parsed text template");
    Ok(template)
}
