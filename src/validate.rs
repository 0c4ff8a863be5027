//! Content validation against a handler bundle's guards
//!
//! The variant identity is checked before the content, since content guards
//! may depend on which variant is being rendered.

use crate::bundle::HandlerBundle;
use crate::error::{non_empty, Diagnostic};
use crate::hooks::{ExecuteHooks, GuardFailureMode, TemplateReference};

/// Run the bundle's variant guard, then its content guard
///
/// Returns the first diagnostic produced. A failing guard that neither the
/// hook nor the bundle can report on falls through under
/// [`GuardFailureMode::Passthrough`].
pub fn validate(
    bundle: &HandlerBundle,
    reference: &TemplateReference,
    hooks: &ExecuteHooks,
) -> Option<Diagnostic> {
    let content = &reference.content;
    let variant = reference.variant();

    if let (Some(id), Some(guard)) = (variant, &bundle.variant_guard) {
        if !guard(id) {
            tracing::debug!(locator = reference.locator.as_str(), variant = id, "variant guard rejected");
            let message = non_empty((hooks.on_variant_guard_failure)(reference))
                .or_else(|| {
                    bundle
                        .variant_issue_reporter
                        .as_ref()
                        .map(|report| report(id, content))
                        .filter(|m| !m.is_empty())
                })
                .or_else(|| match hooks.guard_failure_mode {
                    GuardFailureMode::Block => {
                        Some(format!("template ID '{}' rejected by {}", id, reference.locator))
                    }
                    GuardFailureMode::Passthrough => None,
                });
            if let Some(message) = message {
                return Some(message.into());
            }
        }
    }

    if let Some(guard) = &bundle.content_guard {
        if !guard(content, variant) {
            tracing::debug!(locator = reference.locator.as_str(), "content guard rejected");
            let message = non_empty((hooks.on_content_guard_failure)(reference))
                .or_else(|| {
                    bundle
                        .content_issue_reporter
                        .as_ref()
                        .map(|report| report(content, variant))
                        .filter(|m| !m.is_empty())
                })
                .or_else(|| match hooks.guard_failure_mode {
                    GuardFailureMode::Block => Some(format!("content rejected by {}", reference.locator)),
                    GuardFailureMode::Passthrough => None,
                });
            if let Some(message) = message {
                return Some(message.into());
            }
        }
    }

    None
}
