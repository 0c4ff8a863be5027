//! Guard builder
//!
//! Builds reusable validation predicates and issue reporters for handler
//! bundles. Content guards see the content together with the resolved
//! variant identity so that one bundle can validate differently per variant.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

/// Accepts or rejects content, given the variant it is rendered for
pub type ContentGuard = Arc<dyn Fn(&Value, Option<&str>) -> bool + Send + Sync>;

/// Explains why content was rejected
pub type ContentIssueReporter = Arc<dyn Fn(&Value, Option<&str>) -> String + Send + Sync>;

/// Accepts or rejects a variant identity
pub type VariantGuard = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Explains why a variant identity was rejected
pub type VariantIssueReporter = Arc<dyn Fn(&str, &Value) -> String + Send + Sync>;

/// Guard accepting objects that carry every field in `fields`
///
/// Field values are not inspected and extra fields are allowed.
pub fn required_fields_guard<S: AsRef<str>>(fields: &[S]) -> (ContentGuard, ContentIssueReporter) {
    let fields: Vec<String> = fields.iter().map(|f| f.as_ref().to_string()).collect();
    let expected = fields.join(", ");

    let guard: ContentGuard = Arc::new(move |value: &Value, _: Option<&str>| match value {
        Value::Object(map) => fields.iter().all(|f| map.contains_key(f)),
        _ => false,
    });

    let reporter: ContentIssueReporter = Arc::new(move |value: &Value, _: Option<&str>| {
        if value.is_object() {
            format!("{} properties expected in object: {}", expected, to_json(value))
        } else {
            format!("object expected: {}", to_json(value))
        }
    });

    (guard, reporter)
}

/// Guard accepting only the listed variant identities
pub fn variant_identity_guard<S: AsRef<str>>(known: &[S]) -> (VariantGuard, VariantIssueReporter) {
    let known: Vec<String> = known.iter().map(|v| v.as_ref().to_string()).collect();
    let expected = known.join(", ");

    let guard: VariantGuard = Arc::new(move |variant: &str| known.iter().any(|k| k == variant));
    let reporter: VariantIssueReporter = Arc::new(move |variant: &str, _: &Value| {
        format!("template ID '{}' invalid, expected: {}", variant, expected)
    });

    (guard, reporter)
}

/// Content guard that dispatches to the guard registered for the variant
///
/// Content rendered without a variant, or for an unknown one, is rejected.
pub fn variant_content_guard(per_variant: HashMap<String, ContentGuard>) -> ContentGuard {
    Arc::new(move |value: &Value, variant: Option<&str>| {
        variant
            .and_then(|v| per_variant.get(v))
            .is_some_and(|guard| guard(value, variant))
    })
}

/// Reporter for content rejected by a variant-aware guard
pub fn variant_content_issue_reporter() -> ContentIssueReporter {
    Arc::new(|value: &Value, variant: Option<&str>| {
        format!(
            "unexpected content for template {}: {}",
            variant.unwrap_or("undefined"),
            to_json(value)
        )
    })
}

/// The four callables a variant-aware template module needs
#[derive(Clone)]
pub struct VariantGuards {
    pub content_guard: ContentGuard,
    pub content_issue_reporter: ContentIssueReporter,
    pub variant_guard: VariantGuard,
    pub variant_issue_reporter: VariantIssueReporter,
}

impl VariantGuards {
    /// Build guards for `known` variants, each validated by its own content guard
    ///
    /// Variants listed in `known` without an entry in `per_variant` reject all content.
    pub fn new<S: AsRef<str>>(known: &[S], per_variant: HashMap<String, ContentGuard>) -> Self {
        let (variant_guard, variant_issue_reporter) = variant_identity_guard(known);
        Self {
            content_guard: variant_content_guard(per_variant),
            content_issue_reporter: variant_content_issue_reporter(),
            variant_guard,
            variant_issue_reporter,
        }
    }
}

fn to_json(value: &Value) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| value.to_string())
}
