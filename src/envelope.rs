//! JSON envelope resolution
//!
//! A JSON envelope names the template module to use (explicitly, by name, or
//! not at all) together with the content to render:
//!
//! ```json
//! {
//!   "templateName": "authn-email",
//!   "variantIdentity": "create-password",
//!   "content": { "authnUrl": "https://example.com/x/reset-password" }
//! }
//! ```
//!
//! [`transform`] parses the envelope, resolves the locator under a
//! [`Policy`], and hands the resulting reference to the executor.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{non_empty, Diagnostic};
use crate::executor::execute;
use crate::hooks::{ExecuteHooks, TemplateReference};
use crate::loader::ModuleLoader;

/// The wire format accepted by [`transform`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonEnvelope {
    #[serde(rename = "templateModuleURL", default, skip_serializing_if = "Option::is_none")]
    pub template_module_url: Option<String>,

    #[serde(rename = "templateName", default, skip_serializing_if = "Option::is_none")]
    pub template_name: Option<String>,

    #[serde(rename = "variantIdentity", default, skip_serializing_if = "Option::is_none")]
    pub variant_identity: Option<String>,

    /// Older name for `variantIdentity`, used only when that is absent
    #[serde(rename = "templateIdentity", default, skip_serializing)]
    template_identity: Option<String>,

    pub content: Map<String, Value>,
}

impl JsonEnvelope {
    /// Treat empty selector strings as if they were not supplied, and fold
    /// `templateIdentity` into `variantIdentity`
    fn normalized(mut self) -> Self {
        for field in [
            &mut self.template_module_url,
            &mut self.template_name,
            &mut self.variant_identity,
            &mut self.template_identity,
        ] {
            if field.as_deref() == Some("") {
                *field = None;
            }
        }
        if self.variant_identity.is_none() {
            self.variant_identity = self.template_identity.take();
        }
        self
    }
}

pub type ArbitraryModuleFn = Arc<dyn Fn(&str) -> bool + Send + Sync>;
pub type NamedModuleFn = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;
pub type EnvelopeFn = Arc<dyn Fn(&JsonEnvelope) -> Option<String> + Send + Sync>;
pub type StrHook = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// How envelopes are resolved to template references
///
/// The resolution functions are optional: leaving one out changes which
/// locator is picked. The `on_*` hooks always exist and default to `None`,
/// which selects the built-in diagnostic.
#[derive(Clone)]
pub struct Policy {
    /// Whether an explicit `templateModuleURL` may be used; absent means never
    pub allow_arbitrary_module: Option<ArbitraryModuleFn>,
    pub named_template_module_url: Option<NamedModuleFn>,
    pub default_template_module_url: Option<EnvelopeFn>,
    pub default_template_identity: Option<EnvelopeFn>,

    pub on_invalid_json: Arc<dyn Fn(&[u8]) -> Option<String> + Send + Sync>,
    pub on_invalid_envelope: Arc<dyn Fn(&Value) -> Option<String> + Send + Sync>,
    pub on_arbitrary_module_not_allowed: StrHook,
    pub on_invalid_template_name: StrHook,
    pub on_unresolved_template: EnvelopeFn,

    /// Hooks handed to the executor
    pub hooks: ExecuteHooks,
}

fn no_str_override() -> StrHook {
    Arc::new(|_: &str| None)
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            allow_arbitrary_module: None,
            named_template_module_url: None,
            default_template_module_url: None,
            default_template_identity: None,
            on_invalid_json: Arc::new(|_: &[u8]| None),
            on_invalid_envelope: Arc::new(|_: &Value| None),
            on_arbitrary_module_not_allowed: no_str_override(),
            on_invalid_template_name: no_str_override(),
            on_unresolved_template: Arc::new(|_: &JsonEnvelope| None),
            hooks: ExecuteHooks::default(),
        }
    }
}

impl Policy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allow_arbitrary_module<F>(mut self, allow: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.allow_arbitrary_module = Some(Arc::new(allow));
        self
    }

    pub fn named_template_module_url<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        self.named_template_module_url = Some(Arc::new(lookup));
        self
    }

    pub fn default_template_module_url<F>(mut self, default: F) -> Self
    where
        F: Fn(&JsonEnvelope) -> Option<String> + Send + Sync + 'static,
    {
        self.default_template_module_url = Some(Arc::new(default));
        self
    }

    pub fn default_template_identity<F>(mut self, default: F) -> Self
    where
        F: Fn(&JsonEnvelope) -> Option<String> + Send + Sync + 'static,
    {
        self.default_template_identity = Some(Arc::new(default));
        self
    }

    pub fn on_invalid_json<F>(mut self, hook: F) -> Self
    where
        F: Fn(&[u8]) -> Option<String> + Send + Sync + 'static,
    {
        self.on_invalid_json = Arc::new(hook);
        self
    }

    pub fn on_invalid_envelope<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Value) -> Option<String> + Send + Sync + 'static,
    {
        self.on_invalid_envelope = Arc::new(hook);
        self
    }

    pub fn on_arbitrary_module_not_allowed<F>(mut self, hook: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        self.on_arbitrary_module_not_allowed = Arc::new(hook);
        self
    }

    pub fn on_invalid_template_name<F>(mut self, hook: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        self.on_invalid_template_name = Arc::new(hook);
        self
    }

    pub fn on_unresolved_template<F>(mut self, hook: F) -> Self
    where
        F: Fn(&JsonEnvelope) -> Option<String> + Send + Sync + 'static,
    {
        self.on_unresolved_template = Arc::new(hook);
        self
    }

    pub fn with_hooks(mut self, hooks: ExecuteHooks) -> Self {
        self.hooks = hooks;
        self
    }
}

impl fmt::Debug for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Policy")
            .field("allow_arbitrary_module", &self.allow_arbitrary_module.is_some())
            .field("named_template_module_url", &self.named_template_module_url.is_some())
            .field("default_template_module_url", &self.default_template_module_url.is_some())
            .field("default_template_identity", &self.default_template_identity.is_some())
            .field("hooks", &self.hooks)
            .finish_non_exhaustive()
    }
}

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Parse raw JSON input into an envelope
///
/// A leading UTF-8 byte order mark is ignored.
pub fn parse_envelope(input: &[u8], policy: &Policy) -> Result<JsonEnvelope, Diagnostic> {
    let input = input.strip_prefix(UTF8_BOM).unwrap_or(input);
    let value: Value = match serde_json::from_slice(input) {
        Ok(value) => value,
        Err(err) => {
            tracing::debug!(error = %err, "envelope is not valid JSON");
            let message = non_empty((policy.on_invalid_json)(input))
                .unwrap_or_else(|| "Invalid JSON input".to_string());
            return Err(message.into());
        }
    };

    match JsonEnvelope::deserialize(&value) {
        Ok(envelope) => Ok(envelope.normalized()),
        Err(err) => {
            tracing::debug!(error = %err, "envelope has an invalid shape");
            let message = non_empty((policy.on_invalid_envelope)(&value))
                .unwrap_or_else(|| format!("Invalid JSON input: {}", value));
            Err(message.into())
        }
    }
}

/// Decide which module renders the envelope, and for which variant
///
/// Precedence: an explicit `templateModuleURL` (only when the policy allows
/// arbitrary modules), then `templateName` through the named lookup, then
/// the policy's default module.
pub fn resolve(envelope: &JsonEnvelope, policy: &Policy) -> Result<TemplateReference, Diagnostic> {
    let mut locator = policy
        .default_template_module_url
        .as_ref()
        .and_then(|default| default(envelope));

    if let Some(url) = &envelope.template_module_url {
        let allowed = policy
            .allow_arbitrary_module
            .as_ref()
            .is_some_and(|allow| allow(url));
        if !allowed {
            tracing::debug!(url = url.as_str(), "arbitrary template module refused");
            let message = non_empty((policy.on_arbitrary_module_not_allowed)(url)).unwrap_or_else(|| {
                "templateModuleURL can only be provided if allowArbitraryModule() is provided".to_string()
            });
            return Err(message.into());
        }
        locator = Some(url.clone());
    } else if let (Some(name), Some(lookup)) = (&envelope.template_name, &policy.named_template_module_url) {
        locator = lookup(name);
    }

    let Some(locator) = non_empty(locator) else {
        let message = match &envelope.template_name {
            Some(name) => non_empty((policy.on_invalid_template_name)(name))
                .unwrap_or_else(|| format!("templateName '{}' is not valid", name)),
            None => non_empty((policy.on_unresolved_template)(envelope)).unwrap_or_else(|| {
                "Either templateModuleURL, templateName, or defaultTemplateModuleURL() must be supplied"
                    .to_string()
            }),
        };
        return Err(message.into());
    };

    let variant = envelope.variant_identity.clone().or_else(|| {
        policy
            .default_template_identity
            .as_ref()
            .and_then(|default| non_empty(default(envelope)))
    });
    tracing::debug!(locator = locator.as_str(), variant = variant.as_deref(), "resolved template module");

    Ok(TemplateReference {
        locator,
        content: Value::Object(envelope.content.clone()),
        variant,
    })
}

/// Render raw JSON envelope input
///
/// String input can be passed with `as_bytes()`. Every failure comes back as
/// a diagnostic; nothing here panics on bad input.
pub async fn transform(input: &[u8], loader: &dyn ModuleLoader, policy: &Policy) -> Result<String, Diagnostic> {
    let envelope = parse_envelope(input, policy)?;
    let reference = resolve(&envelope, policy)?;
    execute(&reference, loader, &policy.hooks).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn envelope(value: Value) -> JsonEnvelope {
        parse_envelope(value.to_string().as_bytes(), &Policy::default()).unwrap()
    }

    #[test]
    fn test_parse_invalid_json() {
        let err = parse_envelope(b"{not json", &Policy::default()).unwrap_err();
        assert_eq!(err, "Invalid JSON input");

        let policy = Policy::new().on_invalid_json(|raw| Some(format!("bad input of {} bytes", raw.len())));
        let err = parse_envelope(b"{not json", &policy).unwrap_err();
        assert_eq!(err, "bad input of 9 bytes");
    }

    #[test]
    fn test_parse_rejects_bad_shapes() {
        for input in [
            r#"{"templateName":"x"}"#,
            r#"{"content":[1,2]}"#,
            r#"{"content":"text"}"#,
            r#"{"content":null}"#,
            r#"{"content":{},"templateModuleURL":5}"#,
            r#"{"content":{},"templateName":true}"#,
            r#"[]"#,
        ] {
            let err = parse_envelope(input.as_bytes(), &Policy::default()).unwrap_err();
            assert!(err.as_str().starts_with("Invalid JSON input: "), "{}", input);
        }

        let err = parse_envelope(br#"{"content":[1]}"#, &Policy::default()).unwrap_err();
        assert_eq!(err, r#"Invalid JSON input: {"content":[1]}"#);
    }

    #[test]
    fn test_parse_normalizes_empty_selectors() {
        let env = envelope(json!({"templateName": "", "templateIdentity": "a", "content": {}}));
        assert_eq!(env.template_name, None);
        assert_eq!(env.variant_identity.as_deref(), Some("a"));
    }

    #[test]
    fn test_parse_accepts_both_identity_keys() {
        let env = envelope(json!({"variantIdentity": "a", "templateIdentity": "b", "content": {}}));
        assert_eq!(env.variant_identity.as_deref(), Some("a"));

        let env = envelope(json!({"variantIdentity": "", "templateIdentity": "b", "content": {}}));
        assert_eq!(env.variant_identity.as_deref(), Some("b"));

        let env = envelope(json!({"templateIdentity": "b", "content": {}}));
        assert_eq!(env.variant_identity.as_deref(), Some("b"));
    }

    #[test]
    fn test_parse_skips_byte_order_mark() {
        let env = parse_envelope(b"\xEF\xBB\xBF{\"templateName\":\"n\",\"content\":{}}", &Policy::default()).unwrap();
        assert_eq!(env.template_name.as_deref(), Some("n"));
    }

    #[test]
    fn test_resolve_requires_some_locator() {
        let err = resolve(&envelope(json!({"content": {}})), &Policy::default()).unwrap_err();
        assert_eq!(
            err,
            "Either templateModuleURL, templateName, or defaultTemplateModuleURL() must be supplied"
        );
    }

    #[test]
    fn test_resolve_default_module() {
        let policy = Policy::new()
            .default_template_module_url(|_| Some("builtin:debug".to_string()))
            .default_template_identity(|_| Some("v1".to_string()));
        let reference = resolve(&envelope(json!({"content": {"a": 1}})), &policy).unwrap();
        assert_eq!(reference.locator, "builtin:debug");
        assert_eq!(reference.variant(), Some("v1"));
        assert_eq!(reference.content, json!({"a": 1}));
    }

    #[test]
    fn test_resolve_arbitrary_module_denied_by_default() {
        let env = envelope(json!({"templateModuleURL": "./x.toml", "content": {}}));
        let err = resolve(&env, &Policy::default()).unwrap_err();
        assert_eq!(
            err,
            "templateModuleURL can only be provided if allowArbitraryModule() is provided"
        );

        let policy = Policy::new()
            .allow_arbitrary_module(|_| false)
            .on_arbitrary_module_not_allowed(|url| Some(format!("no {}", url)));
        assert_eq!(resolve(&env, &policy).unwrap_err(), "no ./x.toml");
    }

    #[test]
    fn test_resolve_arbitrary_module_overrides_default() {
        let policy = Policy::new()
            .allow_arbitrary_module(|_| true)
            .default_template_module_url(|_| Some("builtin:debug".to_string()));
        let env = envelope(json!({"templateModuleURL": "./x.toml", "templateName": "n", "content": {}}));
        assert_eq!(resolve(&env, &policy).unwrap().locator, "./x.toml");
    }

    #[test]
    fn test_resolve_named_module() {
        let policy = Policy::new()
            .default_template_module_url(|_| Some("builtin:debug".to_string()))
            .named_template_module_url(|name| (name == "known").then(|| "builtin:known".to_string()));

        let env = envelope(json!({"templateName": "known", "content": {}}));
        assert_eq!(resolve(&env, &policy).unwrap().locator, "builtin:known");

        // A configured lookup that finds nothing does not fall back to the default
        let env = envelope(json!({"templateName": "unknown", "content": {}}));
        assert_eq!(resolve(&env, &policy).unwrap_err(), "templateName 'unknown' is not valid");

        let policy = policy.on_invalid_template_name(|name| Some(format!("unknown template {}", name)));
        assert_eq!(resolve(&env, &policy).unwrap_err(), "unknown template unknown");
    }

    #[test]
    fn test_resolve_name_without_lookup_uses_default() {
        let policy = Policy::new().default_template_module_url(|_| Some("builtin:debug".to_string()));
        let env = envelope(json!({"templateName": "anything", "content": {}}));
        assert_eq!(resolve(&env, &policy).unwrap().locator, "builtin:debug");
    }

    #[test]
    fn test_resolve_explicit_variant_wins() {
        let policy = Policy::new()
            .default_template_module_url(|_| Some("m".to_string()))
            .default_template_identity(|_| Some("fallback".to_string()));
        let env = envelope(json!({"variantIdentity": "explicit", "content": {}}));
        assert_eq!(resolve(&env, &policy).unwrap().variant(), Some("explicit"));
    }
}
