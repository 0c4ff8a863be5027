//! End-to-end tests: JSON envelope in, rendered output or diagnostic out

use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use serde_json::Value;

use template_orchestrator::{
    modules, transform, ExecuteHooks, FileModuleLoader, GuardFailureMode, HandlerBundle, ImportError,
    ModuleLoader, ModuleRegistry, OrchestratorConfig, Policy, ProduceError, TemplateModule,
};

fn fixtures() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn loader() -> ModuleRegistry {
    let mut registry = ModuleRegistry::new().with_fallback(FileModuleLoader::new(fixtures().join("templates")));
    modules::register_builtins(&mut registry).expect("builtins register once");
    registry
}

fn permissive_policy() -> Policy {
    Policy::new()
        .allow_arbitrary_module(|_| true)
        .named_template_module_url(|name| match name {
            "medigy-email" => Some(modules::AUTHN_EMAIL.to_string()),
            "multiple" => Some("multiple.toml".to_string()),
            _ => None,
        })
        .default_template_module_url(|_| Some(modules::DEBUG.to_string()))
}

/// Loader that counts imports and never finds anything
#[derive(Default)]
struct CountingLoader {
    imports: AtomicUsize,
}

#[async_trait]
impl ModuleLoader for CountingLoader {
    async fn import(&self, locator: &str) -> Result<TemplateModule, ImportError> {
        self.imports.fetch_add(1, Ordering::SeqCst);
        Err(ImportError::NotFound {
            locator: locator.to_string(),
        })
    }
}

#[tokio::test]
async fn test_create_password_email_matches_golden() {
    let input = r#"{
        "templateName": "medigy-email",
        "variantIdentity": "create-password",
        "content": { "authnUrl": "https://www.medigy.com/x/reset-password" }
    }"#;
    let expected = fs::read_to_string(fixtures().join("create-password.html.golden")).expect("golden file");

    let output = transform(input.as_bytes(), &loader(), &permissive_policy()).await;
    assert_eq!(output.expect("should render"), expected);
}

#[tokio::test]
async fn test_email_rejects_unexpected_content() {
    let input = r#"{
        "templateModuleURL": "builtin:authn-email",
        "templateIdentity": "create-password",
        "content": { "badData": "bad data" }
    }"#;

    let output = transform(input.as_bytes(), &loader(), &permissive_policy()).await;
    assert_eq!(
        output.unwrap_err(),
        r#"unexpected content for template create-password: {"badData":"bad data"}"#
    );
}

#[tokio::test]
async fn test_email_rejects_unknown_variant() {
    let input = r#"{"templateName":"medigy-email","variantIdentity":"welcome","content":{"authnUrl":"u"}}"#;

    let output = transform(input.as_bytes(), &loader(), &permissive_policy()).await;
    assert_eq!(
        output.unwrap_err(),
        "template ID 'welcome' invalid, expected: create-password, reset-password"
    );
}

#[tokio::test]
async fn test_named_module_with_multiple_templates() {
    let input = r#"{
        "templateName": "multiple",
        "templateIdentity": "content1",
        "content": { "heading1": "TestHeading", "body1": "TestBody" }
    }"#;

    let output = transform(input.as_bytes(), &loader(), &permissive_policy()).await;
    assert_eq!(output.unwrap(), "Template 1: TestHeading, TestBody");
}

#[tokio::test]
async fn test_missing_optional_field_renders_empty() {
    let input = r#"{"templateName":"multiple","variantIdentity":"content2","content":{"body2":"Body"}}"#;

    let output = transform(input.as_bytes(), &loader(), &permissive_policy()).await;
    insta::assert_snapshot!(output.unwrap(), @"Template 2: , Body");
}

#[tokio::test]
async fn test_default_module_echoes_content() {
    let input = r#"{"content":{"heading":"Hi","count":2}}"#;

    let output = transform(input.as_bytes(), &loader(), &permissive_policy()).await;
    assert_eq!(output.unwrap(), r#"{"heading":"Hi","count":2}"#);
}

#[tokio::test]
async fn test_unknown_template_name() {
    let input = r#"{"templateName":"nope","content":{}}"#;

    let output = transform(input.as_bytes(), &loader(), &permissive_policy()).await;
    assert_eq!(output.unwrap_err(), "templateName 'nope' is not valid");
}

#[tokio::test]
async fn test_malformed_json() {
    let output = transform(b"{not json", &loader(), &permissive_policy()).await;
    assert_eq!(output.unwrap_err(), "Invalid JSON input");
}

#[tokio::test]
async fn test_envelope_without_content_object() {
    let output = transform(br#"{"content":[1,2]}"#, &loader(), &permissive_policy()).await;
    assert_eq!(output.unwrap_err(), r#"Invalid JSON input: {"content":[1,2]}"#);
}

#[tokio::test]
async fn test_unresolved_template_without_default() {
    let output = transform(br#"{"content":{}}"#, &loader(), &Policy::new()).await;
    assert_eq!(
        output.unwrap_err(),
        "Either templateModuleURL, templateName, or defaultTemplateModuleURL() must be supplied"
    );
}

#[tokio::test]
async fn test_denied_arbitrary_module_never_imports() {
    let loader = CountingLoader::default();
    let input = br#"{"templateModuleURL":"multiple.toml","content":{}}"#;

    let output = transform(input, &loader, &Policy::new()).await;
    assert_eq!(
        output.unwrap_err(),
        "templateModuleURL can only be provided if allowArbitraryModule() is provided"
    );

    let policy = Policy::new().allow_arbitrary_module(|url| url.starts_with("builtin:"));
    let output = transform(input, &loader, &policy).await;
    assert_eq!(
        output.unwrap_err(),
        "templateModuleURL can only be provided if allowArbitraryModule() is provided"
    );
    assert_eq!(loader.imports.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_module_without_default_export() {
    let input = br#"{"templateModuleURL":"invalid-no-default.toml","content":{}}"#;

    let output = transform(input, &loader(), &permissive_policy()).await;
    assert_eq!(output.unwrap_err(), "No module.default found in invalid-no-default.toml");
}

#[tokio::test]
async fn test_module_with_invalid_default_export() {
    let input = br#"{"templateModuleURL":"invalid-default-type.toml","content":{}}"#;

    let output = transform(input, &loader(), &permissive_policy()).await;
    assert_eq!(
        output.unwrap_err(),
        "module.default is not an array or function: invalid-default-type.toml"
    );
}

#[tokio::test]
async fn test_hooks_override_default_messages() {
    let hooks = ExecuteHooks::new()
        .on_import_error(|_, reference| Some(format!("no such template: {}", reference.locator)))
        .on_content_guard_failure(|_| Some("bad content".to_string()));
    let policy = permissive_policy()
        .on_invalid_json(|_| Some("send JSON please".to_string()))
        .with_hooks(hooks);

    let output = transform(b"", &loader(), &policy).await;
    assert_eq!(output.unwrap_err(), "send JSON please");

    let output = transform(br#"{"templateModuleURL":"absent.toml","content":{}}"#, &loader(), &policy).await;
    assert_eq!(output.unwrap_err(), "no such template: absent.toml");

    let output = transform(br#"{"templateModuleURL":"single.toml","content":{}}"#, &loader(), &policy).await;
    assert_eq!(output.unwrap_err(), "bad content");
}

#[tokio::test]
async fn test_guard_failure_mode_block() {
    let mut registry = ModuleRegistry::new();
    registry
        .register("silent", || {
            let guard = Arc::new(|content: &Value, _: Option<&str>| content.get("ok").is_some());
            TemplateModule::bundle(
                HandlerBundle::from_fn(|_: &Value, _: Option<&str>| Ok::<_, ProduceError>("rendered".to_string()))
                    .with_content_guard(guard),
            )
        })
        .unwrap();
    let input = br#"{"templateModuleURL":"silent","content":{}}"#;

    let passthrough = permissive_policy();
    let output = transform(input, &registry, &passthrough).await;
    assert_eq!(output.unwrap(), "rendered");

    let block = permissive_policy().with_hooks(ExecuteHooks::new().with_guard_failure_mode(GuardFailureMode::Block));
    let output = transform(input, &registry, &block).await;
    assert_eq!(output.unwrap_err(), "content rejected by silent");
}

#[tokio::test]
async fn test_config_driven_pipeline() {
    let config = OrchestratorConfig::from_str(&format!(
        r#"
default_template_identity = "content1"
module_root = "{}"

[modules]
multiple = "multiple.toml"
"#,
        fixtures().join("templates").display()
    ))
    .expect("config parses");
    let loader = config.loader().expect("loader builds");
    let policy = config.to_policy();

    let input = br#"{"templateName":"multiple","content":{"heading1":"H","body1":"B"}}"#;
    assert_eq!(transform(input, &loader, &policy).await.unwrap(), "Template 1: H, B");

    let input = br#"{"templateModuleURL":"multiple.toml","content":{}}"#;
    assert_eq!(
        transform(input, &loader, &policy).await.unwrap_err(),
        "arbitrary template modules are disabled, can only use pre-defined modules (not multiple.toml)"
    );
}
