//! HTML e-mail messages for account authentication flows
//!
//! Variants: `create-password` and `reset-password`, both rendering a call
//! to action pointing at the content's `authnUrl`.

use std::collections::HashMap;

use serde_json::Value;

use crate::bundle::HandlerBundle;
use crate::error::ProduceError;
use crate::guard::{required_fields_guard, ContentGuard, VariantGuards};
use crate::html::escape_html;

pub const VARIANTS: [&str; 2] = ["create-password", "reset-password"];

const BUTTON_STYLE: &str = "display: inline-block; padding: 12px 24px; background-color: #2196f3; \
color: #ffffff; text-decoration: none; border-radius: 4px;";

/// The e-mail module's handler bundle
pub fn bundle() -> HandlerBundle {
    let per_variant: HashMap<String, ContentGuard> = VARIANTS
        .iter()
        .map(|v| (v.to_string(), required_fields_guard(&["authnUrl"]).0))
        .collect();

    HandlerBundle::from_fn(render).with_variant_guards(VariantGuards::new(&VARIANTS, per_variant))
}

fn render(content: &Value, variant: Option<&str>) -> Result<String, ProduceError> {
    let authn_url = content
        .get("authnUrl")
        .and_then(Value::as_str)
        .ok_or_else(|| ProduceError::message("authnUrl must be a string"))?;

    match variant {
        Some("create-password") => Ok(create_password(authn_url)),
        Some("reset-password") => Ok(reset_password(authn_url)),
        other => Err(ProduceError::message(format!(
            "template ID '{}' invalid, expected: {}",
            other.unwrap_or("undefined"),
            VARIANTS.join(", ")
        ))),
    }
}

pub fn create_password(authn_url: &str) -> String {
    layout(
        "Create Password",
        &[
            paragraph("Hi"),
            paragraph("Welcome to Medigy, please click below to create your password."),
            call_to_action_button("Create a new password", authn_url),
            anchor_tip(authn_url),
        ],
    )
}

pub fn reset_password(authn_url: &str) -> String {
    layout(
        "Reset Password",
        &[
            paragraph("Hi"),
            paragraph("We're sorry you had trouble logging in, please tap below to reset your password."),
            call_to_action_button("Reset your password", authn_url),
            anchor_tip(authn_url),
        ],
    )
}

fn paragraph(text: &str) -> String {
    format!("<p>{}</p>", escape_html(text))
}

fn call_to_action_button(label: &str, url: &str) -> String {
    format!(
        "<p><a href=\"{}\" style=\"{}\">{}</a></p>",
        escape_html(url),
        BUTTON_STYLE,
        escape_html(label)
    )
}

fn anchor_tip(url: &str) -> String {
    let url = escape_html(url);
    format!(
        "<p style=\"font-size: 12px;\">If the button does not work, copy this link into your browser: \
<a href=\"{url}\">{url}</a></p>"
    )
}

fn layout(heading: &str, body: &[String]) -> String {
    let heading = escape_html(heading);
    let mut html = String::new();
    html.push_str("<!DOCTYPE html>\n");
    html.push_str("<html lang=\"en\">\n");
    html.push_str("<head>\n");
    html.push_str("  <meta charset=\"utf-8\">\n");
    html.push_str(&format!("  <title>{}</title>\n", heading));
    html.push_str("</head>\n");
    html.push_str("<body style=\"margin: 0; font-family: Arial, sans-serif; color: #333333;\">\n");
    html.push_str(&format!("  <h1 style=\"font-size: 24px;\">{}</h1>\n", heading));
    for line in body {
        html.push_str("  ");
        html.push_str(line);
        html.push('\n');
    }
    html.push_str("</body>\n");
    html.push_str("</html>\n");
    html
}
