//! Debugging module: accepts any content and echoes it back as JSON

use serde_json::Value;

use crate::error::ProduceError;

pub fn render(content: &Value, _variant: Option<&str>) -> Result<String, ProduceError> {
    Ok(serde_json::to_string(content)?)
}
