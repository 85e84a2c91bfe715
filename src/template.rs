//! Named event templates, bundled at compile time.

use serde_json::{Map, Value};

use crate::error::SentryError;
use crate::render::RunContext;

/// Name of the bundled execution template.
pub const EXECUTION_TEMPLATE: &str = "execution.json";

const EXECUTION_TEMPLATE_BODY: &str = include_str!("../templates/execution.json");

/// Look up a bundled template by name.
pub fn load(name: &str) -> Result<&'static str, SentryError> {
    match name {
        EXECUTION_TEMPLATE => Ok(EXECUTION_TEMPLATE_BODY),
        other => Err(SentryError::TemplateNotFound(other.to_string())),
    }
}

/// Load a named template, render it against `vars` and parse the result as a
/// JSON object. The parsed map is the starting state of the event payload.
pub fn render_template(
    ctx: &RunContext,
    name: &str,
    vars: &Map<String, Value>,
) -> Result<Map<String, Value>, SentryError> {
    let raw = load(name)?;
    let rendered = ctx.render_with(raw, vars)?;
    parse_object(&rendered)
}

fn parse_object(rendered: &str) -> Result<Map<String, Value>, SentryError> {
    let parsed: Value = serde_json::from_str(rendered)
        .map_err(|e| SentryError::InvalidTemplateOutput(e.to_string()))?;
    match parsed {
        Value::Object(map) => Ok(map),
        other => Err(SentryError::InvalidTemplateOutput(format!(
            "expected a JSON object at the top level, got {}",
            type_name(&other)
        ))),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
