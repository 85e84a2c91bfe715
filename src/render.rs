//! Variable rendering for dynamic task properties.
//!
//! Rendering is an injected capability: the host engine owns the real
//! templating language and hands this crate a [`Renderer`]. The bundled
//! [`VariableRenderer`] only substitutes `{{ path }}` references from a
//! variable map, which is all the bundled templates need.

use serde_json::{Map, Value};
use thiserror::Error;

/// Rendering failures. Unresolved references fail loudly instead of being
/// blanked, so a half-rendered payload can never be sent.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    #[error("unresolved reference `{{{{ {0} }}}}`")]
    Unresolved(String),

    #[error("unterminated `{{{{` at byte {0}")]
    Unterminated(usize),
}

/// Substitutes variable references in a string.
pub trait Renderer: Send + Sync {
    fn render(&self, input: &str, vars: &Map<String, Value>) -> Result<String, RenderError>;
}

/// Minimal `{{ path }}` renderer.
///
/// `path` is a key of the variable map, or a dot-separated path into nested
/// objects (`execution.id`). String values substitute verbatim; everything
/// else substitutes as compact JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct VariableRenderer;

impl Renderer for VariableRenderer {
    fn render(&self, input: &str, vars: &Map<String, Value>) -> Result<String, RenderError> {
        let mut out = String::with_capacity(input.len());
        let mut rest = input;
        let mut offset = 0;

        while let Some(start) = rest.find("{{") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let end = after
                .find("}}")
                .ok_or(RenderError::Unterminated(offset + start))?;

            let path = after[..end].trim();
            let value =
                lookup(vars, path).ok_or_else(|| RenderError::Unresolved(path.to_string()))?;
            match value {
                Value::String(s) => out.push_str(s),
                other => out.push_str(&other.to_string()),
            }

            offset += start + 2 + end + 2;
            rest = &after[end + 2..];
        }

        out.push_str(rest);
        Ok(out)
    }
}

fn lookup<'a>(vars: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    if let Some(value) = vars.get(path) {
        return Some(value);
    }
    let mut parts = path.split('.');
    let mut current = vars.get(parts.next()?)?;
    for part in parts {
        current = current.as_object()?.get(part)?;
    }
    Some(current)
}

/// Per-invocation rendering context handed in by the host engine.
///
/// Carries the engine's variable map for dynamic properties (headers, dsn,
/// transaction, ...). Templates render against their own map via
/// [`RunContext::render_with`].
pub struct RunContext {
    renderer: Box<dyn Renderer>,
    variables: Map<String, Value>,
}

impl RunContext {
    pub fn new(renderer: Box<dyn Renderer>, variables: Map<String, Value>) -> Self {
        Self {
            renderer,
            variables,
        }
    }

    /// Context backed by the bundled [`VariableRenderer`].
    pub fn with_variables(variables: Map<String, Value>) -> Self {
        Self::new(Box::new(VariableRenderer), variables)
    }

    /// Context with no variables; any reference fails to resolve.
    pub fn empty() -> Self {
        Self::with_variables(Map::new())
    }

    pub fn variables(&self) -> &Map<String, Value> {
        &self.variables
    }

    /// Render against the context's own variables.
    pub fn render(&self, input: &str) -> Result<String, RenderError> {
        self.renderer.render(input, &self.variables)
    }

    /// Render against an explicit variable map (template rendering).
    pub fn render_with(
        &self,
        input: &str,
        vars: &Map<String, Value>,
    ) -> Result<String, RenderError> {
        self.renderer.render(input, vars)
    }

    /// Render an optional property, passing `None` through.
    pub fn render_opt(&self, input: Option<&str>) -> Result<Option<String>, RenderError> {
        input.map(|value| self.render(value)).transpose()
    }
}
