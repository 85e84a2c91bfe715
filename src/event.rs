//! Event vocabulary and payload assembly.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use uuid::Uuid;

use crate::error::SentryError;

/// Originating technology stack, attached to every event so Sentry can adapt
/// parsing and display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    #[default]
    Rust,
    Java,
    Javascript,
    Node,
    Python,
    Ruby,
    Php,
    Go,
    Csharp,
    Elixir,
    Other,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rust => "rust",
            Self::Java => "java",
            Self::Javascript => "javascript",
            Self::Node => "node",
            Self::Python => "python",
            Self::Ruby => "ruby",
            Self::Php => "php",
            Self::Go => "go",
            Self::Csharp => "csharp",
            Self::Elixir => "elixir",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Alert severity as Sentry understands it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Fatal,
    #[default]
    Error,
    Warning,
    Info,
    Debug,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fatal => "fatal",
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
            Self::Debug => "debug",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "fatal" => Some(Self::Fatal),
            "error" => Some(Self::Error),
            "warning" | "warn" => Some(Self::Warning),
            "info" => Some(Self::Info),
            "debug" => Some(Self::Debug),
            _ => None,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Generate a fresh event id: uuid4, lowercase hex, no dashes.
pub fn generate_event_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Event ids must be exactly 32 lowercase hex digits.
pub fn validate_event_id(id: &str) -> Result<(), SentryError> {
    let valid = id.len() == 32
        && id
            .bytes()
            .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'));
    if valid {
        Ok(())
    } else {
        Err(SentryError::Configuration(format!(
            "event id must match [0-9a-f]{{32}}, got `{id}`"
        )))
    }
}

/// Resolved per-field overrides layered onto the rendered template.
///
/// Optional fields follow override-or-leave-untouched: a `None` neither adds
/// nor removes the template's value.
#[derive(Debug, Clone, Default)]
pub struct EventOverrides {
    pub event_id: String,
    pub platform: Platform,
    pub level: Option<Level>,
    pub transaction: Option<String>,
    pub server_name: Option<String>,
    pub extra: Map<String, Value>,
    pub errors: Map<String, Value>,
}

/// Overlay the overrides onto the template map and serialize the final event.
///
/// The order is fixed: identity fields are set unconditionally, optional
/// fields only when resolved, `extra` merges key-by-key into the template's
/// object while `errors` replaces it wholesale. Key order is insertion order,
/// so serialization is deterministic.
pub fn assemble(
    mut event: Map<String, Value>,
    overrides: EventOverrides,
    timestamp: DateTime<Utc>,
) -> Result<String, SentryError> {
    validate_event_id(&overrides.event_id)?;

    event.insert("event_id".to_string(), Value::String(overrides.event_id));
    event.insert(
        "timestamp".to_string(),
        Value::String(timestamp.to_rfc3339_opts(SecondsFormat::Micros, true)),
    );
    event.insert(
        "platform".to_string(),
        Value::String(overrides.platform.as_str().to_string()),
    );

    if let Some(level) = overrides.level {
        event.insert(
            "level".to_string(),
            Value::String(level.as_str().to_string()),
        );
    }

    if let Some(transaction) = overrides.transaction {
        if !transaction.is_empty() {
            event.insert("transaction".to_string(), Value::String(transaction));
        }
    }

    if let Some(server_name) = overrides.server_name {
        event.insert("server_name".to_string(), Value::String(server_name));
    }

    if !overrides.extra.is_empty() {
        let mut merged = match event.get("extra") {
            Some(Value::Object(existing)) => existing.clone(),
            _ => Map::new(),
        };
        for (key, value) in overrides.extra {
            merged.insert(key, value);
        }
        event.insert("extra".to_string(), Value::Object(merged));
    }

    if !overrides.errors.is_empty() {
        event.insert("errors".to_string(), Value::Object(overrides.errors));
    }

    Ok(serde_json::to_string(&event)?)
}
