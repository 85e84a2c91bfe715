//! Error types surfaced by alert tasks.

use thiserror::Error;

use crate::render::RenderError;

/// Errors raised while assembling or delivering a Sentry event.
///
/// Every variant is fatal to the task invocation; nothing is retried or
/// downgraded to a warning.
#[derive(Error, Debug)]
pub enum SentryError {
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Template not found: {0}")]
    TemplateNotFound(String),

    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    #[error("Invalid template output: {0}")]
    InvalidTemplateOutput(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Sentry rejected the event with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("Response exceeded the configured limit of {limit} bytes")]
    ResponseTooLarge { limit: usize },
}
