//! # sentry-notify
//!
//! Sentry alert delivery for workflow execution events.
//!
//! This crate provides functionality for:
//! - Rendering JSON event templates with execution metadata
//! - Assembling Sentry event payloads (event id, level, `extra`, `errors`)
//! - Delivering events to the DSN-derived store endpoint over HTTP
//!
//! The host engine supplies execution metadata and variable rendering; this
//! crate owns payload assembly and the single outbound POST.

mod dsn;
mod error;
mod event;
mod execution;
mod options;
mod render;
mod sender;
mod task;
mod template;

pub use dsn::Dsn;
pub use error::SentryError;
pub use event::{assemble, generate_event_id, validate_event_id, EventOverrides, Level, Platform};
pub use execution::{Execution, ExecutionStatus};
pub use options::{build_client, Charset, RequestOptions};
pub use render::{RenderError, Renderer, RunContext, VariableRenderer};
pub use sender::AlertSender;
pub use task::{NotificationTask, SentryAlert, SentryExecution, SentryTemplate};
pub use template::EXECUTION_TEMPLATE;
