//! Alert tasks: raw payload, templated payload, and execution-driven.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::dsn::Dsn;
use crate::error::SentryError;
use crate::event::{self, generate_event_id, EventOverrides, Level, Platform};
use crate::execution::Execution;
use crate::options::RequestOptions;
use crate::render::RunContext;
use crate::sender::AlertSender;
use crate::template;

/// A runnable notification task. One invocation, one outcome; there is no
/// output value beyond success or failure.
#[async_trait]
pub trait NotificationTask: Send + Sync {
    async fn run(&self, ctx: &RunContext) -> Result<(), SentryError>;
}

fn default_level() -> Option<Level> {
    Some(Level::Error)
}

/// Send a pre-assembled payload to a DSN. The base task: both templated
/// variants delegate their delivery here.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentryAlert {
    /// Project DSN, already secret-resolved by the host.
    pub dsn: String,

    /// Event document to send; rendered against the run context.
    pub payload: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<RequestOptions>,
}

impl SentryAlert {
    pub fn new(dsn: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            dsn: dsn.into(),
            payload: payload.into(),
            options: None,
        }
    }

    /// Deliver an already-final payload. Headers and the DSN still render
    /// against the run context; a failure in either aborts before any
    /// network activity.
    async fn dispatch(&self, ctx: &RunContext, payload: String) -> Result<(), SentryError> {
        let dsn = Dsn::parse(&ctx.render(&self.dsn)?)?;
        let headers = match &self.options {
            Some(options) => options.rendered_headers(ctx)?,
            None => HeaderMap::new(),
        };
        let sender = AlertSender::new(self.options.as_ref())?;
        sender.send(&dsn, payload, headers).await
    }
}

#[async_trait]
impl NotificationTask for SentryAlert {
    async fn run(&self, ctx: &RunContext) -> Result<(), SentryError> {
        let payload = ctx.render(&self.payload)?;
        self.dispatch(ctx, payload).await
    }
}

/// Render a named template, overlay the event fields, send the result.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentryTemplate {
    pub dsn: String,

    /// Bundled template name; when unset the payload starts empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_uri: Option<String>,

    /// Variables the template renders against (not the run context's own).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_render_map: Option<Map<String, Value>>,

    /// 32 lowercase hex digits; generated when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,

    #[serde(default)]
    pub platform: Platform,

    #[serde(default = "default_level")]
    pub level: Option<Level>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_name: Option<String>,

    /// Merged key-by-key into the template's `extra` object.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,

    /// Replaces the template's `errors` object wholesale.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub errors: Map<String, Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<RequestOptions>,
}

impl Default for SentryTemplate {
    fn default() -> Self {
        Self {
            dsn: String::new(),
            template_uri: None,
            template_render_map: None,
            event_id: None,
            platform: Platform::default(),
            level: default_level(),
            transaction: None,
            server_name: None,
            extra: Map::new(),
            errors: Map::new(),
            options: None,
        }
    }
}

impl SentryTemplate {
    pub fn new(dsn: impl Into<String>) -> Self {
        Self {
            dsn: dsn.into(),
            ..Self::default()
        }
    }

    /// Run the template pipeline and assemble the final event document.
    /// Pure with respect to the network; nothing is sent from here.
    pub fn assemble_payload(&self, ctx: &RunContext) -> Result<String, SentryError> {
        let base = match &self.template_uri {
            Some(uri) => {
                let uri = ctx.render(uri)?;
                let empty = Map::new();
                let vars = self.template_render_map.as_ref().unwrap_or(&empty);
                template::render_template(ctx, &uri, vars)?
            }
            None => Map::new(),
        };

        let event_id = match &self.event_id {
            Some(raw) => ctx.render(raw)?,
            None => generate_event_id(),
        };

        let overrides = EventOverrides {
            event_id,
            platform: self.platform,
            level: self.level,
            transaction: ctx.render_opt(self.transaction.as_deref())?,
            server_name: ctx.render_opt(self.server_name.as_deref())?,
            extra: self.extra.clone(),
            errors: self.errors.clone(),
        };

        debug!(template = self.template_uri.as_deref().unwrap_or("<none>"), "assembling event");
        event::assemble(base, overrides, Utc::now())
    }
}

#[async_trait]
impl NotificationTask for SentryTemplate {
    async fn run(&self, ctx: &RunContext) -> Result<(), SentryError> {
        let payload = self.assemble_payload(ctx)?;
        let alert = SentryAlert {
            dsn: self.dsn.clone(),
            payload: String::new(),
            options: self.options.clone(),
        };
        alert.dispatch(ctx, payload).await
    }
}

/// Report one execution to Sentry using the bundled execution template.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentryExecution {
    pub dsn: String,

    /// Execution snapshot supplied by the host engine.
    pub execution: Execution,

    /// Extra key/value pairs exposed to the template and folded into the
    /// event's `extra` object.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub custom_fields: Map<String, Value>,

    /// Message override; defaults to a summary derived from the execution.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_message: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,

    #[serde(default)]
    pub platform: Platform,

    #[serde(default = "default_level")]
    pub level: Option<Level>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_name: Option<String>,

    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,

    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub errors: Map<String, Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<RequestOptions>,
}

impl SentryExecution {
    pub fn new(dsn: impl Into<String>, execution: Execution) -> Self {
        Self {
            dsn: dsn.into(),
            execution,
            custom_fields: Map::new(),
            custom_message: None,
            event_id: None,
            platform: Platform::default(),
            level: default_level(),
            transaction: None,
            server_name: None,
            extra: Map::new(),
            errors: Map::new(),
            options: None,
        }
    }

    pub fn with_level(mut self, level: Level) -> Self {
        self.level = Some(level);
        self
    }

    pub fn with_transaction(mut self, transaction: impl Into<String>) -> Self {
        self.transaction = Some(transaction.into());
        self
    }

    pub fn with_custom_message(mut self, message: impl Into<String>) -> Self {
        self.custom_message = Some(message.into());
        self
    }

    pub fn with_custom_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.custom_fields.insert(key.into(), value);
        self
    }

    fn to_template(&self, ctx: &RunContext) -> Result<SentryTemplate, SentryError> {
        let custom_message = ctx.render_opt(self.custom_message.as_deref())?;
        let render_map = self
            .execution
            .render_map(&self.custom_fields, custom_message.as_deref());

        // Custom fields land in `extra`; explicit extra entries win on clash.
        let mut extra = self.extra.clone();
        for (key, value) in &self.custom_fields {
            extra
                .entry(key.clone())
                .or_insert_with(|| value.clone());
        }

        Ok(SentryTemplate {
            dsn: self.dsn.clone(),
            template_uri: Some(template::EXECUTION_TEMPLATE.to_string()),
            template_render_map: Some(render_map),
            event_id: self.event_id.clone(),
            platform: self.platform,
            level: self.level,
            transaction: self.transaction.clone(),
            server_name: self.server_name.clone(),
            extra,
            errors: self.errors.clone(),
            options: self.options.clone(),
        })
    }
}

#[async_trait]
impl NotificationTask for SentryExecution {
    async fn run(&self, ctx: &RunContext) -> Result<(), SentryError> {
        self.to_template(ctx)?.run(ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::validate_event_id;
    use crate::execution::ExecutionStatus;
    use serde_json::json;
    use std::time::Duration;

    fn failed_execution() -> Execution {
        Execution {
            id: "5xGpL2".to_string(),
            namespace: "prod.team".to_string(),
            flow_id: "nightly-sync".to_string(),
            start_date: "2025-03-01T02:00:00Z".parse().unwrap(),
            duration: Some(Duration::from_secs(75)),
            status: ExecutionStatus::Failed,
            failed_task_id: Some("extract".to_string()),
            link: Some("https://ui.example.com/executions/5xGpL2".to_string()),
        }
    }

    fn parse(payload: &str) -> Map<String, Value> {
        serde_json::from_str::<Value>(payload)
            .unwrap()
            .as_object()
            .cloned()
            .unwrap()
    }

    #[test]
    fn template_task_without_template_builds_minimal_event() {
        let task = SentryTemplate::new("https://key@sentry.example.com/1");
        let payload = task.assemble_payload(&RunContext::empty()).unwrap();
        let event = parse(&payload);

        validate_event_id(event["event_id"].as_str().unwrap()).unwrap();
        assert_eq!(event["platform"], "rust");
        assert_eq!(event["level"], "error");
        assert!(!event.contains_key("transaction"));
        assert!(!event.contains_key("extra"));
    }

    #[test]
    fn template_task_renders_dynamic_properties() {
        let mut vars = Map::new();
        vars.insert("host".to_string(), json!("worker-7"));
        let ctx = RunContext::with_variables(vars);

        let mut task = SentryTemplate::new("https://key@sentry.example.com/1");
        task.server_name = Some("{{ host }}".to_string());
        task.transaction = Some("/flows/{{ host }}".to_string());
        task.level = None;

        let event = parse(&task.assemble_payload(&ctx).unwrap());
        assert_eq!(event["server_name"], "worker-7");
        assert_eq!(event["transaction"], "/flows/worker-7");
        assert!(!event.contains_key("level"));
    }

    #[test]
    fn supplied_event_id_is_validated() {
        let mut task = SentryTemplate::new("https://key@sentry.example.com/1");
        task.event_id = Some("not-hex".to_string());
        let err = task.assemble_payload(&RunContext::empty()).unwrap_err();
        assert!(matches!(err, SentryError::Configuration(_)));
    }

    #[test]
    fn unknown_template_uri_fails() {
        let mut task = SentryTemplate::new("https://key@sentry.example.com/1");
        task.template_uri = Some("nope.json".to_string());
        let err = task.assemble_payload(&RunContext::empty()).unwrap_err();
        assert!(matches!(err, SentryError::TemplateNotFound(_)));
    }

    #[test]
    fn execution_task_assembles_template_and_extras() {
        let task = SentryExecution::new("https://key@sentry.example.com/1", failed_execution())
            .with_custom_field("shard", json!("team"));

        let template = task.to_template(&RunContext::empty()).unwrap();
        let event = parse(&template.assemble_payload(&RunContext::empty()).unwrap());

        assert_eq!(
            event["message"],
            "Execution 5xGpL2 of prod.team.nightly-sync failed on task `extract`"
        );
        assert_eq!(event["extra"]["Execution ID"], "5xGpL2");
        assert_eq!(event["extra"]["Failed task ID"], "extract");
        assert_eq!(event["extra"]["shard"], "team");
        assert_eq!(event["level"], "error");
    }

    #[test]
    fn explicit_extra_wins_over_custom_field() {
        let mut task =
            SentryExecution::new("https://key@sentry.example.com/1", failed_execution())
                .with_custom_field("shard", json!("from-custom"));
        task.extra.insert("shard".to_string(), json!("from-extra"));

        let template = task.to_template(&RunContext::empty()).unwrap();
        assert_eq!(template.extra["shard"], "from-extra");
    }

    #[test]
    fn task_configs_deserialize_with_defaults() {
        let task: SentryTemplate = serde_json::from_value(json!({
            "dsn": "https://key@sentry.example.com/1",
            "transaction": "/job/42"
        }))
        .unwrap();
        assert_eq!(task.level, Some(Level::Error));
        assert_eq!(task.platform, Platform::Rust);
        assert_eq!(task.transaction.as_deref(), Some("/job/42"));

        let task: SentryExecution = serde_json::from_value(json!({
            "dsn": "https://key@sentry.example.com/1",
            "execution": {
                "id": "01J8",
                "namespace": "prod",
                "flowId": "sync",
                "startDate": "2025-03-01T02:00:00Z",
                "status": "FAILED"
            }
        }))
        .unwrap();
        assert_eq!(task.execution.id, "01J8");
        assert_eq!(task.level, Some(Level::Error));
    }
}
