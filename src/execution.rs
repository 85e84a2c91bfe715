//! Adapter between the host engine's execution record and the template
//! variable map.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Terminal and in-flight states an execution can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionStatus {
    Created,
    Running,
    Paused,
    Success,
    Warning,
    Failed,
    Killed,
}

impl ExecutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "CREATED",
            Self::Running => "RUNNING",
            Self::Paused => "PAUSED",
            Self::Success => "SUCCESS",
            Self::Warning => "WARNING",
            Self::Failed => "FAILED",
            Self::Killed => "KILLED",
        }
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Snapshot of one execution, supplied by the host engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Execution {
    pub id: String,
    pub namespace: String,
    pub flow_id: String,
    pub start_date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<Duration>,
    pub status: ExecutionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_task_id: Option<String>,
    /// Deep link into the host engine's UI.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

impl Execution {
    /// Build the template variable map.
    ///
    /// Every key the bundled template references is always present; absent
    /// optionals become empty strings so a template reference never fails on
    /// a successful execution.
    pub fn render_map(
        &self,
        custom_fields: &Map<String, Value>,
        custom_message: Option<&str>,
    ) -> Map<String, Value> {
        let mut execution = Map::new();
        execution.insert("id".to_string(), json!(self.id));
        execution.insert("namespace".to_string(), json!(self.namespace));
        execution.insert("flowId".to_string(), json!(self.flow_id));
        execution.insert(
            "startDate".to_string(),
            json!(self.start_date.to_rfc3339_opts(SecondsFormat::Secs, true)),
        );
        execution.insert("status".to_string(), json!(self.status.as_str()));
        execution.insert(
            "failedTaskId".to_string(),
            json!(self.failed_task_id.clone().unwrap_or_default()),
        );

        let mut vars = Map::new();
        vars.insert("execution".to_string(), Value::Object(execution));
        vars.insert(
            "duration".to_string(),
            json!(self.duration.map(format_duration).unwrap_or_default()),
        );
        vars.insert(
            "link".to_string(),
            json!(self.link.clone().unwrap_or_default()),
        );
        vars.insert(
            "customMessage".to_string(),
            json!(custom_message
                .map(str::to_string)
                .unwrap_or_else(|| self.default_message())),
        );
        vars.insert("customFields".to_string(), Value::Object(custom_fields.clone()));
        vars
    }

    fn default_message(&self) -> String {
        match &self.failed_task_id {
            Some(task) => format!(
                "Execution {} of {}.{} failed on task `{}`",
                self.id, self.namespace, self.flow_id, task
            ),
            None => format!(
                "Execution {} of {}.{} finished with status {}",
                self.id, self.namespace, self.flow_id, self.status
            ),
        }
    }
}

fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs >= 60 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{:.3}s", duration.as_secs_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failed_execution() -> Execution {
        Execution {
            id: "5xGpL2".to_string(),
            namespace: "prod.team".to_string(),
            flow_id: "nightly-sync".to_string(),
            start_date: "2025-03-01T02:00:00Z".parse().unwrap(),
            duration: Some(Duration::from_secs(252)),
            status: ExecutionStatus::Failed,
            failed_task_id: Some("extract".to_string()),
            link: Some("https://ui.example.com/executions/5xGpL2".to_string()),
        }
    }

    #[test]
    fn render_map_exposes_all_execution_keys() {
        let vars = failed_execution().render_map(&Map::new(), None);
        let execution = vars["execution"].as_object().unwrap();

        assert_eq!(execution["id"], "5xGpL2");
        assert_eq!(execution["namespace"], "prod.team");
        assert_eq!(execution["flowId"], "nightly-sync");
        assert_eq!(execution["startDate"], "2025-03-01T02:00:00Z");
        assert_eq!(execution["status"], "FAILED");
        assert_eq!(execution["failedTaskId"], "extract");
        assert_eq!(vars["duration"], "4m 12s");
        assert_eq!(vars["link"], "https://ui.example.com/executions/5xGpL2");
    }

    #[test]
    fn absent_optionals_become_empty_strings() {
        let mut execution = failed_execution();
        execution.duration = None;
        execution.failed_task_id = None;
        execution.link = None;
        execution.status = ExecutionStatus::Success;

        let vars = execution.render_map(&Map::new(), None);
        assert_eq!(vars["execution"]["failedTaskId"], "");
        assert_eq!(vars["duration"], "");
        assert_eq!(vars["link"], "");
    }

    #[test]
    fn default_message_names_the_failed_task() {
        let vars = failed_execution().render_map(&Map::new(), None);
        assert_eq!(
            vars["customMessage"],
            "Execution 5xGpL2 of prod.team.nightly-sync failed on task `extract`"
        );
    }

    #[test]
    fn default_message_falls_back_to_status() {
        let mut execution = failed_execution();
        execution.failed_task_id = None;
        execution.status = ExecutionStatus::Warning;

        let vars = execution.render_map(&Map::new(), None);
        assert_eq!(
            vars["customMessage"],
            "Execution 5xGpL2 of prod.team.nightly-sync finished with status WARNING"
        );
    }

    #[test]
    fn custom_message_wins_over_default() {
        let vars = failed_execution().render_map(&Map::new(), Some("Failure in prod"));
        assert_eq!(vars["customMessage"], "Failure in prod");
    }

    #[test]
    fn custom_fields_pass_through() {
        let mut fields = Map::new();
        fields.insert("shard".to_string(), serde_json::json!("team"));
        fields.insert("retried".to_string(), serde_json::json!(false));

        let vars = failed_execution().render_map(&fields, None);
        assert_eq!(vars["customFields"]["shard"], "team");
        assert_eq!(vars["customFields"]["retried"], false);
    }

    #[test]
    fn short_durations_use_fractional_seconds() {
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.500s");
        assert_eq!(format_duration(Duration::from_secs(75)), "1m 15s");
    }
}
