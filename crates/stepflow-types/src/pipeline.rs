//! Pipeline execution types for Stepflow.
//!
//! Defines the output contract for pipeline steps (`StepOutput` with its
//! success/stop flags), run status enums, and the execution tracking records
//! (`PipelineRun`, `StepLog`) used for run history and auditing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// StepOutput
// ---------------------------------------------------------------------------

/// Result of one executed step.
///
/// The `stop` flag is the fatal signal: once a step reports `stop = true` the
/// sequential runner halts and no further steps execute. A step may report
/// `success = false` without stopping the pipeline (soft failure); the
/// reverse -- `stop = true` with `success = true` -- is never constructed.
///
/// Group outputs (parallel groups, nested sequences) carry their member
/// outputs in `members`, in declaration order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepOutput {
    /// Name of the step that produced this output. Stamped by the engine
    /// when the output is recorded, so constructors leave it empty.
    #[serde(default)]
    pub step_name: String,
    /// Whether the step's work succeeded.
    pub success: bool,
    /// Fatal signal: halt the remaining pipeline.
    pub stop: bool,
    /// The step's payload: a structured record, free text, or an error
    /// descriptor of the form `{"error": "..."}`.
    pub content: Value,
    /// Member outputs for group steps, in declaration order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub members: Option<Vec<StepOutput>>,
}

impl StepOutput {
    /// A successful output carrying `content`.
    pub fn success(content: Value) -> Self {
        Self {
            step_name: String::new(),
            success: true,
            stop: false,
            content,
            members: None,
        }
    }

    /// A non-fatal failure: the step did not produce a useful result, but
    /// the pipeline may continue.
    pub fn failure(content: Value) -> Self {
        Self {
            step_name: String::new(),
            success: false,
            stop: false,
            content,
            members: None,
        }
    }

    /// A fatal failure: captures the error message and halts the pipeline.
    pub fn fatal(message: impl Into<String>) -> Self {
        Self {
            step_name: String::new(),
            success: false,
            stop: true,
            content: json!({ "error": message.into() }),
            members: None,
        }
    }

    /// Aggregate member outputs into a group output.
    ///
    /// `success` holds iff every member succeeded; `stop` propagates if any
    /// member was fatal. The group's own content mirrors the members as an
    /// ordered array so downstream steps can inspect it as plain JSON.
    pub fn group(members: Vec<StepOutput>) -> Self {
        let success = members.iter().all(|m| m.success);
        let stop = members.iter().any(|m| m.stop);
        let content = Value::Array(
            members
                .iter()
                .map(|m| json!({ "step": m.step_name, "content": m.content }))
                .collect(),
        );
        Self {
            step_name: String::new(),
            success,
            stop,
            content,
            members: Some(members),
        }
    }

    /// Stamp the producing step's name onto this output.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.step_name = name.into();
        self
    }

    /// Look up a member output by name (group outputs only).
    pub fn member(&self, name: &str) -> Option<&StepOutput> {
        self.members
            .as_ref()
            .and_then(|ms| ms.iter().find(|m| m.step_name == name))
    }

    /// The captured error message, if this output is an error descriptor.
    pub fn error_message(&self) -> Option<&str> {
        self.content.get("error").and_then(Value::as_str)
    }
}

// ---------------------------------------------------------------------------
// Run status
// ---------------------------------------------------------------------------

/// Overall status of a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

/// Status of an individual step execution within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Running,
    Completed,
    Failed,
}

// ---------------------------------------------------------------------------
// Run records
// ---------------------------------------------------------------------------

/// A single execution instance of a pipeline. Used for run history and audit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineRun {
    /// UUIDv7 run ID.
    pub id: Uuid,
    /// Name of the pipeline being executed.
    pub pipeline_name: String,
    /// Current run status.
    pub status: RunStatus,
    /// The validated input record supplied at pipeline start.
    pub input: Value,
    /// Terminal output of the run (None while running).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    /// Name of the step that halted the run, if it failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub halted_at: Option<String>,
    /// Error message if the run failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the run completed (None if still running).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

/// Execution log for a single step within a pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepLog {
    /// UUIDv7 step execution ID.
    pub id: Uuid,
    /// Parent pipeline run ID.
    pub run_id: Uuid,
    /// Step name, unique within the run.
    pub step_name: String,
    /// Current step status.
    pub status: StepStatus,
    /// JSON output produced by this step.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    /// Error message if the step failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// When step execution started.
    pub started_at: DateTime<Utc>,
    /// When step execution completed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // -----------------------------------------------------------------------
    // StepOutput constructors
    // -----------------------------------------------------------------------

    #[test]
    fn success_output_does_not_stop() {
        let out = StepOutput::success(json!({"bytes": 42})).named("download");
        assert!(out.success);
        assert!(!out.stop);
        assert_eq!(out.step_name, "download");
        assert!(out.error_message().is_none());
    }

    #[test]
    fn fatal_output_captures_message() {
        let out = StepOutput::fatal("HTTP error 404: Not Found");
        assert!(!out.success);
        assert!(out.stop);
        assert_eq!(out.error_message(), Some("HTTP error 404: Not Found"));
    }

    #[test]
    fn failure_output_is_not_fatal() {
        let out = StepOutput::failure(json!("no content found"));
        assert!(!out.success);
        assert!(!out.stop);
    }

    // -----------------------------------------------------------------------
    // Group aggregation
    // -----------------------------------------------------------------------

    #[test]
    fn group_preserves_declaration_order() {
        let group = StepOutput::group(vec![
            StepOutput::success(json!("a")).named("web-research"),
            StepOutput::success(json!("b")).named("semantic-search"),
        ]);
        let members = group.members.as_ref().unwrap();
        assert_eq!(members[0].step_name, "web-research");
        assert_eq!(members[1].step_name, "semantic-search");
        assert!(group.success);
        assert!(!group.stop);
    }

    #[test]
    fn group_with_fatal_member_propagates_stop() {
        let group = StepOutput::group(vec![
            StepOutput::fatal("quota exceeded").named("a"),
            StepOutput::success(json!("ok")).named("b"),
        ]);
        assert!(!group.success);
        assert!(group.stop);
        // Both members are still present
        assert_eq!(group.members.as_ref().unwrap().len(), 2);
        assert!(group.member("b").unwrap().success);
    }

    #[test]
    fn group_content_mirrors_members_as_array() {
        let group = StepOutput::group(vec![
            StepOutput::success(json!("x")).named("first"),
            StepOutput::success(json!("y")).named("second"),
        ]);
        let arr = group.content.as_array().unwrap();
        assert_eq!(arr[0]["step"], "first");
        assert_eq!(arr[1]["content"], "y");
    }

    // -----------------------------------------------------------------------
    // Serde roundtrips
    // -----------------------------------------------------------------------

    #[test]
    fn step_output_json_roundtrip() {
        let out = StepOutput::success(json!({"invoice_number": "INV-1"})).named("extract");
        let text = serde_json::to_string(&out).unwrap();
        let parsed: StepOutput = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed.step_name, "extract");
        assert_eq!(parsed.content["invoice_number"], "INV-1");
        assert!(parsed.members.is_none());
    }

    #[test]
    fn run_status_serde() {
        for status in [
            RunStatus::Pending,
            RunStatus::Running,
            RunStatus::Completed,
            RunStatus::Failed,
        ] {
            let text = serde_json::to_string(&status).unwrap();
            let parsed: RunStatus = serde_json::from_str(&text).unwrap();
            assert_eq!(parsed, status);
        }
    }

    #[test]
    fn pipeline_run_json_roundtrip() {
        let run = PipelineRun {
            id: Uuid::now_v7(),
            pipeline_name: "invoice-processing".to_string(),
            status: RunStatus::Failed,
            input: json!({"file_link": "https://x/invoice.pdf"}),
            output: None,
            halted_at: Some("download-invoice".to_string()),
            error: Some("HTTP error 502".to_string()),
            started_at: Utc::now(),
            completed_at: Some(Utc::now()),
        };
        let text = serde_json::to_string(&run).unwrap();
        let parsed: PipelineRun = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed.status, RunStatus::Failed);
        assert_eq!(parsed.halted_at.as_deref(), Some("download-invoice"));
    }

    #[test]
    fn step_log_json_roundtrip() {
        let log = StepLog {
            id: Uuid::now_v7(),
            run_id: Uuid::now_v7(),
            step_name: "extract-invoice-data".to_string(),
            status: StepStatus::Completed,
            output: Some(json!({"total_amount": 120.0})),
            error: None,
            started_at: Utc::now(),
            completed_at: Some(Utc::now()),
        };
        let text = serde_json::to_string(&log).unwrap();
        let parsed: StepLog = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed.step_name, "extract-invoice-data");
        assert_eq!(parsed.status, StepStatus::Completed);
    }
}
