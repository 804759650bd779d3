//! Run recorder: persists run history as a pipeline executes.
//!
//! Recording is best-effort: a failed write is logged and the run
//! continues, so a flaky history store never takes down a healthy
//! pipeline.

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::warn;
use uuid::Uuid;

use stepflow_types::pipeline::{PipelineRun, RunStatus, StepLog, StepOutput, StepStatus};

use crate::repository::run::RunRepository;

/// Writes run and step records to a [`RunRepository`] as the runner
/// progresses.
pub struct RunRecorder<R: RunRepository> {
    repository: R,
}

impl<R: RunRepository> RunRecorder<R> {
    pub fn new(repository: R) -> Self {
        Self { repository }
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    pub(crate) async fn run_started(&self, run: &PipelineRun) {
        if let Err(err) = self.repository.create_run(run).await {
            warn!(run_id = %run.id, error = %err, "failed to record run start");
        }
    }

    pub(crate) async fn run_running(&self, run_id: Uuid) {
        let update = self
            .repository
            .update_run_status(run_id, RunStatus::Running, None, None, None)
            .await;
        if let Err(err) = update {
            warn!(%run_id, error = %err, "failed to record run transition");
        }
    }

    pub(crate) async fn step_completed(
        &self,
        run_id: Uuid,
        step_name: &str,
        output: &StepOutput,
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
    ) {
        let status = if output.success {
            StepStatus::Completed
        } else {
            StepStatus::Failed
        };
        let log = StepLog {
            id: Uuid::now_v7(),
            run_id,
            step_name: step_name.to_string(),
            status,
            output: Some(output.content.clone()),
            error: output.error_message().map(str::to_string),
            started_at,
            completed_at: Some(completed_at),
        };
        if let Err(err) = self.repository.append_step_log(&log).await {
            warn!(%run_id, step = step_name, error = %err, "failed to record step");
        }
    }

    pub(crate) async fn run_finished(
        &self,
        run_id: Uuid,
        status: RunStatus,
        output: Option<Value>,
        halted_at: Option<String>,
        error: Option<String>,
    ) {
        let update = self
            .repository
            .update_run_status(run_id, status, output, halted_at, error)
            .await;
        if let Err(err) = update {
            warn!(%run_id, error = %err, "failed to record run finish");
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
