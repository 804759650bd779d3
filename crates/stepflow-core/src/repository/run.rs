//! RunRepository trait: durable record of pipeline runs and step logs.

use std::future::Future;

use serde_json::Value;
use uuid::Uuid;

use stepflow_types::error::RepositoryError;
use stepflow_types::pipeline::{PipelineRun, RunStatus, StepLog};

/// Trait for persisting pipeline runs and their per-step execution logs.
///
/// Implementations must be safe for concurrent use; runs are append-mostly
/// (a run row is created once, updated on terminal transition, and step
/// logs are only ever inserted).
pub trait RunRepository: Send + Sync {
    /// Insert a new run record.
    fn create_run(
        &self,
        run: &PipelineRun,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    /// Transition a run's status, recording output, halt point, and error.
    fn update_run_status(
        &self,
        run_id: Uuid,
        status: RunStatus,
        output: Option<Value>,
        halted_at: Option<String>,
        error: Option<String>,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    /// Append a step execution log entry.
    fn append_step_log(
        &self,
        log: &StepLog,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    /// Fetch a run by id.
    fn get_run(
        &self,
        run_id: Uuid,
    ) -> impl Future<Output = Result<Option<PipelineRun>, RepositoryError>> + Send;

    /// List all runs for a pipeline, most recent first.
    fn list_runs_for_pipeline(
        &self,
        pipeline_name: &str,
    ) -> impl Future<Output = Result<Vec<PipelineRun>, RepositoryError>> + Send;

    /// Fetch the step logs for a run in execution order.
    fn get_step_logs(
        &self,
        run_id: Uuid,
    ) -> impl Future<Output = Result<Vec<StepLog>, RepositoryError>> + Send;
}
