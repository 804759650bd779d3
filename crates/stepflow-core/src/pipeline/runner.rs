//! The sequential pipeline runner.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

use stepflow_types::error::PipelineError;
use stepflow_types::pipeline::{PipelineRun, RunStatus, StepOutput};

use super::context::StepContext;
use super::recorder::RunRecorder;
use super::step::Runnable;
use super::store::StepOutputStore;
use crate::repository::run::RunRepository;

type InputValidator = Arc<dyn Fn(&Value) -> Result<(), PipelineError> + Send + Sync>;

// ---------------------------------------------------------------------------
// RunResult
// ---------------------------------------------------------------------------

/// Terminal state of a pipeline run.
#[derive(Clone)]
pub struct RunResult {
    pub run_id: Uuid,
    pub status: RunStatus,
    /// Every output the run recorded, in execution order. On a halted run
    /// this contains exactly the steps that executed.
    pub store: StepOutputStore,
    /// Content of the last executed step.
    pub output: Value,
    /// Name of the step that halted the run, if it failed.
    pub halted_at: Option<String>,
    /// Error message from the halting step.
    pub error: Option<String>,
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// A named, ordered sequence of steps.
///
/// Steps run strictly in declaration order; each sees the outputs of all
/// steps before it. The first fatal output halts the run.
#[derive(Clone)]
pub struct Pipeline {
    name: String,
    steps: Vec<Runnable>,
    validator: Option<InputValidator>,
}

impl Pipeline {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: Vec::new(),
            validator: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Append a step. Name uniqueness is enforced when the pipeline runs,
    /// before any step executes.
    pub fn step(mut self, step: impl Into<Runnable>) -> Self {
        self.steps.push(step.into());
        self
    }

    /// Require the run input to deserialize as `T`; mismatched input fails
    /// the run before any step executes.
    pub fn input_schema<T: DeserializeOwned + 'static>(mut self) -> Self {
        self.validator = Some(Arc::new(|input: &Value| {
            serde_json::from_value::<T>(input.clone())
                .map(|_| ())
                .map_err(|e| PipelineError::InputValidation(e.to_string()))
        }));
        self
    }

    /// Execute the pipeline in memory, without run-history persistence.
    pub async fn run(&self, input: Value) -> Result<RunResult, PipelineError> {
        self.check_declaration(&input)?;

        let run_id = Uuid::now_v7();
        info!(pipeline = %self.name, %run_id, steps = self.steps.len(), "starting run");

        let mut ctx = StepContext::new(input, run_id, self.name.clone());
        let mut halted_at = None;
        for step in &self.steps {
            let output = self.execute_step(step, &mut ctx).await?;
            if output.stop {
                halted_at = Some(step.name().to_string());
                break;
            }
        }

        Ok(self.finish(run_id, ctx.store, halted_at))
    }

    /// Execute the pipeline, recording the run and every step to the
    /// recorder's repository.
    pub async fn run_with_recorder<R: RunRepository>(
        &self,
        input: Value,
        recorder: &RunRecorder<R>,
    ) -> Result<RunResult, PipelineError> {
        // Declaration mistakes fail before anything is persisted.
        self.check_declaration(&input)?;

        let run_id = Uuid::now_v7();
        let run = PipelineRun {
            id: run_id,
            pipeline_name: self.name.clone(),
            status: RunStatus::Pending,
            input: input.clone(),
            output: None,
            halted_at: None,
            error: None,
            started_at: Utc::now(),
            completed_at: None,
        };
        recorder.run_started(&run).await;
        recorder.run_running(run_id).await;

        info!(pipeline = %self.name, %run_id, steps = self.steps.len(), "starting recorded run");

        let mut ctx = StepContext::new(input, run_id, self.name.clone());
        let mut halted_at = None;
        for step in &self.steps {
            let started_at = Utc::now();
            let output = self.execute_step(step, &mut ctx).await?;
            recorder
                .step_completed(run_id, step.name(), &output, started_at, Utc::now())
                .await;
            if output.stop {
                halted_at = Some(step.name().to_string());
                break;
            }
        }

        let result = self.finish(run_id, ctx.store, halted_at);
        recorder
            .run_finished(
                run_id,
                result.status,
                Some(result.output.clone()),
                result.halted_at.clone(),
                result.error.clone(),
            )
            .await;
        Ok(result)
    }

    async fn execute_step(
        &self,
        step: &Runnable,
        ctx: &mut StepContext,
    ) -> Result<StepOutput, PipelineError> {
        let output = step.execute(ctx).await;
        if output.stop {
            warn!(
                pipeline = %self.name,
                step = step.name(),
                error = output.error_message().unwrap_or("unknown"),
                "step halted the run"
            );
        }
        ctx.store.insert(step.name(), output.clone())?;
        Ok(output.named(step.name()))
    }

    fn finish(&self, run_id: Uuid, store: StepOutputStore, halted_at: Option<String>) -> RunResult {
        let status = if halted_at.is_some() {
            RunStatus::Failed
        } else {
            RunStatus::Completed
        };
        let output = store
            .latest()
            .map(|o| o.content.clone())
            .unwrap_or(Value::Null);
        let error = store
            .latest()
            .filter(|_| status == RunStatus::Failed)
            .and_then(|o| o.error_message().map(str::to_string));

        info!(pipeline = %self.name, %run_id, ?status, "run finished");

        RunResult {
            run_id,
            status,
            store,
            output,
            halted_at,
            error,
        }
    }

    fn check_declaration(&self, input: &Value) -> Result<(), PipelineError> {
        let mut names = Vec::new();
        for step in &self.steps {
            step.collect_names(&mut names);
        }
        let mut seen = HashSet::new();
        for name in names {
            if !seen.insert(name) {
                return Err(PipelineError::DuplicateStepName(name.to_string()));
            }
        }

        if let Some(validator) = &self.validator {
            validator(input)?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
