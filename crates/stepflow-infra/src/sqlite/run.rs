//! SQLite run repository implementation.
//!
//! Implements `RunRepository` from `stepflow-core` using sqlx with split
//! read/write pools. Inputs and outputs are stored as JSON blobs; timestamps
//! as RFC 3339 strings.

use chrono::{DateTime, Utc};
use sqlx::Row;
use uuid::Uuid;

use stepflow_core::repository::run::RunRepository;
use stepflow_types::error::RepositoryError;
use stepflow_types::pipeline::{PipelineRun, RunStatus, StepLog, StepStatus};

use super::pool::DatabasePool;

/// SQLite-backed implementation of `RunRepository`.
pub struct SqliteRunRepository {
    pool: DatabasePool,
}

impl SqliteRunRepository {
    /// Create a new repository backed by the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

// ---------------------------------------------------------------------------
// Internal row types
// ---------------------------------------------------------------------------

struct RunRow {
    id: String,
    pipeline_name: String,
    status: String,
    input: String,
    output: Option<String>,
    halted_at: Option<String>,
    error: Option<String>,
    started_at: String,
    completed_at: Option<String>,
}

impl RunRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            pipeline_name: row.try_get("pipeline_name")?,
            status: row.try_get("status")?,
            input: row.try_get("input")?,
            output: row.try_get("output")?,
            halted_at: row.try_get("halted_at")?,
            error: row.try_get("error")?,
            started_at: row.try_get("started_at")?,
            completed_at: row.try_get("completed_at")?,
        })
    }

    fn into_run(self) -> Result<PipelineRun, RepositoryError> {
        let id = parse_uuid(&self.id)?;
        let status = parse_run_status(&self.status)?;

        let input = serde_json::from_str(&self.input)
            .map_err(|e| RepositoryError::Query(format!("invalid input JSON: {e}")))?;
        let output = self
            .output
            .as_deref()
            .map(|s| {
                serde_json::from_str(s)
                    .map_err(|e| RepositoryError::Query(format!("invalid output JSON: {e}")))
            })
            .transpose()?;

        let started_at = parse_datetime(&self.started_at)?;
        let completed_at = self
            .completed_at
            .as_deref()
            .map(parse_datetime)
            .transpose()?;

        Ok(PipelineRun {
            id,
            pipeline_name: self.pipeline_name,
            status,
            input,
            output,
            halted_at: self.halted_at,
            error: self.error,
            started_at,
            completed_at,
        })
    }
}

struct StepLogRow {
    id: String,
    run_id: String,
    step_name: String,
    status: String,
    output: Option<String>,
    error: Option<String>,
    started_at: String,
    completed_at: Option<String>,
}

impl StepLogRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            run_id: row.try_get("run_id")?,
            step_name: row.try_get("step_name")?,
            status: row.try_get("status")?,
            output: row.try_get("output")?,
            error: row.try_get("error")?,
            started_at: row.try_get("started_at")?,
            completed_at: row.try_get("completed_at")?,
        })
    }

    fn into_step_log(self) -> Result<StepLog, RepositoryError> {
        let id = parse_uuid(&self.id)?;
        let run_id = parse_uuid(&self.run_id)?;
        let status: StepStatus =
            serde_json::from_value(serde_json::Value::String(self.status.clone()))
                .map_err(|_| {
                    RepositoryError::Query(format!("invalid step status: {}", self.status))
                })?;

        let output = self
            .output
            .as_deref()
            .map(|s| {
                serde_json::from_str(s)
                    .map_err(|e| RepositoryError::Query(format!("invalid step output: {e}")))
            })
            .transpose()?;

        let started_at = parse_datetime(&self.started_at)?;
        let completed_at = self
            .completed_at
            .as_deref()
            .map(parse_datetime)
            .transpose()?;

        Ok(StepLog {
            id,
            run_id,
            step_name: self.step_name,
            status,
            output,
            error: self.error,
            started_at,
            completed_at,
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn parse_uuid(s: &str) -> Result<Uuid, RepositoryError> {
    s.parse::<Uuid>()
        .map_err(|e| RepositoryError::Query(format!("invalid UUID: {e}")))
}

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Query(format!("invalid datetime: {e}")))
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

fn parse_run_status(s: &str) -> Result<RunStatus, RepositoryError> {
    serde_json::from_value(serde_json::Value::String(s.to_string()))
        .map_err(|_| RepositoryError::Query(format!("invalid run status: {s}")))
}

fn status_text<S: serde::Serialize>(status: &S) -> Result<String, RepositoryError> {
    match serde_json::to_value(status) {
        Ok(serde_json::Value::String(s)) => Ok(s),
        _ => Err(RepositoryError::Query("unserializable status".to_string())),
    }
}

// ---------------------------------------------------------------------------
// RunRepository impl
// ---------------------------------------------------------------------------

impl RunRepository for SqliteRunRepository {
    async fn create_run(&self, run: &PipelineRun) -> Result<(), RepositoryError> {
        let input_json = serde_json::to_string(&run.input)
            .map_err(|e| RepositoryError::Query(format!("serialize input: {e}")))?;
        let output_json = run
            .output
            .as_ref()
            .map(|v| {
                serde_json::to_string(v)
                    .map_err(|e| RepositoryError::Query(format!("serialize output: {e}")))
            })
            .transpose()?;

        sqlx::query(
            r#"INSERT INTO pipeline_runs
               (id, pipeline_name, status, input, output, halted_at, error, started_at, completed_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(run.id.to_string())
        .bind(&run.pipeline_name)
        .bind(status_text(&run.status)?)
        .bind(input_json)
        .bind(output_json)
        .bind(&run.halted_at)
        .bind(&run.error)
        .bind(format_datetime(&run.started_at))
        .bind(run.completed_at.as_ref().map(format_datetime))
        .execute(&self.pool.writer)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                RepositoryError::Conflict(format!("run {} already exists", run.id))
            }
            other => RepositoryError::Query(other.to_string()),
        })?;

        Ok(())
    }

    async fn update_run_status(
        &self,
        run_id: Uuid,
        status: RunStatus,
        output: Option<serde_json::Value>,
        halted_at: Option<String>,
        error: Option<String>,
    ) -> Result<(), RepositoryError> {
        let output_json = output
            .as_ref()
            .map(|v| {
                serde_json::to_string(v)
                    .map_err(|e| RepositoryError::Query(format!("serialize output: {e}")))
            })
            .transpose()?;
        let completed_at = matches!(status, RunStatus::Completed | RunStatus::Failed)
            .then(|| format_datetime(&Utc::now()));

        let result = sqlx::query(
            r#"UPDATE pipeline_runs
               SET status = ?,
                   output = COALESCE(?, output),
                   halted_at = COALESCE(?, halted_at),
                   error = COALESCE(?, error),
                   completed_at = COALESCE(?, completed_at)
               WHERE id = ?"#,
        )
        .bind(status_text(&status)?)
        .bind(output_json)
        .bind(halted_at)
        .bind(error)
        .bind(completed_at)
        .bind(run_id.to_string())
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn append_step_log(&self, log: &StepLog) -> Result<(), RepositoryError> {
        let output_json = log
            .output
            .as_ref()
            .map(|v| {
                serde_json::to_string(v)
                    .map_err(|e| RepositoryError::Query(format!("serialize step output: {e}")))
            })
            .transpose()?;

        sqlx::query(
            r#"INSERT INTO step_logs
               (id, run_id, step_name, status, output, error, started_at, completed_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(log.id.to_string())
        .bind(log.run_id.to_string())
        .bind(&log.step_name)
        .bind(status_text(&log.status)?)
        .bind(output_json)
        .bind(&log.error)
        .bind(format_datetime(&log.started_at))
        .bind(log.completed_at.as_ref().map(format_datetime))
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(())
    }

    async fn get_run(&self, run_id: Uuid) -> Result<Option<PipelineRun>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM pipeline_runs WHERE id = ?")
            .bind(run_id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        row.map(|r| RunRow::from_row(&r).map_err(|e| RepositoryError::Query(e.to_string())))
            .transpose()?
            .map(RunRow::into_run)
            .transpose()
    }

    async fn list_runs_for_pipeline(
        &self,
        pipeline_name: &str,
    ) -> Result<Vec<PipelineRun>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT * FROM pipeline_runs WHERE pipeline_name = ? ORDER BY started_at DESC",
        )
        .bind(pipeline_name)
        .fetch_all(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        rows.iter()
            .map(|r| {
                RunRow::from_row(r)
                    .map_err(|e| RepositoryError::Query(e.to_string()))?
                    .into_run()
            })
            .collect()
    }

    async fn get_step_logs(&self, run_id: Uuid) -> Result<Vec<StepLog>, RepositoryError> {
        let rows =
            sqlx::query("SELECT * FROM step_logs WHERE run_id = ? ORDER BY started_at, id")
                .bind(run_id.to_string())
                .fetch_all(&self.pool.reader)
                .await
                .map_err(|e| RepositoryError::Query(e.to_string()))?;

        rows.iter()
            .map(|r| {
                StepLogRow::from_row(r)
                    .map_err(|e| RepositoryError::Query(e.to_string()))?
                    .into_step_log()
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
