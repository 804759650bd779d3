//! Error types shared across the Stepflow workspace.

use thiserror::Error;

/// Errors raised by the pipeline engine.
///
/// Step-local failures (a function step raising, a service call failing) are
/// captured into fatal `StepOutput`s rather than surfacing through this type;
/// `PipelineError` covers declaration mistakes and run-boundary failures.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Malformed pipeline input; the run never starts.
    #[error("input validation failed: {0}")]
    InputValidation(String),

    /// Two steps were declared with the same name.
    #[error("duplicate step name: '{0}'")]
    DuplicateStepName(String),

    /// A step tried to read an output that has not been produced.
    #[error("no output recorded for step '{0}'")]
    StepNotFound(String),

    /// A function step raised an unhandled fault.
    #[error("step execution failed: {0}")]
    Execution(String),

    /// An external service call failed.
    #[error("service error: {0}")]
    Service(String),

    /// Run-history persistence failed.
    #[error("persistence error: {0}")]
    Persistence(String),
}

/// Errors from fetching a remote resource.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The request could not be sent or the connection failed.
    #[error("request to '{url}' failed: {message}")]
    Transport { url: String, message: String },

    /// The server answered with a non-2xx status.
    #[error("'{url}' returned HTTP {status}")]
    Status { url: String, status: u16 },
}

/// Errors from repository operations (used by trait definitions in
/// stepflow-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pipeline_error_display() {
        let err = PipelineError::DuplicateStepName("download".to_string());
        assert_eq!(err.to_string(), "duplicate step name: 'download'");

        let err = PipelineError::StepNotFound("extract".to_string());
        assert!(err.to_string().contains("extract"));
    }

    #[test]
    fn fetch_error_display() {
        let err = FetchError::Status {
            url: "https://x/invoice.pdf".to_string(),
            status: 404,
        };
        assert!(err.to_string().contains("404"));
        assert!(err.to_string().contains("invoice.pdf"));
    }

    #[test]
    fn repository_error_display() {
        let err = RepositoryError::Query("syntax error".to_string());
        assert_eq!(err.to_string(), "query error: syntax error");
    }
}
