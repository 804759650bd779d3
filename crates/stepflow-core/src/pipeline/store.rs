//! Step output store: the shared record of everything a run has produced.

use indexmap::IndexMap;
use stepflow_types::error::PipelineError;
use stepflow_types::pipeline::StepOutput;
use tracing::warn;

/// Outputs larger than this (serialized) trigger a warning; oversized step
/// payloads slow down run persistence and usually mean a step is returning
/// raw bytes instead of a summary.
const OUTPUT_SIZE_WARN_BYTES: usize = 1024 * 1024;

// ---------------------------------------------------------------------------
// StepOutputStore
// ---------------------------------------------------------------------------

/// Write-once, insertion-ordered store of step outputs keyed by step name.
///
/// Each step name may be written exactly once per run; reads of names that
/// have not yet been written fail with `StepNotFound`. Iteration order is
/// insertion order, which matches pipeline execution order.
#[derive(Debug, Clone, Default)]
pub struct StepOutputStore {
    outputs: IndexMap<String, StepOutput>,
}

impl StepOutputStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a step's output under its name.
    ///
    /// Fails with `DuplicateStepName` if the name is already present; the
    /// store never overwrites.
    pub fn insert(&mut self, name: &str, output: StepOutput) -> Result<(), PipelineError> {
        if self.outputs.contains_key(name) {
            return Err(PipelineError::DuplicateStepName(name.to_string()));
        }
        let size = output.content.to_string().len();
        if size > OUTPUT_SIZE_WARN_BYTES {
            warn!(step = name, bytes = size, "oversized step output");
        }
        self.outputs.insert(name.to_string(), output.named(name));
        Ok(())
    }

    /// Look up a step's output, if it has been recorded.
    pub fn get(&self, name: &str) -> Option<&StepOutput> {
        self.outputs.get(name)
    }

    /// A step's output, failing if it has not been recorded yet.
    pub fn output(&self, name: &str) -> Result<&StepOutput, PipelineError> {
        self.outputs
            .get(name)
            .ok_or_else(|| PipelineError::StepNotFound(name.to_string()))
    }

    /// A step's content payload, failing if it has not been recorded yet.
    pub fn content(&self, name: &str) -> Result<&serde_json::Value, PipelineError> {
        self.output(name).map(|o| &o.content)
    }

    /// The most recently recorded output.
    pub fn latest(&self) -> Option<&StepOutput> {
        self.outputs.last().map(|(_, o)| o)
    }

    /// Step names in execution order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.outputs.keys().map(String::as_str)
    }

    /// Iterate outputs in execution order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &StepOutput)> {
        self.outputs.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
