//! The pipeline execution engine.
//!
//! - `store`: write-once, insertion-ordered record of step outputs
//! - `context`: the read view handed to each executing step
//! - `step`: the `Runnable` step kinds (service, function, sequence)
//! - `parallel`: concurrent fan-out groups
//! - `runner`: the sequential pipeline runner
//! - `recorder`: persistence hooks for run history

pub mod context;
pub mod parallel;
pub mod recorder;
pub mod runner;
pub mod step;
pub mod store;

pub use context::StepContext;
pub use parallel::ParallelGroup;
pub use recorder::RunRecorder;
pub use runner::{Pipeline, RunResult};
pub use step::{FunctionStep, Runnable, SequenceGroup, ServiceStep};
pub use store::StepOutputStore;
