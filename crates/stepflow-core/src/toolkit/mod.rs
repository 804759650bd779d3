//! Tool surfaces exposed to generation services.

pub mod knowledge;

pub use knowledge::{KnowledgeCapabilities, KnowledgeToolkit, ToolSpec, ToolkitState};
