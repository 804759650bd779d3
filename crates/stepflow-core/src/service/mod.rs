//! External collaborator ports.
//!
//! Traits for the services the pipeline engine depends on but does not
//! implement: text/structured generation, knowledge retrieval, and remote
//! resource fetching. Implementations live in stepflow-infra; tests use
//! in-memory mocks.

pub mod fetch;
pub mod generate;
pub mod knowledge;
