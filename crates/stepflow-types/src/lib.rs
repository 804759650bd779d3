//! Shared domain types for Stepflow.
//!
//! This crate contains the types used across the Stepflow pipeline engine:
//! step outputs, run records, generation requests/responses, knowledge
//! documents, and the exemplar pipeline schemas (invoice, business profile).
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror,
//! schemars.

pub mod config;
pub mod error;
pub mod generate;
pub mod invoice;
pub mod knowledge;
pub mod pipeline;
pub mod profile;
