//! Infrastructure implementations for Stepflow.
//!
//! Concrete backends for the ports defined in `stepflow-core`: an HTTP
//! file fetcher, an OpenAI-compatible generation service client, and a
//! SQLite-backed run repository. The config loader lives here too.

pub mod config;
pub mod http;
pub mod llm;
pub mod sqlite;
