//! Pipeline engine and service port definitions for Stepflow.
//!
//! This crate defines the step pipeline executor (the engine) and the
//! "ports" (service traits) that the infrastructure layer implements. It
//! depends only on `stepflow-types` -- never on `stepflow-infra` or any
//! HTTP/database crate.

pub mod flows;
pub mod pipeline;
pub mod repository;
pub mod service;
pub mod toolkit;
