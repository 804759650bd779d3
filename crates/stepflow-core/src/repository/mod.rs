//! Persistence traits for pipeline run tracking.

pub mod run;
