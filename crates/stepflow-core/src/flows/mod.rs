//! Prebuilt pipelines assembled from the engine's step kinds.

pub mod invoice;
pub mod profile;
