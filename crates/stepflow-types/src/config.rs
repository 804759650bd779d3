//! Global configuration types for Stepflow.
//!
//! `GlobalConfig` represents the top-level `config.toml` that controls
//! the default model, service endpoint, and run-history database.

use serde::{Deserialize, Serialize};

/// Top-level configuration for the Stepflow engine.
///
/// Loaded from `~/.stepflow/config.toml`. All fields have sensible defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// Model used by service steps that do not pin one.
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Base URL of the generation service. `None` means the provider's
    /// public endpoint.
    #[serde(default)]
    pub service_base_url: Option<String>,

    /// Token ceiling for a single generation call.
    #[serde(default = "default_max_tokens")]
    pub default_max_tokens: u32,

    /// Run-history database URL. `None` derives it from the data directory.
    #[serde(default)]
    pub database_url: Option<String>,

    /// Timeout for remote file downloads, in seconds.
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
}

fn default_model() -> String {
    "gpt-4.1".to_string()
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_fetch_timeout_secs() -> u64 {
    30
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            default_model: default_model(),
            service_base_url: None,
            default_max_tokens: default_max_tokens(),
            database_url: None,
            fetch_timeout_secs: default_fetch_timeout_secs(),
        }
    }
}
