//! Business profile schemas.
//!
//! Typed input and structured-output shapes for the business profile
//! pipeline: the business to research, and the consolidated profile the
//! writer step must produce.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Input for the business profile pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct BusinessProfileInput {
    /// Business name.
    pub name: String,
    /// Business website URL.
    pub website: String,
    /// Optional short description supplied by the caller.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A consolidated business profile synthesized from search results.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct BusinessProfileOutput {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub founded_year: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub employee_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revenue: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headquarters: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locations: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linkedin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub twitter: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_people: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_email: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub competitors: Option<Vec<String>>,
}
