//! Generation service request/response types.
//!
//! These types model the data shapes for calls to an external generation
//! service: instructions plus a rendered input, optional file attachments,
//! and an optional JSON schema constraining the structured output.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// A file attached to a generation request.
///
/// The payload is carried base64-encoded so requests stay plain JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    /// Original filename (e.g. "invoice.pdf").
    pub filename: String,
    /// MIME type (e.g. "application/pdf").
    pub content_type: String,
    /// Base64-encoded file content.
    pub data: String,
}

/// Request to a generation service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Model identifier (e.g. "gpt-4.1").
    pub model: String,
    /// System-level instructions for the service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    /// The rendered query/input for this call.
    pub input: String,
    /// Attached files.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
    /// JSON schema the response content must conform to, if structured
    /// output is required.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_schema: Option<Value>,
    /// Name for the output schema (required by some providers).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_name: Option<String>,
    /// Maximum tokens to generate.
    pub max_tokens: u32,
    /// Sampling temperature.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
}

impl GenerationRequest {
    /// A plain free-text request with default generation limits.
    pub fn text(model: impl Into<String>, input: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            instructions: None,
            input: input.into(),
            attachments: Vec::new(),
            output_schema: None,
            schema_name: None,
            max_tokens: 4096,
            temperature: None,
        }
    }
}

/// Response from a generation service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResponse {
    /// Provider-assigned response ID.
    pub id: String,
    /// The generated content: a JSON string for free-text requests, a
    /// structured value when an output schema was supplied.
    pub content: Value,
    /// Model that produced the response.
    pub model: String,
    /// Token usage for this call.
    #[serde(default)]
    pub usage: Usage,
}

/// Token usage for a generation request/response.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// Errors from a generation service call.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// The request never reached the service or the connection dropped.
    #[error("transport error: {0}")]
    Transport(String),

    /// The service answered with an error status.
    #[error("api error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// The response body could not be decoded, or structured output did not
    /// match the requested schema.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// The provider is misconfigured (missing key, bad base URL).
    #[error("configuration error: {0}")]
    Configuration(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn text_request_defaults() {
        let req = GenerationRequest::text("gpt-4.1", "Summarize the findings");
        assert_eq!(req.model, "gpt-4.1");
        assert_eq!(req.max_tokens, 4096);
        assert!(req.attachments.is_empty());
        assert!(req.output_schema.is_none());
    }

    #[test]
    fn request_json_skips_empty_fields() {
        let req = GenerationRequest::text("gpt-4.1", "hello");
        let text = serde_json::to_string(&req).unwrap();
        assert!(!text.contains("attachments"));
        assert!(!text.contains("output_schema"));
        assert!(!text.contains("instructions"));
    }

    #[test]
    fn response_json_roundtrip() {
        let resp = GenerationResponse {
            id: "gen-123".to_string(),
            content: json!({"vendor_name": "Acme"}),
            model: "gpt-4.1".to_string(),
            usage: Usage {
                input_tokens: 150,
                output_tokens: 40,
            },
        };
        let text = serde_json::to_string(&resp).unwrap();
        let parsed: GenerationResponse = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed.content["vendor_name"], "Acme");
        assert_eq!(parsed.usage.output_tokens, 40);
    }

    #[test]
    fn generation_error_display() {
        let err = GenerationError::Api {
            status: 429,
            message: "rate limited".to_string(),
        };
        assert!(err.to_string().contains("429"));
        assert!(err.to_string().contains("rate limited"));
    }
}
