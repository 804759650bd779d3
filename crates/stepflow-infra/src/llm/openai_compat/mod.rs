//! OpenAiCompatProvider -- concrete [`GenerationService`] implementation
//! for OpenAI-compatible chat completion APIs.
//!
//! Sends requests to `/chat/completions` on the configured base URL.
//! Attachments are embedded as data-URL file parts; structured output is
//! requested through the `json_schema` response format.
//!
//! The API key is wrapped in [`secrecy::SecretString`] and is never logged
//! or included in `Debug` output.

mod types;

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tracing::debug;

use stepflow_core::service::generate::GenerationService;
use stepflow_types::generate::{
    GenerationError, GenerationRequest, GenerationResponse, Usage,
};

use types::{
    ChatMessage, ChatRequest, ChatResponse, ContentPart, FilePart, JsonSchemaFormat,
    MessageContent, ResponseFormat,
};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Generation service client for OpenAI-compatible APIs.
// No Debug derive: the struct holds the API key.
pub struct OpenAiCompatProvider {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
}

impl OpenAiCompatProvider {
    pub fn new(api_key: SecretString) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .expect("failed to create reqwest client");
        Self {
            client,
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Override the base URL (self-hosted gateways, proxies, tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn to_chat_request(&self, request: &GenerationRequest) -> ChatRequest {
        let mut messages = Vec::new();
        if let Some(instructions) = &request.instructions {
            messages.push(ChatMessage {
                role: "system",
                content: MessageContent::Text(instructions.clone()),
            });
        }

        let user_content = if request.attachments.is_empty() {
            MessageContent::Text(request.input.clone())
        } else {
            let mut parts = vec![ContentPart::Text {
                text: request.input.clone(),
            }];
            for attachment in &request.attachments {
                parts.push(ContentPart::File {
                    file: FilePart {
                        filename: attachment.filename.clone(),
                        file_data: format!(
                            "data:{};base64,{}",
                            attachment.content_type, attachment.data
                        ),
                    },
                });
            }
            MessageContent::Parts(parts)
        };
        messages.push(ChatMessage {
            role: "user",
            content: user_content,
        });

        let response_format = request.output_schema.as_ref().map(|schema| ResponseFormat {
            kind: "json_schema",
            json_schema: JsonSchemaFormat {
                name: request
                    .schema_name
                    .clone()
                    .unwrap_or_else(|| "response".to_string()),
                schema: schema.clone(),
                strict: true,
            },
        });

        ChatRequest {
            model: request.model.clone(),
            messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            response_format,
        }
    }
}

impl GenerationService for OpenAiCompatProvider {
    fn name(&self) -> &str {
        "openai-compat"
    }

    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse, GenerationError> {
        let body = self.to_chat_request(request);
        let url = format!("{}/chat/completions", self.base_url);

        debug!(model = %request.model, attachments = request.attachments.len(), "chat completion request");

        let response = self
            .client
            .post(&url)
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| GenerationError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            if status.as_u16() == 401 {
                return Err(GenerationError::Configuration(
                    "api key rejected".to_string(),
                ));
            }
            return Err(GenerationError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::MalformedResponse(e.to_string()))?;

        let text = chat
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                GenerationError::MalformedResponse("response carried no content".to_string())
            })?;

        // Structured requests must come back as parseable JSON.
        let content = if request.output_schema.is_some() {
            serde_json::from_str::<Value>(&text).map_err(|e| {
                GenerationError::MalformedResponse(format!(
                    "structured output is not valid JSON: {e}"
                ))
            })?
        } else {
            Value::String(text)
        };

        let usage = chat
            .usage
            .map(|u| Usage {
                input_tokens: u.prompt_tokens,
                output_tokens: u.completion_tokens,
            })
            .unwrap_or_default();

        Ok(GenerationResponse {
            id: chat.id,
            content,
            model: chat.model,
            usage,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stepflow_types::generate::Attachment;

    fn provider() -> OpenAiCompatProvider {
        OpenAiCompatProvider::new(SecretString::from("sk-test"))
            .with_base_url("http://localhost:9")
    }

    #[test]
    fn request_includes_schema_format() {
        let mut request = GenerationRequest::text("gpt-4.1", "extract");
        request.output_schema = Some(serde_json::json!({"type": "object"}));
        request.schema_name = Some("invoice_data".to_string());

        let body = provider().to_chat_request(&request);
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["response_format"]["type"], "json_schema");
        assert_eq!(json["response_format"]["json_schema"]["name"], "invoice_data");
        assert_eq!(json["response_format"]["json_schema"]["strict"], true);
    }

    #[test]
    fn attachments_become_data_url_parts() {
        let mut request = GenerationRequest::text("gpt-4.1", "read this");
        request.attachments.push(Attachment {
            filename: "inv.pdf".to_string(),
            content_type: "application/pdf".to_string(),
            data: "JVBERg==".to_string(),
        });

        let body = provider().to_chat_request(&request);
        let json = serde_json::to_value(&body).unwrap();
        let parts = json["messages"][0]["content"].as_array().unwrap();
        assert_eq!(parts[0]["type"], "text");
        assert_eq!(parts[1]["type"], "file");
        assert_eq!(
            parts[1]["file"]["file_data"],
            "data:application/pdf;base64,JVBERg=="
        );
    }

    #[test]
    fn instructions_become_system_message() {
        let mut request = GenerationRequest::text("gpt-4.1", "hello");
        request.instructions = Some("be terse".to_string());

        let body = provider().to_chat_request(&request);
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][0]["content"], "be terse");
        assert_eq!(json["messages"][1]["role"], "user");
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_a_transport_error() {
        let err = provider()
            .generate(&GenerationRequest::text("gpt-4.1", "hi"))
            .await;
        assert!(matches!(err, Err(GenerationError::Transport(_))));
    }
}
