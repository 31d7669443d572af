//! Single-shot chat-completion vision analyzer

use async_trait::async_trait;
use base64::Engine;
use bytes::Bytes;
use serde::Deserialize;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use crate::error::{ServiceError, ServiceResult};

use super::{VisionAnalyzer, GARMENT_PROMPT};

const SERVICE: &str = "vision model";

#[derive(Clone)]
pub struct OpenAiChatAnalyzer {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
}

// Chat Completions API response types
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Debug, Deserialize)]
struct Message {
    content: Option<String>,
}

impl OpenAiChatAnalyzer {
    pub fn new(
        client: reqwest::Client,
        base_url: String,
        api_key: String,
        model: String,
        max_tokens: u32,
    ) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model,
            max_tokens,
        }
    }

    async fn request_completion(&self, image: &[u8], content_type: &str) -> ServiceResult<String> {
        let image_base64 = base64::engine::general_purpose::STANDARD.encode(image);

        let request_body = json!({
            "model": self.model,
            "messages": [
                {
                    "role": "user",
                    "content": [
                        {
                            "type": "text",
                            "text": GARMENT_PROMPT
                        },
                        {
                            "type": "image_url",
                            "image_url": {
                                "url": format!("data:{};base64,{}", content_type, image_base64)
                            }
                        }
                    ]
                }
            ],
            "max_tokens": self.max_tokens
        });

        tracing::debug!(
            model = %self.model,
            image_size = image.len(),
            "Sending garment analysis request to chat completions API"
        );

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .header("Content-Type", "application/json")
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(api_error(status.as_u16(), error_text));
        }

        let chat_response: ChatCompletionResponse = response.json().await?;

        chat_response
            .choices
            .first()
            .and_then(|choice| choice.message.content.as_ref())
            .map(|s| s.trim().to_string())
            .ok_or(ServiceError::MalformedResponse {
                service: SERVICE,
                field: "choices[0].message.content",
            })
    }
}

/// Build an Api error, preferring the structured OpenAI error message when
/// the body carries one.
fn api_error(status: u16, error_text: String) -> ServiceError {
    if let Ok(error_json) = serde_json::from_str::<serde_json::Value>(&error_text) {
        if let Some(error_obj) = error_json.get("error") {
            let message = error_obj
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("unknown error");
            let error_type = error_obj
                .get("type")
                .and_then(|t| t.as_str())
                .unwrap_or("api_error");
            return ServiceError::Api {
                service: SERVICE,
                status,
                message: format!("{} ({})", message, error_type),
            };
        }
    }

    ServiceError::Api {
        service: SERVICE,
        status,
        message: error_text,
    }
}

#[async_trait]
impl VisionAnalyzer for OpenAiChatAnalyzer {
    async fn analyze(
        &self,
        image: Bytes,
        content_type: &str,
        cancel: &CancellationToken,
    ) -> ServiceResult<String> {
        tokio::select! {
            result = self.request_completion(&image, content_type) => result,
            _ = cancel.cancelled() => Err(ServiceError::Cancelled { service: SERVICE }),
        }
    }
}
