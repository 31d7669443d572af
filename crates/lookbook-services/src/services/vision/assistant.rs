//! Assistants thread/run vision analyzer
//!
//! Stateful protocol: upload the image as a file, create a thread, post a
//! message referencing the file plus the instruction text, start a run, poll
//! run status at a fixed interval with a bounded attempt budget, then read
//! the newest message's first text block.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use serde::Deserialize;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use crate::error::{ServiceError, ServiceResult};

use super::{VisionAnalyzer, GARMENT_PROMPT};

const SERVICE: &str = "vision model";

#[derive(Clone)]
pub struct OpenAiAssistantAnalyzer {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    assistant_id: String,
    poll_interval: Duration,
    max_poll_attempts: u32,
}

// Assistants API response types
#[derive(Debug, Deserialize)]
struct FileResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ThreadResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct RunResponse {
    id: String,
    status: String,
    #[serde(default)]
    last_error: Option<RunError>,
}

#[derive(Debug, Deserialize)]
struct RunError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct MessageListResponse {
    data: Vec<ThreadMessage>,
}

#[derive(Debug, Deserialize)]
struct ThreadMessage {
    content: Vec<MessageContent>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum MessageContent {
    Text {
        text: TextValue,
    },
    /// Non-text blocks (image_file etc.) are skipped when reading the reply.
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct TextValue {
    value: String,
}

impl OpenAiAssistantAnalyzer {
    pub fn new(
        client: reqwest::Client,
        base_url: String,
        api_key: String,
        assistant_id: String,
        poll_interval: Duration,
        max_poll_attempts: u32,
    ) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            assistant_id,
            poll_interval,
            max_poll_attempts,
        }
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.base_url, path))
            .bearer_auth(&self.api_key)
            .header("OpenAI-Beta", "assistants=v2")
    }

    async fn check_status(response: reqwest::Response) -> ServiceResult<reqwest::Response> {
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ServiceError::Api {
                service: SERVICE,
                status: status.as_u16(),
                message,
            });
        }
        Ok(response)
    }

    async fn upload_file(&self, image: Vec<u8>, content_type: &str) -> ServiceResult<String> {
        let part = reqwest::multipart::Part::bytes(image)
            .file_name("garment.jpg")
            .mime_str(content_type)?;
        let form = reqwest::multipart::Form::new()
            .text("purpose", "vision")
            .part("file", part);

        let response = self
            .request(reqwest::Method::POST, "/files")
            .multipart(form)
            .send()
            .await?;
        let file: FileResponse = Self::check_status(response).await?.json().await?;
        Ok(file.id)
    }

    async fn create_thread(&self) -> ServiceResult<String> {
        let response = self
            .request(reqwest::Method::POST, "/threads")
            .json(&json!({}))
            .send()
            .await?;
        let thread: ThreadResponse = Self::check_status(response).await?.json().await?;
        Ok(thread.id)
    }

    async fn post_message(&self, thread_id: &str, file_id: &str) -> ServiceResult<()> {
        let body = json!({
            "role": "user",
            "content": [
                {
                    "type": "image_file",
                    "image_file": { "file_id": file_id }
                },
                {
                    "type": "text",
                    "text": GARMENT_PROMPT
                }
            ]
        });

        let response = self
            .request(
                reqwest::Method::POST,
                &format!("/threads/{}/messages", thread_id),
            )
            .json(&body)
            .send()
            .await?;
        Self::check_status(response).await?;
        Ok(())
    }

    async fn create_run(&self, thread_id: &str) -> ServiceResult<RunResponse> {
        let response = self
            .request(
                reqwest::Method::POST,
                &format!("/threads/{}/runs", thread_id),
            )
            .json(&json!({ "assistant_id": self.assistant_id }))
            .send()
            .await?;
        Ok(Self::check_status(response).await?.json().await?)
    }

    async fn get_run(&self, thread_id: &str, run_id: &str) -> ServiceResult<RunResponse> {
        let response = self
            .request(
                reqwest::Method::GET,
                &format!("/threads/{}/runs/{}", thread_id, run_id),
            )
            .send()
            .await?;
        Ok(Self::check_status(response).await?.json().await?)
    }

    /// Poll the run until it completes, within the attempt budget.
    async fn wait_for_run(
        &self,
        thread_id: &str,
        run_id: &str,
        cancel: &CancellationToken,
    ) -> ServiceResult<()> {
        for attempt in 0..self.max_poll_attempts {
            let run = self.get_run(thread_id, run_id).await?;

            match run.status.as_str() {
                "completed" => {
                    tracing::info!(
                        run_id = %run_id,
                        attempts = attempt + 1,
                        "Assistant run completed"
                    );
                    return Ok(());
                }
                "failed" | "cancelled" | "expired" | "incomplete" => {
                    let message = run
                        .last_error
                        .map(|e| e.message)
                        .unwrap_or_else(|| format!("run ended with status {}", run.status));
                    return Err(ServiceError::Api {
                        service: SERVICE,
                        status: 200,
                        message,
                    });
                }
                "requires_action" => {
                    // No tools are attached to the assistant; a tool-call
                    // request cannot be satisfied here.
                    return Err(ServiceError::Api {
                        service: SERVICE,
                        status: 200,
                        message: "run requires tool action, which is not supported".to_string(),
                    });
                }
                other => {
                    tracing::debug!(
                        run_id = %run_id,
                        attempt = attempt + 1,
                        status = %other,
                        "Waiting for assistant run"
                    );
                }
            }

            tokio::select! {
                _ = cancel.cancelled() => {
                    return Err(ServiceError::Cancelled { service: SERVICE });
                }
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
        }

        Err(ServiceError::Timeout {
            service: SERVICE,
            attempts: self.max_poll_attempts,
        })
    }

    /// Read the newest message's first text block.
    async fn fetch_reply(&self, thread_id: &str) -> ServiceResult<String> {
        let response = self
            .request(
                reqwest::Method::GET,
                &format!("/threads/{}/messages?order=desc&limit=1", thread_id),
            )
            .send()
            .await?;
        let messages: MessageListResponse = Self::check_status(response).await?.json().await?;

        messages
            .data
            .into_iter()
            .next()
            .and_then(|message| {
                message.content.into_iter().find_map(|block| match block {
                    MessageContent::Text { text } => Some(text.value.trim().to_string()),
                    MessageContent::Other => None,
                })
            })
            .ok_or(ServiceError::MalformedResponse {
                service: SERVICE,
                field: "data[0].content[0].text.value",
            })
    }
}

#[async_trait]
impl VisionAnalyzer for OpenAiAssistantAnalyzer {
    async fn analyze(
        &self,
        image: Bytes,
        content_type: &str,
        cancel: &CancellationToken,
    ) -> ServiceResult<String> {
        let file_id = self.upload_file(image.to_vec(), content_type).await?;
        let thread_id = self.create_thread().await?;
        self.post_message(&thread_id, &file_id).await?;

        let run = self.create_run(&thread_id).await?;
        tracing::info!(thread_id = %thread_id, run_id = %run.id, "Assistant run started");

        if run.status != "completed" {
            self.wait_for_run(&thread_id, &run.id, cancel).await?;
        }

        self.fetch_reply(&thread_id).await
    }
}
