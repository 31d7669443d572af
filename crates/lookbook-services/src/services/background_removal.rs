//! Background-removal job client
//!
//! Submits a hosted image URL as a removal job, polls the job status at a
//! fixed interval with a bounded attempt budget, and downloads the processed
//! image bytes. The poll loop selects on the request's cancellation token so
//! a dropped request stops polling immediately.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::error::{ServiceError, ServiceResult};

const SERVICE: &str = "background removal";

/// Background removal abstraction: hosted image URL in, processed bytes out.
#[async_trait]
pub trait BackgroundRemover: Send + Sync {
    async fn remove(&self, image_url: &str, cancel: &CancellationToken) -> ServiceResult<Bytes>;
}

#[derive(Clone)]
pub struct BackgroundRemovalClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    poll_interval: Duration,
    max_poll_attempts: u32,
}

#[derive(Debug, Serialize)]
struct CreateRemovalRequest<'a> {
    image_url: &'a str,
}

#[derive(Debug, Deserialize)]
struct RemovalJob {
    id: String,
    status: String,
    #[serde(default)]
    result_url: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl BackgroundRemovalClient {
    pub fn new(
        client: reqwest::Client,
        base_url: String,
        api_key: String,
        poll_interval: Duration,
        max_poll_attempts: u32,
    ) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            poll_interval,
            max_poll_attempts,
        }
    }

    async fn submit(&self, image_url: &str) -> ServiceResult<RemovalJob> {
        let response = self
            .client
            .post(format!("{}/v1/removals", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&CreateRemovalRequest { image_url })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ServiceError::Api {
                service: SERVICE,
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json().await?)
    }

    async fn get_job(&self, job_id: &str) -> ServiceResult<RemovalJob> {
        let response = self
            .client
            .get(format!("{}/v1/removals/{}", self.base_url, job_id))
            .bearer_auth(&self.api_key)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ServiceError::Api {
                service: SERVICE,
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json().await?)
    }

    /// Wait for the job to yield a result URL, within the attempt budget.
    async fn wait_for_result(
        &self,
        job_id: &str,
        cancel: &CancellationToken,
    ) -> ServiceResult<String> {
        for attempt in 0..self.max_poll_attempts {
            let job = self.get_job(job_id).await?;

            match job.status.as_str() {
                "done" => {
                    tracing::info!(
                        job_id = %job_id,
                        attempts = attempt + 1,
                        "Background removal job completed"
                    );
                    return job.result_url.ok_or(ServiceError::MalformedResponse {
                        service: SERVICE,
                        field: "result_url",
                    });
                }
                "error" => {
                    return Err(ServiceError::Api {
                        service: SERVICE,
                        status: 200,
                        message: job
                            .error
                            .unwrap_or_else(|| "job reported an error".to_string()),
                    });
                }
                "queued" | "processing" => {
                    tracing::debug!(
                        job_id = %job_id,
                        attempt = attempt + 1,
                        status = %job.status,
                        "Waiting for background removal job"
                    );
                }
                other => {
                    tracing::warn!(job_id = %job_id, status = %other, "Unknown removal job status");
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

    async fn download(&self, result_url: &str) -> ServiceResult<Bytes> {
        let response = self.client.get(result_url).send().await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ServiceError::Api {
                service: SERVICE,
                status: status.as_u16(),
                message,
            });
        }

        let data = response.bytes().await?;
        if data.is_empty() {
            return Err(ServiceError::EmptyResult { service: SERVICE });
        }

        Ok(data)
    }
}

#[async_trait]
impl BackgroundRemover for BackgroundRemovalClient {
    async fn remove(&self, image_url: &str, cancel: &CancellationToken) -> ServiceResult<Bytes> {
        let job = self.submit(image_url).await?;
        tracing::info!(job_id = %job.id, "Background removal job submitted");

        let result_url = match (job.status.as_str(), job.result_url) {
            ("done", Some(url)) => url,
            _ => self.wait_for_result(&job.id, cancel).await?,
        };

        self.download(&result_url).await
    }
}
