//! Image host client
//!
//! Uploads processed image buffers to the external image host and deletes
//! superseded uploads. The host exposes a public URL plus a remote id per
//! stored image.

use async_trait::async_trait;
use serde::Deserialize;

use lookbook_core::models::HostedImageRef;

use crate::error::{ServiceError, ServiceResult};

const SERVICE: &str = "image host";

/// Image host abstraction: upload a buffer, get back (url, remote id);
/// delete by remote id when a cleaned version supersedes an upload.
#[async_trait]
pub trait ImageHost: Send + Sync {
    async fn upload(
        &self,
        filename: &str,
        content_type: &str,
        data: Vec<u8>,
    ) -> ServiceResult<HostedImageRef>;

    async fn delete(&self, remote_id: &str) -> ServiceResult<()>;
}

#[derive(Clone)]
pub struct ImageHostClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    folder: String,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    url: String,
    id: String,
}

impl ImageHostClient {
    pub fn new(client: reqwest::Client, base_url: String, api_key: String, folder: String) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            folder,
        }
    }
}

#[async_trait]
impl ImageHost for ImageHostClient {
    async fn upload(
        &self,
        filename: &str,
        content_type: &str,
        data: Vec<u8>,
    ) -> ServiceResult<HostedImageRef> {
        let part = reqwest::multipart::Part::bytes(data)
            .file_name(filename.to_string())
            .mime_str(content_type)?;
        let form = reqwest::multipart::Form::new()
            .text("folder", self.folder.clone())
            .part("file", part);

        let response = self
            .client
            .post(format!("{}/v1/images", self.base_url))
            .bearer_auth(&self.api_key)
            .multipart(form)
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

        let parsed: UploadResponse = response.json().await?;
        tracing::debug!(url = %parsed.url, remote_id = %parsed.id, "Image uploaded to host");

        Ok(HostedImageRef {
            url: parsed.url,
            remote_id: parsed.id,
        })
    }

    async fn delete(&self, remote_id: &str) -> ServiceResult<()> {
        let response = self
            .client
            .delete(format!("{}/v1/images/{}", self.base_url, remote_id))
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

        Ok(())
    }
}
