//! Wardrobe storage client
//!
//! Forwards extracted garments to the downstream wardrobe storage API, one
//! create-record call per garment.

use async_trait::async_trait;
use serde_json::Value;

use lookbook_core::models::NewClothingRecord;

use crate::error::{ServiceError, ServiceResult};

const SERVICE: &str = "wardrobe service";

/// Downstream persistence abstraction: one create call per garment record.
#[async_trait]
pub trait WardrobeStore: Send + Sync {
    async fn create_clothing(&self, record: &NewClothingRecord) -> ServiceResult<Value>;
}

#[derive(Clone)]
pub struct WardrobeClient {
    client: reqwest::Client,
    base_url: String,
}

impl WardrobeClient {
    pub fn new(client: reqwest::Client, base_url: String) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl WardrobeStore for WardrobeClient {
    async fn create_clothing(&self, record: &NewClothingRecord) -> ServiceResult<Value> {
        let response = self
            .client
            .post(format!("{}/api/clothing", self.base_url))
            .json(record)
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
}
