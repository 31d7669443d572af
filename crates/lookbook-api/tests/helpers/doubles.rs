//! Trait doubles for the external collaborators.
//!
//! Every double counts its calls so tests can assert that validation
//! failures reject the request before any external call is made.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use tokio_util::sync::CancellationToken;

use lookbook_core::models::{HostedImageRef, NewClothingRecord};
use lookbook_services::{
    BackgroundRemover, ImageHost, ServiceError, VisionAnalyzer, WardrobeStore,
};

#[derive(Default)]
pub struct StubImageHost {
    pub uploads: AtomicUsize,
    pub deletes: Mutex<Vec<String>>,
    pub fail_upload: bool,
}

#[async_trait]
impl ImageHost for StubImageHost {
    async fn upload(
        &self,
        _filename: &str,
        _content_type: &str,
        _data: Vec<u8>,
    ) -> Result<HostedImageRef, ServiceError> {
        if self.fail_upload {
            return Err(ServiceError::Api {
                service: "image host",
                status: 503,
                message: "host unavailable".to_string(),
            });
        }
        let n = self.uploads.fetch_add(1, Ordering::SeqCst);
        Ok(HostedImageRef {
            url: format!("https://img.test/{}.jpg", n),
            remote_id: format!("img-{}", n),
        })
    }

    async fn delete(&self, remote_id: &str) -> Result<(), ServiceError> {
        self.deletes.lock().unwrap().push(remote_id.to_string());
        Ok(())
    }
}

#[derive(Default)]
pub struct StubBackgroundRemover {
    pub calls: AtomicUsize,
    /// When set, every call fails as an exhausted poll budget.
    pub times_out: bool,
}

#[async_trait]
impl BackgroundRemover for StubBackgroundRemover {
    async fn remove(
        &self,
        _image_url: &str,
        _cancel: &CancellationToken,
    ) -> Result<Bytes, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.times_out {
            return Err(ServiceError::Timeout {
                service: "background removal",
                attempts: 3,
            });
        }
        Ok(Bytes::from_static(b"cleaned image bytes"))
    }
}

pub struct StubVision {
    pub reply: String,
    pub calls: AtomicUsize,
}

impl StubVision {
    pub fn replying(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl VisionAnalyzer for StubVision {
    async fn analyze(
        &self,
        _image: Bytes,
        _content_type: &str,
        _cancel: &CancellationToken,
    ) -> Result<String, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.reply.clone())
    }
}

#[derive(Default)]
pub struct RecordingWardrobe {
    pub records: Mutex<Vec<NewClothingRecord>>,
    /// Garment types whose create call fails.
    pub fail_types: Vec<String>,
}

impl RecordingWardrobe {
    pub fn failing_on(garment_type: &str) -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            fail_types: vec![garment_type.to_string()],
        }
    }
}

#[async_trait]
impl WardrobeStore for RecordingWardrobe {
    async fn create_clothing(
        &self,
        record: &NewClothingRecord,
    ) -> Result<serde_json::Value, ServiceError> {
        if self.fail_types.contains(&record.garment_type) {
            return Err(ServiceError::Api {
                service: "wardrobe service",
                status: 500,
                message: "insert failed".to_string(),
            });
        }
        self.records.lock().unwrap().push(record.clone());
        Ok(serde_json::json!({ "id": self.records.lock().unwrap().len() }))
    }
}
