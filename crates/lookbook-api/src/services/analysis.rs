//! Analysis pipeline orchestrator
//!
//! Runs one upload through the full flow: preprocess, host, background
//! removal, vision analysis, garment extraction, per-item persistence.
//! Strictly linear; per-item persistence failures never abort the batch.

use bytes::Bytes;
use tokio_util::sync::CancellationToken;

use lookbook_core::extract::extract_garments;
use lookbook_core::models::{GarmentRecord, HostedImageRef, NewClothingRecord, PersistenceFailure};
use lookbook_core::AppError;
use lookbook_processing::ImagePreprocessor;
use lookbook_services::ServiceError;

use crate::services::temp::TempImage;
use crate::state::AppState;

/// Result of a completed pipeline run.
#[derive(Debug)]
pub struct AnalysisOutcome {
    /// Final hosted image URL (the cleaned version when removal ran).
    pub image_url: String,
    /// Garments persisted downstream, in detection order.
    pub persisted: Vec<GarmentRecord>,
    /// Garments the downstream service rejected.
    pub failed: Vec<PersistenceFailure>,
}

/// Orchestrates the analysis pipeline against the injected services.
pub struct AnalysisService<'a> {
    state: &'a AppState,
}

impl<'a> AnalysisService<'a> {
    pub fn new(state: &'a AppState) -> Self {
        Self { state }
    }

    #[tracing::instrument(
        skip(self, upload, cancel),
        fields(user_id = %user_id, filename = %upload.original_filename())
    )]
    pub async fn analyze(
        &self,
        user_id: &str,
        upload: &TempImage,
        cancel: &CancellationToken,
    ) -> Result<AnalysisOutcome, AppError> {
        let data = upload
            .read()
            .await
            .map_err(|e| AppError::Internal(format!("failed to read spooled upload: {}", e)))?;

        // Preprocess: bounded resize + JPEG re-encode
        let preprocessor =
            ImagePreprocessor::new(self.state.media.max_image_width, self.state.media.jpeg_quality);
        let jpeg = preprocessor
            .shrink(&data)
            .map_err(|e| AppError::ImageProcessing(format!("{:#}", e)))?;
        let filename = upload.jpeg_filename();
        let content_type = ImagePreprocessor::output_content_type();

        // Host the preprocessed buffer
        let hosted = self
            .state
            .services
            .image_host
            .upload(&filename, content_type, jpeg.to_vec())
            .await
            .map_err(|e| fatal(e, AppError::Upload))?;
        tracing::info!(url = %hosted.url, "Image uploaded to host");

        // Background removal, when configured
        let (analysis_bytes, image_ref) = match &self.state.services.background_remover {
            Some(remover) => {
                let cleaned = remover
                    .remove(&hosted.url, cancel)
                    .await
                    .map_err(|e| fatal(e, AppError::BackgroundRemoval))?;
                let final_ref = self
                    .replace_hosted_image(&hosted, &filename, content_type, &cleaned)
                    .await?;
                (cleaned, final_ref)
            }
            None => (jpeg, hosted),
        };

        // Vision analysis
        let reply = self
            .state
            .services
            .vision
            .analyze(analysis_bytes, content_type, cancel)
            .await
            .map_err(|e| fatal(e, AppError::Analysis))?;
        tracing::debug!(reply_len = reply.len(), "Model reply received");

        // Garment extraction
        let garments = extract_garments(&reply).map_err(|e| AppError::Parse(e.to_string()))?;
        tracing::info!(garments = garments.len(), "Garments extracted from model reply");

        // Per-item persistence; failures are reported, never fatal
        let mut persisted = Vec::with_capacity(garments.len());
        let mut failed = Vec::new();
        for garment in garments {
            let record = NewClothingRecord::from_garment(user_id, &garment, &image_ref.url);
            match self.state.services.wardrobe.create_clothing(&record).await {
                Ok(_) => {
                    let mut garment = garment;
                    garment.season = Some(record.season);
                    persisted.push(garment);
                }
                Err(err) => {
                    tracing::warn!(
                        garment_type = %garment.garment_type,
                        error = %err,
                        "Failed to persist garment, skipping"
                    );
                    failed.push(PersistenceFailure {
                        garment_type: garment.garment_type,
                        error: err.to_string(),
                    });
                }
            }
        }

        Ok(AnalysisOutcome {
            image_url: image_ref.url,
            persisted,
            failed,
        })
    }

    /// Re-upload the cleaned bytes and delete the superseded hosted image.
    /// A failed delete leaves a stale remote file behind, which is logged
    /// but does not fail the request.
    async fn replace_hosted_image(
        &self,
        superseded: &HostedImageRef,
        filename: &str,
        content_type: &str,
        cleaned: &Bytes,
    ) -> Result<HostedImageRef, AppError> {
        if let Err(err) = self
            .state
            .services
            .image_host
            .delete(&superseded.remote_id)
            .await
        {
            tracing::warn!(
                remote_id = %superseded.remote_id,
                error = %err,
                "Failed to delete superseded hosted image"
            );
        }

        self.state
            .services
            .image_host
            .upload(filename, content_type, cleaned.to_vec())
            .await
            .map_err(|e| fatal(e, AppError::Upload))
    }
}

/// Map a service error to the stage's fatal `AppError` variant; poll-budget
/// exhaustion always surfaces as a timeout.
fn fatal(err: ServiceError, variant: fn(String) -> AppError) -> AppError {
    if err.is_timeout() {
        AppError::AnalysisTimeout(err.to_string())
    } else {
        variant(err.to_string())
    }
}
