//! Clothing analysis handler
//!
//! `POST /analyze` accepts a multipart form (`image` file + `userId` text),
//! runs the analysis pipeline, and answers 201 with the persisted garments.

use std::sync::Arc;

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use lookbook_core::models::{GarmentRecord, PersistenceFailure};
use lookbook_core::AppError;
use lookbook_processing::MediaValidator;

use crate::error::HttpAppError;
use crate::services::analysis::AnalysisService;
use crate::services::temp::TempImage;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeResponse {
    pub message: String,
    /// Detected garments that were persisted downstream, in detection order.
    pub clothes: Vec<GarmentRecord>,
    /// Garments the downstream service rejected; the request still succeeds.
    pub failed: Vec<PersistenceFailure>,
    /// Final hosted image URL shared by all persisted garments.
    pub image_url: String,
}

/// Analyze an uploaded clothing photo
///
/// Validates the multipart form, spools the upload to a temp file, and runs
/// the pipeline. The temp file is deleted on every exit path, including all
/// failure branches, by the `TempImage` guard.
#[tracing::instrument(skip(state, multipart), fields(operation = "analyze"))]
pub async fn analyze(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Response, HttpAppError> {
    let (user_id, upload) = read_analyze_form(&state, multipart).await?;

    // Tie the polling loops of the external jobs to this request's lifetime.
    let cancel = CancellationToken::new();
    let _cancel_guard = cancel.clone().drop_guard();

    let outcome = AnalysisService::new(&state)
        .analyze(&user_id, &upload, &cancel)
        .await?;

    tracing::info!(
        persisted = outcome.persisted.len(),
        failed = outcome.failed.len(),
        "Analysis request completed"
    );

    Ok((
        StatusCode::CREATED,
        Json(AnalyzeResponse {
            message: "Clothing analyzed and saved".to_string(),
            clothes: outcome.persisted,
            failed: outcome.failed,
            image_url: outcome.image_url,
        }),
    )
        .into_response())
}

/// Read and validate the multipart form. Everything here runs before any
/// external call: a missing userId or a disallowed file never leaves the
/// process.
async fn read_analyze_form(
    state: &AppState,
    mut multipart: Multipart,
) -> Result<(String, TempImage), HttpAppError> {
    let mut user_id: Option<String> = None;
    let mut image: Option<(String, Option<String>, Bytes)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("invalid multipart body: {}", e)))?
    {
        match field.name() {
            Some("userId") => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("invalid userId field: {}", e)))?;
                user_id = Some(value);
            }
            Some("image") => {
                let filename = field
                    .file_name()
                    .map(str::to_owned)
                    .ok_or_else(|| AppError::InvalidInput("image field has no filename".into()))?;
                let content_type = field.content_type().map(str::to_owned);
                let data = field.bytes().await.map_err(|e| {
                    AppError::InvalidInput(format!("failed to read image field: {}", e))
                })?;
                image = Some((filename, content_type, data));
            }
            _ => {
                // Unknown fields are ignored
            }
        }
    }

    let user_id = user_id
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest("userId is required".to_string()))?;
    let (filename, content_type, data) =
        image.ok_or_else(|| AppError::InvalidInput("image file is required".to_string()))?;

    let validator = MediaValidator::new(
        state.media.max_file_size,
        state.media.allowed_extensions.clone(),
        state.media.allowed_content_types.clone(),
    );
    validator.validate_file_size(data.len())?;
    validator.validate_extension(&filename)?;
    if let Some(content_type) = &content_type {
        validator.validate_content_type(content_type)?;
        validator.validate_extension_content_type_match(&filename, content_type)?;
    }

    let upload = TempImage::spool(&state.temp_dir, &filename, &data)
        .await
        .map_err(|e| AppError::Internal(format!("failed to spool upload: {}", e)))?;

    Ok((user_id, upload))
}
