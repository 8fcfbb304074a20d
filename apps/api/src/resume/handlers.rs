use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use tracing::{debug, info};

use crate::errors::AppError;
use crate::resume::extract_pdf_text;
use crate::state::AppState;

const RESUME_FIELD: &str = "resume";

#[derive(Serialize)]
pub struct UploadResponse {
    pub resume_text: String,
    pub char_count: usize,
}

/// POST /api/v1/resumes/upload
/// Multipart form with a single PDF file in the `resume` field.
pub async fn handle_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let limit = state.config.max_upload_bytes;

    while let Some(field) = multipart.next_field().await.map_err(|e| multipart_error(e, limit))? {
        if field.name() != Some(RESUME_FIELD) {
            continue;
        }

        // The magic bytes decide, not the declared content type.
        let declared = field.content_type().map(str::to_string);
        debug!("Résumé upload declared as {:?}", declared);

        let data = field.bytes().await.map_err(|e| multipart_error(e, limit))?;
        if data.is_empty() {
            return Err(AppError::Validation("the uploaded file is empty".to_string()));
        }
        if data.len() > limit {
            return Err(too_large(limit));
        }

        let size = data.len();
        let resume_text = extract_pdf_text(data).await?;
        info!(
            "Extracted {} chars of résumé text from a {} byte PDF",
            resume_text.chars().count(),
            size
        );

        return Ok(Json(UploadResponse {
            char_count: resume_text.chars().count(),
            resume_text,
        }));
    }

    Err(AppError::Validation(format!(
        "missing '{RESUME_FIELD}' file field"
    )))
}

fn multipart_error(err: MultipartError, limit: usize) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        too_large(limit)
    } else {
        AppError::Validation(format!("invalid multipart body: {}", err.body_text()))
    }
}

fn too_large(limit: usize) -> AppError {
    AppError::PayloadTooLarge(format!(
        "résumé must be at most {} MB",
        limit / (1024 * 1024)
    ))
}
