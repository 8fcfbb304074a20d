use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ats::{score_resume, AtsReport};
use crate::errors::AppError;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct AtsScoreRequest {
    pub user_id: Uuid,
    pub resume_text: String,
    pub field_match: String,
}

#[derive(Serialize)]
pub struct AtsScoreResponse {
    pub data: AtsReport,
    pub cached: bool,
}

/// POST /api/v1/ats/score
pub async fn handle_ats_score(
    State(state): State<AppState>,
    Json(req): Json<AtsScoreRequest>,
) -> Result<Json<AtsScoreResponse>, AppError> {
    let (data, cached) = score_resume(
        &state.db,
        state.oracle.as_ref(),
        req.user_id,
        &req.resume_text,
        &req.field_match,
    )
    .await?;
    Ok(Json(AtsScoreResponse { data, cached }))
}
