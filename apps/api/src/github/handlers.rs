use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::github::{analyze_repository, RepoAnalysis};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct GithubAnalyzeRequest {
    pub user_id: Uuid,
    pub url: String,
}

#[derive(Serialize)]
pub struct GithubAnalyzeResponse {
    pub data: RepoAnalysis,
    pub cached: bool,
}

/// POST /api/v1/github/analyze
pub async fn handle_github_analyze(
    State(state): State<AppState>,
    Json(req): Json<GithubAnalyzeRequest>,
) -> Result<Json<GithubAnalyzeResponse>, AppError> {
    let (data, cached) = analyze_repository(
        &state.db,
        state.oracle.as_ref(),
        &state.github,
        req.user_id,
        &req.url,
    )
    .await?;
    Ok(Json(GithubAnalyzeResponse { data, cached }))
}
