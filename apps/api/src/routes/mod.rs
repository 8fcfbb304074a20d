pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::ats::handlers::handle_ats_score;
use crate::github::handlers::handle_github_analyze;
use crate::interview::handlers as interview;
use crate::resume::handlers::handle_upload;
use crate::state::AppState;

/// Room for multipart boundaries and part headers on top of the file itself.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

pub fn build_router(state: AppState) -> Router {
    let upload_limit = state.config.max_upload_bytes + MULTIPART_OVERHEAD_BYTES;

    Router::new()
        .route("/health", get(health::health_handler))
        // Mock interviews
        .route("/api/v1/interviews", post(interview::handle_start))
        .route("/api/v1/interviews/:id", get(interview::handle_get_session))
        .route(
            "/api/v1/interviews/:id/answers",
            post(interview::handle_answer),
        )
        .route("/api/v1/interviews/:id/end", post(interview::handle_end))
        .route(
            "/api/v1/interviews/:id/report",
            post(interview::handle_report),
        )
        // Résumé ingestion
        .route(
            "/api/v1/resumes/upload",
            post(handle_upload).layer(DefaultBodyLimit::max(upload_limit)),
        )
        // Analysis
        .route("/api/v1/ats/score", post(handle_ats_score))
        .route("/api/v1/github/analyze", post(handle_github_analyze))
        .with_state(state)
}
