use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::interview::models::{InterviewSession, PerformanceReport, Question, SessionStatus};
use crate::interview::orchestrator::{Advance, AdvanceTurn, CompletionReason, StartInterview};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct UserIdQuery {
    pub user_id: Uuid,
}

#[derive(Deserialize)]
pub struct UserIdBody {
    pub user_id: Uuid,
}

#[derive(Deserialize)]
pub struct StartRequest {
    pub user_id: Uuid,
    pub field_name: String,
    pub experience_level: String,
    pub resume_text: String,
    #[serde(default)]
    pub job_description: Option<String>,
}

#[derive(Serialize)]
pub struct StartResponse {
    pub session_id: Uuid,
    pub question: Question,
    pub resumed: bool,
    pub status: SessionStatus,
}

#[derive(Deserialize)]
pub struct AnswerRequest {
    pub user_id: Uuid,
    pub question: String,
    pub answer: String,
    pub turn_count: usize,
}

#[derive(Serialize)]
pub struct AnswerResponse {
    pub status: SessionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_question: Option<Question>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion_reason: Option<CompletionReason>,
    pub questions_asked: usize,
    pub answers_given: usize,
}

#[derive(Serialize)]
pub struct SessionResponse {
    #[serde(flatten)]
    pub session: InterviewSession,
    pub status: SessionStatus,
}

impl From<InterviewSession> for SessionResponse {
    fn from(session: InterviewSession) -> Self {
        let status = session.status();
        Self { session, status }
    }
}

/// POST /api/v1/interviews
pub async fn handle_start(
    State(state): State<AppState>,
    Json(req): Json<StartRequest>,
) -> Result<(StatusCode, Json<StartResponse>), AppError> {
    let outcome = state
        .interviews
        .start(StartInterview {
            user_id: req.user_id,
            field_name: req.field_name,
            experience_level: req.experience_level,
            resume_text: req.resume_text,
            job_description: req.job_description,
        })
        .await?;

    let status = if outcome.resumed {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((
        status,
        Json(StartResponse {
            session_id: outcome.session.id,
            question: outcome.first_question().clone(),
            resumed: outcome.resumed,
            status: outcome.session.status(),
        }),
    ))
}

/// GET /api/v1/interviews/:id
pub async fn handle_get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<SessionResponse>, AppError> {
    let session = state.interviews.get(id, params.user_id).await?;
    Ok(Json(session.into()))
}

/// POST /api/v1/interviews/:id/answers
pub async fn handle_answer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<AnswerRequest>,
) -> Result<Json<AnswerResponse>, AppError> {
    let outcome = state
        .interviews
        .advance(AdvanceTurn {
            session_id: id,
            user_id: req.user_id,
            question: req.question,
            answer: req.answer,
            turn_count: req.turn_count,
        })
        .await?;

    let (next_question, completion_reason) = match outcome.advance {
        Advance::Continue(question) => (Some(question), None),
        Advance::Completed(reason) => (None, Some(reason)),
    };
    Ok(Json(AnswerResponse {
        status: outcome.session.status(),
        next_question,
        completion_reason,
        questions_asked: outcome.session.questions.len(),
        answers_given: outcome.session.answers.len(),
    }))
}

/// POST /api/v1/interviews/:id/end
pub async fn handle_end(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UserIdBody>,
) -> Result<Json<SessionResponse>, AppError> {
    let session = state.interviews.conclude(id, req.user_id).await?;
    Ok(Json(session.into()))
}

/// POST /api/v1/interviews/:id/report
pub async fn handle_report(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UserIdBody>,
) -> Result<Json<PerformanceReport>, AppError> {
    let report = state.interviews.finalize(id, req.user_id).await?;
    Ok(Json(report))
}
