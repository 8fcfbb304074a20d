//! Interview Orchestrator: owns the question/answer turn state machine.
//!
//! States: `NotStarted → InProgress → Completed`.
//!
//! - `start` creates a session with one oracle-generated question, or rewinds an existing
//!   session with the same natural key to its stored first question (no oracle call).
//! - `advance` records the candidate's answer and either appends the next question or
//!   closes the session. Both happen in one store append.
//! - `finalize` asks the oracle for a `PerformanceReport` over the answered prefix. It only
//!   reads the session, so a failed call can be retried.

use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use crate::interview::error::InterviewError;
use crate::interview::models::{
    InterviewSession, PerformanceReport, Question, SessionKey, SessionStatus,
};
use crate::interview::prompts::{
    FIRST_QUESTION_PROMPT, NEXT_QUESTION_PROMPT, PERFORMANCE_PROMPT, TERMINATION_SENTINEL,
};
use crate::interview::store::{NewSession, SessionStore, StoreError, TurnAppend};
use crate::llm_client::prompts::{render, JSON_RECORD_INSTRUCTION};
use crate::llm_client::{complete_json, extract, PromptOracle};
use crate::resume::normalize_resume_text;

/// Questions asked before an interview ends without consulting the oracle.
pub const DEFAULT_MAX_QUESTIONS: usize = 6;

// ────────────────────────────────────────────────────────────────────────────
// Inputs / outputs
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct StartInterview {
    pub user_id: Uuid,
    pub field_name: String,
    pub experience_level: String,
    pub resume_text: String,
    pub job_description: Option<String>,
}

#[derive(Debug, Clone)]
pub struct StartOutcome {
    pub session: InterviewSession,
    /// True when an existing session with the same natural key was rewound.
    pub resumed: bool,
}

impl StartOutcome {
    pub fn first_question(&self) -> &Question {
        &self.session.questions[0]
    }
}

#[derive(Debug, Clone)]
pub struct AdvanceTurn {
    pub session_id: Uuid,
    pub user_id: Uuid,
    /// Text of the question being answered; must match the pending question.
    pub question: String,
    pub answer: String,
    /// Number of questions the caller has seen so far.
    pub turn_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionReason {
    QuestionCap,
    OracleSignalledEnd,
    NoNextQuestion,
    EndedByCandidate,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Advance {
    Continue(Question),
    Completed(CompletionReason),
}

#[derive(Debug, Clone)]
pub struct AdvanceOutcome {
    pub session: InterviewSession,
    pub advance: Advance,
}

// ────────────────────────────────────────────────────────────────────────────
// Orchestrator
// ────────────────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct InterviewOrchestrator {
    oracle: Arc<dyn PromptOracle>,
    store: Arc<dyn SessionStore>,
    max_questions: usize,
}

impl InterviewOrchestrator {
    pub fn new(
        oracle: Arc<dyn PromptOracle>,
        store: Arc<dyn SessionStore>,
        max_questions: usize,
    ) -> Self {
        Self {
            oracle,
            store,
            max_questions: max_questions.max(1),
        }
    }

    pub fn max_questions(&self) -> usize {
        self.max_questions
    }

    /// `NotStarted → InProgress`.
    ///
    /// Guarantees exactly one question and zero answers on success. A session with the same
    /// natural key is rewound instead of duplicated.
    pub async fn start(&self, request: StartInterview) -> Result<StartOutcome, InterviewError> {
        let field_name = required(&request.field_name, "field_name")?;
        let experience_level = required(&request.experience_level, "experience_level")?;
        let resume_text = normalize_resume_text(&request.resume_text);
        if resume_text.is_empty() {
            return Err(InterviewError::Validation(
                "resume_text cannot be empty".to_string(),
            ));
        }
        let job_description = request
            .job_description
            .as_deref()
            .map(str::trim)
            .filter(|jd| !jd.is_empty())
            .map(str::to_string);

        let key = SessionKey {
            user_id: request.user_id,
            field_name,
            experience_level,
            resume_text,
        };

        if let Some(existing) = self.store.find_session(&key).await? {
            return self.rewind(existing).await;
        }

        let prompt = render(
            FIRST_QUESTION_PROMPT,
            &[
                ("field_name", &key.field_name),
                ("experience_level", &key.experience_level),
                ("resume_text", &key.resume_text),
                ("job_description", job_description.as_deref().unwrap_or("")),
                ("json_instruction", JSON_RECORD_INSTRUCTION),
            ],
        );
        let first_question: Question = complete_json(self.oracle.as_ref(), &prompt).await?;

        let created = self
            .store
            .create_session(NewSession {
                key: key.clone(),
                job_description,
                first_question,
            })
            .await;

        match created {
            Ok(session) => {
                info!(
                    "Started interview {} for user {} ({}, {})",
                    session.id, session.user_id, session.field_name, session.experience_level
                );
                Ok(StartOutcome {
                    session,
                    resumed: false,
                })
            }
            // A concurrent start with the same key won the insert; reuse its session.
            Err(StoreError::Duplicate) => {
                warn!("Concurrent start for user {}; reusing existing session", key.user_id);
                let existing = self
                    .store
                    .find_session(&key)
                    .await?
                    .ok_or(InterviewError::Store(StoreError::Duplicate))?;
                self.rewind(existing).await
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Rewinds an existing session to its stored first question.
    async fn rewind(&self, existing: InterviewSession) -> Result<StartOutcome, InterviewError> {
        let first_question = match existing.questions.first() {
            Some(q) => q.clone(),
            None => {
                warn!("Session {} has no stored questions; regenerating", existing.id);
                self.generate_first_question(&existing).await?
            }
        };

        let session = self
            .store
            .reset_session(existing.id, existing.version, first_question)
            .await?;
        info!("Restarted interview {} for user {}", session.id, session.user_id);

        Ok(StartOutcome {
            session,
            resumed: true,
        })
    }

    async fn generate_first_question(
        &self,
        session: &InterviewSession,
    ) -> Result<Question, InterviewError> {
        let prompt = render(
            FIRST_QUESTION_PROMPT,
            &[
                ("field_name", &session.field_name),
                ("experience_level", &session.experience_level),
                ("resume_text", &session.resume_text),
                (
                    "job_description",
                    session.job_description.as_deref().unwrap_or(""),
                ),
                ("json_instruction", JSON_RECORD_INSTRUCTION),
            ],
        );
        Ok(complete_json(self.oracle.as_ref(), &prompt).await?)
    }

    /// `InProgress → InProgress | Completed`.
    ///
    /// The answer to the pending question is always recorded, in the same append as the next
    /// question or the completion mark. Oracle transport failures append nothing.
    pub async fn advance(&self, turn: AdvanceTurn) -> Result<AdvanceOutcome, InterviewError> {
        let answer = turn.answer.trim().to_string();
        if answer.is_empty() {
            return Err(InterviewError::Validation(
                "answer cannot be empty".to_string(),
            ));
        }

        let session = self.load_owned(turn.session_id, turn.user_id).await?;
        if session.status() == SessionStatus::Completed {
            return Err(InterviewError::SessionCompleted(session.id));
        }
        let pending = session
            .pending_question()
            .ok_or(InterviewError::SessionCompleted(session.id))?;

        let asked = session.questions.len();
        if turn.turn_count != asked {
            return Err(InterviewError::StaleTurn {
                requested: turn.turn_count,
                actual: asked,
            });
        }
        if turn.question.trim() != pending.text.trim() {
            return Err(InterviewError::Validation(
                "question does not match the pending interview question".to_string(),
            ));
        }

        if asked >= self.max_questions {
            info!(
                "Interview {} reached the {}-question cap; completing",
                session.id, self.max_questions
            );
            return self
                .close(&session, Some(answer), CompletionReason::QuestionCap)
                .await;
        }

        let prompt = render(
            NEXT_QUESTION_PROMPT,
            &[
                ("field_name", &session.field_name),
                ("experience_level", &session.experience_level),
                ("turn_count", &asked.to_string()),
                ("max_questions", &self.max_questions.to_string()),
                ("last_question", &pending.text),
                ("answer", &answer),
                ("sentinel", TERMINATION_SENTINEL),
                ("json_instruction", JSON_RECORD_INSTRUCTION),
            ],
        );
        let raw = self.oracle.complete(&prompt).await?;

        if signals_end(&raw) {
            info!("Oracle ended interview {} after {} questions", session.id, asked);
            return self
                .close(&session, Some(answer), CompletionReason::OracleSignalledEnd)
                .await;
        }

        match extract::<Question>(&raw) {
            Ok(next_question) => {
                let updated = self
                    .store
                    .append_turn(
                        session.id,
                        session.version,
                        TurnAppend {
                            answer: Some(answer),
                            new_question: Some(next_question.clone()),
                            complete: false,
                        },
                    )
                    .await?;
                info!(
                    "Interview {} advanced to turn {}",
                    updated.id,
                    updated.questions.len()
                );
                Ok(AdvanceOutcome {
                    session: updated,
                    advance: Advance::Continue(next_question),
                })
            }
            Err(e) => {
                warn!(
                    "No next question in oracle output for interview {}: {e}; completing",
                    session.id
                );
                self.close(&session, Some(answer), CompletionReason::NoNextQuestion)
                    .await
            }
        }
    }

    /// Ends an in-progress interview at the candidate's request. Idempotent.
    pub async fn conclude(
        &self,
        session_id: Uuid,
        user_id: Uuid,
    ) -> Result<InterviewSession, InterviewError> {
        let session = self.load_owned(session_id, user_id).await?;
        if session.status() == SessionStatus::Completed {
            return Ok(session);
        }
        let outcome = self
            .close(&session, None, CompletionReason::EndedByCandidate)
            .await?;
        Ok(outcome.session)
    }

    /// `Completed` (terminal). Produces the performance report over the answered prefix.
    pub async fn finalize(
        &self,
        session_id: Uuid,
        user_id: Uuid,
    ) -> Result<PerformanceReport, InterviewError> {
        let session = self.load_owned(session_id, user_id).await?;
        if session.status() != SessionStatus::Completed {
            return Err(InterviewError::SessionInProgress(session.id));
        }

        let (questions, answers): (Vec<&str>, Vec<&str>) = session
            .answered_pairs()
            .map(|(q, a)| (q.text.as_str(), a.as_str()))
            .unzip();
        if answers.is_empty() {
            return Err(InterviewError::AnalysisUnavailable(
                "the interview has no answered questions".to_string(),
            ));
        }

        let questions_json = serde_json::to_string_pretty(&questions)
            .map_err(|e| InterviewError::AnalysisUnavailable(e.to_string()))?;
        let answers_json = serde_json::to_string_pretty(&answers)
            .map_err(|e| InterviewError::AnalysisUnavailable(e.to_string()))?;
        let prompt = render(
            PERFORMANCE_PROMPT,
            &[
                ("questions_json", &questions_json),
                ("answers_json", &answers_json),
                ("json_instruction", JSON_RECORD_INSTRUCTION),
            ],
        );

        let report: PerformanceReport = complete_json(self.oracle.as_ref(), &prompt)
            .await
            .map_err(|e| InterviewError::AnalysisUnavailable(e.to_string()))?;

        info!(
            "Interview {} analysed: overall score {}/100 over {} answers",
            session.id,
            report.overall_score,
            answers.len()
        );
        Ok(report)
    }

    pub async fn get(
        &self,
        session_id: Uuid,
        user_id: Uuid,
    ) -> Result<InterviewSession, InterviewError> {
        self.load_owned(session_id, user_id).await
    }

    async fn close(
        &self,
        session: &InterviewSession,
        answer: Option<String>,
        reason: CompletionReason,
    ) -> Result<AdvanceOutcome, InterviewError> {
        let updated = self
            .store
            .append_turn(
                session.id,
                session.version,
                TurnAppend {
                    answer,
                    new_question: None,
                    complete: true,
                },
            )
            .await?;
        info!(
            "Interview {} completed ({reason:?}) with {} answers",
            updated.id,
            updated.answers.len()
        );
        Ok(AdvanceOutcome {
            session: updated,
            advance: Advance::Completed(reason),
        })
    }

    /// Sessions owned by another user are indistinguishable from missing ones.
    async fn load_owned(
        &self,
        session_id: Uuid,
        user_id: Uuid,
    ) -> Result<InterviewSession, InterviewError> {
        match self.store.get_session(session_id).await? {
            Some(session) if session.user_id == user_id => Ok(session),
            _ => Err(InterviewError::SessionNotFound(session_id)),
        }
    }
}

fn required(value: &str, name: &str) -> Result<String, InterviewError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(InterviewError::Validation(format!("{name} cannot be empty")));
    }
    Ok(trimmed.to_string())
}

fn signals_end(raw: &str) -> bool {
    raw.to_ascii_uppercase().contains(TERMINATION_SENTINEL)
}
