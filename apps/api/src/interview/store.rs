//! Interview Session Store: durable source of truth for interview sessions.
//!
//! Every mutation is a single conditional statement keyed on the row `version`, so an
//! append either lands completely or not at all, and a stale writer gets `Conflict`
//! instead of silently overwriting a concurrent turn.

use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::PgPool;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::interview::models::{InterviewSession, Question, SessionKey};
use crate::models::interview::InterviewSessionRow;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("session {0} not found")]
    NotFound(Uuid),

    #[error("session {0} was modified concurrently")]
    Conflict(Uuid),

    #[error("a session with the same natural key already exists")]
    Duplicate,
}

/// Input for creating a session. The first question is mandatory: a stored session always
/// has at least one question.
#[derive(Debug, Clone)]
pub struct NewSession {
    pub key: SessionKey,
    pub job_description: Option<String>,
    pub first_question: Question,
}

/// Atomic append of zero-or-one answer and zero-or-one question, optionally closing the
/// session.
#[derive(Debug, Clone, Default)]
pub struct TurnAppend {
    pub answer: Option<String>,
    pub new_question: Option<Question>,
    pub complete: bool,
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn find_session(&self, key: &SessionKey)
        -> Result<Option<InterviewSession>, StoreError>;

    async fn get_session(&self, id: Uuid) -> Result<Option<InterviewSession>, StoreError>;

    async fn create_session(&self, new: NewSession) -> Result<InterviewSession, StoreError>;

    /// Applies `append` only if the stored version still equals `expected_version`.
    async fn append_turn(
        &self,
        id: Uuid,
        expected_version: i32,
        append: TurnAppend,
    ) -> Result<InterviewSession, StoreError>;

    /// Rewinds a session to `questions = [first_question]`, `answers = []`, in progress.
    async fn reset_session(
        &self,
        id: Uuid,
        expected_version: i32,
        first_question: Question,
    ) -> Result<InterviewSession, StoreError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Postgres implementation
// ────────────────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct PgSessionStore {
    pool: PgPool,
}

impl PgSessionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Distinguishes "no such row" from "row exists at another version" after a conditional
    /// update matched nothing.
    async fn miss(&self, id: Uuid) -> StoreError {
        match self.get_session(id).await {
            Ok(Some(_)) => StoreError::Conflict(id),
            Ok(None) => StoreError::NotFound(id),
            Err(e) => e,
        }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn find_session(
        &self,
        key: &SessionKey,
    ) -> Result<Option<InterviewSession>, StoreError> {
        let row = sqlx::query_as::<_, InterviewSessionRow>(
            r#"
            SELECT * FROM interview_sessions
            WHERE user_id = $1 AND field_name = $2 AND experience_level = $3 AND resume_text = $4
            LIMIT 1
            "#,
        )
        .bind(key.user_id)
        .bind(&key.field_name)
        .bind(&key.experience_level)
        .bind(&key.resume_text)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(InterviewSession::from))
    }

    async fn get_session(&self, id: Uuid) -> Result<Option<InterviewSession>, StoreError> {
        let row = sqlx::query_as::<_, InterviewSessionRow>(
            "SELECT * FROM interview_sessions WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(InterviewSession::from))
    }

    async fn create_session(&self, new: NewSession) -> Result<InterviewSession, StoreError> {
        let NewSession {
            key,
            job_description,
            first_question,
        } = new;

        let result = sqlx::query_as::<_, InterviewSessionRow>(
            r#"
            INSERT INTO interview_sessions
                (id, user_id, field_name, experience_level, resume_text, job_description,
                 questions, answers, version)
            VALUES ($1, $2, $3, $4, $5, $6, $7, '{}', 1)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(key.user_id)
        .bind(&key.field_name)
        .bind(&key.experience_level)
        .bind(&key.resume_text)
        .bind(job_description.as_deref())
        .bind(Json(vec![first_question]))
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(row) => Ok(row.into()),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(StoreError::Duplicate)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn append_turn(
        &self,
        id: Uuid,
        expected_version: i32,
        append: TurnAppend,
    ) -> Result<InterviewSession, StoreError> {
        debug!(
            "append_turn session={id} v={expected_version} answer={} question={} complete={}",
            append.answer.is_some(),
            append.new_question.is_some(),
            append.complete
        );

        let row = sqlx::query_as::<_, InterviewSessionRow>(
            r#"
            UPDATE interview_sessions SET
                answers = CASE WHEN $3::text IS NULL THEN answers
                               ELSE array_append(answers, $3::text) END,
                questions = CASE WHEN $4::jsonb IS NULL THEN questions
                                 ELSE questions || jsonb_build_array($4::jsonb) END,
                completed_at = CASE WHEN $5 THEN COALESCE(completed_at, now())
                                    ELSE completed_at END,
                version = version + 1,
                updated_at = now()
            WHERE id = $1 AND version = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(expected_version)
        .bind(append.answer.as_deref())
        .bind(append.new_question.as_ref().map(Json))
        .bind(append.complete)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(row.into()),
            None => Err(self.miss(id).await),
        }
    }

    async fn reset_session(
        &self,
        id: Uuid,
        expected_version: i32,
        first_question: Question,
    ) -> Result<InterviewSession, StoreError> {
        let row = sqlx::query_as::<_, InterviewSessionRow>(
            r#"
            UPDATE interview_sessions SET
                questions = $3,
                answers = '{}',
                completed_at = NULL,
                version = version + 1,
                updated_at = now()
            WHERE id = $1 AND version = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(expected_version)
        .bind(Json(vec![first_question]))
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(row.into()),
            None => Err(self.miss(id).await),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// In-memory implementation (tests)
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
pub mod memory {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, Ordering};

    use chrono::Utc;
    use tokio::sync::Mutex;

    use super::*;

    /// Same contract as `PgSessionStore`, backed by a map.
    #[derive(Default)]
    pub struct InMemorySessionStore {
        sessions: Mutex<HashMap<Uuid, InterviewSession>>,
        fail_writes: AtomicBool,
    }

    impl InMemorySessionStore {
        pub fn new() -> Self {
            Self::default()
        }

        /// Makes every subsequent write fail as if the database were down.
        pub fn fail_writes(&self, fail: bool) {
            self.fail_writes.store(fail, Ordering::SeqCst);
        }

        pub async fn len(&self) -> usize {
            self.sessions.lock().await.len()
        }

        fn check_writable(&self) -> Result<(), StoreError> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
            }
            Ok(())
        }
    }

    fn checked<'a>(
        sessions: &'a mut HashMap<Uuid, InterviewSession>,
        id: Uuid,
        expected_version: i32,
    ) -> Result<&'a mut InterviewSession, StoreError> {
        let session = sessions.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        if session.version != expected_version {
            return Err(StoreError::Conflict(id));
        }
        Ok(session)
    }

    #[async_trait]
    impl SessionStore for InMemorySessionStore {
        async fn find_session(
            &self,
            key: &SessionKey,
        ) -> Result<Option<InterviewSession>, StoreError> {
            let sessions = self.sessions.lock().await;
            Ok(sessions.values().find(|s| &s.key() == key).cloned())
        }

        async fn get_session(&self, id: Uuid) -> Result<Option<InterviewSession>, StoreError> {
            Ok(self.sessions.lock().await.get(&id).cloned())
        }

        async fn create_session(&self, new: NewSession) -> Result<InterviewSession, StoreError> {
            self.check_writable()?;
            let mut sessions = self.sessions.lock().await;
            if sessions.values().any(|s| s.key() == new.key) {
                return Err(StoreError::Duplicate);
            }
            let now = Utc::now();
            let session = InterviewSession {
                id: Uuid::new_v4(),
                user_id: new.key.user_id,
                field_name: new.key.field_name,
                experience_level: new.key.experience_level,
                resume_text: new.key.resume_text,
                job_description: new.job_description,
                questions: vec![new.first_question],
                answers: vec![],
                version: 1,
                completed_at: None,
                created_at: now,
                updated_at: now,
            };
            sessions.insert(session.id, session.clone());
            Ok(session)
        }

        async fn append_turn(
            &self,
            id: Uuid,
            expected_version: i32,
            append: TurnAppend,
        ) -> Result<InterviewSession, StoreError> {
            self.check_writable()?;
            let mut sessions = self.sessions.lock().await;
            let session = checked(&mut sessions, id, expected_version)?;
            if let Some(answer) = append.answer {
                session.answers.push(answer);
            }
            if let Some(question) = append.new_question {
                session.questions.push(question);
            }
            if append.complete && session.completed_at.is_none() {
                session.completed_at = Some(Utc::now());
            }
            session.version += 1;
            session.updated_at = Utc::now();
            Ok(session.clone())
        }

        async fn reset_session(
            &self,
            id: Uuid,
            expected_version: i32,
            first_question: Question,
        ) -> Result<InterviewSession, StoreError> {
            self.check_writable()?;
            let mut sessions = self.sessions.lock().await;
            let session = checked(&mut sessions, id, expected_version)?;
            session.questions = vec![first_question];
            session.answers.clear();
            session.completed_at = None;
            session.version += 1;
            session.updated_at = Utc::now();
            Ok(session.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::memory::InMemorySessionStore;
    use super::*;

    fn key() -> SessionKey {
        SessionKey {
            user_id: Uuid::new_v4(),
            field_name: "data-science".to_string(),
            experience_level: "0-1".to_string(),
            resume_text: "Pandas, SQL".to_string(),
        }
    }

    fn question(text: &str) -> Question {
        Question {
            text: text.to_string(),
            category: "Technical".to_string(),
            expected_duration_seconds: 60,
        }
    }

    async fn seeded(store: &InMemorySessionStore, key: SessionKey) -> InterviewSession {
        store
            .create_session(NewSession {
                key,
                job_description: None,
                first_question: question("Q1"),
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_rejects_duplicate_natural_key() {
        let store = InMemorySessionStore::new();
        let key = key();
        seeded(&store, key.clone()).await;

        let again = store
            .create_session(NewSession {
                key,
                job_description: None,
                first_question: question("other"),
            })
            .await;
        assert!(matches!(again, Err(StoreError::Duplicate)));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_append_bumps_version_and_rejects_stale_writer() {
        let store = InMemorySessionStore::new();
        let session = seeded(&store, key()).await;

        let updated = store
            .append_turn(
                session.id,
                session.version,
                TurnAppend {
                    answer: Some("A1".to_string()),
                    new_question: Some(question("Q2")),
                    complete: false,
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.version, session.version + 1);
        assert_eq!(updated.questions.len(), 2);
        assert_eq!(updated.answers, vec!["A1".to_string()]);

        let stale = store
            .append_turn(session.id, session.version, TurnAppend::default())
            .await;
        assert!(matches!(stale, Err(StoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_reset_rewinds_and_reopens() {
        let store = InMemorySessionStore::new();
        let session = seeded(&store, key()).await;
        let done = store
            .append_turn(
                session.id,
                session.version,
                TurnAppend {
                    answer: Some("A1".to_string()),
                    new_question: None,
                    complete: true,
                },
            )
            .await
            .unwrap();
        assert!(done.completed_at.is_some());

        let reset = store
            .reset_session(done.id, done.version, question("Q1"))
            .await
            .unwrap();
        assert_eq!(reset.questions, vec![question("Q1")]);
        assert!(reset.answers.is_empty());
        assert!(reset.completed_at.is_none());
    }

    #[tokio::test]
    async fn test_unknown_session_is_not_found() {
        let store = InMemorySessionStore::new();
        let result = store
            .append_turn(Uuid::new_v4(), 1, TurnAppend::default())
            .await;
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }
}
