use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use crate::interview::models::{InterviewSession, Question};

#[derive(Debug, Clone, FromRow)]
pub struct InterviewSessionRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub field_name: String,
    pub experience_level: String,
    pub resume_text: String,
    pub job_description: Option<String>,
    pub questions: Json<Vec<Question>>,
    pub answers: Vec<String>,
    pub version: i32,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<InterviewSessionRow> for InterviewSession {
    fn from(row: InterviewSessionRow) -> Self {
        InterviewSession {
            id: row.id,
            user_id: row.user_id,
            field_name: row.field_name,
            experience_level: row.experience_level,
            resume_text: row.resume_text,
            job_description: row.job_description,
            questions: row.questions.0,
            answers: row.answers,
            version: row.version,
            completed_at: row.completed_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
