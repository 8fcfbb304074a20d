use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

/// Cached ATS report, one per (user, résumé text).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AtsReportRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub resume_text: String,
    pub field_match: String,
    pub ats_score: i16,
    pub comparison: Value,
    pub explanation: Value,
    pub ats_friendly_resume: String,
    pub created_at: DateTime<Utc>,
}

/// Cached repository write-up, one per (user, repository URL).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct GithubAnalysisRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub repo_url: String,
    pub readme_summary: String,
    pub linkedin_summary: String,
    pub resume_summary: String,
    pub created_at: DateTime<Utc>,
}
