//! ATS scoring: how well a résumé survives an Applicant Tracking System, plus an ATS-friendly
//! rewrite. Two oracle calls per résumé; results are cached per (user, résumé text).

pub mod handlers;
pub mod prompts;

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::interview::models::deserialize_score;
use crate::llm_client::prompts::{render, JSON_RECORD_INSTRUCTION};
use crate::llm_client::{complete_json, PromptOracle};
use crate::models::analysis::AtsReportRow;
use crate::resume::normalize_resume_text;

use prompts::{ATS_REWRITE_PROMPT, ATS_SCORE_PROMPT};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Explanation {
    pub overview: String,
    pub key_issues: Vec<String>,
    pub improvements: Vec<String>,
}

/// First oracle call's record.
#[derive(Debug, Clone, PartialEq, Deserialize)]
struct AtsScoring {
    #[serde(rename = "ATSScore", deserialize_with = "deserialize_score")]
    ats_score: u8,
    #[serde(rename = "Comparison")]
    comparison: Comparison,
    #[serde(rename = "Explanation")]
    explanation: Explanation,
}

/// Second oracle call's record.
#[derive(Debug, Clone, PartialEq, Deserialize)]
struct AtsRewrite {
    #[serde(rename = "ATSFriendlyResume")]
    ats_friendly_resume: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AtsReport {
    #[serde(rename = "ATSScore")]
    pub ats_score: u8,
    #[serde(rename = "Comparison")]
    pub comparison: Comparison,
    #[serde(rename = "Explanation")]
    pub explanation: Explanation,
    #[serde(rename = "ATSFriendlyResume")]
    pub ats_friendly_resume: String,
}

impl TryFrom<AtsReportRow> for AtsReport {
    type Error = serde_json::Error;

    fn try_from(row: AtsReportRow) -> Result<Self, Self::Error> {
        Ok(Self {
            ats_score: row.ats_score.clamp(0, 100) as u8,
            comparison: serde_json::from_value(row.comparison)?,
            explanation: serde_json::from_value(row.explanation)?,
            ats_friendly_resume: row.ats_friendly_resume,
        })
    }
}

/// Runs both oracle calls. Nothing is persisted here.
pub async fn generate_report(
    oracle: &dyn PromptOracle,
    resume_text: &str,
    field_match: &str,
) -> Result<AtsReport, AppError> {
    let vars = [
        ("field_match", field_match),
        ("resume_text", resume_text),
        ("json_instruction", JSON_RECORD_INSTRUCTION),
    ];

    let scoring: AtsScoring = complete_json(oracle, &render(ATS_SCORE_PROMPT, &vars)).await?;
    let rewrite: AtsRewrite = complete_json(oracle, &render(ATS_REWRITE_PROMPT, &vars)).await?;

    let ats_friendly_resume = rewrite.ats_friendly_resume.trim().to_string();
    if ats_friendly_resume.is_empty() {
        return Err(AppError::MalformedOracleResponse(
            "ATSFriendlyResume was empty".to_string(),
        ));
    }

    Ok(AtsReport {
        ats_score: scoring.ats_score,
        comparison: scoring.comparison,
        explanation: scoring.explanation,
        ats_friendly_resume,
    })
}

/// Returns the cached report for this résumé, or generates and caches a new one.
pub async fn score_resume(
    db: &PgPool,
    oracle: &dyn PromptOracle,
    user_id: Uuid,
    resume_text: &str,
    field_match: &str,
) -> Result<(AtsReport, bool), AppError> {
    let resume_text = normalize_resume_text(resume_text);
    let field_match = field_match.trim();
    if resume_text.is_empty() {
        return Err(AppError::Validation("resume_text cannot be empty".to_string()));
    }
    if field_match.is_empty() {
        return Err(AppError::Validation("field_match cannot be empty".to_string()));
    }

    let cached: Option<AtsReportRow> = sqlx::query_as(
        "SELECT * FROM ats_reports WHERE user_id = $1 AND resume_text = $2 LIMIT 1",
    )
    .bind(user_id)
    .bind(&resume_text)
    .fetch_optional(db)
    .await?;

    if let Some(row) = cached {
        info!("Serving cached ATS report for user {user_id}");
        let report = AtsReport::try_from(row)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("corrupt cached ATS report: {e}")))?;
        return Ok((report, true));
    }

    let report = generate_report(oracle, &resume_text, field_match).await?;

    sqlx::query(
        r#"
        INSERT INTO ats_reports
            (id, user_id, resume_text, field_match, ats_score, comparison, explanation,
             ats_friendly_resume)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        ON CONFLICT (user_id, md5(resume_text)) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(&resume_text)
    .bind(field_match)
    .bind(i16::from(report.ats_score))
    .bind(sqlx::types::Json(&report.comparison))
    .bind(sqlx::types::Json(&report.explanation))
    .bind(&report.ats_friendly_resume)
    .execute(db)
    .await?;

    info!(
        "Generated ATS report for user {user_id}: score {}/100",
        report.ats_score
    );
    Ok((report, false))
}
