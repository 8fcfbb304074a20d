use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

// ────────────────────────────────────────────────────────────────────────────
// Oracle-facing records
// ────────────────────────────────────────────────────────────────────────────

/// One generated interview question. Immutable once generated.
///
/// Wire shape: `{"question": "...", "expectedDuration": 120, "category": "Technical"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    #[serde(rename = "question")]
    pub text: String,
    /// Free-form label chosen by the oracle ("Technical", "Behavioral", ...).
    pub category: String,
    #[serde(
        rename = "expectedDuration",
        deserialize_with = "deserialize_seconds"
    )]
    pub expected_duration_seconds: u32,
}

/// Scores per evaluation axis, each 0-100.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryScores {
    #[serde(deserialize_with = "deserialize_score")]
    pub communication: u8,
    #[serde(deserialize_with = "deserialize_score")]
    pub technical: u8,
    #[serde(deserialize_with = "deserialize_score")]
    pub confidence: u8,
    #[serde(deserialize_with = "deserialize_score")]
    pub clarity: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionFeedback {
    pub question: String,
    pub response: String,
    #[serde(deserialize_with = "deserialize_score")]
    pub score: u8,
    pub feedback: String,
}

/// End-of-interview analysis. Derived once from the answered question/answer pairs and
/// returned to the caller; never written back into the session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceReport {
    #[serde(deserialize_with = "deserialize_score")]
    pub overall_score: u8,
    #[serde(alias = "categories")]
    pub category_scores: CategoryScores,
    pub strengths: Vec<String>,
    pub improvements: Vec<String>,
    #[serde(alias = "detailedFeedback")]
    pub per_question_feedback: Vec<QuestionFeedback>,
}

// ────────────────────────────────────────────────────────────────────────────
// Session state
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    NotStarted,
    InProgress,
    Completed,
}

/// The natural key used to detect and reuse a prior session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionKey {
    pub user_id: Uuid,
    pub field_name: String,
    pub experience_level: String,
    pub resume_text: String,
}

/// The unit of state for one interview attempt.
///
/// Invariant: `answers.len() <= questions.len() <= answers.len() + 1`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InterviewSession {
    pub id: Uuid,
    pub user_id: Uuid,
    pub field_name: String,
    pub experience_level: String,
    #[serde(skip_serializing)]
    pub resume_text: String,
    pub job_description: Option<String>,
    pub questions: Vec<Question>,
    pub answers: Vec<String>,
    /// Optimistic-concurrency token, bumped by every store mutation.
    pub version: i32,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl InterviewSession {
    pub fn status(&self) -> SessionStatus {
        if self.completed_at.is_some() {
            SessionStatus::Completed
        } else if self.questions.is_empty() {
            SessionStatus::NotStarted
        } else {
            SessionStatus::InProgress
        }
    }

    /// The question awaiting an answer, if any.
    pub fn pending_question(&self) -> Option<&Question> {
        if self.answers.len() < self.questions.len() {
            self.questions.get(self.answers.len())
        } else {
            None
        }
    }

    /// Question/answer pairs for the answered prefix.
    pub fn answered_pairs(&self) -> impl Iterator<Item = (&Question, &String)> {
        self.questions.iter().zip(self.answers.iter())
    }

    pub fn key(&self) -> SessionKey {
        SessionKey {
            user_id: self.user_id,
            field_name: self.field_name.clone(),
            experience_level: self.experience_level.clone(),
            resume_text: self.resume_text.clone(),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Lenient numeric decoding for oracle output
// ────────────────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(untagged)]
enum LooseNumber {
    Number(f64),
    Text(String),
}

impl LooseNumber {
    fn as_f64(&self) -> Option<f64> {
        match self {
            LooseNumber::Number(n) => Some(*n),
            LooseNumber::Text(s) => s
                .trim()
                .trim_end_matches('s')
                .trim()
                .parse::<f64>()
                .ok(),
        }
    }
}

/// Accepts `85`, `85.4` or `"85"`; rounds and clamps into 0-100.
pub(crate) fn deserialize_score<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u8, D::Error> {
    let raw = LooseNumber::deserialize(deserializer)?;
    let value = raw
        .as_f64()
        .filter(|v| v.is_finite())
        .ok_or_else(|| serde::de::Error::custom("score is not a number"))?;
    Ok(value.round().clamp(0.0, 100.0) as u8)
}

/// Accepts `120`, `120.0`, `"120"` or `"120s"`.
fn deserialize_seconds<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    let raw = LooseNumber::deserialize(deserializer)?;
    let value = raw
        .as_f64()
        .filter(|v| v.is_finite() && *v >= 0.0)
        .ok_or_else(|| serde::de::Error::custom("expectedDuration is not a duration"))?;
    Ok(value.round().min(u32::MAX as f64) as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn question(text: &str) -> Question {
        Question {
            text: text.to_string(),
            category: "Technical".to_string(),
            expected_duration_seconds: 120,
        }
    }

    fn session(questions: usize, answers: usize) -> InterviewSession {
        let now = Utc::now();
        InterviewSession {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            field_name: "software-engineering".to_string(),
            experience_level: "2-3".to_string(),
            resume_text: "X".to_string(),
            job_description: None,
            questions: (0..questions).map(|i| question(&format!("Q{i}"))).collect(),
            answers: (0..answers).map(|i| format!("A{i}")).collect(),
            version: 1,
            completed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_question_uses_oracle_field_names() {
        let q: Question = serde_json::from_value(json!({
            "question": "Tell me about a cache you built.",
            "expectedDuration": 90,
            "category": "Technical"
        }))
        .unwrap();
        assert_eq!(q.text, "Tell me about a cache you built.");
        assert_eq!(q.expected_duration_seconds, 90);

        let back = serde_json::to_value(&q).unwrap();
        assert_eq!(back["question"], "Tell me about a cache you built.");
        assert_eq!(back["expectedDuration"], 90);
    }

    #[test]
    fn test_question_accepts_stringly_duration() {
        let q: Question = serde_json::from_value(json!({
            "question": "Q",
            "expectedDuration": "120s",
            "category": "Behavioral"
        }))
        .unwrap();
        assert_eq!(q.expected_duration_seconds, 120);
    }

    #[test]
    fn test_question_rejects_missing_category() {
        let result: Result<Question, _> = serde_json::from_value(json!({
            "question": "Q",
            "expectedDuration": 60
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_report_accepts_legacy_field_names_and_clamps() {
        let report: PerformanceReport = serde_json::from_value(json!({
            "overallScore": 104.2,
            "categories": {"communication": 80, "technical": "75", "confidence": 66.6, "clarity": -5},
            "strengths": ["Clear examples"],
            "improvements": ["Use STAR"],
            "detailedFeedback": [
                {"question": "Q0", "response": "A0", "score": 70, "feedback": "ok"}
            ]
        }))
        .unwrap();
        assert_eq!(report.overall_score, 100);
        assert_eq!(report.category_scores.technical, 75);
        assert_eq!(report.category_scores.confidence, 67);
        assert_eq!(report.category_scores.clarity, 0);
        assert_eq!(report.per_question_feedback.len(), 1);

        let back = serde_json::to_value(&report).unwrap();
        assert!(back.get("categoryScores").is_some());
        assert!(back.get("perQuestionFeedback").is_some());
    }

    #[test]
    fn test_status_progression() {
        assert_eq!(session(0, 0).status(), SessionStatus::NotStarted);
        assert_eq!(session(1, 0).status(), SessionStatus::InProgress);

        let mut done = session(3, 3);
        done.completed_at = Some(Utc::now());
        assert_eq!(done.status(), SessionStatus::Completed);
    }

    #[test]
    fn test_pending_question_and_answered_pairs() {
        let s = session(3, 2);
        assert_eq!(s.pending_question().map(|q| q.text.as_str()), Some("Q2"));
        assert_eq!(s.answered_pairs().count(), 2);

        let all_answered = session(3, 3);
        assert!(all_answered.pending_question().is_none());
    }

    #[test]
    fn test_resume_text_is_not_serialized() {
        let value = serde_json::to_value(session(1, 0)).unwrap();
        assert!(value.get("resume_text").is_none());
    }
}
