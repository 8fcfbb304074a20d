// Interview LLM prompt templates.
// All prompts for the interview module are defined here.

/// Sentinel the model replies with when no further question is warranted.
pub const TERMINATION_SENTINEL: &str = "INTERVIEW_COMPLETE";

pub const FIRST_QUESTION_PROMPT: &str = r#"You are conducting a mock job interview.

CANDIDATE PROFILE:
- Field: {field_name}
- Years of experience: {experience_level}

RESUME:
{resume_text}

JOB DESCRIPTION (may be empty):
{job_description}

Ask the opening question of the interview. Base it on the candidate's resume and, when present,
the job description. Pitch the difficulty at the stated experience level.

OUTPUT SCHEMA (return exactly this structure):
{
  "question": "string",
  "expectedDuration": number,   // seconds the candidate should spend answering
  "category": "string"          // e.g. "Technical", "Behavioral", "Situational"
}

{json_instruction}"#;

pub const NEXT_QUESTION_PROMPT: &str = r#"You are conducting a mock job interview for a {field_name} candidate
with {experience_level} years of experience.

So far {turn_count} question(s) have been asked; the interview holds at most {max_questions}.

LAST QUESTION:
{last_question}

CANDIDATE ANSWER:
{answer}

Decide what happens next:
- If the interview should continue, ask one follow-up or new question that builds on the answer.
  Return it using the schema below.
- If the interview has covered enough ground, reply with exactly {sentinel} and nothing else.

OUTPUT SCHEMA (when continuing):
{
  "question": "string",
  "expectedDuration": number,
  "category": "string"
}

{json_instruction}"#;

pub const PERFORMANCE_PROMPT: &str = r#"You are evaluating a completed mock job interview.

QUESTIONS (in order):
{questions_json}

ANSWERS (in the same order):
{answers_json}

Score the candidate from 0 to 100 overall and on each of communication, technical depth,
confidence and clarity. List concrete strengths and improvements, and give feedback on every
question/answer pair.

OUTPUT SCHEMA (return exactly this structure):
{
  "overallScore": number,
  "categoryScores": {
    "communication": number,
    "technical": number,
    "confidence": number,
    "clarity": number
  },
  "strengths": ["string"],
  "improvements": ["string"],
  "perQuestionFeedback": [
    {"question": "string", "response": "string", "score": number, "feedback": "string"}
  ]
}

{json_instruction}"#;
