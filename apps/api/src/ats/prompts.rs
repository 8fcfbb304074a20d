// ATS LLM prompt templates.
// Both prompts are rendered with llm_client::prompts::render.

pub const ATS_SCORE_PROMPT: &str = r#"You are an Applicant Tracking System (ATS) expert and senior technical recruiter.

TARGET FIELD:
{field_match}

RESUME:
{resume_text}

Evaluate how well this resume will be parsed and ranked by a typical ATS for the target field.
Consider keyword coverage for the field, section structure, formatting that parsers choke on
(tables, columns, images, headers/footers), quantified achievements and overall clarity.

OUTPUT SCHEMA (return exactly this structure):
{
  "ATSScore": number,               // 0-100
  "Comparison": {
    "strengths": ["string"],
    "weaknesses": ["string"],
    "recommendations": ["string"]
  },
  "Explanation": {
    "overview": "string",
    "keyIssues": ["string"],
    "improvements": ["string"]
  }
}

{json_instruction}"#;

pub const ATS_REWRITE_PROMPT: &str = r#"You are an expert resume writer who optimizes resumes for Applicant Tracking Systems.

TARGET FIELD:
{field_match}

ORIGINAL RESUME:
{resume_text}

Rewrite the resume so that it parses cleanly and ranks well for the target field:
- single column, standard section headings (Summary, Skills, Experience, Projects, Education)
- plain text only, no tables or graphics
- keep every fact from the original; never invent employers, dates, titles or metrics
- lead bullets with strong verbs and keep quantified results

OUTPUT SCHEMA (return exactly this structure):
{
  "ATSFriendlyResume": "string"     // the full rewritten resume as plain text, newlines as \n
}

{json_instruction}"#;
