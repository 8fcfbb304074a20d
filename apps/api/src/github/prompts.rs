// GitHub analysis LLM prompt templates.

pub const REPO_ANALYSIS_PROMPT: &str = r#"You are an expert technical writer and project analyst.

PROJECT: {project_name}
OWNER: {owner}

DEPENDENCY MANIFESTS (path → content):
{project_files}

RECENT COMMITS (newest first):
{commits}

Tasks:
1. From the manifests, identify the main languages, frameworks, libraries and tools.
2. From the commit history, infer the key features, the development process and how the
   project evolved.
3. Using this analysis, write:
   - a README summary of the project (a real summary of this project, not a template)
   - a LinkedIn post highlighting the project's purpose, tech stack and achievements
   - resume-ready bullet points describing the project's impact, the technologies used and the
     owner's role, as a single overview

Base everything only on the data above. Never invent metrics or features.

OUTPUT SCHEMA (return exactly this structure):
{
  "GitHubAnalysis": ["string"],     // the README summary
  "LinkedInAnalysis": ["string"],   // the LinkedIn post
  "ResumeAnalysis": ["string"]      // the resume bullet points
}

{json_instruction}"#;
