//! GitHub project write-ups: README summary, LinkedIn post and résumé bullets generated from a
//! repository's dependency manifests and recent commits. Cached per (user, repository).

pub mod client;
pub mod handlers;
pub mod prompts;

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::llm_client::prompts::{render, JSON_RECORD_INSTRUCTION};
use crate::llm_client::{complete_json, PromptOracle};
use crate::models::analysis::GithubAnalysisRow;

use client::{CommitSummary, RepoRef, RepoSource};
use prompts::REPO_ANALYSIS_PROMPT;

pub use client::GitHubClient;

const COMMIT_LIMIT: usize = 10;
const SUBPROJECT_DIRS: [&str; 2] = ["backend", "frontend"];

/// Parses `https://github.com/<owner>/<repo>[/...]`.
pub fn parse_repo_url(raw: &str) -> Result<RepoRef, AppError> {
    let invalid = || AppError::Validation(format!("not a GitHub repository URL: {raw}"));

    let url = reqwest::Url::parse(raw.trim()).map_err(|_| invalid())?;
    if !matches!(url.scheme(), "https" | "http") {
        return Err(invalid());
    }
    if !matches!(url.host_str(), Some("github.com") | Some("www.github.com")) {
        return Err(invalid());
    }

    let mut segments = url
        .path_segments()
        .ok_or_else(invalid)?
        .filter(|s| !s.is_empty());
    let owner = segments.next().ok_or_else(invalid)?;
    let repo = segments.next().ok_or_else(invalid)?;
    let repo = repo.strip_suffix(".git").unwrap_or(repo);
    if repo.is_empty() {
        return Err(invalid());
    }

    Ok(RepoRef {
        owner: owner.to_string(),
        repo: repo.to_string(),
    })
}

/// What the oracle is shown about a repository.
#[derive(Debug, Clone, PartialEq)]
pub struct RepoSnapshot {
    pub repo: RepoRef,
    /// Manifest path → file content.
    pub project_files: BTreeMap<String, String>,
    pub commits: Vec<CommitSummary>,
}

/// Collects dependency manifests and recent commits.
///
/// `backend/package.json` and `frontend/package.json` take precedence over a root
/// `package.json`; a root `requirements.txt` is always included when present. Individual file
/// or commit fetch failures are logged and skipped; a missing repository is `NotFound`.
pub async fn gather_snapshot(
    source: &dyn RepoSource,
    repo: &RepoRef,
) -> Result<RepoSnapshot, AppError> {
    let root = source
        .list_dir(repo, "")
        .await?
        .ok_or_else(|| AppError::NotFound(format!("repository {} not found", repo.canonical_url())))?;

    let mut manifests: Vec<String> = Vec::new();
    for dir in SUBPROJECT_DIRS {
        if !root.iter().any(|name| name == dir) {
            continue;
        }
        match source.list_dir(repo, dir).await {
            Ok(Some(entries)) if entries.iter().any(|n| n == "package.json") => {
                manifests.push(format!("{dir}/package.json"));
            }
            Ok(_) => {}
            Err(e) => warn!("Skipping {dir}/ of {}: {e}", repo.canonical_url()),
        }
    }
    if manifests.is_empty() && root.iter().any(|n| n == "package.json") {
        manifests.push("package.json".to_string());
    }
    if root.iter().any(|n| n == "requirements.txt") {
        manifests.push("requirements.txt".to_string());
    }

    let mut project_files = BTreeMap::new();
    for path in manifests {
        match source.file_content(repo, &path).await {
            Ok(Some(content)) => {
                project_files.insert(path, content);
            }
            Ok(None) => {}
            Err(e) => warn!("Skipping {path} of {}: {e}", repo.canonical_url()),
        }
    }

    let commits = source
        .recent_commits(repo, COMMIT_LIMIT)
        .await
        .unwrap_or_else(|e| {
            warn!("Could not list commits of {}: {e}", repo.canonical_url());
            Vec::new()
        });

    Ok(RepoSnapshot {
        repo: repo.clone(),
        project_files,
        commits,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepoAnalysis {
    #[serde(rename = "GitHubAnalysis", deserialize_with = "one_or_many")]
    pub readme: Vec<String>,
    #[serde(rename = "LinkedInAnalysis", deserialize_with = "one_or_many")]
    pub linkedin: Vec<String>,
    #[serde(rename = "ResumeAnalysis", deserialize_with = "one_or_many")]
    pub resume: Vec<String>,
}

impl From<GithubAnalysisRow> for RepoAnalysis {
    fn from(row: GithubAnalysisRow) -> Self {
        Self {
            readme: vec![row.readme_summary],
            linkedin: vec![row.linkedin_summary],
            resume: vec![row.resume_summary],
        }
    }
}

/// Oracles sometimes return a bare string where a list was asked for.
fn one_or_many<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(s) => vec![s],
        OneOrMany::Many(v) => v,
    })
}

fn first_nonempty(items: &[String]) -> Option<&str> {
    items.first().map(|s| s.trim()).filter(|s| !s.is_empty())
}

pub async fn analyze_snapshot(
    oracle: &dyn PromptOracle,
    snapshot: &RepoSnapshot,
) -> Result<RepoAnalysis, AppError> {
    let project_files = if snapshot.project_files.is_empty() {
        "(no dependency manifests found)".to_string()
    } else {
        snapshot
            .project_files
            .iter()
            .map(|(path, content)| format!("--- {path} ---\n{content}"))
            .collect::<Vec<_>>()
            .join("\n\n")
    };
    let commits = serde_json::to_string_pretty(&snapshot.commits)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("serialize commits: {e}")))?;

    let prompt = render(
        REPO_ANALYSIS_PROMPT,
        &[
            ("project_name", &snapshot.repo.repo),
            ("owner", &snapshot.repo.owner),
            ("project_files", &project_files),
            ("commits", &commits),
            ("json_instruction", JSON_RECORD_INSTRUCTION),
        ],
    );

    let analysis: RepoAnalysis = complete_json(oracle, &prompt).await?;
    if [&analysis.readme, &analysis.linkedin, &analysis.resume]
        .iter()
        .any(|items| first_nonempty(items).is_none())
    {
        return Err(AppError::MalformedOracleResponse(
            "repository analysis is missing a section".to_string(),
        ));
    }
    Ok(analysis)
}

/// Returns the cached write-up for this repository, or generates and caches a new one.
pub async fn analyze_repository(
    db: &PgPool,
    oracle: &dyn PromptOracle,
    source: &dyn RepoSource,
    user_id: Uuid,
    url: &str,
) -> Result<(RepoAnalysis, bool), AppError> {
    let repo = parse_repo_url(url)?;
    let repo_url = repo.canonical_url();

    let cached: Option<GithubAnalysisRow> = sqlx::query_as(
        "SELECT * FROM github_analyses WHERE user_id = $1 AND repo_url = $2 LIMIT 1",
    )
    .bind(user_id)
    .bind(&repo_url)
    .fetch_optional(db)
    .await?;

    if let Some(row) = cached {
        info!("Serving cached analysis of {repo_url} for user {user_id}");
        return Ok((row.into(), true));
    }

    let snapshot = gather_snapshot(source, &repo).await?;
    info!(
        "Fetched {} manifests and {} commits from {repo_url}",
        snapshot.project_files.len(),
        snapshot.commits.len()
    );
    let analysis = analyze_snapshot(oracle, &snapshot).await?;

    sqlx::query(
        r#"
        INSERT INTO github_analyses
            (id, user_id, repo_url, readme_summary, linkedin_summary, resume_summary)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (user_id, repo_url) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(&repo_url)
    .bind(first_nonempty(&analysis.readme))
    .bind(first_nonempty(&analysis.linkedin))
    .bind(first_nonempty(&analysis.resume))
    .execute(db)
    .await?;

    Ok((analysis, false))
}
