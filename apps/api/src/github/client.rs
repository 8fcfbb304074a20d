use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::AppError;

const GITHUB_API_URL: &str = "https://api.github.com";
const USER_AGENT: &str = concat!("careerlift-api/", env!("CARGO_PKG_VERSION"));

/// `owner/repo` on github.com.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    pub owner: String,
    pub repo: String,
}

impl RepoRef {
    pub fn canonical_url(&self) -> String {
        format!("https://github.com/{}/{}", self.owner, self.repo)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommitSummary {
    pub message: String,
    pub author: Option<String>,
    pub date: Option<String>,
}

/// Read-only view of a hosted repository.
#[async_trait]
pub trait RepoSource: Send + Sync {
    /// Entry names of a directory. `Ok(None)` when the path does not exist.
    async fn list_dir(&self, repo: &RepoRef, path: &str) -> Result<Option<Vec<String>>, AppError>;

    /// UTF-8 file content. `Ok(None)` when the path does not exist or is not a file.
    async fn file_content(&self, repo: &RepoRef, path: &str) -> Result<Option<String>, AppError>;

    /// Most recent commits on the default branch, newest first.
    async fn recent_commits(
        &self,
        repo: &RepoRef,
        limit: usize,
    ) -> Result<Vec<CommitSummary>, AppError>;
}

// ── GitHub REST API wire types ───────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ContentsResponse {
    Dir(Vec<DirEntry>),
    File(FileEntry),
}

#[derive(Debug, Deserialize)]
struct DirEntry {
    name: String,
}

#[derive(Debug, Deserialize)]
struct FileEntry {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    encoding: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CommitItem {
    commit: CommitDetail,
}

#[derive(Debug, Deserialize)]
struct CommitDetail {
    message: String,
    author: Option<CommitAuthor>,
}

#[derive(Debug, Deserialize)]
struct CommitAuthor {
    name: Option<String>,
    date: Option<String>,
}

/// GitHub REST client. One page per request; rate limiting is left to GitHub.
#[derive(Clone)]
pub struct GitHubClient {
    client: Client,
    token: Option<String>,
}

impl GitHubClient {
    pub fn new(token: Option<String>) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: Client::builder()
                .user_agent(USER_AGENT)
                .timeout(std::time::Duration::from_secs(30))
                .build()?,
            token,
        })
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>, AppError> {
        let url = format!("{GITHUB_API_URL}{path}");
        let mut request = self
            .client
            .get(&url)
            .header("accept", "application/vnd.github+json");
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("GitHub request failed: {e}")))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            debug!("GitHub 404 for {path}");
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Upstream(format!(
                "GitHub returned {status} for {path}: {body}"
            )));
        }

        response
            .json::<T>()
            .await
            .map(Some)
            .map_err(|e| AppError::Upstream(format!("unexpected GitHub response for {path}: {e}")))
    }
}

#[async_trait]
impl RepoSource for GitHubClient {
    async fn list_dir(&self, repo: &RepoRef, path: &str) -> Result<Option<Vec<String>>, AppError> {
        let contents: Option<ContentsResponse> = self
            .get(&format!("/repos/{}/{}/contents/{path}", repo.owner, repo.repo))
            .await?;
        Ok(match contents {
            Some(ContentsResponse::Dir(entries)) => {
                Some(entries.into_iter().map(|e| e.name).collect())
            }
            _ => None,
        })
    }

    async fn file_content(&self, repo: &RepoRef, path: &str) -> Result<Option<String>, AppError> {
        let contents: Option<ContentsResponse> = self
            .get(&format!("/repos/{}/{}/contents/{path}", repo.owner, repo.repo))
            .await?;
        match contents {
            Some(ContentsResponse::File(file)) => decode_content(&file).map(Some),
            _ => Ok(None),
        }
    }

    async fn recent_commits(
        &self,
        repo: &RepoRef,
        limit: usize,
    ) -> Result<Vec<CommitSummary>, AppError> {
        let items: Option<Vec<CommitItem>> = self
            .get(&format!(
                "/repos/{}/{}/commits?per_page={limit}",
                repo.owner, repo.repo
            ))
            .await?;
        Ok(items
            .unwrap_or_default()
            .into_iter()
            .map(|item| {
                let (author, date) = match item.commit.author {
                    Some(a) => (a.name, a.date),
                    None => (None, None),
                };
                CommitSummary {
                    message: item.commit.message,
                    author,
                    date,
                }
            })
            .collect())
    }
}

/// GitHub wraps base64 content at 60 columns.
fn decode_content(file: &FileEntry) -> Result<String, AppError> {
    let Some(content) = &file.content else {
        return Ok(String::new());
    };
    if file.encoding.as_deref().unwrap_or("base64") != "base64" {
        return Ok(content.clone());
    }

    let compact: String = content.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = BASE64_STANDARD
        .decode(compact)
        .map_err(|e| AppError::Upstream(format!("invalid base64 file content: {e}")))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
