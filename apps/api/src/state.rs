use std::sync::Arc;

use sqlx::PgPool;

use crate::config::Config;
use crate::github::GitHubClient;
use crate::interview::InterviewOrchestrator;
use crate::llm_client::PromptOracle;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    /// Prompt oracle shared by every LLM-backed feature. Production: `LlmClient`.
    pub oracle: Arc<dyn PromptOracle>,
    pub interviews: InterviewOrchestrator,
    pub github: GitHubClient,
    pub config: Config,
}
