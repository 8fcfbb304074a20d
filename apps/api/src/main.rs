mod ats;
mod config;
mod db;
mod errors;
mod github;
mod interview;
mod llm_client;
mod models;
mod resume;
mod routes;
mod state;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::create_pool;
use crate::github::GitHubClient;
use crate::interview::store::PgSessionStore;
use crate::interview::InterviewOrchestrator;
use crate::llm_client::LlmClient;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails fast on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting CareerLift API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let db = create_pool(&config.database_url).await?;

    // Initialize LLM client
    let llm = LlmClient::new(config.anthropic_api_key.clone())
        .context("Failed to build LLM HTTP client")?;
    info!("LLM client initialized (model: {})", llm_client::MODEL);
    let oracle: Arc<dyn llm_client::PromptOracle> = Arc::new(llm);

    let github = GitHubClient::new(config.github_token.clone())
        .context("Failed to build GitHub HTTP client")?;
    if config.github_token.is_none() {
        info!("GITHUB_TOKEN not set; GitHub API calls are unauthenticated");
    }

    let interviews = InterviewOrchestrator::new(
        oracle.clone(),
        Arc::new(PgSessionStore::new(db.clone())),
        config.interview_max_questions,
    );
    info!(
        "Interview orchestrator ready (max {} questions)",
        interviews.max_questions()
    );

    // Build app state
    let state = AppState {
        db,
        oracle,
        interviews,
        github,
        config: config.clone(),
    };

    // Build router
    let app = build_router(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive()), // TODO: restrict origins once the web client has a fixed domain
    );

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
