use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

const MAX_CONNECTIONS: u32 = 10;
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

/// Creates and returns a PostgreSQL connection pool.
/// The schema in `migrations/` must already be applied.
pub async fn create_pool(database_url: &str) -> Result<PgPool> {
    info!("Connecting to PostgreSQL...");

    let pool = PgPoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .connect(database_url)
        .await
        .context("Failed to connect to PostgreSQL")?;

    sqlx::query("SELECT 1 FROM interview_sessions LIMIT 1")
        .execute(&pool)
        .await
        .context("interview_sessions table is missing; apply migrations/0001_init.sql")?;

    info!("PostgreSQL connection pool established");
    Ok(pool)
}
