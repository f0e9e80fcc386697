//! Database connection pool setup

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;

use crate::config::DatabaseConfig;
use crate::error::AppResult;

/// Create the PostgreSQL connection pool from configuration.
pub async fn connect(config: &DatabaseConfig) -> AppResult<PgPool> {
    tracing::info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(30))
        .connect(&config.url)
        .await?;
    tracing::info!("Database connection established");
    Ok(pool)
}

/// Run the embedded migrations. Intended for development environments.
pub async fn migrate(pool: &PgPool) -> AppResult<()> {
    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| anyhow::anyhow!(e))?;
    tracing::info!("Migrations completed");
    Ok(())
}
