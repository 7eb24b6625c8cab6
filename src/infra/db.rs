use anyhow::Context;
use sqlx::postgres::PgPoolOptions;

pub type Db = sqlx::PgPool;

pub async fn connect() -> anyhow::Result<Db> {
    let url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL missing; set it to a Postgres connection string")?;
    let max_connections = std::env::var("DATABASE_MAX_CONNECTIONS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(5);
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(&url)
        .await
        .with_context(|| "failed to connect to database; check DATABASE_URL")?;
    Ok(pool)
}
