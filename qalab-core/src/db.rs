use crate::config::DatabaseConfig;
use sqlx::{postgres::PgPoolOptions, PgPool};

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS interaction_records (
        id                 BIGSERIAL PRIMARY KEY,
        scenario_id        TEXT        NOT NULL,
        session_id         TEXT        NOT NULL,
        action_performed   TEXT        NOT NULL,
        element_interacted TEXT        NOT NULL,
        value_filled       TEXT,
        recorded_at        TIMESTAMPTZ NOT NULL DEFAULT clock_timestamp(),
        metadata           JSONB       NOT NULL DEFAULT '{}'::jsonb
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS interaction_records_key_idx
        ON interaction_records (scenario_id, session_id, id)
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS interaction_records_session_idx
        ON interaction_records (session_id)
    "#,
];

pub async fn create_pool(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.url)
        .await
}

pub async fn health_check(pool: &PgPool) -> Result<String, sqlx::Error> {
    let row: (String,) = sqlx::query_as("SELECT version()").fetch_one(pool).await?;
    Ok(row.0)
}

/// Create the interaction table and its indexes if they are missing.
pub async fn ensure_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}
