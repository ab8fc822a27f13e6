//! Persistence layer for the approval workflow.
//!
//! Repositories are unit structs with static async methods over a
//! [`DbPool`]; models mirror table rows (`FromRow`) with separate
//! `Create*` DTOs for inserts. State transitions that must survive
//! concurrent writers are expressed as conditional `UPDATE`s so the loser
//! of a race observes zero affected rows.

pub mod models;
pub mod repositories;

use sqlx::postgres::PgPoolOptions;

pub type DbPool = sqlx::PgPool;

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(20)
        .connect(database_url)
        .await
}

/// Verify the database answers before the worker starts its loops.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Apply pending migrations from the workspace `migrations/` directory.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("../../migrations").run(pool).await
}
