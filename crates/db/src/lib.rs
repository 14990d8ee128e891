//! Persistence layer: Postgres pool management, migrations, row models,
//! and repositories.
//!
//! Repositories are stateless structs with associated async functions
//! taking `&PgPool` (or a transaction for multi-statement flows). All
//! lifecycle guards come from `labelkit_core`; this crate enforces them
//! inside transactions so that a guard's verdict and the write it
//! permits are atomic.

pub mod error;
pub mod models;
pub mod repositories;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

pub use error::{DbError, DbResult};

/// Shared connection pool type used across crates.
pub type DbPool = PgPool;

/// Connect to Postgres with sensible pool defaults.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
}

/// Cheap liveness probe used by the health endpoint and at startup.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Apply any pending migrations from `db/migrations`.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("../../db/migrations").run(pool).await
}
