//! PostgreSQL persistence for the sweet shop.
//!
//! - [`models`] -- row structs and DTOs.
//! - [`repositories`] -- zero-sized repository structs, one per table concern.
//! - [`reservation`] -- the transactional stock-reservation protocol that
//!   coordinates the inventory ledger and the cart store.
//! - [`bootstrap`] -- idempotent default-catalog seeding.

use sqlx::postgres::PgPoolOptions;

pub mod bootstrap;
pub mod models;
pub mod repositories;
pub mod reservation;

pub type DbPool = sqlx::PgPool;

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
}

/// Round-trip a trivial query to confirm the database is reachable.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Apply all pending migrations from `db/migrations`.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("../../db/migrations").run(pool).await
}
