//! Database connection pool and migration management.
//!
//! The pool backs [`PgStore`](crate::store::PgStore), which holds every
//! piece of shared security state: API keys, rate limit windows, seen
//! signatures, registered sites and the tool audit log.

use sqlx::{Pool, Postgres};

/// PostgreSQL connection pool shared by all requests.
pub type DbPool = Pool<Postgres>;

/// Create a new PostgreSQL connection pool.
///
/// Connections are created lazily and reused across requests; each pipeline
/// stage issues at most one statement at a time, so a small pool suffices.
///
/// # Errors
///
/// Returns an error if:
/// - The connection string is invalid
/// - The server is unreachable or rejects the credentials
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    sqlx::postgres::PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
}

/// Run the migrations embedded from `migrations/`.
///
/// Applied migrations are tracked in `_sqlx_migrations`, so each runs once.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
