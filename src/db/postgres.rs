use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;

/// Creates the PostgreSQL connection pool backing the book store
///
/// Bounded acquire so a saturated database surfaces as a timely error
/// instead of a hung request.
pub async fn create_pool(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await?;

    Ok(pool)
}
