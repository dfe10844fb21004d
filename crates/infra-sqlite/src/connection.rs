// SQLite Connection Pool Setup

use crate::error::map_sqlx_error;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;
use txprop_core::error::{AppError, Result};

pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Create SQLite connection pool with WAL mode.
///
/// `RequiresNew` holds two connections at once (suspended + new), so
/// `max_connections` must be at least the deepest expected nesting of
/// independent transactions plus one.
pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<SqlitePool> {
    if max_connections == 0 {
        return Err(AppError::Config(
            "max_connections must be at least 1".to_string(),
        ));
    }

    let options = SqliteConnectOptions::from_str(database_url)
        .map_err(map_sqlx_error)?
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5))
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(10))
        .connect_with(options)
        .await
        .map_err(map_sqlx_error)?;

    tracing::debug!(database_url = %database_url, max_connections, "SQLite pool created");
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_pool() {
        let pool = create_pool("sqlite::memory:", 1).await.unwrap();
        assert!(pool.acquire().await.is_ok());
    }

    #[tokio::test]
    async fn test_zero_connections_rejected() {
        let err = create_pool("sqlite::memory:", 0).await.unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }
}
