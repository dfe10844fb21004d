// SQLite LogRepository Implementation

use crate::error::map_sqlx_error;
use crate::resource::SqliteResource;
use async_trait::async_trait;
use tracing::info;
use txprop_core::domain::Log;
use txprop_core::error::{AppError, Result};
use txprop_core::port::LogRepository;

#[derive(Debug, Default, Clone, Copy)]
pub struct SqliteLogRepository;

impl SqliteLogRepository {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl LogRepository<SqliteResource> for SqliteLogRepository {
    async fn save(&self, resource: &mut SqliteResource, log: &Log) -> Result<Log> {
        // Refused before writing, so the refusal never takes the write lock
        if log.is_failure_trigger() {
            info!(message = %log.message, "Log save refused");
            return Err(AppError::Operation(format!(
                "log save refused: {}",
                log.message
            )));
        }

        let result = sqlx::query("INSERT INTO log (message) VALUES (?)")
            .bind(&log.message)
            .execute(resource.writer()?)
            .await
            .map_err(map_sqlx_error)?;

        Ok(Log {
            id: Some(result.last_insert_rowid()),
            message: log.message.clone(),
        })
    }

    async fn find(&self, resource: &mut SqliteResource, message: &str) -> Result<Option<Log>> {
        let row = sqlx::query_as::<_, LogRow>(
            "SELECT id, message FROM log WHERE message = ? ORDER BY id LIMIT 1",
        )
        .bind(message)
        .fetch_optional(resource.connection())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(|r| Log {
            id: Some(r.id),
            message: r.message,
        }))
    }
}

#[derive(Debug, sqlx::FromRow)]
struct LogRow {
    id: i64,
    message: String,
}
