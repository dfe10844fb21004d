// Log Repository Port (Interface)

use crate::domain::Log;
use crate::error::Result;
use async_trait::async_trait;

#[async_trait]
pub trait LogRepository<H: Send>: Send + Sync {
    /// Insert a log message.
    ///
    /// Implementations must fail with `AppError::Operation` when
    /// `log.is_failure_trigger()`, without writing anything.
    async fn save(&self, resource: &mut H, log: &Log) -> Result<Log>;

    /// Find log by message
    async fn find(&self, resource: &mut H, message: &str) -> Result<Option<Log>>;
}
