// SQLite physical transaction resource

use crate::error::map_sqlx_error;
use async_trait::async_trait;
use sqlx::{Sqlite, SqliteConnection, SqlitePool, Transaction as SqlxTransaction};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};
use txprop_core::error::{AppError, Result};
use txprop_core::port::{ResourceHandle, ResourceProvider};

/// A pooled connection with an open `BEGIN`.
///
/// Dropped without completion, sqlx rolls it back when the connection
/// returns to the pool.
///
/// SQLite has a single writer. Once a transaction has written it holds the
/// write lock until it completes, so a transaction nested on it through
/// `RequiresNew` could only wait out the busy timeout. `writer()` refuses
/// that write up front instead.
pub struct SqliteResource {
    tx: SqlxTransaction<'static, Sqlite>,
    wrote: Arc<AtomicBool>,
    parked_writers: Vec<Arc<AtomicBool>>,
}

impl SqliteResource {
    fn new(tx: SqlxTransaction<'static, Sqlite>) -> Self {
        Self {
            tx,
            wrote: Arc::new(AtomicBool::new(false)),
            parked_writers: Vec::new(),
        }
    }

    /// Connection for reads
    pub fn connection(&mut self) -> &mut SqliteConnection {
        &mut self.tx
    }

    /// Connection for a write, refused with `WriteConflict` while a suspended
    /// transaction beneath this one holds the write lock
    pub fn writer(&mut self) -> Result<&mut SqliteConnection> {
        if self.parked_writers.iter().any(|w| w.load(Ordering::Acquire)) {
            warn!("Write refused: suspended transaction holds the SQLite write lock");
            return Err(AppError::WriteConflict(
                "a suspended outer transaction holds the SQLite write lock; \
                 an independent transaction cannot write until it completes"
                    .to_string(),
            ));
        }
        self.wrote.store(true, Ordering::Release);
        Ok(&mut self.tx)
    }

    pub fn has_written(&self) -> bool {
        self.wrote.load(Ordering::Acquire)
    }
}

#[async_trait]
impl ResourceHandle for SqliteResource {
    async fn commit(self) -> Result<()> {
        self.tx.commit().await.map_err(map_sqlx_error)
    }

    async fn rollback(self) -> Result<()> {
        self.tx.rollback().await.map_err(map_sqlx_error)
    }

    fn nest_independent(&self, independent: &mut Self) {
        independent
            .parked_writers
            .extend(self.parked_writers.iter().cloned());
        independent.parked_writers.push(Arc::clone(&self.wrote));
    }
}

/// Hands out one pooled connection per physical transaction
#[derive(Clone)]
pub struct SqliteResourceProvider {
    pool: SqlitePool,
}

impl SqliteResourceProvider {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl ResourceProvider for SqliteResourceProvider {
    type Handle = SqliteResource;

    async fn begin(&self) -> Result<SqliteResource> {
        let tx = self.pool.begin().await.map_err(map_sqlx_error)?;
        debug!(
            pool_size = self.pool.size(),
            idle = self.pool.num_idle(),
            "Acquired connection for new transaction"
        );
        Ok(SqliteResource::new(tx))
    }
}
