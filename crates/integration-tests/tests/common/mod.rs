//! Shared fixtures: one throwaway SQLite file per test

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use sqlx::SqlitePool;
use txprop_core::application::{MemberService, ServiceBoundaries, TransactionManager};
use txprop_infra_sqlite::{
    create_pool, run_migrations, SqliteLogRepository, SqliteMemberRepository,
    SqliteResourceProvider,
};

pub type Manager = TransactionManager<SqliteResourceProvider>;
pub type Service = MemberService<SqliteResourceProvider>;

pub struct TestDb {
    path: PathBuf,
    pub pool: SqlitePool,
    pub tx_manager: Arc<Manager>,
}

impl TestDb {
    pub async fn new() -> Self {
        let path = std::env::temp_dir().join(format!("txprop_test_{}.db", uuid::Uuid::new_v4()));
        let pool = create_pool(path.to_str().unwrap(), 4).await.unwrap();
        run_migrations(&pool).await.unwrap();

        let tx_manager = Arc::new(TransactionManager::new(SqliteResourceProvider::new(
            pool.clone(),
        )));

        Self {
            path,
            pool,
            tx_manager,
        }
    }

    pub fn service(&self, boundaries: ServiceBoundaries) -> Service {
        MemberService::new(
            Arc::clone(&self.tx_manager),
            Arc::new(SqliteMemberRepository::new()),
            Arc::new(SqliteLogRepository::new()),
            boundaries,
        )
    }

    /// Committed state, read outside any managed transaction
    pub async fn member_exists(&self, username: &str) -> bool {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM member WHERE username = ?")
            .bind(username)
            .fetch_one(&self.pool)
            .await
            .unwrap();
        count > 0
    }

    pub async fn log_exists(&self, message: &str) -> bool {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM log WHERE message = ?")
            .bind(message)
            .fetch_one(&self.pool)
            .await
            .unwrap();
        count > 0
    }
}

impl Drop for TestDb {
    fn drop(&mut self) {
        for suffix in ["", "-wal", "-shm"] {
            let mut file = self.path.clone().into_os_string();
            file.push(suffix);
            let _ = std::fs::remove_file(file);
        }
    }
}
