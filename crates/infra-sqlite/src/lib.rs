// Txprop Infrastructure - SQLite Adapter
// Implements: ResourceProvider/ResourceHandle, MemberRepository, LogRepository

mod connection;
mod error;
mod log_repository;
mod member_repository;
mod migration;
mod resource;

pub use connection::{create_pool, DEFAULT_MAX_CONNECTIONS};
pub use log_repository::SqliteLogRepository;
pub use member_repository::SqliteMemberRepository;
pub use migration::run_migrations;
pub use resource::{SqliteResource, SqliteResourceProvider};
