// Port Layer - Interfaces for external dependencies

pub mod log_repository;
pub mod member_repository;
pub mod resource;

// Re-exports
pub use log_repository::LogRepository;
pub use member_repository::MemberRepository;
pub use resource::{ResourceHandle, ResourceProvider};
