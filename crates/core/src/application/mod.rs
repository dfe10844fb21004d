// Application Layer - Propagation engine and use cases

pub mod boundary;
pub mod manager;
pub mod member_service;
pub mod scope;

// Re-exports
pub use boundary::Boundary;
pub use manager::TransactionManager;
pub use member_service::{MemberService, ServiceBoundaries};
pub use scope::TxScope;
