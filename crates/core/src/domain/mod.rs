// Domain Layer - Transaction model and business records

pub mod member;
pub mod resource;
pub mod transaction;

// Re-exports
pub use member::{Log, Member, RecordId, LOG_FAILURE_MARKER};
pub use resource::BoundResource;
pub use transaction::{ContextId, Propagation, ResourceId, TransactionContext, TxStatus};
