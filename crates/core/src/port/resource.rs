// Physical Resource Port

use crate::error::Result;
use async_trait::async_trait;

/// One physical connection with an open transaction on it.
///
/// Completing the handle consumes it; dropping it without completing must
/// roll the physical transaction back.
#[async_trait]
pub trait ResourceHandle: Send + Sized + 'static {
    /// Physically commit
    async fn commit(self) -> Result<()>;

    /// Physically roll back
    async fn rollback(self) -> Result<()>;

    /// Called when `independent` begins while `self` is suspended beneath it
    /// on the same call stack. Stores with a single writer use it to refuse
    /// writes that would wait on the suspended transaction's lock.
    fn nest_independent(&self, _independent: &mut Self) {}
}

/// Source of fresh physical transactions.
///
/// Every call to `begin` must return a handle on its own connection, so a
/// suspended handle and a new one never share a physical transaction.
#[async_trait]
pub trait ResourceProvider: Send + Sync + 'static {
    type Handle: ResourceHandle;

    /// Acquire a connection and begin a physical transaction on it
    async fn begin(&self) -> Result<Self::Handle>;
}
