// Transaction Context Domain Model

use super::resource::BoundResource;
use serde::{Deserialize, Serialize};

/// Identifier of one logical transaction attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContextId(pub u64);

/// Identifier of one physical resource (connection + open transaction)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceId(pub u64);

impl std::fmt::Display for ContextId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ctx-{}", self.0)
    }
}

impl std::fmt::Display for ResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "res-{}", self.0)
    }
}

/// Propagation mode requested at a transactional boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Propagation {
    /// Join the active transaction, or start one if none exists
    Required,
    /// Always suspend the active transaction and start an independent one
    RequiresNew,
    /// Join the active transaction; fail if none exists
    Mandatory,
    /// Run without a transaction; fail if one is active
    Never,
}

impl std::fmt::Display for Propagation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Propagation::Required => write!(f, "REQUIRED"),
            Propagation::RequiresNew => write!(f, "REQUIRES_NEW"),
            Propagation::Mandatory => write!(f, "MANDATORY"),
            Propagation::Never => write!(f, "NEVER"),
        }
    }
}

/// Lifecycle of a context: `Active -> {Committed, RolledBack}`.
///
/// Rollback-only is a flag on an `Active` context, not a separate state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TxStatus {
    Active,
    Committed,
    RolledBack,
}

impl TxStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TxStatus::Active)
    }
}

impl std::fmt::Display for TxStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TxStatus::Active => write!(f, "ACTIVE"),
            TxStatus::Committed => write!(f, "COMMITTED"),
            TxStatus::RolledBack => write!(f, "ROLLED_BACK"),
        }
    }
}

/// One logical transaction attempt, created by `TransactionManager::begin`.
///
/// A context is owned by the call frame that began it and must be completed
/// (committed or rolled back) by that same frame. A `RequiresNew` context
/// carries the resource it displaced until it completes.
#[derive(Debug)]
pub struct TransactionContext<H> {
    pub(crate) id: ContextId,
    pub(crate) propagation: Propagation,
    pub(crate) resource: Option<ResourceId>,
    pub(crate) new_transaction: bool,
    pub(crate) rollback_only: bool,
    pub(crate) suspended: Option<BoundResource<H>>,
    pub(crate) status: TxStatus,
}

impl<H> TransactionContext<H> {
    pub(crate) fn new(
        id: ContextId,
        propagation: Propagation,
        resource: Option<ResourceId>,
        new_transaction: bool,
        suspended: Option<BoundResource<H>>,
    ) -> Self {
        Self {
            id,
            propagation,
            resource,
            new_transaction,
            rollback_only: false,
            suspended,
            status: TxStatus::Active,
        }
    }

    pub fn id(&self) -> ContextId {
        self.id
    }

    pub fn propagation(&self) -> Propagation {
        self.propagation
    }

    /// Physical resource this context runs on (`None` for `Never`)
    pub fn resource_id(&self) -> Option<ResourceId> {
        self.resource
    }

    /// True if this context began its own physical transaction
    pub fn is_new_transaction(&self) -> bool {
        self.new_transaction
    }

    /// Local rollback-only flag. See `TransactionManager::is_rollback_only`
    /// for the flag shared with the owning context.
    pub fn is_local_rollback_only(&self) -> bool {
        self.rollback_only
    }

    pub fn status(&self) -> TxStatus {
        self.status
    }

    pub fn is_completed(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn has_suspended_resource(&self) -> bool {
        self.suspended.is_some()
    }

    // Sticky: there is no way back to false.
    pub(crate) fn mark_rollback_only(&mut self) {
        self.rollback_only = true;
    }
}
