// Per-call-stack transaction carrier

use crate::domain::{BoundResource, ContextId, ResourceId};
use crate::error::{AppError, Result};

#[derive(Debug, Clone, Copy)]
pub(crate) struct OpenContext {
    pub(crate) id: ContextId,
    pub(crate) resource: Option<ResourceId>,
}

/// Explicit replacement for thread-local "current transaction" state.
///
/// One `TxScope` per logical call stack (task). It holds the physical
/// resource currently bound to the stack and the ids of the contexts that
/// are still open, innermost last. Scopes are never shared, so concurrent
/// stacks never see each other's transactions.
#[derive(Debug)]
pub struct TxScope<H> {
    pub(crate) bound: Option<BoundResource<H>>,
    pub(crate) open: Vec<OpenContext>,
    pub(crate) poisoned: bool,
}

impl<H> TxScope<H> {
    pub fn new() -> Self {
        Self {
            bound: None,
            open: Vec::new(),
            poisoned: false,
        }
    }

    /// True while a physical transaction is bound to this stack
    pub fn is_transaction_active(&self) -> bool {
        self.bound.is_some()
    }

    /// Number of contexts begun and not yet completed
    pub fn depth(&self) -> usize {
        self.open.len()
    }

    pub fn bound_resource_id(&self) -> Option<ResourceId> {
        self.bound.as_ref().map(|b| b.id)
    }

    /// Set once an invariant violation has been detected; every later
    /// `begin` on this scope is refused.
    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    /// The physical handle resource operations run against
    pub fn resource_mut(&mut self) -> Result<&mut H> {
        self.bound
            .as_mut()
            .map(|b| b.handle_mut())
            .ok_or(AppError::NoActiveTransaction)
    }

    /// Bound resource must be the one the innermost open context uses
    pub(crate) fn check_consistent(&self) -> Result<()> {
        if self.poisoned {
            return Err(AppError::InvariantViolation(
                "scope was poisoned by an earlier invariant violation".to_string(),
            ));
        }

        let expected = self.open.last().and_then(|c| c.resource);
        if expected != self.bound_resource_id() {
            return Err(AppError::InvariantViolation(format!(
                "bound resource {:?} does not match innermost context resource {:?}",
                self.bound_resource_id(),
                expected
            )));
        }

        Ok(())
    }
}

impl<H> Default for TxScope<H> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_scope() {
        let mut scope: TxScope<()> = TxScope::new();
        assert!(!scope.is_transaction_active());
        assert_eq!(scope.depth(), 0);
        assert!(scope.check_consistent().is_ok());
        assert!(matches!(
            scope.resource_mut(),
            Err(AppError::NoActiveTransaction)
        ));
    }

    #[test]
    fn test_mismatch_is_inconsistent() {
        let mut scope: TxScope<()> = TxScope::new();
        scope.bound = Some(BoundResource::new(ResourceId(1), ()));

        let err = scope.check_consistent().unwrap_err();
        assert!(err.is_invariant_violation());
    }

    #[test]
    fn test_poisoned_scope_is_inconsistent() {
        let mut scope: TxScope<()> = TxScope::new();
        scope.poisoned = true;
        assert!(scope.check_consistent().unwrap_err().is_invariant_violation());
    }
}
