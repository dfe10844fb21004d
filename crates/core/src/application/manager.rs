// Transaction Manager - propagation and rollback-only state machine

use super::scope::{OpenContext, TxScope};
use crate::domain::{BoundResource, ContextId, Propagation, ResourceId, TransactionContext, TxStatus};
use crate::error::{AppError, Result};
use crate::port::{ResourceHandle, ResourceProvider};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, error, warn};

type Handle<P> = <P as ResourceProvider>::Handle;
type Scope<P> = TxScope<Handle<P>>;
type Context<P> = TransactionContext<Handle<P>>;

/// Resolves propagation modes, owns no per-stack state.
///
/// All state for one call stack lives in the `TxScope` passed to each call,
/// so a single manager can be shared across tasks.
pub struct TransactionManager<P: ResourceProvider> {
    provider: P,
    next_context_id: AtomicU64,
    next_resource_id: AtomicU64,
}

impl<P: ResourceProvider> TransactionManager<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            next_context_id: AtomicU64::new(1),
            next_resource_id: AtomicU64::new(1),
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Fresh carrier for a new call stack
    pub fn scope(&self) -> Scope<P> {
        TxScope::new()
    }

    /// Open a context for `propagation`, joining, starting or suspending as
    /// the mode requires.
    pub async fn begin(&self, scope: &mut Scope<P>, propagation: Propagation) -> Result<Context<P>> {
        if let Err(e) = scope.check_consistent() {
            scope.poisoned = true;
            error!(error = %e, propagation = %propagation, "Refusing to begin on inconsistent scope");
            return Err(e);
        }

        let id = ContextId(self.next_context_id.fetch_add(1, Ordering::Relaxed));

        let ctx = match propagation {
            Propagation::Required => match scope.bound_resource_id() {
                Some(resource) => self.join(id, propagation, resource),
                None => self.start(scope, id, propagation, None).await?,
            },
            Propagation::Mandatory => match scope.bound_resource_id() {
                Some(resource) => self.join(id, propagation, resource),
                None => {
                    return Err(AppError::IllegalTransactionState(
                        "no existing transaction found for propagation MANDATORY".to_string(),
                    ))
                }
            },
            Propagation::RequiresNew => {
                let suspended = scope.bound.take();
                if let Some(s) = &suspended {
                    debug!(context_id = %id, resource_id = %s.id, "Suspending current transaction");
                }
                self.start(scope, id, propagation, suspended).await?
            }
            Propagation::Never => {
                if scope.is_transaction_active() {
                    return Err(AppError::IllegalTransactionState(
                        "existing transaction found for propagation NEVER".to_string(),
                    ));
                }
                debug!(context_id = %id, "Running without transaction");
                TransactionContext::new(id, propagation, None, false, None)
            }
        };

        scope.open.push(OpenContext {
            id: ctx.id,
            resource: ctx.resource,
        });
        Ok(ctx)
    }

    fn join(&self, id: ContextId, propagation: Propagation, resource: ResourceId) -> Context<P> {
        debug!(
            context_id = %id,
            resource_id = %resource,
            propagation = %propagation,
            "Participating in existing transaction"
        );
        TransactionContext::new(id, propagation, Some(resource), false, None)
    }

    async fn start(
        &self,
        scope: &mut Scope<P>,
        id: ContextId,
        propagation: Propagation,
        suspended: Option<BoundResource<Handle<P>>>,
    ) -> Result<Context<P>> {
        let mut handle = match self.provider.begin().await {
            Ok(handle) => handle,
            Err(e) => {
                // Nothing was opened, so the displaced resource goes straight back
                scope.bound = suspended;
                return Err(e);
            }
        };

        if let Some(parked) = &suspended {
            parked.handle().nest_independent(&mut handle);
        }

        let resource = ResourceId(self.next_resource_id.fetch_add(1, Ordering::Relaxed));
        scope.bound = Some(BoundResource::new(resource, handle));

        debug!(
            context_id = %id,
            resource_id = %resource,
            propagation = %propagation,
            new_transaction = true,
            "Began new transaction"
        );
        Ok(TransactionContext::new(
            id,
            propagation,
            Some(resource),
            true,
            suspended,
        ))
    }

    /// Commit `ctx`, or roll it back if anything marked it rollback-only.
    ///
    /// A rollback-only context always yields `UnexpectedRollback`. A joined
    /// context never touches the physical transaction; it only forwards the
    /// mark to the owner.
    pub async fn commit(&self, scope: &mut Scope<P>, ctx: &mut Context<P>) -> Result<()> {
        self.check_completable(scope, ctx)?;
        scope.open.pop();

        let rollback_only = self.is_rollback_only(scope, ctx);

        if ctx.new_transaction {
            let bound = self.release(scope, ctx)?;
            let resource = bound.id;

            if rollback_only {
                ctx.status = TxStatus::RolledBack;
                warn!(
                    context_id = %ctx.id,
                    resource_id = %resource,
                    "Transaction marked rollback-only, rolling back instead of committing"
                );
                bound.into_handle().rollback().await?;
                return Err(AppError::UnexpectedRollback(format!(
                    "{} on {} was marked rollback-only",
                    ctx.id, resource
                )));
            }

            return match bound.into_handle().commit().await {
                Ok(()) => {
                    ctx.status = TxStatus::Committed;
                    debug!(context_id = %ctx.id, resource_id = %resource, "Committed transaction");
                    Ok(())
                }
                Err(e) => {
                    ctx.status = TxStatus::RolledBack;
                    error!(context_id = %ctx.id, resource_id = %resource, error = %e, "Physical commit failed");
                    Err(e)
                }
            };
        }

        if rollback_only {
            if let Some(bound) = scope.bound.as_mut() {
                bound.mark_rollback_only();
            }
            ctx.mark_rollback_only();
            ctx.status = TxStatus::RolledBack;
            warn!(
                context_id = %ctx.id,
                "Participating transaction is rollback-only, commit refused"
            );
            return Err(AppError::UnexpectedRollback(format!(
                "participating {} was marked rollback-only",
                ctx.id
            )));
        }

        // Decision deferred to the owning context
        ctx.status = TxStatus::Committed;
        debug!(context_id = %ctx.id, "Participating transaction completed");
        Ok(())
    }

    /// Roll back `ctx`. A joined context cannot roll back a transaction it
    /// does not own; it marks the owner rollback-only instead.
    pub async fn rollback(&self, scope: &mut Scope<P>, ctx: &mut Context<P>) -> Result<()> {
        self.check_completable(scope, ctx)?;
        scope.open.pop();
        ctx.status = TxStatus::RolledBack;

        if ctx.new_transaction {
            let bound = self.release(scope, ctx)?;
            debug!(context_id = %ctx.id, resource_id = %bound.id, "Rolling back transaction");
            return bound.into_handle().rollback().await;
        }

        if let Some(bound) = scope.bound.as_mut() {
            bound.mark_rollback_only();
            ctx.mark_rollback_only();
            warn!(
                context_id = %ctx.id,
                resource_id = %bound.id,
                "Participating transaction failed, marking existing transaction rollback-only"
            );
        }
        Ok(())
    }

    /// Mark `ctx` rollback-only without failing. Cannot be undone.
    pub fn set_rollback_only(&self, ctx: &mut Context<P>) {
        ctx.mark_rollback_only();
    }

    /// Local flag of `ctx`, or the shared flag of the resource it runs on
    /// while that resource is bound.
    pub fn is_rollback_only(&self, scope: &Scope<P>, ctx: &Context<P>) -> bool {
        if ctx.rollback_only {
            return true;
        }
        match (ctx.resource, scope.bound.as_ref()) {
            (Some(resource), Some(bound)) if bound.id == resource => bound.rollback_only,
            _ => false,
        }
    }

    fn check_completable(&self, scope: &mut Scope<P>, ctx: &Context<P>) -> Result<()> {
        if ctx.status.is_terminal() {
            error!(context_id = %ctx.id, status = %ctx.status, "Context completed twice");
            return Err(AppError::InvariantViolation(format!(
                "{} is already {}",
                ctx.id, ctx.status
            )));
        }

        let innermost = scope.open.last().map(|c| c.id);
        if innermost != Some(ctx.id) {
            scope.poisoned = true;
            error!(context_id = %ctx.id, innermost = ?innermost, "Contexts completed out of order");
            return Err(AppError::InvariantViolation(format!(
                "{} is not the innermost open context (innermost: {:?})",
                ctx.id, innermost
            )));
        }

        if ctx.resource != scope.bound_resource_id() {
            scope.poisoned = true;
            error!(
                context_id = %ctx.id,
                expected = ?ctx.resource,
                bound = ?scope.bound_resource_id(),
                "Bound resource does not belong to context"
            );
            return Err(AppError::InvariantViolation(format!(
                "{} expects resource {:?} but {:?} is bound",
                ctx.id,
                ctx.resource,
                scope.bound_resource_id()
            )));
        }

        Ok(())
    }

    /// Detach the context's own resource and put back the one it suspended.
    /// Runs before the physical commit/rollback so a failing completion
    /// never leaves the suspended resource detached.
    fn release(&self, scope: &mut Scope<P>, ctx: &mut Context<P>) -> Result<BoundResource<Handle<P>>> {
        let own = scope.bound.take();
        scope.bound = ctx.suspended.take();

        if let Some(resumed) = &scope.bound {
            debug!(context_id = %ctx.id, resource_id = %resumed.id, "Resuming suspended transaction");
        }

        own.ok_or_else(|| {
            scope.poisoned = true;
            AppError::InvariantViolation(format!("{} owns no bound resource", ctx.id))
        })
    }
}
