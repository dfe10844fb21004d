// Transactional Call Wrapper

use super::manager::TransactionManager;
use super::scope::TxScope;
use crate::domain::Propagation;
use crate::error::Result;
use crate::port::ResourceProvider;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use tracing::error;

impl<P: ResourceProvider> TransactionManager<P> {
    /// Run `operation` inside a transactional boundary.
    ///
    /// Exactly one of commit/rollback is issued for the context begun here.
    /// On success the result of commit decides the outcome, so an
    /// `UnexpectedRollback` replaces the operation's value. On failure the
    /// operation's own error is returned after rollback; only an invariant
    /// violation raised by the rollback takes its place. A panic rolls back
    /// and then resumes.
    ///
    /// # Example
    /// ```text
    /// let id = tm.run_transactional(&mut scope, Propagation::Required, |scope| {
    ///     Box::pin(async move { repo.save(scope.resource_mut()?, &member).await })
    /// }).await?;
    /// ```
    pub async fn run_transactional<T, F>(
        &self,
        scope: &mut TxScope<P::Handle>,
        propagation: Propagation,
        operation: F,
    ) -> Result<T>
    where
        T: Send,
        F: for<'s> FnOnce(&'s mut TxScope<P::Handle>) -> BoxFuture<'s, Result<T>> + Send,
    {
        let mut ctx = self.begin(scope, propagation).await?;

        let outcome = AssertUnwindSafe(operation(scope)).catch_unwind().await;

        match outcome {
            Ok(Ok(value)) => {
                self.commit(scope, &mut ctx).await?;
                Ok(value)
            }
            Ok(Err(err)) => {
                if let Err(rollback_err) = self.rollback(scope, &mut ctx).await {
                    if rollback_err.is_invariant_violation() {
                        return Err(rollback_err);
                    }
                    error!(
                        context_id = %ctx.id(),
                        error = %rollback_err,
                        original = %err,
                        "Rollback failed, returning original error"
                    );
                }
                Err(err)
            }
            Err(panic) => {
                if let Err(rollback_err) = self.rollback(scope, &mut ctx).await {
                    error!(context_id = %ctx.id(), error = %rollback_err, "Rollback after panic failed");
                }
                std::panic::resume_unwind(panic)
            }
        }
    }
}

/// Declared transactional behaviour of a service or repository method
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boundary {
    /// Run on whatever the caller has bound, if anything
    NonTransactional,
    Transactional(Propagation),
}

impl Boundary {
    pub fn required() -> Self {
        Boundary::Transactional(Propagation::Required)
    }

    pub fn requires_new() -> Self {
        Boundary::Transactional(Propagation::RequiresNew)
    }

    /// Run `operation` under this boundary
    pub async fn run<P, T, F>(
        self,
        manager: &TransactionManager<P>,
        scope: &mut TxScope<P::Handle>,
        operation: F,
    ) -> Result<T>
    where
        P: ResourceProvider,
        T: Send,
        F: for<'s> FnOnce(&'s mut TxScope<P::Handle>) -> BoxFuture<'s, Result<T>> + Send,
    {
        match self {
            Boundary::NonTransactional => operation(scope).await,
            Boundary::Transactional(propagation) => {
                manager.run_transactional(scope, propagation, operation).await
            }
        }
    }
}

impl From<Propagation> for Boundary {
    fn from(propagation: Propagation) -> Self {
        Boundary::Transactional(propagation)
    }
}

impl std::fmt::Display for Boundary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Boundary::NonTransactional => write!(f, "OFF"),
            Boundary::Transactional(p) => write!(f, "{}", p),
        }
    }
}
