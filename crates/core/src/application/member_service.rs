// Member Service - join use cases composing member and log repositories

use super::boundary::Boundary;
use super::manager::TransactionManager;
use super::scope::TxScope;
use crate::domain::{Log, Member};
use crate::error::{AppError, Result};
use crate::port::{LogRepository, MemberRepository, ResourceProvider};
use std::sync::Arc;
use tracing::{info, warn};

/// Transactional boundary declared on each layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceBoundaries {
    pub service: Boundary,
    pub member_repository: Boundary,
    pub log_repository: Boundary,
}

impl Default for ServiceBoundaries {
    fn default() -> Self {
        Self {
            service: Boundary::required(),
            member_repository: Boundary::required(),
            log_repository: Boundary::required(),
        }
    }
}

pub struct MemberService<P: ResourceProvider> {
    tx_manager: Arc<TransactionManager<P>>,
    member_repo: Arc<dyn MemberRepository<P::Handle>>,
    log_repo: Arc<dyn LogRepository<P::Handle>>,
    boundaries: ServiceBoundaries,
}

impl<P: ResourceProvider> Clone for MemberService<P> {
    fn clone(&self) -> Self {
        Self {
            tx_manager: Arc::clone(&self.tx_manager),
            member_repo: Arc::clone(&self.member_repo),
            log_repo: Arc::clone(&self.log_repo),
            boundaries: self.boundaries,
        }
    }
}

impl<P: ResourceProvider> MemberService<P> {
    pub fn new(
        tx_manager: Arc<TransactionManager<P>>,
        member_repo: Arc<dyn MemberRepository<P::Handle>>,
        log_repo: Arc<dyn LogRepository<P::Handle>>,
        boundaries: ServiceBoundaries,
    ) -> Self {
        Self {
            tx_manager,
            member_repo,
            log_repo,
            boundaries,
        }
    }

    pub fn boundaries(&self) -> ServiceBoundaries {
        self.boundaries
    }

    pub fn tx_manager(&self) -> &Arc<TransactionManager<P>> {
        &self.tx_manager
    }

    /// Save member, then log. Any failure propagates.
    pub async fn join_v1(&self, scope: &mut TxScope<P::Handle>, username: &str) -> Result<()> {
        let this = self.clone();
        let username = username.to_string();

        self.boundaries
            .service
            .run(&self.tx_manager, scope, move |scope| {
                Box::pin(async move {
                    info!(username = %username, "Saving member");
                    this.save_member(scope, Member::new(username.clone()))
                        .await?;

                    info!(username = %username, "Saving log");
                    this.save_log(scope, Log::new(username)).await?;
                    Ok::<_, AppError>(())
                })
            })
            .await
    }

    /// Save member, then log; a failing log save is recovered locally.
    ///
    /// Recovery does not undo a rollback-only mark the log boundary already
    /// put on a shared transaction; the outer commit still reports
    /// `UnexpectedRollback` in that case.
    pub async fn join_v2(&self, scope: &mut TxScope<P::Handle>, username: &str) -> Result<()> {
        let this = self.clone();
        let username = username.to_string();

        self.boundaries
            .service
            .run(&self.tx_manager, scope, move |scope| {
                Box::pin(async move {
                    info!(username = %username, "Saving member");
                    this.save_member(scope, Member::new(username.clone()))
                        .await?;

                    info!(username = %username, "Saving log");
                    if let Err(e) = this.save_log(scope, Log::new(username.clone())).await {
                        if e.is_invariant_violation() {
                            return Err(e);
                        }
                        warn!(username = %username, error = %e, "Log save failed, continuing");
                    }
                    Ok::<_, AppError>(())
                })
            })
            .await
    }

    pub async fn find_member(
        &self,
        scope: &mut TxScope<P::Handle>,
        username: &str,
    ) -> Result<Option<Member>> {
        let repo = Arc::clone(&self.member_repo);
        let username = username.to_string();

        Boundary::required()
            .run(&self.tx_manager, scope, move |scope| {
                Box::pin(async move { repo.find(scope.resource_mut()?, &username).await })
            })
            .await
    }

    pub async fn find_log(&self, scope: &mut TxScope<P::Handle>, message: &str) -> Result<Option<Log>> {
        let repo = Arc::clone(&self.log_repo);
        let message = message.to_string();

        Boundary::required()
            .run(&self.tx_manager, scope, move |scope| {
                Box::pin(async move { repo.find(scope.resource_mut()?, &message).await })
            })
            .await
    }

    async fn save_member(&self, scope: &mut TxScope<P::Handle>, member: Member) -> Result<Member> {
        let repo = Arc::clone(&self.member_repo);

        self.boundaries
            .member_repository
            .run(&self.tx_manager, scope, move |scope| {
                Box::pin(async move { repo.save(scope.resource_mut()?, &member).await })
            })
            .await
    }

    async fn save_log(&self, scope: &mut TxScope<P::Handle>, log: Log) -> Result<Log> {
        let repo = Arc::clone(&self.log_repo);

        self.boundaries
            .log_repository
            .run(&self.tx_manager, scope, move |scope| {
                Box::pin(async move { repo.save(scope.resource_mut()?, &log).await })
            })
            .await
    }
}
