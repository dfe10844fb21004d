// Member Repository Port (Interface)

use crate::domain::Member;
use crate::error::Result;
use async_trait::async_trait;

/// Persistence of members, executed on whatever physical resource the
/// caller's transaction currently has bound
#[async_trait]
pub trait MemberRepository<H: Send>: Send + Sync {
    /// Insert a member, returning it with its assigned ID
    async fn save(&self, resource: &mut H, member: &Member) -> Result<Member>;

    /// Find member by username
    async fn find(&self, resource: &mut H, username: &str) -> Result<Option<Member>>;
}
