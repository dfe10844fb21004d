// SQLite MemberRepository Implementation

use crate::error::map_sqlx_error;
use crate::resource::SqliteResource;
use async_trait::async_trait;
use txprop_core::domain::Member;
use txprop_core::error::Result;
use txprop_core::port::MemberRepository;

#[derive(Debug, Default, Clone, Copy)]
pub struct SqliteMemberRepository;

impl SqliteMemberRepository {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl MemberRepository<SqliteResource> for SqliteMemberRepository {
    async fn save(&self, resource: &mut SqliteResource, member: &Member) -> Result<Member> {
        let result = sqlx::query("INSERT INTO member (username) VALUES (?)")
            .bind(&member.username)
            .execute(resource.writer()?)
            .await
            .map_err(map_sqlx_error)?;

        Ok(Member {
            id: Some(result.last_insert_rowid()),
            username: member.username.clone(),
        })
    }

    async fn find(&self, resource: &mut SqliteResource, username: &str) -> Result<Option<Member>> {
        let row = sqlx::query_as::<_, MemberRow>(
            "SELECT id, username FROM member WHERE username = ? ORDER BY id LIMIT 1",
        )
        .bind(username)
        .fetch_optional(resource.connection())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(MemberRow::into_member))
    }
}

#[derive(Debug, sqlx::FromRow)]
struct MemberRow {
    id: i64,
    username: String,
}

impl MemberRow {
    fn into_member(self) -> Member {
        Member {
            id: Some(self.id),
            username: self.username,
        }
    }
}
