// In-memory resource and repositories for unit tests

use crate::domain::{Log, Member};
use crate::error::{AppError, Result};
use crate::port::{LogRepository, MemberRepository, ResourceHandle, ResourceProvider};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

#[derive(Debug, Default, Clone, Copy)]
pub struct Stats {
    pub begins: usize,
    pub commits: usize,
    pub rollbacks: usize,
}

#[derive(Debug, Default)]
struct State {
    stats: Stats,
    members: Vec<Member>,
    logs: Vec<Log>,
    next_id: i64,
    fail_next_begin: bool,
    fail_next_commit: bool,
}

/// Committed store shared by every handle of one provider
#[derive(Debug, Clone, Default)]
pub struct Journal(Arc<Mutex<State>>);

impl Journal {
    pub fn stats(&self) -> Stats {
        self.0.lock().unwrap().stats
    }

    pub fn fail_next_begin(&self) {
        self.0.lock().unwrap().fail_next_begin = true;
    }

    pub fn fail_next_commit(&self) {
        self.0.lock().unwrap().fail_next_commit = true;
    }

    pub fn has_member(&self, username: &str) -> bool {
        self.0
            .lock()
            .unwrap()
            .members
            .iter()
            .any(|m| m.username == username)
    }

    pub fn has_log(&self, message: &str) -> bool {
        self.0
            .lock()
            .unwrap()
            .logs
            .iter()
            .any(|l| l.message == message)
    }

    fn next_id(&self) -> i64 {
        let mut state = self.0.lock().unwrap();
        state.next_id += 1;
        state.next_id
    }
}

/// Buffers writes until commit
#[derive(Debug)]
pub struct FakeHandle {
    journal: Journal,
    members: Vec<Member>,
    logs: Vec<Log>,
    parked_beneath: usize,
}

impl FakeHandle {
    /// Number of suspended handles this one was nested on
    pub fn parked_beneath(&self) -> usize {
        self.parked_beneath
    }
}

#[async_trait]
impl ResourceHandle for FakeHandle {
    async fn commit(self) -> Result<()> {
        let mut state = self.journal.0.lock().unwrap();
        if state.fail_next_commit {
            state.fail_next_commit = false;
            state.stats.rollbacks += 1;
            return Err(AppError::Database("commit failed".to_string()));
        }
        state.stats.commits += 1;
        state.members.extend(self.members);
        state.logs.extend(self.logs);
        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        self.journal.0.lock().unwrap().stats.rollbacks += 1;
        Ok(())
    }

    fn nest_independent(&self, independent: &mut Self) {
        independent.parked_beneath = self.parked_beneath + 1;
    }
}

#[derive(Debug, Default)]
pub struct FakeProvider {
    journal: Journal,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn journal(&self) -> Journal {
        self.journal.clone()
    }
}

#[async_trait]
impl ResourceProvider for FakeProvider {
    type Handle = FakeHandle;

    async fn begin(&self) -> Result<FakeHandle> {
        let mut state = self.journal.0.lock().unwrap();
        if state.fail_next_begin {
            state.fail_next_begin = false;
            return Err(AppError::Database("no connection available".to_string()));
        }
        state.stats.begins += 1;
        Ok(FakeHandle {
            journal: self.journal.clone(),
            members: Vec::new(),
            logs: Vec::new(),
            parked_beneath: 0,
        })
    }
}

pub struct FakeMemberRepository;

#[async_trait]
impl MemberRepository<FakeHandle> for FakeMemberRepository {
    async fn save(&self, resource: &mut FakeHandle, member: &Member) -> Result<Member> {
        let mut saved = member.clone();
        saved.id = Some(resource.journal.next_id());
        resource.members.push(saved.clone());
        Ok(saved)
    }

    async fn find(&self, resource: &mut FakeHandle, username: &str) -> Result<Option<Member>> {
        if let Some(m) = resource.members.iter().find(|m| m.username == username) {
            return Ok(Some(m.clone()));
        }
        let state = resource.journal.0.lock().unwrap();
        Ok(state.members.iter().find(|m| m.username == username).cloned())
    }
}

pub struct FakeLogRepository;

#[async_trait]
impl LogRepository<FakeHandle> for FakeLogRepository {
    async fn save(&self, resource: &mut FakeHandle, log: &Log) -> Result<Log> {
        if log.is_failure_trigger() {
            return Err(AppError::Operation(format!("log write refused: {}", log.message)));
        }
        let mut saved = log.clone();
        saved.id = Some(resource.journal.next_id());
        resource.logs.push(saved.clone());
        Ok(saved)
    }

    async fn find(&self, resource: &mut FakeHandle, message: &str) -> Result<Option<Log>> {
        if let Some(l) = resource.logs.iter().find(|l| l.message == message) {
            return Ok(Some(l.clone()));
        }
        let state = resource.journal.0.lock().unwrap();
        Ok(state.logs.iter().find(|l| l.message == message).cloned())
    }
}
