//! Shared fakes for integration tests.

#![allow(dead_code)]

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use memo::assistant::{AssistantClient, RunStatus};
use memo::error::{AssistantError, AssistantResult, StoreError, StoreResult};
use memo::session::{Session, ThreadStore, UserId};

/// Reply with a five-keyword classification.
pub const WORK_REPLY: &str = r#"{
    "category": "Work",
    "keywords": ["meeting", "budget", "q3", "finance", "planning"],
    "summary": "Q3 budget meeting",
    "attachments_analysis": "",
    "links": ["https://example.com/agenda"]
}"#;

#[derive(Debug)]
struct Script {
    next_session: usize,
    next_run: usize,
    live: HashSet<String>,
    ghosts: HashSet<String>,
    statuses: VecDeque<RunStatus>,
    settled: RunStatus,
    reply: Option<String>,
    fail_create: bool,
    fail_exists: bool,
    fail_everything: bool,
    fail_delete: bool,
    create_delay: Duration,
}

/// Scripted in-memory assistant with call counters.
///
/// Sessions live until deleted or expired. Each run walks the scripted
/// status sequence, then reports `settled` (default `completed`) forever.
#[derive(Debug)]
pub struct FakeAssistant {
    script: Mutex<Script>,
    pub creates: AtomicUsize,
    pub exists_checks: AtomicUsize,
    pub posts: AtomicUsize,
    pub runs: AtomicUsize,
    pub polls: AtomicUsize,
    pub replies: AtomicUsize,
    pub deletes: AtomicUsize,
}

impl FakeAssistant {
    pub fn new() -> Arc<Self> {
        Self::with_reply(WORK_REPLY)
    }

    pub fn with_reply(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(Script {
                next_session: 0,
                next_run: 0,
                live: HashSet::new(),
                ghosts: HashSet::new(),
                statuses: VecDeque::new(),
                settled: RunStatus::Completed,
                reply: Some(reply.to_string()),
                fail_create: false,
                fail_exists: false,
                fail_everything: false,
                fail_delete: false,
                create_delay: Duration::ZERO,
            }),
            creates: AtomicUsize::new(0),
            exists_checks: AtomicUsize::new(0),
            posts: AtomicUsize::new(0),
            runs: AtomicUsize::new(0),
            polls: AtomicUsize::new(0),
            replies: AtomicUsize::new(0),
            deletes: AtomicUsize::new(0),
        })
    }

    /// An assistant whose every call fails with a network error.
    pub fn unreachable() -> Arc<Self> {
        let fake = Self::new();
        fake.script.lock().unwrap().fail_everything = true;
        fake
    }

    pub fn script_statuses(&self, statuses: &[RunStatus]) {
        self.script.lock().unwrap().statuses = statuses.iter().copied().collect();
    }

    pub fn settle_on(&self, status: RunStatus) {
        self.script.lock().unwrap().settled = status;
    }

    pub fn set_reply(&self, reply: Option<&str>) {
        self.script.lock().unwrap().reply = reply.map(str::to_string);
    }

    pub fn fail_create(&self, fail: bool) {
        self.script.lock().unwrap().fail_create = fail;
    }

    pub fn fail_exists(&self, fail: bool) {
        self.script.lock().unwrap().fail_exists = fail;
    }

    pub fn fail_delete(&self, fail: bool) {
        self.script.lock().unwrap().fail_delete = fail;
    }

    pub fn delay_create(&self, delay: Duration) {
        self.script.lock().unwrap().create_delay = delay;
    }

    /// Make the remote forget a session, as if it expired.
    pub fn expire(&self, session_id: &str) {
        self.script.lock().unwrap().live.remove(session_id);
    }

    /// Delete a session remotely but keep reporting it as existing, so it
    /// passes validation and fails on first use.
    pub fn haunt(&self, session_id: &str) {
        let mut script = self.script.lock().unwrap();
        script.live.remove(session_id);
        script.ghosts.insert(session_id.to_string());
    }

    /// Register a session the remote knows without counting a create.
    pub fn adopt(&self, session_id: &str) {
        self.script.lock().unwrap().live.insert(session_id.to_string());
    }

    pub fn is_live(&self, session_id: &str) -> bool {
        self.script.lock().unwrap().live.contains(session_id)
    }

    pub fn live_count(&self) -> usize {
        self.script.lock().unwrap().live.len()
    }

    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    fn check_reachable(&self) -> AssistantResult<()> {
        if self.script.lock().unwrap().fail_everything {
            return Err(AssistantError::network("connection refused"));
        }
        Ok(())
    }

    fn check_live(&self, session_id: &str) -> AssistantResult<()> {
        self.check_reachable()?;
        if self.script.lock().unwrap().live.contains(session_id) {
            Ok(())
        } else {
            Err(AssistantError::not_found(format!("No thread found with id '{session_id}'")))
        }
    }
}

#[async_trait]
impl AssistantClient for FakeAssistant {
    async fn create_session(&self) -> AssistantResult<String> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        self.check_reachable()?;
        let delay = {
            let script = self.script.lock().unwrap();
            if script.fail_create {
                return Err(AssistantError::rate_limited("quota exceeded"));
            }
            script.create_delay
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let mut script = self.script.lock().unwrap();
        script.next_session += 1;
        let id = format!("thread_{}", script.next_session);
        script.live.insert(id.clone());
        Ok(id)
    }

    async fn session_exists(&self, session_id: &str) -> AssistantResult<bool> {
        self.exists_checks.fetch_add(1, Ordering::SeqCst);
        self.check_reachable()?;
        let script = self.script.lock().unwrap();
        if script.fail_exists {
            return Err(AssistantError::network("validation timed out"));
        }
        Ok(script.live.contains(session_id) || script.ghosts.contains(session_id))
    }

    async fn post_message(&self, session_id: &str, _text: &str) -> AssistantResult<()> {
        self.posts.fetch_add(1, Ordering::SeqCst);
        self.check_live(session_id)
    }

    async fn submit_run(&self, session_id: &str) -> AssistantResult<String> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        self.check_live(session_id)?;
        let mut script = self.script.lock().unwrap();
        script.next_run += 1;
        Ok(format!("run_{}", script.next_run))
    }

    async fn run_status(&self, session_id: &str, _run_id: &str) -> AssistantResult<RunStatus> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        self.check_live(session_id)?;
        let mut script = self.script.lock().unwrap();
        let settled = script.settled;
        Ok(script.statuses.pop_front().unwrap_or(settled))
    }

    async fn latest_reply(&self, session_id: &str) -> AssistantResult<Option<String>> {
        self.replies.fetch_add(1, Ordering::SeqCst);
        self.check_live(session_id)?;
        Ok(self.script.lock().unwrap().reply.clone())
    }

    async fn delete_session(&self, session_id: &str) -> AssistantResult<()> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.check_reachable()?;
        let mut script = self.script.lock().unwrap();
        if script.fail_delete {
            return Err(AssistantError::http_status(500, "internal error"));
        }
        script.live.remove(session_id);
        Ok(())
    }
}

/// A durable store that is always down.
#[derive(Debug, Default)]
pub struct BrokenStore {
    pub calls: AtomicUsize,
}

impl BrokenStore {
    fn fail<T>(&self) -> StoreResult<T> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(StoreError::backend("test", "store unavailable"))
    }
}

#[async_trait]
impl ThreadStore for BrokenStore {
    async fn get(&self, _user_id: UserId) -> StoreResult<Option<Session>> {
        self.fail()
    }

    async fn put(&self, _session: &Session) -> StoreResult<()> {
        self.fail()
    }

    async fn touch(&self, _user_id: UserId) -> StoreResult<()> {
        self.fail()
    }

    async fn delete(&self, _user_id: UserId) -> StoreResult<()> {
        self.fail()
    }
}
