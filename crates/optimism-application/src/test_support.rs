//! Scripted collaborators shared by the unit tests.

use async_trait::async_trait;
use optimism_core::session::{
    Message, MessageMetadata, NewSession, Sender, Session, SessionStore, SessionUpdate,
};
use optimism_core::{OptimismError, Result, TextGenerator};
use optimism_infrastructure::InMemorySessionStore;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use tokio::time::Instant;

/// Wraps the in-memory store and injects failures on demand.
#[derive(Default)]
pub struct FlakyStore {
    pub inner: InMemorySessionStore,
    /// Number of upcoming `get` calls that fail with `Unreachable`.
    pub failing_gets: AtomicU32,
    /// Number of upcoming `update` calls that fail with a 503.
    pub failing_updates: AtomicU32,
    /// Number of upcoming `heartbeat` calls that fail with `Unreachable`.
    pub failing_heartbeats: AtomicU32,
    /// Accept `messages` updates but silently keep the old array.
    pub drop_message_writes: AtomicBool,
    pub update_calls: Mutex<Vec<Instant>>,
    pub get_calls: AtomicU32,
    pub heartbeat_calls: AtomicU32,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn take(counter: &AtomicU32) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    pub fn update_instants(&self) -> Vec<Instant> {
        self.update_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl SessionStore for FlakyStore {
    async fn create(&self, request: NewSession) -> Result<Session> {
        self.inner.create(request).await
    }

    async fn get(&self, session_id: &str) -> Result<Option<Session>> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        if Self::take(&self.failing_gets) {
            return Err(OptimismError::Unreachable("connection refused".into()));
        }
        self.inner.get(session_id).await
    }

    async fn update(&self, session_id: &str, mut update: SessionUpdate) -> Result<Option<Session>> {
        self.update_calls.lock().unwrap().push(Instant::now());
        if Self::take(&self.failing_updates) {
            return Err(OptimismError::server(
                503,
                format!("PUT /sessions/{}", session_id),
                "Service Unavailable",
            ));
        }
        if self.drop_message_writes.load(Ordering::SeqCst) {
            update.messages = None;
        }
        self.inner.update(session_id, update).await
    }

    async fn add_message(
        &self,
        session_id: &str,
        sender: Sender,
        content: &str,
        metadata: Option<MessageMetadata>,
    ) -> Result<Message> {
        self.inner
            .add_message(session_id, sender, content, metadata)
            .await
    }

    async fn messages(&self, session_id: &str) -> Result<Option<Vec<Message>>> {
        self.inner.messages(session_id).await
    }

    async fn heartbeat(&self, session_id: &str) -> Result<()> {
        self.heartbeat_calls.fetch_add(1, Ordering::SeqCst);
        if Self::take(&self.failing_heartbeats) {
            return Err(OptimismError::Unreachable("connection refused".into()));
        }
        self.inner.heartbeat(session_id).await
    }

    async fn delete(&self, session_id: &str) -> Result<bool> {
        self.inner.delete(session_id).await
    }

    async fn list(&self) -> Result<Vec<Session>> {
        self.inner.list().await
    }

    async fn list_waiting(&self) -> Result<Vec<Session>> {
        self.inner.list_waiting().await
    }

    async fn clear(&self) -> Result<()> {
        self.inner.clear().await
    }
}

/// Returns a fixed reply and records the prompts it was given.
pub struct CannedGenerator {
    reply: Result<String>,
    pub prompts: Mutex<Vec<String>>,
}

impl CannedGenerator {
    pub fn replying(text: &str) -> Self {
        Self {
            reply: Ok(text.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(err: OptimismError) -> Self {
        Self {
            reply: Err(err),
            prompts: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl TextGenerator for CannedGenerator {
    fn expertise(&self) -> &str {
        "canned"
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.reply.clone()
    }
}
