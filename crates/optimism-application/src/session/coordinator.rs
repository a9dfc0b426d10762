//! Client-side session lifecycle: resume or create, watch, replace.

use super::change_feed::{ChangeCallback, ChangeFeed, PollingChangeFeed, SessionChange, Subscription};
use super::context::SessionContext;
use super::heartbeat::{HeartbeatCallback, HeartbeatEmitter, HeartbeatEvent, HeartbeatHandle};
use optimism_core::session::{NewSession, Session, SessionStore, SessionUpdate, StatusTrigger};
use optimism_core::{OptimismError, Result};
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};

/// What the coordinator reports to the UI layer.
#[derive(Debug, Clone, PartialEq)]
pub enum CoordinatorEvent {
    /// The open session changed.
    Updated(Session),
    /// The open session was deleted or completed and a fresh one is now open.
    Replaced {
        previous_id: String,
        session: Session,
    },
    /// Heartbeats keep failing and the store cannot be asked about the session.
    StoreUnreachable { session_id: String },
}

#[derive(Debug)]
enum Signal {
    Change(SessionChange),
    Heartbeat(HeartbeatEvent),
}

struct ActiveSession {
    subscription: Subscription,
    heartbeat: HeartbeatHandle,
}

impl ActiveSession {
    fn session_id(&self) -> &str {
        self.subscription.session_id()
    }

    async fn stop(self) {
        tracing::debug!("[SessionCoordinator] Stopping timers for {}", self.session_id());
        self.subscription.unsubscribe().await;
        self.heartbeat.stop().await;
    }
}

/// Owns the open session and its timers.
///
/// At most one subscription and one heartbeat run at a time, and both are
/// stopped before timers for another session id are started. Signals that
/// were already queued for an older id are dropped in [`Self::next_event`].
pub struct SessionCoordinator {
    store: Arc<dyn SessionStore>,
    context: SessionContext,
    feed: Arc<dyn ChangeFeed>,
    heartbeat: HeartbeatEmitter,
    template: NewSession,
    active: Mutex<Option<ActiveSession>>,
    signals_tx: mpsc::UnboundedSender<(String, Signal)>,
    signals_rx: Mutex<mpsc::UnboundedReceiver<(String, Signal)>>,
}

impl SessionCoordinator {
    /// `template` is used for every session this coordinator creates.
    pub fn new(store: Arc<dyn SessionStore>, context: SessionContext, template: NewSession) -> Self {
        let (signals_tx, signals_rx) = mpsc::unbounded_channel();
        Self {
            feed: Arc::new(PollingChangeFeed::new(Arc::clone(&store))),
            heartbeat: HeartbeatEmitter::new(Arc::clone(&store)),
            store,
            context,
            template,
            active: Mutex::new(None),
            signals_tx,
            signals_rx: Mutex::new(signals_rx),
        }
    }

    pub fn with_feed(mut self, feed: Arc<dyn ChangeFeed>) -> Self {
        self.feed = feed;
        self
    }

    pub fn with_heartbeat(mut self, heartbeat: HeartbeatEmitter) -> Self {
        self.heartbeat = heartbeat;
        self
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    pub async fn current_session_id(&self) -> Option<String> {
        self.context.current().await
    }

    /// Returns the remembered session, or creates one when there is none or
    /// it is gone or completed. Store failures propagate.
    pub async fn ensure_session(&self) -> Result<Session> {
        if let Some(id) = self.context.current().await {
            match self.store.get(&id).await? {
                Some(session) if !session.is_completed() => {
                    tracing::info!("[SessionCoordinator] Resuming session {}", id);
                    return Ok(session);
                }
                Some(_) => {
                    tracing::info!("[SessionCoordinator] Remembered session {} is completed", id);
                }
                None => {
                    tracing::info!("[SessionCoordinator] Remembered session {} is gone", id);
                }
            }
            self.context.clear().await?;
        }
        self.create_session().await
    }

    /// Ensures a session and opens it.
    pub async fn start(&self) -> Result<Session> {
        let session = self.ensure_session().await?;
        self.open(&session.id).await?;
        Ok(session)
    }

    /// Makes `session_id` the open session, stopping any previous timers first.
    pub async fn open(&self, session_id: &str) -> Result<()> {
        let mut active = self.active.lock().await;
        if let Some(previous) = active.take() {
            previous.stop().await;
        }

        self.context.set_current(session_id).await?;

        let tx = self.signals_tx.clone();
        let id = session_id.to_string();
        let on_change: ChangeCallback = Arc::new(move |change| {
            let _ = tx.send((id.clone(), Signal::Change(change)));
        });

        let tx = self.signals_tx.clone();
        let id = session_id.to_string();
        let on_heartbeat: HeartbeatCallback = Arc::new(move |event| {
            let _ = tx.send((id.clone(), Signal::Heartbeat(event)));
        });

        *active = Some(ActiveSession {
            subscription: self.feed.subscribe(session_id, on_change),
            heartbeat: self.heartbeat.start(session_id, on_heartbeat),
        });

        tracing::info!("[SessionCoordinator] Opened session {}", session_id);
        Ok(())
    }

    /// Waits for the next event for the open session.
    ///
    /// Replacement happens inside this call, so a `Replaced` event always
    /// refers to a session that is already open.
    pub async fn next_event(&self) -> Result<CoordinatorEvent> {
        let mut signals = self.signals_rx.lock().await;
        loop {
            let (session_id, signal) = signals
                .recv()
                .await
                .ok_or_else(|| OptimismError::internal("coordinator signal channel closed"))?;

            if !self.is_open(&session_id).await {
                tracing::debug!("[SessionCoordinator] Dropping stale signal for {}", session_id);
                continue;
            }

            match signal {
                Signal::Change(SessionChange::Updated(session)) if session.is_completed() => {
                    tracing::info!("[SessionCoordinator] Session {} completed", session_id);
                    return self.replace(&session_id).await;
                }
                Signal::Change(SessionChange::Updated(session)) => {
                    return Ok(CoordinatorEvent::Updated(session));
                }
                Signal::Change(SessionChange::Deleted) => {
                    tracing::info!("[SessionCoordinator] Session {} was deleted", session_id);
                    return self.replace(&session_id).await;
                }
                Signal::Heartbeat(HeartbeatEvent::SessionLost { .. }) => {
                    match self.store.get(&session_id).await {
                        Ok(Some(session)) if !session.is_completed() => {
                            tracing::info!(
                                "[SessionCoordinator] Heartbeats failing but {} still exists",
                                session_id
                            );
                        }
                        Ok(_) => return self.replace(&session_id).await,
                        Err(e) => {
                            tracing::warn!(
                                "[SessionCoordinator] Liveness check for {} failed: {}",
                                session_id,
                                e
                            );
                            return Ok(CoordinatorEvent::StoreUnreachable { session_id });
                        }
                    }
                }
            }
        }
    }

    /// Marks the open session `completed`.
    ///
    /// Observers (including this coordinator) replace it on their next poll.
    pub async fn terminate(&self) -> Result<Option<Session>> {
        let Some(id) = self.context.current().await else {
            return Ok(None);
        };
        let Some(session) = self.store.get(&id).await? else {
            return Ok(None);
        };
        let status = session.status.next(StatusTrigger::Terminated);
        tracing::info!("[SessionCoordinator] Terminating session {}", id);
        self.store.update(&id, SessionUpdate::status(status)).await
    }

    /// Stops the timers. The remembered session id is kept for the next start.
    pub async fn close(&self) {
        if let Some(active) = self.active.lock().await.take() {
            active.stop().await;
        }
    }

    async fn is_open(&self, session_id: &str) -> bool {
        self.active
            .lock()
            .await
            .as_ref()
            .is_some_and(|active| active.session_id() == session_id)
    }

    async fn create_session(&self) -> Result<Session> {
        let session = self.store.create(self.template.clone()).await?;
        self.context.set_current(&session.id).await?;
        tracing::info!(
            "[SessionCoordinator] Created {} session {}",
            session.mode,
            session.id
        );
        Ok(session)
    }

    async fn replace(&self, previous_id: &str) -> Result<CoordinatorEvent> {
        if let Some(active) = self.active.lock().await.take() {
            active.stop().await;
        }
        self.context.clear().await?;

        let session = self.create_session().await?;
        self.open(&session.id).await?;
        tracing::info!(
            "[SessionCoordinator] Replaced {} with {}",
            previous_id,
            session.id
        );

        Ok(CoordinatorEvent::Replaced {
            previous_id: previous_id.to_string(),
            session,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::task::TaskGuard;
    use crate::test_support::FlakyStore;
    use optimism_core::session::{SessionMode, SessionStatus};
    use optimism_infrastructure::InMemoryKeyValueStore;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    /// Never reports anything; used to exercise the heartbeat path alone.
    struct SilentFeed;

    impl ChangeFeed for SilentFeed {
        fn subscribe(&self, session_id: &str, _callback: ChangeCallback) -> Subscription {
            let task = TaskGuard::spawn(|token| async move { token.cancelled().await });
            Subscription::new(session_id, task)
        }
    }

    async fn coordinator(store: Arc<FlakyStore>) -> (SessionCoordinator, Arc<InMemoryKeyValueStore>) {
        let kv = Arc::new(InMemoryKeyValueStore::new());
        let context = SessionContext::load(kv.clone()).await.unwrap();
        let coordinator = SessionCoordinator::new(
            store,
            context,
            NewSession::new(SessionMode::Experimental, "default-user"),
        );
        (coordinator, kv)
    }

    async fn next(coordinator: &SessionCoordinator) -> CoordinatorEvent {
        tokio::time::timeout(Duration::from_secs(60), coordinator.next_event())
            .await
            .expect("no event within 60s")
            .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_remembers_and_resumes() {
        let store = Arc::new(FlakyStore::new());
        let (first, kv) = coordinator(store.clone()).await;
        let session = first.start().await.unwrap();
        assert_eq!(first.current_session_id().await, Some(session.id.clone()));
        assert!(matches!(
            next(&first).await,
            CoordinatorEvent::Updated(s) if s.id == session.id
        ));
        first.close().await;

        let context = SessionContext::load(kv).await.unwrap();
        let second = SessionCoordinator::new(
            store.clone(),
            context,
            NewSession::new(SessionMode::Experimental, "default-user"),
        );
        let resumed = second.ensure_session().await.unwrap();
        assert_eq!(resumed.id, session.id);
        assert_eq!(store.inner.len().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_completed_session_is_not_resumed() {
        let store = Arc::new(FlakyStore::new());
        let (coordinator, _kv) = coordinator(store.clone()).await;
        let old = coordinator.ensure_session().await.unwrap();
        store
            .update(&old.id, SessionUpdate::status(SessionStatus::Completed))
            .await
            .unwrap();

        let fresh = coordinator.ensure_session().await.unwrap();
        assert_ne!(fresh.id, old.id);
        assert_eq!(coordinator.current_session_id().await, Some(fresh.id));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deleted_session_is_replaced() {
        let store = Arc::new(FlakyStore::new());
        let (coordinator, _kv) = coordinator(store.clone()).await;
        let session = coordinator.start().await.unwrap();
        next(&coordinator).await;

        store.delete(&session.id).await.unwrap();
        match next(&coordinator).await {
            CoordinatorEvent::Replaced {
                previous_id,
                session: fresh,
            } => {
                assert_eq!(previous_id, session.id);
                assert_ne!(fresh.id, session.id);
                assert_eq!(coordinator.current_session_id().await, Some(fresh.id));
            }
            other => panic!("unexpected event: {:?}", other),
        }

        coordinator.close().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_terminate_leads_to_replacement() {
        let store = Arc::new(FlakyStore::new());
        let (coordinator, _kv) = coordinator(store.clone()).await;
        let session = coordinator.start().await.unwrap();
        next(&coordinator).await;

        let terminated = coordinator.terminate().await.unwrap().unwrap();
        assert_eq!(terminated.status, SessionStatus::Completed);

        assert!(matches!(
            next(&coordinator).await,
            CoordinatorEvent::Replaced { previous_id, .. } if previous_id == session.id
        ));
        coordinator.close().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_signals_for_previous_session_are_dropped() {
        let store = Arc::new(FlakyStore::new());
        let (coordinator, _kv) = coordinator(store.clone()).await;
        let a = coordinator.start().await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        let b = store
            .create(NewSession::new(SessionMode::Experimental, "default-user"))
            .await
            .unwrap();
        coordinator.open(&b.id).await.unwrap();

        match next(&coordinator).await {
            CoordinatorEvent::Updated(session) => assert_eq!(session.id, b.id),
            other => panic!("unexpected event: {:?}", other),
        }

        store
            .update(&a.id, SessionUpdate::default().with_ready_to_formalize(true))
            .await
            .unwrap();
        let quiet = tokio::time::timeout(Duration::from_secs(5), coordinator.next_event()).await;
        assert!(quiet.is_err());

        coordinator.close().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_lost_heartbeat_replaces_missing_session() {
        let store = Arc::new(FlakyStore::new());
        let (coordinator, _kv) = coordinator(store.clone()).await;
        let coordinator = coordinator
            .with_feed(Arc::new(SilentFeed))
            .with_heartbeat(HeartbeatEmitter::new(store.clone()).with_interval(Duration::from_secs(1)));
        let session = coordinator.start().await.unwrap();

        store.failing_heartbeats.store(3, Ordering::SeqCst);
        store.inner.delete(&session.id).await.unwrap();

        assert!(matches!(
            next(&coordinator).await,
            CoordinatorEvent::Replaced { previous_id, .. } if previous_id == session.id
        ));
        coordinator.close().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_lost_heartbeat_with_store_down() {
        let store = Arc::new(FlakyStore::new());
        let (coordinator, _kv) = coordinator(store.clone()).await;
        let coordinator = coordinator
            .with_feed(Arc::new(SilentFeed))
            .with_heartbeat(HeartbeatEmitter::new(store.clone()).with_interval(Duration::from_secs(1)));
        let session = coordinator.start().await.unwrap();

        store.failing_heartbeats.store(100, Ordering::SeqCst);
        store.failing_gets.store(100, Ordering::SeqCst);

        assert_eq!(
            next(&coordinator).await,
            CoordinatorEvent::StoreUnreachable {
                session_id: session.id.clone()
            }
        );
        assert_eq!(coordinator.current_session_id().await, Some(session.id));
        coordinator.close().await;
    }
}
