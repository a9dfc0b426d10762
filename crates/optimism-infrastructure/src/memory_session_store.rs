//! In-process session store.
//!
//! A complete implementation of the store contract, including the store-side
//! effects of message appends. Backs the HTTP client's integration tests and
//! the application-layer tests, and doubles as an offline store.

use async_trait::async_trait;
use optimism_core::session::{
    AiConfig, AiConfigKey, AiConfigStatus, AiConfigValidation, AiProvider, Message,
    MessageMetadata, NewSession, Sender, Session, SessionMode, SessionStatus, SessionStore,
    SessionUpdate, SetAiConfigRequest, StatusTrigger,
};
use optimism_core::{OptimismError, Result, detect_readiness, now_millis};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Clone)]
struct StoredAiConfig {
    config: AiConfig,
    api_key: String,
}

#[derive(Default)]
struct StoreState {
    sessions: HashMap<String, Session>,
    ai_configs: HashMap<String, StoredAiConfig>,
}

/// Thread-safe in-memory [`SessionStore`].
#[derive(Clone, Default)]
pub struct InMemorySessionStore {
    state: Arc<Mutex<StoreState>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.sessions.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Status view of a session's provider configuration.
    pub async fn ai_config(&self, session_id: &str) -> Result<Option<AiConfig>> {
        let state = self.state.lock().await;
        if !state.sessions.contains_key(session_id) {
            return Ok(None);
        }
        Ok(state
            .ai_configs
            .get(session_id)
            .map(|stored| stored.config.clone()))
    }

    /// Stores a provider configuration after a format check of the key.
    pub async fn set_ai_config(
        &self,
        session_id: &str,
        request: SetAiConfigRequest,
    ) -> Result<Option<AiConfig>> {
        let mut state = self.state.lock().await;
        if !state.sessions.contains_key(session_id) {
            return Ok(None);
        }

        check_api_key(request.provider, &request.api_key).map_err(OptimismError::Validation)?;

        let now = now_millis();
        let config = AiConfig {
            session_id: session_id.to_string(),
            provider: request.provider,
            model: request.model,
            endpoint: request.endpoint,
            status: AiConfigStatus::Connected,
            last_validated: Some(now),
            set_by: request.set_by,
            set_at: now,
            error_message: None,
        };
        state.ai_configs.insert(
            session_id.to_string(),
            StoredAiConfig {
                config: config.clone(),
                api_key: request.api_key,
            },
        );
        Ok(Some(config))
    }

    pub async fn ai_config_key(&self, session_id: &str) -> Result<Option<AiConfigKey>> {
        let state = self.state.lock().await;
        if !state.sessions.contains_key(session_id) {
            return Ok(None);
        }
        Ok(state.ai_configs.get(session_id).map(|stored| AiConfigKey {
            api_key: stored.api_key.clone(),
            provider: stored.config.provider,
            model: stored.config.model.clone(),
            endpoint: stored.config.endpoint.clone(),
            status: stored.config.status,
        }))
    }

    /// Re-checks the stored key and records the outcome on the config.
    pub async fn validate_ai_config(&self, session_id: &str) -> Result<Option<AiConfigValidation>> {
        let mut state = self.state.lock().await;
        if !state.sessions.contains_key(session_id) {
            return Ok(None);
        }
        let Some(stored) = state.ai_configs.get_mut(session_id) else {
            return Ok(None);
        };

        let now = now_millis();
        let validation = match check_api_key(stored.config.provider, &stored.api_key) {
            Ok(()) => {
                stored.config.status = AiConfigStatus::Connected;
                stored.config.last_validated = Some(now);
                stored.config.error_message = None;
                AiConfigValidation {
                    status: AiConfigStatus::Connected,
                    message: "Validation successful".to_string(),
                    last_validated: Some(now),
                }
            }
            Err(message) => {
                stored.config.status = AiConfigStatus::Error;
                stored.config.error_message = Some(message.clone());
                AiConfigValidation {
                    status: AiConfigStatus::Error,
                    message,
                    last_validated: stored.config.last_validated,
                }
            }
        };
        Ok(Some(validation))
    }
}

/// Format check applied by the store before accepting a key.
fn check_api_key(provider: AiProvider, api_key: &str) -> std::result::Result<(), String> {
    if api_key.trim().is_empty() {
        return Err("API key cannot be empty".to_string());
    }
    if provider == AiProvider::Google && !api_key.starts_with("AI") && api_key.len() < 20 {
        return Err("Invalid API key format".to_string());
    }
    Ok(())
}

/// Next revision marker: wall clock, but always strictly past `previous`.
fn next_revision(previous: i64) -> i64 {
    now_millis().max(previous + 1)
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn create(&self, request: NewSession) -> Result<Session> {
        let now = now_millis();
        let session = Session {
            id: Uuid::new_v4().to_string(),
            mode: request.mode,
            status: SessionStatus::Active,
            user_id: request.user_id,
            researcher_id: request.researcher_id,
            created_at: now,
            updated_at: now,
            last_activity: now,
            messages: Vec::new(),
            is_researcher_typing: None,
            is_ai_responding: None,
            ready_to_formalize: false,
        };

        self.state
            .lock()
            .await
            .sessions
            .insert(session.id.clone(), session.clone());
        Ok(session)
    }

    async fn get(&self, session_id: &str) -> Result<Option<Session>> {
        Ok(self.state.lock().await.sessions.get(session_id).cloned())
    }

    async fn update(&self, session_id: &str, update: SessionUpdate) -> Result<Option<Session>> {
        let mut state = self.state.lock().await;
        let Some(session) = state.sessions.get_mut(session_id) else {
            return Ok(None);
        };

        update.apply_to(session);
        session.updated_at = next_revision(session.updated_at);
        Ok(Some(session.clone()))
    }

    async fn add_message(
        &self,
        session_id: &str,
        sender: Sender,
        content: &str,
        metadata: Option<MessageMetadata>,
    ) -> Result<Message> {
        let mut state = self.state.lock().await;
        let session = state
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| OptimismError::session_not_found(session_id))?;

        let now = now_millis();
        let timestamp = session
            .last_message()
            .map_or(now, |last| now.max(last.timestamp));

        let message = Message {
            id: Uuid::new_v4().to_string(),
            session_id: session_id.to_string(),
            sender,
            content: content.to_string(),
            timestamp,
            metadata,
        };
        let is_formalization = message.is_formalization();
        session.messages.push(message.clone());

        session.status = session.status.next(StatusTrigger::MessageAppended {
            sender,
            mode: session.mode,
        });
        if sender == Sender::User && session.mode == SessionMode::Experimental {
            session.ready_to_formalize = false;
        } else if sender.is_assistant() && !is_formalization && detect_readiness(content).is_ready {
            session.ready_to_formalize = true;
        }

        session.updated_at = next_revision(session.updated_at);
        session.last_activity = now;
        Ok(message)
    }

    async fn messages(&self, session_id: &str) -> Result<Option<Vec<Message>>> {
        Ok(self
            .state
            .lock()
            .await
            .sessions
            .get(session_id)
            .map(|session| session.messages.clone()))
    }

    async fn heartbeat(&self, session_id: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        let session = state
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| OptimismError::session_not_found(session_id))?;
        session.last_activity = now_millis();
        Ok(())
    }

    async fn delete(&self, session_id: &str) -> Result<bool> {
        let mut state = self.state.lock().await;
        state.ai_configs.remove(session_id);
        Ok(state.sessions.remove(session_id).is_some())
    }

    async fn list(&self) -> Result<Vec<Session>> {
        let state = self.state.lock().await;
        let mut sessions: Vec<Session> = state.sessions.values().cloned().collect();
        sessions.sort_by_key(|session| session.created_at);
        Ok(sessions)
    }

    async fn list_waiting(&self) -> Result<Vec<Session>> {
        Ok(self
            .list()
            .await?
            .into_iter()
            .filter(|session| session.status == SessionStatus::Waiting)
            .collect())
    }

    async fn clear(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        state.sessions.clear();
        state.ai_configs.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use optimism_core::session::ConfiguredBy;

    async fn experimental(store: &InMemorySessionStore) -> Session {
        store
            .create(NewSession::new(SessionMode::Experimental, "default-user"))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_starts_active() {
        let store = InMemorySessionStore::new();
        let session = experimental(&store).await;

        assert_eq!(session.status, SessionStatus::Active);
        assert!(session.messages.is_empty());
        assert!(!session.ready_to_formalize);
        assert_eq!(store.get(&session.id).await.unwrap(), Some(session));
    }

    #[tokio::test]
    async fn test_missing_session_is_soft() {
        let store = InMemorySessionStore::new();
        assert!(store.get("nope").await.unwrap().is_none());
        assert!(store
            .update("nope", SessionUpdate::status(SessionStatus::Completed))
            .await
            .unwrap()
            .is_none());
        assert!(!store.delete("nope").await.unwrap());
        assert!(store.messages("nope").await.unwrap().is_none());
        assert!(store.heartbeat("nope").await.unwrap_err().is_not_found());
        assert!(store
            .add_message("nope", Sender::User, "hi", None)
            .await
            .unwrap_err()
            .is_not_found());
    }

    #[tokio::test]
    async fn test_updates_strictly_increase_revision() {
        let store = InMemorySessionStore::new();
        let session = experimental(&store).await;

        let mut previous = session.updated_at;
        for _ in 0..5 {
            let updated = store
                .update(&session.id, SessionUpdate::default())
                .await
                .unwrap()
                .unwrap();
            assert!(updated.updated_at > previous);
            previous = updated.updated_at;
        }
    }

    #[tokio::test]
    async fn test_add_message_appends_one_in_order() {
        let store = InMemorySessionStore::new();
        let session = experimental(&store).await;

        let first = store
            .add_message(&session.id, Sender::User, "Initialize", None)
            .await
            .unwrap();
        let second = store
            .add_message(&session.id, Sender::Researcher, "Hello there", None)
            .await
            .unwrap();

        let stored = store.get(&session.id).await.unwrap().unwrap();
        assert_eq!(stored.messages.len(), 2);
        assert_eq!(stored.messages[0].id, first.id);
        assert_eq!(stored.messages[1].id, second.id);
        assert!(second.timestamp >= first.timestamp);
    }

    #[tokio::test]
    async fn test_experimental_status_side_effects() {
        let store = InMemorySessionStore::new();
        let session = experimental(&store).await;

        store
            .add_message(&session.id, Sender::User, "Minimise cost", None)
            .await
            .unwrap();
        let waiting = store.get(&session.id).await.unwrap().unwrap();
        assert_eq!(waiting.status, SessionStatus::Waiting);
        assert_eq!(store.list_waiting().await.unwrap().len(), 1);

        store
            .add_message(
                &session.id,
                Sender::Researcher,
                "I have enough information to formalize this.",
                None,
            )
            .await
            .unwrap();
        let active = store.get(&session.id).await.unwrap().unwrap();
        assert_eq!(active.status, SessionStatus::Active);
        assert!(active.ready_to_formalize);
        assert!(store.list_waiting().await.unwrap().is_empty());

        store
            .add_message(&session.id, Sender::User, "One more constraint", None)
            .await
            .unwrap();
        let cleared = store.get(&session.id).await.unwrap().unwrap();
        assert!(!cleared.ready_to_formalize);
    }

    #[tokio::test]
    async fn test_formalized_session_follows_new_messages() {
        let store = InMemorySessionStore::new();
        let session = experimental(&store).await;
        store
            .update(&session.id, SessionUpdate::status(SessionStatus::Formalized))
            .await
            .unwrap();

        store
            .add_message(&session.id, Sender::User, "Actually there is a fourth depot", None)
            .await
            .unwrap();
        let waiting = store.get(&session.id).await.unwrap().unwrap();
        assert_eq!(waiting.status, SessionStatus::Waiting);
        assert_eq!(store.list_waiting().await.unwrap().len(), 1);

        store
            .update(&session.id, SessionUpdate::status(SessionStatus::Formalized))
            .await
            .unwrap();
        store
            .add_message(&session.id, Sender::Researcher, "Noted, let me update it.", None)
            .await
            .unwrap();
        let active = store.get(&session.id).await.unwrap().unwrap();
        assert_eq!(active.status, SessionStatus::Active);
    }

    #[tokio::test]
    async fn test_ai_mode_user_message_stays_active() {
        let store = InMemorySessionStore::new();
        let session = store
            .create(NewSession::new(SessionMode::Ai, "default-user"))
            .await
            .unwrap();

        store
            .add_message(&session.id, Sender::User, "hello", None)
            .await
            .unwrap();
        let stored = store.get(&session.id).await.unwrap().unwrap();
        assert_eq!(stored.status, SessionStatus::Active);
    }

    #[tokio::test]
    async fn test_heartbeat_leaves_revision_alone() {
        let store = InMemorySessionStore::new();
        let session = experimental(&store).await;

        store.heartbeat(&session.id).await.unwrap();
        let stored = store.get(&session.id).await.unwrap().unwrap();
        assert_eq!(stored.updated_at, session.updated_at);
        assert_eq!(stored.status, session.status);
        assert!(stored.last_activity >= session.last_activity);
    }

    #[tokio::test]
    async fn test_completed_session_ignores_messages() {
        let store = InMemorySessionStore::new();
        let session = experimental(&store).await;
        store
            .update(&session.id, SessionUpdate::status(SessionStatus::Completed))
            .await
            .unwrap();

        store
            .add_message(&session.id, Sender::User, "still there?", None)
            .await
            .unwrap();
        let stored = store.get(&session.id).await.unwrap().unwrap();
        assert_eq!(stored.status, SessionStatus::Completed);
    }

    #[tokio::test]
    async fn test_clear() {
        let store = InMemorySessionStore::new();
        experimental(&store).await;
        experimental(&store).await;
        assert_eq!(store.list().await.unwrap().len(), 2);

        store.clear().await.unwrap();
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_ai_config_lifecycle() {
        let store = InMemorySessionStore::new();
        let session = experimental(&store).await;
        assert!(store.ai_config(&session.id).await.unwrap().is_none());

        let rejected = store
            .set_ai_config(
                &session.id,
                SetAiConfigRequest {
                    provider: AiProvider::Google,
                    api_key: "short".to_string(),
                    model: "gemini-2.5-flash".to_string(),
                    endpoint: None,
                    set_by: ConfiguredBy::Researcher,
                },
            )
            .await
            .unwrap_err();
        assert_eq!(
            rejected,
            OptimismError::Validation("Invalid API key format".to_string())
        );

        let config = store
            .set_ai_config(
                &session.id,
                SetAiConfigRequest {
                    provider: AiProvider::Google,
                    api_key: "AIzaSyExample".to_string(),
                    model: "gemini-2.5-flash".to_string(),
                    endpoint: None,
                    set_by: ConfiguredBy::Researcher,
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(config.status, AiConfigStatus::Connected);

        let key = store.ai_config_key(&session.id).await.unwrap().unwrap();
        assert_eq!(key.api_key, "AIzaSyExample");

        let validation = store
            .validate_ai_config(&session.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(validation.status, AiConfigStatus::Connected);
        assert_eq!(validation.message, "Validation successful");
    }
}
