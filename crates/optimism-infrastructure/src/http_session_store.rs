//! HttpSessionStore - JSON-over-HTTP client for the remote session store.
//!
//! Every call is a single request with a bounded timeout. Nothing is retried
//! here; retry policy belongs to the callers.

use async_trait::async_trait;
use optimism_core::session::{
    AiConfig, AiConfigKey, AiConfigValidation, Message, MessageMetadata, NewSession, Sender,
    Session, SessionStore, SessionUpdate, SetAiConfigRequest,
};
use optimism_core::{OptimismError, Result};
use reqwest::{Client, Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;

/// Upper bound for the lightweight `GET /` probe.
pub const HEALTH_PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Default upper bound for ordinary store calls.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Serialize)]
struct AddMessageRequest<'a> {
    sender: Sender,
    content: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    metadata: Option<&'a MessageMetadata>,
}

/// Session store reached over HTTP.
#[derive(Clone)]
pub struct HttpSessionStore {
    client: Client,
    base_url: String,
    request_timeout: Duration,
}

impl HttpSessionStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Probes `GET /` with a 2 second bound.
    pub async fn health(&self) -> Result<()> {
        let url = format!("{}/", self.base_url);
        let probe = self.client.get(&url).send();

        match tokio::time::timeout(HEALTH_PROBE_TIMEOUT, probe).await {
            Err(_) => {
                tracing::warn!("[HttpSessionStore] Health probe timed out: {}", url);
                Err(OptimismError::timeout(
                    "health probe",
                    HEALTH_PROBE_TIMEOUT.as_millis() as u64,
                ))
            }
            Ok(Err(e)) => Err(e.into()),
            Ok(Ok(response)) if response.status().is_success() => Ok(()),
            Ok(Ok(response)) => Err(OptimismError::server(
                response.status().as_u16(),
                "GET /",
                "health probe failed",
            )),
        }
    }

    /// Status view of the session's provider configuration.
    pub async fn ai_config(&self, session_id: &str) -> Result<Option<AiConfig>> {
        self.execute::<AiConfig, ()>(Method::GET, &format!("/sessions/{}/ai-config", session_id), None)
            .await
    }

    pub async fn set_ai_config(
        &self,
        session_id: &str,
        request: &SetAiConfigRequest,
    ) -> Result<Option<AiConfig>> {
        self.execute(
            Method::POST,
            &format!("/sessions/{}/ai-config", session_id),
            Some(request),
        )
        .await
    }

    pub async fn ai_config_key(&self, session_id: &str) -> Result<Option<AiConfigKey>> {
        self.execute::<AiConfigKey, ()>(
            Method::GET,
            &format!("/sessions/{}/ai-config/key", session_id),
            None,
        )
        .await
    }

    pub async fn validate_ai_config(&self, session_id: &str) -> Result<Option<AiConfigValidation>> {
        self.execute::<AiConfigValidation, ()>(
            Method::POST,
            &format!("/sessions/{}/ai-config/validate", session_id),
            None,
        )
        .await
    }

    /// Sends one request and decodes the answer.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(T))`: 2xx with a decodable body
    /// - `Ok(None)`: 404 carrying a JSON object (the store's "not found" shape)
    /// - `Err(_)`: anything else, logged with the request and payload
    async fn execute<T, B>(&self, method: Method, path: &str, body: Option<&B>) -> Result<Option<T>>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let url = format!("{}{}", self.base_url, path);
        let request_line = format!("{} {}", method, path);

        let payload = body.map(serde_json::to_value).transpose()?;

        let mut request = self
            .client
            .request(method, &url)
            .timeout(self.request_timeout);
        if let Some(payload) = &payload {
            request = request.json(payload);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                let err = OptimismError::from(e);
                tracing::warn!(
                    request = %request_line,
                    "[HttpSessionStore] Request failed: {}",
                    err
                );
                return Err(err);
            }
        };

        let status = response.status();
        if status.is_success() {
            return Ok(Some(response.json::<T>().await?));
        }

        let text = response.text().await.unwrap_or_default();
        let parsed: Option<Value> = serde_json::from_str(&text).ok();

        if status == StatusCode::NOT_FOUND && parsed.as_ref().is_some_and(Value::is_object) {
            tracing::debug!(request = %request_line, "[HttpSessionStore] Not found");
            return Ok(None);
        }

        let detail = parsed
            .as_ref()
            .and_then(|value| value.get("detail"))
            .map(|detail| match detail {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .unwrap_or(text);

        if matches!(
            status,
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY
        ) {
            tracing::warn!(
                request = %request_line,
                status = status.as_u16(),
                "[HttpSessionStore] Rejected: {}",
                detail
            );
            return Err(OptimismError::Validation(detail));
        }

        tracing::error!(
            request = %request_line,
            status = status.as_u16(),
            payload = %payload.as_ref().map(serde_json::Value::to_string).unwrap_or_default(),
            "[HttpSessionStore] Server error: {}",
            detail
        );
        Err(OptimismError::server(status.as_u16(), request_line, detail))
    }
}

#[async_trait]
impl SessionStore for HttpSessionStore {
    async fn create(&self, request: NewSession) -> Result<Session> {
        let created: Option<Session> = self
            .execute(Method::POST, "/sessions", Some(&request))
            .await?;
        created.ok_or_else(|| OptimismError::server(404, "POST /sessions", "endpoint not found"))
    }

    async fn get(&self, session_id: &str) -> Result<Option<Session>> {
        self.execute::<Session, ()>(Method::GET, &format!("/sessions/{}", session_id), None)
            .await
    }

    async fn update(&self, session_id: &str, update: SessionUpdate) -> Result<Option<Session>> {
        self.execute(
            Method::PUT,
            &format!("/sessions/{}", session_id),
            Some(&update),
        )
        .await
    }

    async fn add_message(
        &self,
        session_id: &str,
        sender: Sender,
        content: &str,
        metadata: Option<MessageMetadata>,
    ) -> Result<Message> {
        let body = AddMessageRequest {
            sender,
            content,
            metadata: metadata.as_ref(),
        };
        let message: Option<Message> = self
            .execute(
                Method::POST,
                &format!("/sessions/{}/messages", session_id),
                Some(&body),
            )
            .await?;
        message.ok_or_else(|| OptimismError::session_not_found(session_id))
    }

    async fn messages(&self, session_id: &str) -> Result<Option<Vec<Message>>> {
        self.execute::<Vec<Message>, ()>(
            Method::GET,
            &format!("/sessions/{}/messages", session_id),
            None,
        )
        .await
    }

    async fn heartbeat(&self, session_id: &str) -> Result<()> {
        self.execute::<Value, ()>(
            Method::POST,
            &format!("/sessions/{}/heartbeat", session_id),
            None,
        )
        .await?
        .map(|_| ())
        .ok_or_else(|| OptimismError::session_not_found(session_id))
    }

    async fn delete(&self, session_id: &str) -> Result<bool> {
        let deleted = self
            .execute::<Value, ()>(Method::DELETE, &format!("/sessions/{}", session_id), None)
            .await?;
        Ok(deleted.is_some())
    }

    async fn list(&self) -> Result<Vec<Session>> {
        Ok(self
            .execute::<Vec<Session>, ()>(Method::GET, "/sessions", None)
            .await?
            .unwrap_or_default())
    }

    async fn list_waiting(&self) -> Result<Vec<Session>> {
        Ok(self
            .execute::<Vec<Session>, ()>(Method::GET, "/sessions/waiting", None)
            .await?
            .unwrap_or_default())
    }

    async fn clear(&self) -> Result<()> {
        self.execute::<Value, ()>(Method::DELETE, "/sessions/clear", None)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_is_normalized() {
        let store = HttpSessionStore::new("http://localhost:8000/");
        assert_eq!(store.base_url(), "http://localhost:8000");
    }

    #[test]
    fn test_add_message_body_shape() {
        let metadata = MessageMetadata::formalization(false);
        let body = AddMessageRequest {
            sender: Sender::Ai,
            content: "Objective: ...",
            metadata: Some(&metadata),
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["sender"], "ai");
        assert_eq!(value["metadata"]["type"], "formalization");

        let body = AddMessageRequest {
            sender: Sender::User,
            content: "hi",
            metadata: None,
        };
        assert!(serde_json::to_value(&body).unwrap().get("metadata").is_none());
    }

    #[tokio::test]
    async fn test_unreachable_store() {
        // Port 9 (discard) is closed on test machines.
        let store = HttpSessionStore::new("http://127.0.0.1:9")
            .with_request_timeout(Duration::from_millis(500));
        let err = store.get("s1").await.unwrap_err();
        assert!(matches!(err, OptimismError::Unreachable(_)));
        assert!(err.is_transient());
    }
}
