//! Provider connection validation.
//!
//! Sends one tiny generation request and reports a normalised outcome. The
//! whole check is bounded; a slow provider is reported as an error, never
//! left pending.

use crate::build_generator;
use crate::prompts::connection_probe;
use optimism_core::session::AiProvider;
use optimism_core::{OptimismError, TextGenerator};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const CONNECTION_VALIDATION_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ValidationStatus {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    pub status: ValidationStatus,
    pub message: String,
    pub provider: AiProvider,
    pub model: String,
}

impl ValidationOutcome {
    pub fn is_success(&self) -> bool {
        self.status == ValidationStatus::Success
    }

    fn error(provider: AiProvider, model: &str, message: impl Into<String>) -> Self {
        Self {
            status: ValidationStatus::Error,
            message: message.into(),
            provider,
            model: model.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConnectionValidator {
    timeout: Duration,
}

impl Default for ConnectionValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionValidator {
    pub fn new() -> Self {
        Self {
            timeout: CONNECTION_VALIDATION_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Builds a generator for the provider and probes it.
    pub async fn validate(
        &self,
        provider: AiProvider,
        api_key: Option<&str>,
        model: &str,
        endpoint: Option<&str>,
    ) -> ValidationOutcome {
        match build_generator(provider, api_key, model, endpoint) {
            Ok(generator) => self.probe(generator.as_ref(), provider, model).await,
            Err(err) => ValidationOutcome::error(provider, model, normalize_error(&err, model)),
        }
    }

    /// Probes an already-built generator.
    pub async fn probe(
        &self,
        generator: &dyn TextGenerator,
        provider: AiProvider,
        model: &str,
    ) -> ValidationOutcome {
        let result = tokio::time::timeout(self.timeout, generator.generate(connection_probe())).await;

        match result {
            Err(_) => {
                tracing::warn!(
                    "[ConnectionValidator] {} {} did not answer within {:?}",
                    provider,
                    model,
                    self.timeout
                );
                ValidationOutcome::error(
                    provider,
                    model,
                    format!(
                        "Connection timed out after {}s",
                        self.timeout.as_secs_f32()
                    ),
                )
            }
            // The provider answered; an empty reply still proves the connection.
            Ok(Ok(_)) | Ok(Err(OptimismError::EmptyResponse)) => {
                tracing::info!("[ConnectionValidator] Connected to {} {}", provider, model);
                ValidationOutcome {
                    status: ValidationStatus::Success,
                    message: format!("Successfully connected to {} {}", provider, model),
                    provider,
                    model: model.to_string(),
                }
            }
            Ok(Err(err)) => {
                tracing::warn!(
                    "[ConnectionValidator] {} {} failed: {}",
                    provider,
                    model,
                    err
                );
                ValidationOutcome::error(provider, model, normalize_error(&err, model))
            }
        }
    }
}

/// Maps provider failures onto the messages users see.
fn normalize_error(err: &OptimismError, model: &str) -> String {
    let text = err.to_string().to_lowercase();
    let invalid_key = text.contains("api_key_invalid")
        || text.contains("invalid api key")
        || text.contains("api key not valid")
        || matches!(err, OptimismError::Server { status: 401 | 403, .. });
    if invalid_key {
        return "Invalid API key".to_string();
    }

    let missing_model = text.contains("not found")
        || text.contains("does not exist")
        || matches!(err, OptimismError::Server { status: 404, .. });
    if missing_model {
        return format!("Model '{}' not found", model);
    }

    match err {
        OptimismError::Validation(message) | OptimismError::Config(message) => message.clone(),
        OptimismError::Unreachable(message) => format!("Cannot connect to provider: {}", message),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct Scripted(std::result::Result<String, OptimismError>);

    #[async_trait]
    impl TextGenerator for Scripted {
        fn expertise(&self) -> &str {
            "scripted"
        }

        async fn generate(&self, _prompt: &str) -> optimism_core::Result<String> {
            self.0.clone()
        }
    }

    struct Stalled;

    #[async_trait]
    impl TextGenerator for Stalled {
        fn expertise(&self) -> &str {
            "stalled"
        }

        async fn generate(&self, _prompt: &str) -> optimism_core::Result<String> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok("late".to_string())
        }
    }

    #[tokio::test]
    async fn test_success() {
        let outcome = ConnectionValidator::new()
            .probe(&Scripted(Ok("ok".into())), AiProvider::Google, "gemini-2.5-flash")
            .await;
        assert!(outcome.is_success());
        assert_eq!(
            outcome.message,
            "Successfully connected to google gemini-2.5-flash"
        );
    }

    #[tokio::test]
    async fn test_invalid_key_is_normalized() {
        let failing = Scripted(Err(OptimismError::server(
            400,
            "gemini generateContent",
            "API_KEY_INVALID: API key not valid.",
        )));
        let outcome = ConnectionValidator::new()
            .probe(&failing, AiProvider::Google, "gemini-2.5-flash")
            .await;
        assert_eq!(outcome.status, ValidationStatus::Error);
        assert_eq!(outcome.message, "Invalid API key");
    }

    #[tokio::test]
    async fn test_missing_model_is_normalized() {
        let failing = Scripted(Err(OptimismError::server(
            404,
            "chat completions",
            "no such model",
        )));
        let outcome = ConnectionValidator::new()
            .probe(&failing, AiProvider::Openai, "gpt-9")
            .await;
        assert_eq!(outcome.message, "Model 'gpt-9' not found");
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_an_error_outcome() {
        let started = tokio::time::Instant::now();
        let outcome = ConnectionValidator::new()
            .probe(&Stalled, AiProvider::Ollama, "llama3")
            .await;

        assert_eq!(outcome.status, ValidationStatus::Error);
        assert_eq!(outcome.message, "Connection timed out after 10s");
        assert_eq!(started.elapsed(), CONNECTION_VALIDATION_TIMEOUT);
    }

    #[tokio::test]
    async fn test_missing_key_never_reaches_provider() {
        let outcome = ConnectionValidator::new()
            .validate(AiProvider::Google, None, "gemini-2.5-flash", None)
            .await;
        assert_eq!(outcome.message, "API key cannot be empty");

        let outcome = ConnectionValidator::new()
            .validate(AiProvider::Custom, Some("k"), "m", None)
            .await;
        assert_eq!(outcome.message, "Custom endpoint URL is required");
    }

    #[test]
    fn test_outcome_wire_shape() {
        let outcome = ValidationOutcome::error(AiProvider::Anthropic, "claude", "Invalid API key");
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value["status"], "error");
        assert_eq!(value["provider"], "anthropic");
    }
}
