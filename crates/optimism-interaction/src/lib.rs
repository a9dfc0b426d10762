//! Text-generation collaborators and provider validation.

pub mod claude_api_agent;
pub mod connection_validator;
pub mod gemini_api_agent;
mod http_error;
pub mod openai_compatible_agent;
pub mod prompts;

pub use claude_api_agent::ClaudeApiAgent;
pub use connection_validator::{
    CONNECTION_VALIDATION_TIMEOUT, ConnectionValidator, ValidationOutcome, ValidationStatus,
};
pub use gemini_api_agent::GeminiApiAgent;
pub use openai_compatible_agent::OpenAiCompatibleAgent;

use optimism_core::session::AiProvider;
use optimism_core::{OptimismError, Result, TextGenerator};
use std::sync::Arc;

/// Builds the generator for a provider.
///
/// Fails with `Validation` when a required key or endpoint is missing.
pub fn build_generator(
    provider: AiProvider,
    api_key: Option<&str>,
    model: &str,
    endpoint: Option<&str>,
) -> Result<Arc<dyn TextGenerator>> {
    let api_key = api_key.map(str::trim).filter(|key| !key.is_empty());
    let require_key = || {
        api_key.ok_or_else(|| OptimismError::Validation("API key cannot be empty".to_string()))
    };

    let generator: Arc<dyn TextGenerator> = match provider {
        AiProvider::Google => {
            let agent = GeminiApiAgent::new(require_key()?, model);
            match endpoint {
                Some(endpoint) => Arc::new(agent.with_base_url(endpoint)),
                None => Arc::new(agent),
            }
        }
        AiProvider::Openai => Arc::new(OpenAiCompatibleAgent::new(
            endpoint.unwrap_or(openai_compatible_agent::OPENAI_BASE_URL),
            Some(require_key()?.to_string()),
            model,
        )),
        AiProvider::Anthropic => {
            let agent = ClaudeApiAgent::new(require_key()?, model);
            match endpoint {
                Some(endpoint) => Arc::new(agent.with_base_url(endpoint)),
                None => Arc::new(agent),
            }
        }
        AiProvider::Ollama => {
            let endpoint = endpoint
                .or(provider.default_endpoint())
                .unwrap_or("http://localhost:11434");
            Arc::new(OpenAiCompatibleAgent::ollama(endpoint, model))
        }
        AiProvider::Custom => {
            let endpoint = endpoint.ok_or_else(|| {
                OptimismError::Validation("Custom endpoint URL is required".to_string())
            })?;
            Arc::new(OpenAiCompatibleAgent::new(
                endpoint,
                api_key.map(str::to_string),
                model,
            ))
        }
    };

    tracing::debug!(
        "[Interaction] Built {} generator for {} {}",
        generator.expertise(),
        provider,
        model
    );
    Ok(generator)
}
