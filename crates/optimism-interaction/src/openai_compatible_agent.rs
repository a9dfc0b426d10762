//! OpenAiCompatibleAgent - Chat Completions client.
//!
//! Covers OpenAI itself plus any server exposing the same
//! `/chat/completions` shape (Ollama's `/v1`, self-hosted gateways).

use crate::http_error::{map_http_error, map_send_error, parse_retry_after};
use async_trait::async_trait;
use optimism_core::{OptimismError, Result, TextGenerator};
use reqwest::Client;
use serde::{Deserialize, Serialize};

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const TARGET: &str = "chat completions";

/// Text generator for OpenAI-compatible chat endpoints.
#[derive(Clone)]
pub struct OpenAiCompatibleAgent {
    client: Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
    max_tokens: Option<u32>,
}

impl OpenAiCompatibleAgent {
    /// OpenAI proper.
    pub fn openai(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self::new(OPENAI_BASE_URL, Some(api_key.into()), model)
    }

    /// A local Ollama server; `endpoint` is the server root
    /// (e.g. `http://localhost:11434`).
    pub fn ollama(endpoint: &str, model: impl Into<String>) -> Self {
        Self::new(
            format!("{}/v1", endpoint.trim_end_matches('/')),
            None,
            model,
        )
    }

    /// Any endpoint serving `{base_url}/chat/completions`.
    pub fn new(base_url: impl Into<String>, api_key: Option<String>, model: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            client: Client::new(),
            api_key: api_key.filter(|key| !key.is_empty()),
            model: model.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
            max_tokens: None,
        }
    }

    /// Sets the maximum number of tokens to generate.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn send_request(&self, body: &ChatCompletionRequest) -> Result<String> {
        let mut request = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .json(body);
        if let Some(api_key) = &self.api_key {
            request = request.header("Authorization", format!("Bearer {}", api_key));
        }

        let response = request
            .send()
            .await
            .map_err(|err| map_send_error(TARGET, err))?;

        if !response.status().is_success() {
            let status = response.status();
            let retry_after = parse_retry_after(response.headers().get("retry-after"));
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            let message = serde_json::from_str::<ErrorResponse>(&body_text)
                .map(|wrapper| wrapper.error.message)
                .unwrap_or(body_text);
            return Err(map_http_error(TARGET, status, message, retry_after));
        }

        let parsed: ChatCompletionResponse =
            response
                .json()
                .await
                .map_err(|err| OptimismError::Serialization {
                    format: "JSON".to_string(),
                    message: format!("Failed to parse chat completion: {err}"),
                })?;

        extract_text_response(parsed)
    }
}

#[async_trait]
impl TextGenerator for OpenAiCompatibleAgent {
    fn expertise(&self) -> &str {
        "OpenAI-compatible chat agent"
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            max_tokens: self.max_tokens,
        };

        self.send_request(&request).await
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

fn extract_text_response(response: ChatCompletionResponse) -> Result<String> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|text| !text.trim().is_empty())
        .ok_or(OptimismError::EmptyResponse)
}
