//! GeminiApiAgent - Direct REST API implementation for Gemini.

use crate::http_error::{map_http_error, map_send_error, parse_retry_after};
use async_trait::async_trait;
use optimism_core::{OptimismError, Result, TextGenerator};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
const BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const TARGET: &str = "gemini generateContent";

/// Text generator that talks to the Gemini HTTP API.
#[derive(Clone)]
pub struct GeminiApiAgent {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    system_instruction: Option<String>,
}

impl GeminiApiAgent {
    /// Creates a new agent with the provided API key and model.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            model: model.into(),
            base_url: BASE_URL.to_string(),
            system_instruction: None,
        }
    }

    /// Overrides the models endpoint (proxies, tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Adds a system instruction that will be sent alongside every request.
    pub fn with_system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = Some(instruction.into());
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn send_request(&self, body: &GenerateContentRequest) -> Result<String> {
        let url = format!(
            "{}/{model}:generateContent?key={api_key}",
            self.base_url,
            model = self.model,
            api_key = self.api_key
        );

        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|err| map_send_error(TARGET, err.without_url()))?;

        if !response.status().is_success() {
            let status = response.status();
            let retry_after = parse_retry_after(response.headers().get("retry-after"));
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read Gemini error body".to_string());
            return Err(map_http_error(
                TARGET,
                status,
                error_message(status, &body_text),
                retry_after,
            ));
        }

        let parsed: GenerateContentResponse =
            response
                .json()
                .await
                .map_err(|err| OptimismError::Serialization {
                    format: "JSON".to_string(),
                    message: format!("Failed to parse Gemini response: {err}"),
                })?;

        extract_text_response(parsed)
    }
}

#[async_trait]
impl TextGenerator for GeminiApiAgent {
    fn expertise(&self) -> &str {
        "Gemini API agent"
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let contents = vec![Content {
            role: "user".to_string(),
            parts: vec![Part {
                text: prompt.to_string(),
            }],
        }];

        let system_instruction = self.system_instruction.as_ref().map(|text| Content {
            role: "system".to_string(),
            parts: vec![Part {
                text: text.to_string(),
            }],
        });

        let request = GenerateContentRequest {
            contents,
            system_instruction,
        };
        self.send_request(&request).await
    }
}

#[derive(Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
}

#[derive(Serialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Part {
    text: String,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<ContentResponse>,
}

#[derive(Deserialize)]
struct ContentResponse {
    parts: Vec<PartResponse>,
}

#[derive(Deserialize)]
struct PartResponse {
    text: Option<String>,
}

#[derive(Deserialize)]
struct ErrorWrapper {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
    status: Option<String>,
}

/// Concatenates the text parts of the first candidate.
fn extract_text_response(response: GenerateContentResponse) -> Result<String> {
    let text: String = response
        .candidates
        .and_then(|candidates| candidates.into_iter().next())
        .and_then(|candidate| candidate.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect()
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(OptimismError::EmptyResponse);
    }
    Ok(text)
}

fn error_message(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<ErrorWrapper>(body)
        .map(|wrapper| {
            let status_text = wrapper.error.status.unwrap_or_default();
            let msg = wrapper.error.message.unwrap_or_else(|| body.to_string());
            if status_text.is_empty() {
                msg
            } else {
                format!("{status_text}: {msg}")
            }
        })
        .unwrap_or_else(|_| format!("{}: {}", status, body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Path;
    use axum::http::StatusCode as AxumStatus;
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{Value, json};

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[test]
    fn test_extract_joins_parts() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{"content": {"parts": [{"text": "Objective: "}, {"text": "minimise cost"}]}}]
        }))
        .unwrap();
        assert_eq!(extract_text_response(response).unwrap(), "Objective: minimise cost");
    }

    #[test]
    fn test_extract_without_candidates_is_empty() {
        let response: GenerateContentResponse = serde_json::from_value(json!({})).unwrap();
        assert_eq!(
            extract_text_response(response).unwrap_err(),
            OptimismError::EmptyResponse
        );
    }

    #[test]
    fn test_error_message_uses_status_text() {
        let body = r#"{"error":{"code":400,"message":"API key not valid.","status":"INVALID_ARGUMENT"}}"#;
        assert_eq!(
            error_message(StatusCode::BAD_REQUEST, body),
            "INVALID_ARGUMENT: API key not valid."
        );
    }

    #[tokio::test]
    async fn test_generate_against_local_server() {
        let router = Router::new().route(
            "/:call",
            post(|Path(call): Path<String>, Json(body): Json<Value>| async move {
                assert_eq!(call, "gemini-test:generateContent");
                let prompt = body["contents"][0]["parts"][0]["text"].as_str().unwrap_or("");
                Json(json!({
                    "candidates": [{"content": {"parts": [{"text": format!("echo: {}", prompt)}]}}]
                }))
            }),
        );
        let url = serve(router).await;

        let agent = GeminiApiAgent::new("AIza-test", "gemini-test").with_base_url(url);
        assert_eq!(agent.generate("hello").await.unwrap(), "echo: hello");
    }

    #[tokio::test]
    async fn test_generate_maps_auth_failure() {
        let router = Router::new().route(
            "/:call",
            post(|| async {
                (
                    AxumStatus::BAD_REQUEST,
                    Json(json!({"error": {"message": "API key not valid.", "status": "API_KEY_INVALID"}})),
                )
            }),
        );
        let url = serve(router).await;

        let agent = GeminiApiAgent::new("bad", "gemini-test").with_base_url(url);
        let err = agent.generate("hello").await.unwrap_err();
        assert!(matches!(
            err,
            OptimismError::Server { status: 400, ref message, .. } if message.contains("API_KEY_INVALID")
        ));
    }
}
