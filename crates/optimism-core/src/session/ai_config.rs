//! Per-session text-generation provider configuration.
//!
//! The store keeps the API key encrypted and only hands it out through the
//! dedicated key endpoint; status reads never include it.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// Supported text-generation providers.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AiProvider {
    Openai,
    Anthropic,
    Google,
    Ollama,
    Custom,
}

impl AiProvider {
    pub fn requires_api_key(&self) -> bool {
        !matches!(self, AiProvider::Ollama)
    }

    pub fn default_endpoint(&self) -> Option<&'static str> {
        match self {
            AiProvider::Ollama => Some("http://localhost:11434"),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AiConfigStatus {
    Connected,
    Error,
}

/// Which actor configured the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ConfiguredBy {
    User,
    Researcher,
}

/// Status view of a session's provider configuration (no key).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiConfig {
    pub session_id: String,
    pub provider: AiProvider,
    pub model: String,
    #[serde(default)]
    pub endpoint: Option<String>,
    pub status: AiConfigStatus,
    #[serde(default)]
    pub last_validated: Option<i64>,
    pub set_by: ConfiguredBy,
    pub set_at: i64,
    #[serde(default)]
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetAiConfigRequest {
    pub provider: AiProvider,
    pub api_key: String,
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    pub set_by: ConfiguredBy,
}

/// Decrypted key plus routing info, for client-side generation.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiConfigKey {
    pub api_key: String,
    pub provider: AiProvider,
    pub model: String,
    #[serde(default)]
    pub endpoint: Option<String>,
    pub status: AiConfigStatus,
}

impl std::fmt::Debug for AiConfigKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AiConfigKey")
            .field("api_key", &"<redacted>")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("endpoint", &self.endpoint)
            .field("status", &self.status)
            .finish()
    }
}

/// Result of `POST /sessions/:id/ai-config/validate`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiConfigValidation {
    pub status: AiConfigStatus,
    pub message: String,
    #[serde(default)]
    pub last_validated: Option<i64>,
}
