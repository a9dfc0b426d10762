//! Error types for the AI Optimism session layer.

use serde::Serialize;
use thiserror::Error;

/// A shared error type for every crate in the workspace.
///
/// The variants follow the failure taxonomy callers branch on:
/// `NotFound` is soft and expected, `Unreachable`/`Network` are transient,
/// `Server` is an unexpected remote failure, and `Validation`/`EmptyResponse`
/// come from the text-generation collaborator.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
pub enum OptimismError {
    /// Entity not found error with type information
    #[error("Entity not found: {entity_type} '{id}'")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },

    /// The remote endpoint could not be reached at all (connect failure, timeout)
    #[error("Cannot connect: {0}")]
    Unreachable(String),

    /// Transport failure after a connection was made
    #[error("Network error: {0}")]
    Network(String),

    /// Unexpected 5xx-class (or otherwise unmapped) remote failure
    #[error("Server error {status} on {target}: {message}")]
    Server {
        status: u16,
        target: String,
        message: String,
    },

    /// The generation collaborator returned malformed or incomplete data
    #[error("Validation error: {0}")]
    Validation(String),

    /// The generation collaborator produced no usable text
    #[error("Generation produced an empty response")]
    EmptyResponse,

    /// A bounded operation did not finish in time
    #[error("{operation} timed out after {after_ms}ms")]
    Timeout { operation: String, after_ms: u64 },

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization { format: String, message: String },

    /// IO error (file system operations)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl OptimismError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    /// Creates a NotFound error
    pub fn not_found(entity_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type,
            id: id.into(),
        }
    }

    /// Creates a NotFound error for a session
    pub fn session_not_found(id: impl Into<String>) -> Self {
        Self::not_found("Session", id)
    }

    /// Creates a Server error
    pub fn server(status: u16, target: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Server {
            status,
            target: target.into(),
            message: message.into(),
        }
    }

    /// Creates a Timeout error
    pub fn timeout(operation: impl Into<String>, after_ms: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            after_ms,
        }
    }

    /// Creates an IO error
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    /// Check if this is a NotFound error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this error is worth retrying (connectivity, timeouts, 5xx).
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Unreachable(_) | Self::Network(_) | Self::Timeout { .. } => true,
            Self::Server { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for OptimismError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for OptimismError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for OptimismError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::ser::Error> for OptimismError {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

/// Transport errors. Status errors are mapped by the caller, which knows the
/// request target; this conversion covers connect/timeout/decode failures.
impl From<reqwest::Error> for OptimismError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() {
            Self::Unreachable(err.to_string())
        } else if err.is_decode() {
            Self::Serialization {
                format: "JSON".to_string(),
                message: err.to_string(),
            }
        } else if let Some(status) = err.status() {
            let target = err
                .url()
                .map(|url| url.path().to_string())
                .unwrap_or_default();
            Self::server(status.as_u16(), target, err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

/// Conversion from anyhow::Error (for collaborator glue code)
impl From<anyhow::Error> for OptimismError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// A type alias for `Result<T, OptimismError>`.
pub type Result<T> = std::result::Result<T, OptimismError>;
