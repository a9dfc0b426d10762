//! Text-generation collaborator trait.

use crate::error::Result;
use async_trait::async_trait;

/// An external service that turns a prompt into text.
///
/// Implementations report authentication, validation and network problems
/// through [`crate::OptimismError`]; they never return an error string inside
/// `Ok`.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Short description used in logs.
    fn expertise(&self) -> &str;

    /// Generates the full text for `prompt`.
    async fn generate(&self, prompt: &str) -> Result<String>;
}
