use super::{AppContext, print_json};
use anyhow::{Context, Result};
use optimism_core::session::{AiProvider, ConfiguredBy, SetAiConfigRequest};
use optimism_interaction::ConnectionValidator;

pub async fn validate(
    app: &AppContext,
    provider: Option<AiProvider>,
    model: Option<String>,
    endpoint: Option<String>,
) -> Result<()> {
    let generation = &app.config.generation;
    let provider = provider.unwrap_or(generation.provider);
    let model = model.unwrap_or_else(|| generation.model.clone());
    let endpoint = endpoint.or_else(|| generation.endpoint.clone());
    let api_key = generation.api_key();

    let outcome = ConnectionValidator::new()
        .validate(provider, api_key.as_deref(), &model, endpoint.as_deref())
        .await;
    print_json(&outcome)?;

    if !outcome.is_success() {
        anyhow::bail!("{}", outcome.message);
    }
    Ok(())
}

/// Validates locally first, then stores the configuration on the session.
pub async fn set(
    app: &AppContext,
    session_id: &str,
    provider: AiProvider,
    model: String,
    endpoint: Option<String>,
    set_by: ConfiguredBy,
) -> Result<()> {
    let api_key = app.config.generation.api_key().unwrap_or_default();

    let outcome = ConnectionValidator::new()
        .validate(provider, Some(&api_key), &model, endpoint.as_deref())
        .await;
    if !outcome.is_success() {
        anyhow::bail!("Provider check failed: {}", outcome.message);
    }

    let request = SetAiConfigRequest {
        provider,
        api_key,
        model,
        endpoint,
        set_by,
    };
    let config = app
        .store
        .set_ai_config(session_id, &request)
        .await?
        .with_context(|| format!("Session {} not found", session_id))?;
    print_json(&config)
}

pub async fn show(app: &AppContext, session_id: &str) -> Result<()> {
    match app.store.ai_config(session_id).await? {
        Some(config) => print_json(&config),
        None => {
            println!("No provider configured on {}", session_id);
            Ok(())
        }
    }
}

pub async fn verify(app: &AppContext, session_id: &str) -> Result<()> {
    let validation = app
        .store
        .validate_ai_config(session_id)
        .await?
        .with_context(|| format!("No provider configured on {}", session_id))?;
    println!("{}: {}", validation.status, validation.message);
    Ok(())
}
