use super::{AppContext, print_json};
use anyhow::Result;
use optimism_application::{FormalizationWorkflow, PersistOutcome, reset_formalization};
use optimism_core::session::MessageMetadata;

pub async fn formalize(app: &AppContext, session_id: &str) -> Result<()> {
    let generator = app.generator(session_id).await?;
    let workflow = FormalizationWorkflow::new(app.store.clone(), generator);
    let outcome = workflow.formalize(session_id).await?;

    print_json(&outcome.message)?;
    if outcome.incomplete {
        println!("Formalization is incomplete; continue the conversation and retry.");
    } else if let Some(session) = outcome.session {
        println!("✓ Session {} is {}", session.id, session.status);
    }
    Ok(())
}

pub async fn reset(app: &AppContext, session_id: &str) -> Result<()> {
    let session = reset_formalization(app.store.as_ref(), session_id).await?;
    println!("Session {} is {}", session.id, session.status);
    Ok(())
}

pub async fn controls(
    app: &AppContext,
    session_id: &str,
    message_id: &str,
    failed: Option<String>,
) -> Result<()> {
    let metadata = match failed {
        Some(error) => MessageMetadata::controls_failed(error),
        None => MessageMetadata::controls_generated(),
    };
    let persister = app.persister()?;

    match persister
        .persist_and_reconcile(session_id, message_id, metadata)
        .await?
    {
        PersistOutcome::Persisted { attempts } => {
            println!("✓ Recorded on {} after {} attempt(s)", message_id, attempts);
        }
        PersistOutcome::LocalOverride { attempts } => {
            if persister.is_overridden(session_id, message_id).await? {
                println!(
                    "Store did not accept the flag after {} attempts; kept locally for {}",
                    attempts, message_id
                );
            } else {
                println!("✓ Recorded on {} after the store recovered", message_id);
            }
        }
        PersistOutcome::Failed { attempts, error } => {
            anyhow::bail!("Could not record the failure after {} attempts: {}", attempts, error)
        }
    }
    Ok(())
}
