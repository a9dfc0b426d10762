use super::{AppContext, print_json, summarize};
use anyhow::{Context, Result};
use optimism_application::{ReadinessAction, ReadinessMonitor};
use optimism_core::session::{
    NewSession, Sender, SessionMode, SessionStore, SessionUpdate, StatusTrigger,
};

pub async fn create(app: &AppContext, mode: SessionMode, researcher: Option<String>) -> Result<()> {
    let mut request = NewSession::new(mode, app.config.user_id.clone());
    if let Some(researcher) = researcher.or_else(|| app.config.researcher_id.clone()) {
        request = request.with_researcher(researcher);
    }

    let session = app
        .store
        .create(request)
        .await
        .context("Cannot create session")?;
    print_json(&session)
}

pub async fn show(app: &AppContext, session_id: &str) -> Result<()> {
    let Some(session) = app.store.get(session_id).await? else {
        anyhow::bail!("Session {} not found", session_id);
    };
    let view = app.persister()?.apply_overrides(&session).await?;
    print_json(&view)
}

pub async fn list(app: &AppContext, waiting: bool) -> Result<()> {
    let sessions = if waiting {
        app.store.list_waiting().await?
    } else {
        app.store.list().await?
    };

    if sessions.is_empty() {
        println!("No sessions");
    }
    for session in &sessions {
        println!("{}", summarize(session));
    }
    Ok(())
}

pub async fn say(app: &AppContext, session_id: &str, sender: Sender, content: &str) -> Result<()> {
    let message = app
        .store
        .add_message(session_id, sender, content, None)
        .await?;
    print_json(&message)?;

    if sender.is_assistant() {
        if let Some(session) = app.store.get(session_id).await? {
            let action = ReadinessMonitor::new(app.store.clone())
                .evaluate(&session)
                .await?;
            if action != ReadinessAction::None {
                println!("Readiness: {:?}", action);
            }
        }
    }
    Ok(())
}

pub async fn terminate(app: &AppContext, session_id: &str) -> Result<()> {
    let Some(session) = app.store.get(session_id).await? else {
        anyhow::bail!("Session {} not found", session_id);
    };
    let status = session.status.next(StatusTrigger::Terminated);
    app.store
        .update(session_id, SessionUpdate::status(status))
        .await?;
    println!("✓ Session {} is {}", session_id, status);
    Ok(())
}

pub async fn delete(app: &AppContext, session_id: &str) -> Result<()> {
    if app.store.delete(session_id).await? {
        println!("✓ Deleted {}", session_id);
    } else {
        println!("Session {} did not exist", session_id);
    }
    Ok(())
}

pub async fn clear(app: &AppContext, yes: bool) -> Result<()> {
    if !yes {
        anyhow::bail!("Refusing to delete every session without --yes");
    }
    app.store.clear().await?;
    println!("✓ Cleared all sessions at {}", app.store.base_url());
    Ok(())
}
