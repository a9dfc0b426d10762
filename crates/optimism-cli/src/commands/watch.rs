use super::{AppContext, summarize};
use anyhow::{Context, Result};
use optimism_application::{
    CoordinatorEvent, HeartbeatEmitter, PollingChangeFeed, ReadinessMonitor, SessionContext,
    SessionCoordinator,
};
use optimism_core::session::{Message, NewSession, SessionMode, SessionStore};
use std::sync::Arc;

/// Follows one session until Ctrl-C, replacing it when it ends.
pub async fn run(app: &AppContext, session: Option<String>, mode: SessionMode) -> Result<()> {
    let store: Arc<dyn SessionStore> = app.store.clone();
    let kv = app.key_value_store()?;
    let context = SessionContext::load(kv).await?;

    let mut template = NewSession::new(mode, app.config.user_id.clone());
    if let Some(researcher) = &app.config.researcher_id {
        template = template.with_researcher(researcher.clone());
    }

    let coordinator = SessionCoordinator::new(Arc::clone(&store), context, template)
        .with_feed(Arc::new(
            PollingChangeFeed::new(Arc::clone(&store)).with_interval(app.config.poll_interval()),
        ))
        .with_heartbeat(
            HeartbeatEmitter::new(Arc::clone(&store))
                .with_interval(app.config.heartbeat_interval())
                .with_failure_threshold(app.config.heartbeat_failure_threshold),
        );
    let readiness = ReadinessMonitor::new(Arc::clone(&store));
    let persister = app.persister()?;

    let opened = match session {
        Some(id) => {
            coordinator.open(&id).await?;
            id
        }
        None => coordinator
            .start()
            .await
            .context("Cannot reach the session store")?
            .id,
    };
    println!("Watching {} (Ctrl-C to stop)", opened);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = coordinator.next_event() => match event? {
                CoordinatorEvent::Updated(session) => {
                    if let Err(e) = persister.reconcile_session(&session).await {
                        tracing::warn!("[CLI] Override reconciliation failed: {}", e);
                    }
                    let view = match persister.apply_overrides(&session).await {
                        Ok(view) => view,
                        Err(e) => {
                            tracing::warn!("[CLI] Local overrides unavailable: {}", e);
                            session.clone()
                        }
                    };
                    println!("{}", summarize(&view));
                    if let Some(last) = view.last_message() {
                        println!("  {}: {}{}", last.sender, last.content, controls_note(last));
                    }
                    if let Err(e) = readiness.evaluate(&session).await {
                        tracing::warn!("[CLI] Readiness update failed: {}", e);
                    }
                }
                CoordinatorEvent::Replaced { previous_id, session } => {
                    println!("Session {} ended; now watching {}", previous_id, session.id);
                }
                CoordinatorEvent::StoreUnreachable { session_id } => {
                    eprintln!("Cannot reach the session store (session {})", session_id);
                }
            },
        }
    }

    coordinator.close().await;
    Ok(())
}

fn controls_note(message: &Message) -> &'static str {
    match &message.metadata {
        Some(metadata) if metadata.is_controls_success() => "  [controls generated]",
        _ => "",
    }
}
