use super::AppContext;
use anyhow::Result;

pub async fn run(app: &AppContext) -> Result<()> {
    match app.store.health().await {
        Ok(()) => {
            println!("✓ Session store at {} is up", app.store.base_url());
            Ok(())
        }
        Err(e) => anyhow::bail!("Session store at {} is not answering: {}", app.store.base_url(), e),
    }
}
