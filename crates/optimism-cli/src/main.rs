use anyhow::Result;
use clap::{Parser, Subcommand};
use optimism_core::session::{AiProvider, ConfiguredBy, Sender, SessionMode};
use std::path::PathBuf;
use std::str::FromStr;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::AppContext;

#[derive(Parser)]
#[command(name = "optimism")]
#[command(about = "AI Optimism CLI - session coordination for problem formalization studies", long_about = None)]
struct Cli {
    /// Config file (defaults to the platform config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Session store base URL (overrides config and OPTIMISM_STORE_URL)
    #[arg(long, global = true)]
    store_url: Option<String>,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that the session store answers
    Health,
    /// Manage session records
    Session {
        #[command(subcommand)]
        action: SessionAction,
    },
    /// Open a session and follow it until interrupted
    Watch {
        /// Open this session instead of the remembered one
        #[arg(long)]
        session: Option<String>,
        #[arg(long, default_value = "experimental", value_parser = SessionMode::from_str)]
        mode: SessionMode,
    },
    /// Append a message to a session
    Say {
        session_id: String,
        content: String,
        #[arg(long, default_value = "user", value_parser = Sender::from_str)]
        sender: Sender,
    },
    /// Formalize a session's conversation
    Formalize { session_id: String },
    /// Send a formalized session back to active
    Reset { session_id: String },
    /// Record the controls-generation outcome on a formalization message
    Controls {
        session_id: String,
        message_id: String,
        /// Record a failure with this error instead of success
        #[arg(long)]
        failed: Option<String>,
    },
    /// Text-generation provider settings
    Provider {
        #[command(subcommand)]
        action: ProviderAction,
    },
}

#[derive(Subcommand)]
enum SessionAction {
    /// Create a session
    Create {
        #[arg(long, default_value = "experimental", value_parser = SessionMode::from_str)]
        mode: SessionMode,
        #[arg(long)]
        researcher: Option<String>,
    },
    /// Print one session
    Show { session_id: String },
    /// List sessions
    List {
        /// Only sessions waiting for a researcher reply
        #[arg(long)]
        waiting: bool,
    },
    /// Mark a session completed
    Terminate { session_id: String },
    /// Delete a session
    Delete { session_id: String },
    /// Delete every session (non-production stores only)
    Clear {
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum ProviderAction {
    /// Make a minimal test generation against a provider
    Validate {
        #[arg(long, value_parser = AiProvider::from_str)]
        provider: Option<AiProvider>,
        #[arg(long)]
        model: Option<String>,
        #[arg(long)]
        endpoint: Option<String>,
    },
    /// Store a provider configuration on a session
    Set {
        session_id: String,
        #[arg(long, value_parser = AiProvider::from_str)]
        provider: AiProvider,
        #[arg(long)]
        model: String,
        #[arg(long)]
        endpoint: Option<String>,
        #[arg(long, default_value = "researcher", value_parser = ConfiguredBy::from_str)]
        set_by: ConfiguredBy,
    },
    /// Show a session's provider status
    Show { session_id: String },
    /// Ask the store to re-check a session's stored provider configuration
    Verify { session_id: String },
}

fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    let app = AppContext::load(cli.config, cli.store_url)?;

    match cli.command {
        Commands::Health => commands::health::run(&app).await?,
        Commands::Session { action } => match action {
            SessionAction::Create { mode, researcher } => {
                commands::session::create(&app, mode, researcher).await?
            }
            SessionAction::Show { session_id } => commands::session::show(&app, &session_id).await?,
            SessionAction::List { waiting } => commands::session::list(&app, waiting).await?,
            SessionAction::Terminate { session_id } => {
                commands::session::terminate(&app, &session_id).await?
            }
            SessionAction::Delete { session_id } => {
                commands::session::delete(&app, &session_id).await?
            }
            SessionAction::Clear { yes } => commands::session::clear(&app, yes).await?,
        },
        Commands::Watch { session, mode } => commands::watch::run(&app, session, mode).await?,
        Commands::Say {
            session_id,
            content,
            sender,
        } => commands::session::say(&app, &session_id, sender, &content).await?,
        Commands::Formalize { session_id } => {
            commands::formalize::formalize(&app, &session_id).await?
        }
        Commands::Reset { session_id } => commands::formalize::reset(&app, &session_id).await?,
        Commands::Controls {
            session_id,
            message_id,
            failed,
        } => commands::formalize::controls(&app, &session_id, &message_id, failed).await?,
        Commands::Provider { action } => match action {
            ProviderAction::Validate {
                provider,
                model,
                endpoint,
            } => commands::provider::validate(&app, provider, model, endpoint).await?,
            ProviderAction::Set {
                session_id,
                provider,
                model,
                endpoint,
                set_by,
            } => {
                commands::provider::set(&app, &session_id, provider, model, endpoint, set_by)
                    .await?
            }
            ProviderAction::Show { session_id } => {
                commands::provider::show(&app, &session_id).await?
            }
            ProviderAction::Verify { session_id } => {
                commands::provider::verify(&app, &session_id).await?
            }
        },
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_say_parses_sender() {
        let cli = Cli::try_parse_from([
            "optimism",
            "say",
            "s1",
            "Shall I formalize this?",
            "--sender",
            "researcher",
        ])
        .unwrap();
        match cli.command {
            Commands::Say { sender, .. } => assert_eq!(sender, Sender::Researcher),
            _ => panic!("expected say"),
        }
    }

    #[test]
    fn test_unknown_mode_is_rejected() {
        assert!(Cli::try_parse_from(["optimism", "session", "create", "--mode", "robot"]).is_err());
    }
}
