use std::io::Write as _;
use std::sync::Arc;

use clap::Parser;
use tracing::{info, warn};

use loom_agent::SessionAgentFactory;
use loom_core::{DenyAllPermissions, Message, Role};
use loom_fileio::SessionFileIO;
use loom_manager::{Manager, Signal};
use loom_store::SessionStore;

mod config;
mod ollama;

use config::LoomConfig;
use ollama::OllamaConnector;

const DEFAULT_AGENT_NAME: &str = "just-ask";

#[derive(Parser)]
#[command(name = "loom", about = "A local conversational session core")]
struct Cli {
    /// Path to loom.toml. Defaults to LOOM_CONFIG or ~/.loom/loom.toml.
    #[arg(long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "loom=info".into()))
        .init();

    let cli = Cli::parse();
    let config = Arc::new(LoomConfig::load(cli.config.as_deref())?);

    let db_path = config.db_path();
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let store = SessionStore::open(&db_path)?;
    let fileio = SessionFileIO::new(config.history_root());

    let connector = Arc::new(OllamaConnector::new(config.ollama().base_url.clone()));

    let mut manager = Manager::new(store, fileio, config.clone(), Arc::new(DenyAllPermissions));
    manager.register_connector(config.ollama().connection_id.clone(), connector.clone());
    manager.register_agent_factory(
        DEFAULT_AGENT_NAME,
        Arc::new(SessionAgentFactory {
            connector,
            tool_registry: Arc::new(std::collections::HashMap::new()),
            permission: Arc::new(DenyAllPermissions),
            system_prompt: None,
        }),
    );

    if let Err(error) = manager.load_sessions() {
        warn!(%error, "failed to load session index, starting with an empty list");
    }

    if let Err(error) = manager.ensure_model_usage().await {
        warn!(%error, "configured default model is not reachable; sends will fail until this is fixed");
    }

    info!(sessions = manager.session_list().len(), "loom ready");

    let mut signals = manager.subscribe();
    tokio::spawn(async move {
        while let Ok(signal) = signals.recv().await {
            render_signal(signal);
        }
    });

    run_repl(&mut manager).await
}

/// Minimal line-oriented REPL: one line in, the streamed reply out via the
/// signal subscriber spawned above. Not a replacement for a real UI — this
/// binary exists to exercise `Manager` end to end.
async fn run_repl(manager: &mut Manager) -> anyhow::Result<()> {
    let stdin = std::io::stdin();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let mut line = String::new();
        if stdin.read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "/quit" {
            break;
        }

        if let Err(error) = manager.send(Message::new(Role::User, line)).await {
            warn!(%error, "send failed");
        }
    }
    Ok(())
}

fn render_signal(signal: Signal) {
    match signal {
        Signal::StreamContent { text, .. } => {
            print!("{text}");
            let _ = std::io::stdout().flush();
        }
        Signal::MessageAdded { message, .. } if message.role == Role::Ui => {
            println!("\n[{}]", message.content);
        }
        Signal::SessionActivated { fid, .. } => {
            if let Some(fid) = fid {
                info!(fid, "session activated");
            }
        }
        _ => {}
    }
}
