//! Recall daemon - multi-tier memory orchestrator for conversational agents

use std::io::{BufRead, Write as _};
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use recall::config::Config;
use recall::error::Result;
use recall::gateway::OpenAiGateway;
use recall::memory::types::MemoryTier;
use recall::orchestrator::{ConversationManager, NoopRulePolicy};
use recall::store::{HttpMemoryStore, HttpRuleStore, InMemoryRuleStore, InMemoryStore};

/// Recall - multi-tier memory for conversational agents
#[derive(Parser)]
#[command(name = "recalld")]
#[command(about = "Multi-tier memory orchestrator for conversational agents")]
#[command(version)]
pub struct Cli {
    /// Path to config file
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run an interactive chat against the orchestrator (default command)
    #[command(name = "chat")]
    Chat {
        /// Use in-process memory tiers instead of the configured endpoints
        #[arg(long)]
        local: bool,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    init_logging();

    let cli = Cli::parse();

    match cli.command {
        None => chat(cli.config, false).await,
        Some(Command::Chat { local }) => chat(cli.config, local).await,
    }
}

fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,recall=debug"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn load_config(config_path: Option<PathBuf>) -> Result<Config> {
    if let Some(path) = config_path {
        tracing::info!("Loading config from: {}", path.display());
        return Config::load(&path);
    }

    let default_paths = [
        dirs::home_dir().map(|h| h.join(".recall").join("config.toml")),
        dirs::config_dir().map(|c| c.join("recall").join("config.toml")),
        Some(PathBuf::from("config.toml")),
    ];

    for path in default_paths.iter().flatten() {
        if path.exists() {
            tracing::info!("Loading config from: {}", path.display());
            return Config::load(path);
        }
    }

    tracing::info!("No config file found, using defaults");
    Ok(Config::default())
}

async fn chat(config_path: Option<PathBuf>, local: bool) -> Result<()> {
    let config = load_config(config_path)?;
    tracing::debug!("Config loaded: {config:?}");

    let gateway = Arc::new(OpenAiGateway::new(&config.gateway)?);

    let manager = if local {
        tracing::info!("Using in-process memory tiers");
        ConversationManager::new(
            &config,
            Arc::new(InMemoryStore::new(MemoryTier::Episodic)),
            Arc::new(InMemoryStore::new(MemoryTier::Semantic)),
            Arc::new(InMemoryRuleStore::new()),
            gateway,
            Arc::new(NoopRulePolicy),
        )
    } else {
        ConversationManager::new(
            &config,
            Arc::new(HttpMemoryStore::new(
                MemoryTier::Episodic,
                &config.tiers.episodic,
            )?),
            Arc::new(HttpMemoryStore::new(
                MemoryTier::Semantic,
                &config.tiers.semantic,
            )?),
            Arc::new(HttpRuleStore::new(&config.tiers.procedural)?),
            gateway,
            Arc::new(NoopRulePolicy),
        )
    };

    let conversation_id = manager.start()?;
    println!("Conversation {conversation_id} started. Type a message, or /end to finish.");

    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();
    loop {
        print!("> ");
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let message = line.trim();
        if message.is_empty() {
            continue;
        }
        if message == "/end" {
            break;
        }

        match manager.process_turn(message).await {
            Ok(outcome) => {
                println!("{}", outcome.response);
                for warning in &outcome.warnings {
                    tracing::warn!("write-back warning: {warning}");
                }
            }
            Err(e) => eprintln!("could not generate a response: {e}"),
        }
    }

    let summary = manager.end().await?;
    println!(
        "Conversation ended: {} messages over {:.1}s (avg {:.0}ms per turn)",
        summary.total_messages, summary.duration_seconds, summary.avg_response_time_ms
    );

    Ok(())
}
