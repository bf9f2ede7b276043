mod cli;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use synapse::config::SynapseConfig;
use synapse::server;

#[derive(Parser)]
#[command(name = "synapse", version, about = "Second-brain knowledge service with AI-assisted connections")]
struct Cli {
    /// Config file (default: ~/.synapse/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the HTTP API
    Serve,
    /// Manage profiles and session tokens
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },
    /// Show counts for a profile
    Stats {
        #[arg(long)]
        email: String,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Check database health and embedding model state
    Doctor,
    /// Search a profile's notes
    Search {
        query: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Export a profile's data as JSON to stdout
    Export {
        #[arg(long)]
        email: String,
    },
    /// Embed notes that have no vector (or all notes with --all)
    Reembed {
        /// Only this profile's notes
        #[arg(long)]
        email: Option<String>,
        /// Regenerate every vector, e.g. after changing the embedding model
        #[arg(long)]
        all: bool,
    },
}

#[derive(Subcommand)]
enum ProfileAction {
    /// Create a profile and print its first token
    Create {
        #[arg(long)]
        email: String,
        #[arg(long)]
        name: String,
    },
    /// Issue a new session token for an existing profile
    Token {
        #[arg(long)]
        email: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => SynapseConfig::load_from(path)?,
        None => SynapseConfig::load()?,
    };

    // Log to stderr so stdout stays clean for command output.
    let filter = EnvFilter::try_new(&config.server.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Serve => server::serve(config).await?,
        Command::Profile { action } => match action {
            ProfileAction::Create { email, name } => cli::profile::create(&config, &email, &name)?,
            ProfileAction::Token { email } => cli::profile::token(&config, &email)?,
        },
        Command::Stats { email, json } => cli::stats::stats(&config, &email, json)?,
        Command::Doctor => cli::doctor::doctor(&config)?,
        Command::Search { query, email, limit } => {
            cli::search::search(&config, &email, &query, limit).await?
        }
        Command::Export { email } => cli::export::export(&config, &email)?,
        Command::Reembed { email, all } => {
            cli::reembed::reembed(&config, email.as_deref(), all).await?
        }
    }

    Ok(())
}
