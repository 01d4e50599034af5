//! ragcall CLI — the main entry point.
//!
//! Commands:
//! - `run`     — Start a call session with knowledge-base grounding
//! - `query`   — Ask the knowledge base one question and show the note the model would get
//! - `doctor`  — Check configuration, credentials and the narrative file

use std::path::PathBuf;
use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "ragcall",
    about = "ragcall — retrieval-augmented outbound call agent",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to ~/.ragcall/config.toml)
    #[arg(short, long, global = true, env = "RAGCALL_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a call session
    Run,

    /// Run one utterance through the retrieval gate
    Query {
        /// What the caller said
        text: String,

        /// Print the answer as JSON
        #[arg(long)]
        json: bool,
    },

    /// Diagnose configuration and knowledge base health
    Doctor,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Run => commands::run::run(config_path).await?,
        Commands::Query { text, json } => commands::query::run(config_path, &text, json).await?,
        Commands::Doctor => commands::doctor::run(config_path).await?,
    }

    Ok(())
}
