//! Linksort CLI: the main entry point.
//!
//! Commands:
//! - `chat` - Interactive or single-message chat with the assistant
//! - `tools` - Print the tool specs sent to the model
//! - `init` - Write a default config file

use clap::{Parser, Subcommand};
use linksort_config::{AppConfig, LoggingConfig};
use std::path::PathBuf;

mod commands;
mod seed;

#[derive(Parser)]
#[command(
    name = "linksort",
    about = "Linksort: chat with an assistant that organises your links",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat with the assistant
    Chat {
        /// Send a single message instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,

        /// JSON file with the user and links to load into the library
        #[arg(long)]
        seed: Option<PathBuf>,
    },

    /// Print the tools offered to the model as JSON
    Tools,

    /// Write a default config file
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },
}

fn init_tracing(logging: &LoggingConfig, verbose: bool) {
    let level = if verbose { "debug" } else { logging.level.as_str() };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    // Logs go to stderr so assistant output on stdout stays clean.
    if logging.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let loaded = AppConfig::load();
    let logging = loaded
        .as_ref()
        .map(|c| c.logging.clone())
        .unwrap_or_default();
    init_tracing(&logging, cli.verbose);

    match cli.command {
        Commands::Init { force } => commands::init::run(force)?,
        Commands::Tools => commands::tools::run().await?,
        Commands::Chat { message, seed } => {
            let config = loaded.map_err(|e| format!("Failed to load config: {e}"))?;
            commands::chat::run(config, message, seed).await?
        }
    }

    Ok(())
}
