//! Folio CLI - markdown content API with build triggers.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

mod commands;
mod config;

#[derive(Parser)]
#[command(name = "folio")]
#[command(about = "Markdown content API with change-triggered site builds")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to folio.toml config file
    #[arg(short, long, default_value = "folio.toml", global = true)]
    config: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a markdown directory with a sample post and config
    Init {
        /// Overwrite existing files
        #[arg(short, long)]
        yes: bool,
    },

    /// Start the API server and file watcher
    Serve {
        /// Port to listen on (overrides config and PORT)
        #[arg(short, long)]
        port: Option<u16>,

        /// Markdown directory (overrides config and MARKDOWN_DIR)
        #[arg(short, long)]
        dir: Option<PathBuf>,
    },

    /// Write the current listing as static fallback data
    Snapshot {
        /// Output file
        #[arg(short, long, default_value = "posts.json")]
        output: PathBuf,
    },

    /// Trigger builds once without starting the server
    Trigger,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    fmt().with_env_filter(filter).with_target(false).init();

    if let Ok(path) = dotenvy::dotenv() {
        tracing::debug!("Loaded environment from {}", path.display());
    }

    // Execute command
    match cli.command {
        Commands::Init { yes } => {
            commands::init::run(&cli.config, yes).await?;
        }
        Commands::Serve { port, dir } => {
            commands::serve::run(&cli.config, port, dir).await?;
        }
        Commands::Snapshot { output } => {
            commands::snapshot::run(&cli.config, output).await?;
        }
        Commands::Trigger => {
            commands::trigger::run(&cli.config).await?;
        }
    }

    Ok(())
}
