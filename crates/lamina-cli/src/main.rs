//! Lamina CLI - deploy and remove AWS Lambda layers.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "lamina")]
#[command(about = "Deploy and remove AWS Lambda layers")]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to lamina.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Package the layer and publish a new version if anything changed
    Deploy,

    /// Delete every version of the deployed layer
    Remove,

    /// Print the recorded state
    State,
}

#[tokio::main]
async fn main() {
    let filter = tracing_subscriber::EnvFilter::from_default_env();
    let filter = match "lamina=info".parse() {
        Ok(directive) => filter.add_directive(directive),
        Err(_) => filter,
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    let config = cli.config.as_deref();

    let result: anyhow::Result<()> = match cli.command {
        Commands::Deploy => commands::deploy::run(config).await,
        Commands::Remove => commands::remove::run(config).await,
        Commands::State => commands::state::run(config).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
