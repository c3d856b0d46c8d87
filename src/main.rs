//! # BMA Calculator CLI (`bma`)
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `bma init` | Create the SQLite database and run schema migrations |
//! | `bma serve` | Start the HTTP API |
//! | `bma addresses` | List addresses with detail summaries |
//! | `bma report [--refresh]` | Print the BMA report as JSON |
//! | `bma instructions show` | Print the LLM instructions |
//! | `bma instructions set <text>` | Replace the LLM instructions |
//! | `bma extract <file>` | Run property extraction over a local listing file |

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bma_calculator::config;
use bma_calculator::migrate;
use bma_calculator::server;
use bma_calculator::BmaService;

/// BMA calculator: listing ingestion and Broker Market Analysis reports.
#[derive(Parser)]
#[command(name = "bma", version, about)]
struct Cli {
    /// Path to configuration file (TOML). Defaults apply if it does not exist.
    #[arg(long, global = true, default_value = "./config/bma.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema. Idempotent.
    Init,

    /// Start the HTTP API server.
    Serve,

    /// List addresses with their extracted details.
    Addresses,

    /// Print the current BMA report as JSON.
    Report {
        /// Discard any cached report and regenerate.
        #[arg(long)]
        refresh: bool,
    },

    /// Show or replace the LLM instructions.
    Instructions {
        #[command(subcommand)]
        action: InstructionsAction,
    },

    /// Extract property details from a local listing text file.
    ///
    /// Calls the LLM and prints the result; nothing is stored.
    Extract {
        /// Path to a file containing listing text.
        path: PathBuf,
    },
}

#[derive(Subcommand)]
enum InstructionsAction {
    /// Print the current instructions.
    Show,
    /// Replace the instructions (clears all cached reports).
    Set {
        /// New instructions text.
        text: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,bma_calculator=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config_or_default(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
        Commands::Addresses => {
            let service = BmaService::open(&cfg).await?;
            let addresses = service.list_addresses().await?;
            println!("{}", serde_json::to_string_pretty(&addresses)?);
        }
        Commands::Report { refresh } => {
            let service = BmaService::open(&cfg).await?;
            let outcome = service.get_report(refresh).await?;
            for failure in &outcome.soft_failures {
                eprintln!("warning: {:?}", failure);
            }
            println!("{}", serde_json::to_string_pretty(&outcome.report)?);
        }
        Commands::Instructions { action } => {
            let service = BmaService::open(&cfg).await?;
            match action {
                InstructionsAction::Show => {
                    println!("{}", service.get_instructions().await?);
                }
                InstructionsAction::Set { text } => {
                    let invalidated = service.update_instructions(&text).await?;
                    println!("Instructions updated ({} cached reports cleared).", invalidated);
                }
            }
        }
        Commands::Extract { path } => {
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read listing file: {}", path.display()))?;
            let service = BmaService::open(&cfg).await?;
            let details = service.extractor().extract(&text).await?;
            println!("{}", serde_json::to_string_pretty(&details)?);
        }
    }

    Ok(())
}
