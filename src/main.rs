//! Vault Funder - provision, fund and inspect a custodial vault
//!
//! # WARNING
//! - `run` signs and sends real transactions with the key in `$PRIVATE_KEY`.
//! - Deposits are not rolled back if a later step fails.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{error, info, warn};

// Use the library crate
use vault_funder::cli::commands;
use vault_funder::config::Config;

/// Vault Funder - provision and fund a follower vault
#[derive(Parser)]
#[command(name = "vault-funder")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file (optional)
    #[arg(short, long, default_value = "vault.toml")]
    config: String,

    /// Defaults to `run` when omitted
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve or create the vault, deposit configured assets, report state
    Run {
        /// Print the run report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show vault state without creating or funding anything
    Status {
        /// Print the snapshot as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show current configuration (secrets masked)
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration
    let config = match Config::load(&cli.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            init_tracing(false);
            error!("Failed to load configuration: {:#}", e);
            std::process::exit(1);
        }
    };

    init_tracing(config.logging.json);
    info!("vault-funder v{}", env!("CARGO_PKG_VERSION"));
    for warning in config.warnings() {
        warn!("{}", warning);
    }

    // Execute command
    let result = match cli.command.unwrap_or(Commands::Run { json: false }) {
        Commands::Run { json } => commands::run(&config, json).await,
        Commands::Status { json } => commands::status(&config, json).await,
        Commands::Config => commands::show_config(&config),
    };

    if let Err(e) = result {
        error!("Command failed: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Initialize tracing
fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(
        "vault_funder=info"
            .parse()
            .unwrap_or_else(|_| tracing_subscriber::filter::LevelFilter::INFO.into()),
    );

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(true)
        .with_line_number(true);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
