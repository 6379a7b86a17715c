//! # Storefront API Main Entry Point
//!
//! This is the main entry point for the storefront service.

use anyhow::Context;
use clap::{Parser, Subcommand};
use storefront::{
    auth::service::AuthService, config::ConfigLoader, db, seeds, server::run_server, telemetry,
};

#[derive(Debug, Parser)]
#[command(name = "storefront", version, about = "Multi-tenant storefront API")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP API (default)
    Serve,
    /// Apply pending database migrations and exit
    Migrate,
    /// Migrate, then load the demo store
    Seed,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration from layered env files and variables
    let config = ConfigLoader::new()
        .load()
        .context("loading configuration")?;

    telemetry::init_tracing(&config).context("initializing telemetry")?;
    tracing::info!(profile = %config.profile, "Loaded configuration");
    if let Ok(redacted_json) = config.redacted_json() {
        tracing::debug!(config = %redacted_json, "Effective configuration");
    }

    let pool = db::init_pool(&config).await?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Migrate => db::run_migrations(&pool).await,
        Command::Seed => {
            db::run_migrations(&pool).await?;
            seeds::seed_demo_store(&pool, &config).await
        }
        Command::Serve => {
            db::run_migrations(&pool).await?;
            if config.seed_demo_data {
                seeds::seed_demo_store(&pool, &config).await?;
            }
            if let Err(err) = AuthService::new(&pool, &config).purge_expired_tokens().await {
                tracing::warn!(error = %err, "Could not purge expired reset tokens");
            }
            run_server(config, pool).await
        }
    }
}
