mod cli;
mod commands;
mod telegram;

use anyhow::Result;
use clap::Parser;
use tracing::warn;

use formpilot_core::AppConfig;

use crate::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config_str = std::fs::read_to_string(&cli.config).unwrap_or_else(|_| {
        warn!(path = %cli.config, "config file not found, using defaults");
        include_str!("../config/default.toml").to_string()
    });
    let mut config = AppConfig::from_toml(&config_str)?;
    config.apply_overrides(|key| std::env::var(key).ok());
    config.validate()?;

    match cli.command {
        Commands::Run => {
            commands::run_bot(config, cli.token).await?;
        }
        Commands::Register {
            first_name,
            last_name,
            email,
            password,
        } => {
            commands::run_register(config, &first_name, &last_name, &email, &password).await?;
        }
        Commands::CheckConfig => {
            commands::run_check_config(&config, cli.token.as_deref())?;
        }
    }

    Ok(())
}
