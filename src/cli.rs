use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "formpilot", about = "Chat-driven signup automation")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: String,

    /// Telegram bot token. Wrapped in a secret as soon as it is parsed.
    #[arg(long, env = "TELEGRAM_BOT_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the Telegram bot (long polling)
    Run,
    /// Register one account from the terminal, without the bot
    Register {
        #[arg(long)]
        first_name: String,

        #[arg(long)]
        last_name: String,

        #[arg(long)]
        email: String,

        #[arg(long)]
        password: String,
    },
    /// Validate the config and print the effective settings
    CheckConfig,
}
