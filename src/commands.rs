use std::sync::Arc;

use anyhow::{bail, Context, Result};
use secrecy::SecretString;
use tracing::info;

use formpilot_conversation::validate;
use formpilot_core::{AppConfig, Registrar, RegistrationRequest};
use formpilot_registration::{ChromeLauncher, EngineSettings, Pacing, RegistrationEngine};

use crate::telegram;

fn build_engine(config: &AppConfig) -> RegistrationEngine {
    RegistrationEngine::new(
        Box::new(ChromeLauncher::new(&config.browser)),
        EngineSettings::from_config(config),
        Pacing::new(&config.pacing),
    )
}

pub async fn run_bot(config: AppConfig, token: Option<String>) -> Result<()> {
    let token = match token {
        Some(t) if !t.trim().is_empty() => SecretString::new(t.trim().to_string()),
        _ => bail!("TELEGRAM_BOT_TOKEN (or --token) must be set to run the bot"),
    };

    info!(
        signup_url = %config.target.signup_url,
        headless = config.browser.headless,
        screenshots = config.debug.screenshots,
        "starting registration bot"
    );

    let registrar: Arc<dyn Registrar> = Arc::new(build_engine(&config));
    telegram::run(token, registrar, config.target.login_url.clone()).await
}

pub async fn run_register(
    config: AppConfig,
    first_name: &str,
    last_name: &str,
    email: &str,
    password: &str,
) -> Result<()> {
    let request = RegistrationRequest {
        first_name: validate::name(first_name).context("first name")?,
        last_name: validate::name(last_name).context("last name")?,
        email: validate::email(email).context("email")?,
        password: validate::password(password).context("password")?,
    };

    let engine = build_engine(&config);
    let result = engine.register(request.clone()).await;

    println!("{}", result.message);
    if !result.success {
        bail!("registration for {} failed", request.email);
    }
    println!("Name:     {}", request.full_name());
    println!("Email:    {}", request.email);
    println!("Password: {}", request.masked_password());
    println!("Login at: {}", config.target.login_url);

    Ok(())
}

pub fn run_check_config(config: &AppConfig, token: Option<&str>) -> Result<()> {
    let token_set = token.map(|t| !t.trim().is_empty()).unwrap_or(false);

    println!("Signup URL:         {}", config.target.signup_url);
    println!("Login URL:          {}", config.target.login_url);
    println!("Headless:           {}", config.browser.headless);
    println!(
        "Chrome:             {}",
        config
            .browser
            .chrome_path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "autodetect".to_string())
    );
    println!(
        "Timeouts (s):       navigation={} network_idle={} option={} outcome={}",
        config.browser.navigation_timeout_seconds,
        config.browser.network_idle_timeout_seconds,
        config.browser.option_timeout_seconds,
        config.browser.outcome_timeout_seconds
    );
    println!(
        "Pacing:             {}{}",
        if config.pacing.enabled { "on" } else { "off" },
        config
            .pacing
            .seed
            .map(|s| format!(" (seed {})", s))
            .unwrap_or_default()
    );
    println!(
        "Debug screenshots:  {}",
        if config.debug.screenshots {
            config.debug.screenshot_dir.display().to_string()
        } else {
            "off".to_string()
        }
    );
    println!("Bot token:          {}", if token_set { "set" } else { "NOT SET" });

    Ok(())
}
