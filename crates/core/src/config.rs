use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

use crate::error::ConfigError;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub target: TargetConfig,
    #[serde(default)]
    pub browser: BrowserConfig,
    #[serde(default)]
    pub pacing: PacingConfig,
    #[serde(default)]
    pub debug: DebugConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TargetConfig {
    pub signup_url: String,
    pub login_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BrowserConfig {
    #[serde(default = "default_true")]
    pub headless: bool,
    /// Chrome binary; autodetected when unset
    #[serde(default)]
    pub chrome_path: Option<PathBuf>,
    #[serde(default = "default_navigation_timeout")]
    pub navigation_timeout_seconds: u64,
    #[serde(default = "default_network_idle_timeout")]
    pub network_idle_timeout_seconds: u64,
    #[serde(default = "default_option_timeout")]
    pub option_timeout_seconds: u64,
    #[serde(default = "default_outcome_timeout")]
    pub outcome_timeout_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PacingConfig {
    /// When false every human-paced delay collapses to zero.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Fixed RNG seed for reproducible runs.
    #[serde(default)]
    pub seed: Option<u64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DebugConfig {
    #[serde(default)]
    pub screenshots: bool,
    #[serde(default = "default_screenshot_dir")]
    pub screenshot_dir: PathBuf,
}

fn default_true() -> bool { true }
fn default_navigation_timeout() -> u64 { 300 }
fn default_network_idle_timeout() -> u64 { 30 }
fn default_option_timeout() -> u64 { 5 }
fn default_outcome_timeout() -> u64 { 60 }
fn default_screenshot_dir() -> PathBuf { PathBuf::from("debug") }

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            chrome_path: None,
            navigation_timeout_seconds: default_navigation_timeout(),
            network_idle_timeout_seconds: default_network_idle_timeout(),
            option_timeout_seconds: default_option_timeout(),
            outcome_timeout_seconds: default_outcome_timeout(),
        }
    }
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self { enabled: true, seed: None }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            screenshots: false,
            screenshot_dir: default_screenshot_dir(),
        }
    }
}

impl BrowserConfig {
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_secs(self.navigation_timeout_seconds)
    }

    pub fn network_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.network_idle_timeout_seconds)
    }

    pub fn option_timeout(&self) -> Duration {
        Duration::from_secs(self.option_timeout_seconds)
    }

    pub fn outcome_timeout(&self) -> Duration {
        Duration::from_secs(self.outcome_timeout_seconds)
    }
}

fn parse_flag(v: &str) -> bool {
    v != "0" && v.to_lowercase() != "false"
}

impl AppConfig {
    pub fn from_toml(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    /// Apply `DEBUG`, `HEADLESS`, `CHROME_PATH` and `SIGNUP_URL` overrides.
    ///
    /// `lookup` is `std::env::var(..).ok()` in the binary.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("DEBUG") {
            self.debug.screenshots = parse_flag(&v);
        }
        if let Some(v) = lookup("HEADLESS") {
            self.browser.headless = parse_flag(&v);
        }
        if let Some(v) = lookup("CHROME_PATH") {
            if !v.is_empty() {
                self.browser.chrome_path = Some(PathBuf::from(v));
            }
        }
        if let Some(v) = lookup("SIGNUP_URL") {
            if !v.is_empty() {
                self.target.signup_url = v;
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        Url::parse(&self.target.signup_url).map_err(|source| ConfigError::InvalidUrl {
            field: "target.signup_url",
            source,
        })?;
        Url::parse(&self.target.login_url).map_err(|source| ConfigError::InvalidUrl {
            field: "target.login_url",
            source,
        })?;

        let timeouts = [
            ("browser.navigation_timeout_seconds", self.browser.navigation_timeout_seconds),
            ("browser.network_idle_timeout_seconds", self.browser.network_idle_timeout_seconds),
            ("browser.option_timeout_seconds", self.browser.option_timeout_seconds),
            ("browser.outcome_timeout_seconds", self.browser.outcome_timeout_seconds),
        ];
        for (name, value) in timeouts {
            if value == 0 {
                return Err(ConfigError::ZeroTimeout(name));
            }
        }

        Ok(())
    }
}
