use std::time::Duration;
use thiserror::Error;

/// Everything that can end a registration attempt without success.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    #[error("browser initialization failed: {0}")]
    BrowserInit(String),

    #[error("{stage} did not finish within {}s", .timeout.as_secs())]
    NavigationTimeout { stage: String, timeout: Duration },

    #[error("no matching {field} found for selectors: {}", .candidates.join(", "))]
    NoMatch { field: String, candidates: Vec<String> },

    /// Message text the site itself rendered in an error container.
    #[error("{0}")]
    SiteValidation(String),

    #[error("Unknown error")]
    UnknownOutcome,

    #[error("{0}")]
    System(String),
}

/// Payload-free classification of [`RegistrationError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    BrowserInit,
    NavigationTimeout,
    NoMatch,
    SiteValidation,
    UnknownOutcome,
    System,
}

impl RegistrationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::BrowserInit(_) => ErrorKind::BrowserInit,
            Self::NavigationTimeout { .. } => ErrorKind::NavigationTimeout,
            Self::NoMatch { .. } => ErrorKind::NoMatch,
            Self::SiteValidation(_) => ErrorKind::SiteValidation,
            Self::UnknownOutcome => ErrorKind::UnknownOutcome,
            Self::System(_) => ErrorKind::System,
        }
    }

    /// Line shown to the person who asked for the registration.
    pub fn user_message(&self) -> String {
        match self {
            Self::BrowserInit(detail) => format!("❌ Browser initialization failed: {}", detail),
            Self::SiteValidation(_) | Self::UnknownOutcome => {
                format!("❌ Registration failed: {}", self)
            }
            Self::NavigationTimeout { .. } | Self::NoMatch { .. } | Self::System(_) => {
                format!("⚠️ System error: {}", self)
            }
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid URL for {field}: {source}")]
    InvalidUrl {
        field: &'static str,
        #[source]
        source: url::ParseError,
    },

    #[error("{0} must be greater than zero")]
    ZeroTimeout(&'static str),

    #[error("parse error: {0}")]
    Parse(#[from] toml::de::Error),
}
