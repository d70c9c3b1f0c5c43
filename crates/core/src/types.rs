use async_trait::async_trait;
use std::fmt;

use crate::error::{ErrorKind, RegistrationError};

/// The four validated inputs a signup needs.
#[derive(Clone, PartialEq, Eq)]
pub struct RegistrationRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
}

impl RegistrationRequest {
    /// Password rendered as one `*` per character.
    pub fn masked_password(&self) -> String {
        "*".repeat(self.password.chars().count())
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

// Passwords must never reach the logs, so Debug is written by hand.
impl fmt::Debug for RegistrationRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistrationRequest")
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("email", &self.email)
            .field("password", &self.masked_password())
            .finish()
    }
}

/// How an attempt ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationStatus {
    /// Site confirmed the account was created.
    Created,
    /// Site asked the user to verify their email before the account is usable.
    PendingVerification,
    Failed(ErrorKind),
}

/// Result of one `register` call. Produced exactly once per call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationResult {
    pub success: bool,
    pub message: String,
    pub status: RegistrationStatus,
}

impl RegistrationResult {
    pub fn created() -> Self {
        Self {
            success: true,
            message: "✅ Account created successfully! Check your email for verification.".to_string(),
            status: RegistrationStatus::Created,
        }
    }

    pub fn pending_verification() -> Self {
        Self {
            success: true,
            message: "✅ Account submitted! Verify your email to activate it.".to_string(),
            status: RegistrationStatus::PendingVerification,
        }
    }

    pub fn failed(error: &RegistrationError) -> Self {
        Self {
            success: false,
            message: error.user_message(),
            status: RegistrationStatus::Failed(error.kind()),
        }
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self.status {
            RegistrationStatus::Failed(kind) => Some(kind),
            _ => None,
        }
    }
}

/// Anything that can perform a signup for a validated request.
///
/// Implementations must not fail: every error is folded into the returned
/// [`RegistrationResult`].
#[async_trait]
pub trait Registrar: Send + Sync {
    async fn register(&self, request: RegistrationRequest) -> RegistrationResult;
}
