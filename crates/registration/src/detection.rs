use std::time::Duration;
use tracing::{info, warn};

use formpilot_core::{RegistrationError, RegistrationResult};

use crate::session::PageSession;
use crate::site::{Locator, SignupSelectors, SuccessMarker};

/// What the page showed after submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Created,
    PendingVerification,
    /// Text of the first error container the site rendered.
    Rejected(String),
    Unknown,
}

impl Outcome {
    pub fn into_result(self) -> Result<RegistrationResult, RegistrationError> {
        match self {
            Outcome::Created => Ok(RegistrationResult::created()),
            Outcome::PendingVerification => Ok(RegistrationResult::pending_verification()),
            Outcome::Rejected(text) => Err(RegistrationError::SiteValidation(text)),
            Outcome::Unknown => Err(RegistrationError::UnknownOutcome),
        }
    }
}

/// Classifies a submitted form by racing the success markers against a
/// bounded wait, then falling back to the site's error containers.
pub struct OutcomeDetector {
    timeout: Duration,
}

impl OutcomeDetector {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub async fn detect(&self, page: &dyn PageSession) -> Result<Outcome, RegistrationError> {
        let markers = SuccessMarker::ALL.map(SuccessMarker::text);

        if let Some(index) = page.wait_for_any_text(&markers, self.timeout).await? {
            let marker = SuccessMarker::ALL[index];
            info!(marker = marker.text(), "success marker found");
            return Ok(match marker {
                SuccessMarker::AccountCreated => Outcome::Created,
                SuccessMarker::VerifyEmail => Outcome::PendingVerification,
            });
        }

        warn!(
            timeout_secs = self.timeout.as_secs(),
            "no success marker, scanning error containers"
        );

        Ok(match Self::extract_error(page, SignupSelectors::ERROR_CONTAINERS).await? {
            Some(text) => Outcome::Rejected(text),
            None => Outcome::Unknown,
        })
    }

    /// Text of the first listed container present with non-blank content.
    pub async fn extract_error(
        page: &dyn PageSession,
        containers: &[Locator],
    ) -> Result<Option<String>, RegistrationError> {
        for locator in containers {
            if let Some(text) = page.inner_text(locator).await? {
                let text = text.trim();
                if !text.is_empty() {
                    info!(selector = %locator, error = text, "site error message");
                    return Ok(Some(text.to_string()));
                }
            }
        }
        Ok(None)
    }
}
