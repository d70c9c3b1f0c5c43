use std::ops::RangeInclusive;
use std::time::Duration;
use tracing::debug;

use formpilot_core::RegistrationError;

use crate::pacing::{timing, Pacing};
use crate::session::PageSession;
use crate::site::{CandidateSet, Locator};

/// What to do with the element once a candidate matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action<'a> {
    /// Click, holding the press for a random time within the range (ms).
    Click(RangeInclusive<u64>),
    Fill(&'a str),
    SelectOption(&'a str),
    ClickAndRead,
}

/// Outcome of a successful resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub locator: Locator,
    /// Set for [`Action::ClickAndRead`].
    pub text: Option<String>,
}

/// Finds the first live element among a candidate set and acts on it.
pub struct SelectorResolver<'a> {
    page: &'a dyn PageSession,
    pacing: &'a Pacing,
    option_timeout: Duration,
}

impl<'a> SelectorResolver<'a> {
    pub fn new(page: &'a dyn PageSession, pacing: &'a Pacing, option_timeout: Duration) -> Self {
        Self {
            page,
            pacing,
            option_timeout,
        }
    }

    /// Act on the first candidate present on the page. Later candidates are
    /// never touched, even if they would also match.
    pub async fn resolve(
        &self,
        candidates: &CandidateSet,
        action: Action<'_>,
    ) -> Result<Resolved, RegistrationError> {
        for locator in candidates.locators {
            if !self.page.is_present(locator).await? {
                debug!(field = candidates.name, selector = %locator, "candidate not present");
                continue;
            }

            debug!(field = candidates.name, selector = %locator, "candidate matched");
            let text = self.perform(candidates, locator, action).await?;
            return Ok(Resolved {
                locator: *locator,
                text,
            });
        }

        Err(RegistrationError::NoMatch {
            field: candidates.name.to_string(),
            candidates: candidates.describe(),
        })
    }

    async fn perform(
        &self,
        candidates: &CandidateSet,
        locator: &Locator,
        action: Action<'_>,
    ) -> Result<Option<String>, RegistrationError> {
        match action {
            Action::Click(hold_ms) => {
                let hold = self.pacing.delay(hold_ms);
                self.page.click(locator, hold).await?;
                Ok(None)
            }
            Action::Fill(value) => {
                // Focus like a person would before typing.
                let hold = self.pacing.delay(timing::FIELD_CLICK_HOLD);
                self.page.click(locator, hold).await?;
                self.pacing.pause(timing::BEFORE_TYPING).await;
                let key_delay = self.pacing.delay(timing::KEY_DELAY);
                self.page.type_text(locator, value, key_delay).await?;
                Ok(None)
            }
            Action::SelectOption(value) => {
                let hold = self.pacing.delay(timing::DROPDOWN_CLICK_HOLD);
                self.page.click(locator, hold).await?;
                self.pacing.pause(timing::DROPDOWN_OPEN).await;
                let option_hold = self.pacing.delay(timing::OPTION_CLICK_HOLD);
                if !self
                    .page
                    .click_option(value, self.option_timeout, option_hold)
                    .await?
                {
                    return Err(RegistrationError::NoMatch {
                        field: format!("option \"{}\" in {}", value, candidates.name),
                        candidates: vec![locator.to_string()],
                    });
                }
                Ok(None)
            }
            Action::ClickAndRead => {
                let hold = self.pacing.delay(timing::FIELD_CLICK_HOLD);
                self.page.click(locator, hold).await?;
                self.page.inner_text(locator).await
            }
        }
    }
}
