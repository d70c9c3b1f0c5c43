use async_trait::async_trait;
use chrono::Utc;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info, warn};

use formpilot_core::{AppConfig, RegistrationError, RegistrationRequest, RegistrationResult, Registrar};

use crate::attempt::{Attempt, AttemptState};
use crate::detection::OutcomeDetector;
use crate::pacing::{timing, Pacing};
use crate::resolver::{Action, SelectorResolver};
use crate::session::{BrowserLauncher, PageSession};
use crate::site::{
    DeviceProfile, SignupSelectors, BUDGET_BAND, BUSINESS_PURPOSES, BUSINESS_TYPES,
    MOBILE_USER_AGENTS,
};

#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub signup_url: String,
    pub navigation_timeout: Duration,
    pub network_idle_timeout: Duration,
    pub option_timeout: Duration,
    pub outcome_timeout: Duration,
    /// Diagnostic screenshots go here when set.
    pub screenshot_dir: Option<PathBuf>,
}

impl EngineSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            signup_url: config.target.signup_url.clone(),
            navigation_timeout: config.browser.navigation_timeout(),
            network_idle_timeout: config.browser.network_idle_timeout(),
            option_timeout: config.browser.option_timeout(),
            outcome_timeout: config.browser.outcome_timeout(),
            screenshot_dir: config
                .debug
                .screenshots
                .then(|| config.debug.screenshot_dir.clone()),
        }
    }
}

/// Drives the signup form end to end, one ephemeral browser per call.
pub struct RegistrationEngine {
    launcher: Box<dyn BrowserLauncher>,
    settings: EngineSettings,
    pacing: Pacing,
}

impl RegistrationEngine {
    pub fn new(launcher: Box<dyn BrowserLauncher>, settings: EngineSettings, pacing: Pacing) -> Self {
        Self {
            launcher,
            settings,
            pacing,
        }
    }

    /// Run one registration attempt. Never fails: every error becomes a
    /// failed [`RegistrationResult`], and the browser is closed exactly once.
    pub async fn run(&self, request: &RegistrationRequest) -> RegistrationResult {
        let mut attempt = Attempt::new();
        let device = DeviceProfile::mobile(self.pacing.choose(MOBILE_USER_AGENTS));

        info!(email = %request.email, user_agent = %device.user_agent, "starting registration");

        let page = match self.launcher.launch(&device).await {
            Ok(page) => page,
            Err(e) => {
                error!(error = %e, "browser launch failed");
                attempt.transition(AttemptState::Failed, Some(e.to_string()));
                return RegistrationResult::failed(&e);
            }
        };

        let outcome = self.drive(page.as_ref(), request, &mut attempt).await;
        if outcome.is_err() {
            self.capture(page.as_ref(), "error").await;
        }
        page.close().await;

        match outcome {
            Ok(result) => {
                attempt.transition(AttemptState::Succeeded, None);
                info!(
                    email = %request.email,
                    status = ?result.status,
                    elapsed_ms = attempt.duration().as_millis() as u64,
                    "registration succeeded"
                );
                result
            }
            Err(e) => {
                let failed_in = attempt.state();
                attempt.transition(AttemptState::Failed, Some(e.to_string()));
                error!(
                    email = %request.email,
                    error = %e,
                    kind = ?e.kind(),
                    failed_in = ?failed_in,
                    path = %attempt.path(),
                    elapsed_ms = attempt.duration().as_millis() as u64,
                    "registration failed"
                );
                RegistrationResult::failed(&e)
            }
        }
    }

    async fn drive(
        &self,
        page: &dyn PageSession,
        request: &RegistrationRequest,
        attempt: &mut Attempt,
    ) -> Result<RegistrationResult, RegistrationError> {
        let resolver = SelectorResolver::new(page, &self.pacing, self.settings.option_timeout);

        // Init -> Navigated
        page.goto(&self.settings.signup_url, self.settings.navigation_timeout)
            .await?;
        page.wait_for_network_idle(self.settings.network_idle_timeout)
            .await?;
        self.pacing.pause(timing::AFTER_LOAD).await;
        attempt.transition(AttemptState::Navigated, Some(self.settings.signup_url.clone()));
        self.capture(page, "post-load").await;

        // Navigated -> FormFilled
        let fields = [
            (SignupSelectors::FIRST_NAME, request.first_name.as_str()),
            (SignupSelectors::LAST_NAME, request.last_name.as_str()),
            (SignupSelectors::EMAIL, request.email.as_str()),
            (SignupSelectors::PASSWORD, request.password.as_str()),
        ];
        for (i, (candidates, value)) in fields.iter().enumerate() {
            if i > 0 {
                self.pacing.pause(timing::BETWEEN_FIELDS).await;
            }
            resolver.resolve(candidates, Action::Fill(value)).await?;
        }
        self.pacing.pause(timing::AFTER_FIELDS).await;

        let business_type = self.pacing.choose(BUSINESS_TYPES);
        let purpose = self.pacing.choose(BUSINESS_PURPOSES);
        info!(business_type, purpose, budget = BUDGET_BAND, "selecting business details");

        resolver
            .resolve(&SignupSelectors::BUSINESS_TYPE, Action::SelectOption(business_type))
            .await?;
        self.pacing.pause(timing::BETWEEN_DROPDOWNS).await;
        resolver
            .resolve(&SignupSelectors::BUSINESS_PURPOSE, Action::SelectOption(purpose))
            .await?;
        self.pacing.pause(timing::BETWEEN_DROPDOWNS).await;
        resolver
            .resolve(&SignupSelectors::BUDGET, Action::SelectOption(BUDGET_BAND))
            .await?;
        self.pacing.pause(timing::AFTER_DROPDOWNS).await;
        attempt.transition(AttemptState::FormFilled, None);

        // FormFilled -> Submitted
        resolver
            .resolve(&SignupSelectors::TERMS, Action::Click(timing::TERMS_CLICK_HOLD))
            .await?;
        resolver
            .resolve(&SignupSelectors::SUBMIT, Action::Click(timing::SUBMIT_CLICK_HOLD))
            .await?;
        attempt.transition(AttemptState::Submitted, None);
        self.capture(page, "post-submit").await;

        // Submitted -> Succeeded | Failed
        OutcomeDetector::new(self.settings.outcome_timeout)
            .detect(page)
            .await?
            .into_result()
    }

    /// Best-effort diagnostic screenshot; never affects the attempt.
    async fn capture(&self, page: &dyn PageSession, checkpoint: &str) {
        let Some(dir) = &self.settings.screenshot_dir else {
            return;
        };
        if let Err(e) = tokio::fs::create_dir_all(dir).await {
            warn!(dir = %dir.display(), error = %e, "cannot create screenshot directory");
            return;
        }
        let path = dir.join(format!(
            "{}-{}.png",
            Utc::now().format("%Y%m%dT%H%M%S%.3f"),
            checkpoint
        ));
        match page.screenshot(&path).await {
            Ok(()) => info!(path = %path.display(), checkpoint, "screenshot saved"),
            Err(e) => warn!(checkpoint, error = %e, "screenshot failed"),
        }
    }
}

#[async_trait]
impl Registrar for RegistrationEngine {
    async fn register(&self, request: RegistrationRequest) -> RegistrationResult {
        self.run(&request).await
    }
}
