use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;

use formpilot_core::RegistrationError;

use crate::site::{DeviceProfile, Locator};

/// Starts one isolated browser (process, fresh context, single page).
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self, device: &DeviceProfile) -> Result<Box<dyn PageSession>, RegistrationError>;
}

/// The page of an ephemeral browser session.
///
/// Every wait is bounded by the timeout passed in. `close` consumes the
/// session so it cannot be used or closed twice.
#[async_trait]
pub trait PageSession: Send + Sync {
    async fn goto(&self, url: &str, timeout: Duration) -> Result<(), RegistrationError>;

    async fn wait_for_network_idle(&self, timeout: Duration) -> Result<(), RegistrationError>;

    async fn is_present(&self, locator: &Locator) -> Result<bool, RegistrationError>;

    /// Hover the element, dwell for `hold`, then click it.
    async fn click(&self, locator: &Locator, hold: Duration) -> Result<(), RegistrationError>;

    /// Replace the element's value, one key every `key_delay`.
    async fn type_text(
        &self,
        locator: &Locator,
        text: &str,
        key_delay: Duration,
    ) -> Result<(), RegistrationError>;

    /// Wait for an open dropdown option whose visible text contains `text`
    /// and click it. `Ok(false)` when none showed up in time.
    async fn click_option(
        &self,
        text: &str,
        timeout: Duration,
        hold: Duration,
    ) -> Result<bool, RegistrationError>;

    /// Index into `texts` of the first one seen on the page, `None` on timeout.
    async fn wait_for_any_text(
        &self,
        texts: &[&str],
        timeout: Duration,
    ) -> Result<Option<usize>, RegistrationError>;

    /// Visible text of the first element matching `locator`, if any.
    async fn inner_text(&self, locator: &Locator) -> Result<Option<String>, RegistrationError>;

    async fn screenshot(&self, path: &Path) -> Result<(), RegistrationError>;

    /// Tear down page, context and browser process.
    async fn close(self: Box<Self>);
}
