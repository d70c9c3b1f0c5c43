use anyhow::Result;
use async_trait::async_trait;
use headless_chrome::protocol::cdp::{Emulation, Page, Target};
use headless_chrome::{Browser, Element, LaunchOptionsBuilder, Tab};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use formpilot_core::config::BrowserConfig;
use formpilot_core::RegistrationError;

use crate::session::{BrowserLauncher, PageSession};
use crate::site::{DeviceProfile, Locator, SignupSelectors};

/// Upper bound for launching Chrome and opening the first tab.
const LAUNCH_TIMEOUT: Duration = Duration::from_secs(60);
/// Upper bound for a single click, lookup or read.
const ACTION_TIMEOUT: Duration = Duration::from_secs(30);
const CLOSE_TIMEOUT: Duration = Duration::from_secs(10);
const POLL_INTERVAL: Duration = Duration::from_millis(250);
/// Network counts as idle once resource loading stayed flat this long.
const IDLE_WINDOW: Duration = Duration::from_millis(500);

/// Launches a dedicated headless Chrome process per registration attempt.
pub struct ChromeLauncher {
    headless: bool,
    chrome_path: Option<PathBuf>,
    idle_timeout: Duration,
}

impl ChromeLauncher {
    pub fn new(config: &BrowserConfig) -> Self {
        Self {
            headless: config.headless,
            chrome_path: config.chrome_path.clone(),
            // Chrome's own watchdog must outlive the longest wait we do.
            idle_timeout: config.navigation_timeout() + ACTION_TIMEOUT,
        }
    }

    fn launch_blocking(
        headless: bool,
        chrome_path: Option<PathBuf>,
        idle_timeout: Duration,
        device: DeviceProfile,
    ) -> Result<ChromeSession> {
        let mut extra_args: Vec<OsString> = vec![
            OsString::from("--no-sandbox"),
            OsString::from("--disable-dev-shm-usage"),
            OsString::from("--disable-gpu"),
            // Hides navigator.webdriver from the page
            OsString::from("--disable-blink-features=AutomationControlled"),
            OsString::from(format!("--user-agent={}", device.user_agent)),
            OsString::from(format!("--lang={}", device.locale)),
            OsString::from(format!("--force-device-scale-factor={}", device.device_scale_factor)),
        ];
        if device.touch {
            extra_args.push(OsString::from("--touch-events=enabled"));
        }

        let mut builder = LaunchOptionsBuilder::default();
        builder
            .headless(headless)
            .window_size(Some(device.viewport))
            .idle_browser_timeout(idle_timeout)
            .args(extra_args.iter().map(|a| a.as_ref()).collect());

        if let Some(path) = chrome_path {
            builder.path(Some(path));
        }

        let browser = Browser::new(builder.build()?)?;

        // Fresh incognito context: no cookies or storage from anywhere else.
        let (context_id, tab) = {
            let context = browser.new_context()?;
            let tab = context.new_tab()?;
            (context.get_id().to_string(), tab)
        };
        tab.set_user_agent(&device.user_agent, Some(device.locale), None)?;
        if let Err(e) = tab.call_method(device_metrics(&device)) {
            warn!(error = %e, "device metrics override failed");
        }
        if device.touch {
            if let Err(e) = tab.call_method(touch_emulation()) {
                warn!(error = %e, "touch emulation failed");
            }
        }

        Ok(ChromeSession {
            browser,
            context_id,
            tab,
        })
    }
}

#[async_trait]
impl BrowserLauncher for ChromeLauncher {
    async fn launch(
        &self,
        device: &DeviceProfile,
    ) -> Result<Box<dyn PageSession>, RegistrationError> {
        let headless = self.headless;
        let chrome_path = self.chrome_path.clone();
        let idle_timeout = self.idle_timeout;
        let device = device.clone();

        let launched = tokio::time::timeout(
            LAUNCH_TIMEOUT,
            tokio::task::spawn_blocking(move || {
                Self::launch_blocking(headless, chrome_path, idle_timeout, device)
            }),
        )
        .await;

        match launched {
            Ok(Ok(Ok(session))) => {
                info!(context = %session.context_id, "browser session opened");
                Ok(Box::new(session))
            }
            Ok(Ok(Err(e))) => Err(RegistrationError::BrowserInit(e.to_string())),
            Ok(Err(join)) => Err(RegistrationError::BrowserInit(join.to_string())),
            Err(_) => Err(RegistrationError::BrowserInit(format!(
                "browser did not start within {}s",
                LAUNCH_TIMEOUT.as_secs()
            ))),
        }
    }
}

/// One Chrome process, one incognito context, one tab.
///
/// Dropping it without `close` still ends the process, since `Browser`
/// kills Chrome on drop.
pub struct ChromeSession {
    browser: Browser,
    context_id: String,
    tab: Arc<Tab>,
}

impl ChromeSession {
    /// Run blocking CDP work off the async runtime, bounded by `limit`.
    async fn on_tab<T, F>(
        &self,
        limit: Duration,
        on_timeout: RegistrationError,
        f: F,
    ) -> Result<T, RegistrationError>
    where
        T: Send + 'static,
        F: FnOnce(&Tab) -> Result<T> + Send + 'static,
    {
        let tab = Arc::clone(&self.tab);
        let work = tokio::task::spawn_blocking(move || f(tab.as_ref()));
        match tokio::time::timeout(limit, work).await {
            Ok(Ok(Ok(value))) => Ok(value),
            Ok(Ok(Err(e))) => Err(RegistrationError::System(e.to_string())),
            Ok(Err(join)) => Err(RegistrationError::System(join.to_string())),
            Err(_) => Err(on_timeout),
        }
    }

    async fn evaluate(&self, expression: String) -> Result<serde_json::Value, RegistrationError> {
        let what = action_timeout("script evaluation");
        self.on_tab(ACTION_TIMEOUT, what, move |tab| {
            Ok(tab
                .evaluate(&expression, false)?
                .value
                .unwrap_or(serde_json::Value::Null))
        })
        .await
    }
}

/// Mobile viewport matching the device profile.
fn device_metrics(device: &DeviceProfile) -> Emulation::SetDeviceMetricsOverride {
    Emulation::SetDeviceMetricsOverride {
        width: device.viewport.0,
        height: device.viewport.1,
        device_scale_factor: device.device_scale_factor,
        mobile: true,
        scale: None,
        screen_width: None,
        screen_height: None,
        position_x: None,
        position_y: None,
        dont_set_visible_size: None,
        screen_orientation: None,
        viewport: None,
        display_feature: None,
        device_posture: None,
    }
}

fn touch_emulation() -> Emulation::SetTouchEmulationEnabled {
    Emulation::SetTouchEmulationEnabled {
        enabled: true,
        max_touch_points: Some(5),
    }
}

fn dispose_context(context_id: String) -> Target::DisposeBrowserContext {
    Target::DisposeBrowserContext {
        browser_context_id: context_id,
    }
}

fn action_timeout(what: &str) -> RegistrationError {
    RegistrationError::System(format!("{} timed out after {}s", what, ACTION_TIMEOUT.as_secs()))
}

fn find<'t>(tab: &'t Tab, locator: &Locator) -> Result<Element<'t>> {
    match locator {
        Locator::Css(selector) => tab.find_element(selector),
        Locator::XPath(query) => tab.find_element_by_xpath(query),
    }
}

/// JS expression yielding the first element for `locator`, or null.
fn lookup_js(locator: &Locator) -> String {
    match locator {
        Locator::Css(selector) => format!("document.querySelector({})", js_string(selector)),
        Locator::XPath(query) => xpath_lookup_js(&js_string(query)),
    }
}

fn xpath_lookup_js(query_js: &str) -> String {
    format!(
        "document.evaluate({}, document, null, XPathResult.FIRST_ORDERED_NODE_TYPE, null).singleNodeValue",
        query_js
    )
}

fn js_string(s: &str) -> String {
    serde_json::Value::from(s).to_string()
}

/// Quote `s` as an XPath string literal, whatever quotes it contains.
pub fn xpath_literal(s: &str) -> String {
    if !s.contains('\'') {
        format!("'{}'", s)
    } else if !s.contains('"') {
        format!("\"{}\"", s)
    } else {
        let parts: Vec<String> = s.split('\'').map(|p| format!("'{}'", p)).collect();
        format!("concat({})", parts.join(", \"'\", "))
    }
}

/// Elements whose own text contains `text`.
pub fn text_xpath(text: &str) -> String {
    format!("//*[text()[contains(., {})]]", xpath_literal(text))
}

/// Open dropdown options whose visible text contains `text`.
pub fn option_xpath(text: &str) -> String {
    SignupSelectors::OPTION_TAGS
        .iter()
        .map(|tag| {
            format!(
                "//{}[@role='option'][contains(normalize-space(.), {})]",
                tag,
                xpath_literal(text)
            )
        })
        .collect::<Vec<_>>()
        .join(" | ")
}

fn hover_then_click(element: &Element<'_>, hold: Duration) -> Result<()> {
    element.scroll_into_view()?;
    element.move_mouse_over()?;
    std::thread::sleep(hold);
    element.click()?;
    Ok(())
}

#[async_trait]
impl PageSession for ChromeSession {
    async fn goto(&self, url: &str, timeout: Duration) -> Result<(), RegistrationError> {
        info!(url, timeout_secs = timeout.as_secs(), "navigating");
        let url = url.to_string();
        let on_timeout = RegistrationError::NavigationTimeout {
            stage: "page load".to_string(),
            timeout,
        };
        self.on_tab(timeout, on_timeout, move |tab| {
            // Let our own bound fire first so the error is classified as a timeout.
            tab.set_default_timeout(timeout + Duration::from_secs(5));
            tab.navigate_to(&url)?;
            tab.wait_until_navigated()?;
            Ok(())
        })
        .await
    }

    async fn wait_for_network_idle(&self, timeout: Duration) -> Result<(), RegistrationError> {
        let check_js = "document.readyState + ':' + performance.getEntriesByType('resource').length";
        let deadline = Instant::now() + timeout;
        let mut last: Option<String> = None;
        let mut stable_since = Instant::now();

        loop {
            let state = self
                .evaluate(check_js.to_string())
                .await?
                .as_str()
                .unwrap_or_default()
                .to_string();

            if last.as_deref() != Some(state.as_str()) {
                last = Some(state.clone());
                stable_since = Instant::now();
            } else if state.starts_with("complete:") && stable_since.elapsed() >= IDLE_WINDOW {
                debug!(state = %state, "network idle");
                return Ok(());
            }

            if Instant::now() >= deadline {
                return Err(RegistrationError::NavigationTimeout {
                    stage: "network idle".to_string(),
                    timeout,
                });
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn is_present(&self, locator: &Locator) -> Result<bool, RegistrationError> {
        let found = self
            .evaluate(format!("({}) !== null", lookup_js(locator)))
            .await?;
        Ok(found.as_bool().unwrap_or(false))
    }

    async fn click(&self, locator: &Locator, hold: Duration) -> Result<(), RegistrationError> {
        let locator = *locator;
        self.on_tab(ACTION_TIMEOUT + hold, action_timeout("click"), move |tab| {
            hover_then_click(&find(tab, &locator)?, hold)
        })
        .await
    }

    async fn type_text(
        &self,
        locator: &Locator,
        text: &str,
        key_delay: Duration,
    ) -> Result<(), RegistrationError> {
        let locator = *locator;
        let text = text.to_string();
        let limit = ACTION_TIMEOUT + key_delay * text.chars().count() as u32;
        self.on_tab(limit, action_timeout("typing"), move |tab| {
            let element = find(tab, &locator)?;
            element.call_js_fn(
                "function() { this.value = ''; this.dispatchEvent(new Event('input', { bubbles: true })); }",
                vec![],
                false,
            )?;
            element.focus()?;
            let mut buf = [0u8; 4];
            for ch in text.chars() {
                tab.type_str(ch.encode_utf8(&mut buf))?;
                std::thread::sleep(key_delay);
            }
            Ok(())
        })
        .await
    }

    async fn click_option(
        &self,
        text: &str,
        timeout: Duration,
        hold: Duration,
    ) -> Result<bool, RegistrationError> {
        let xpath = option_xpath(text);
        let check_js = format!("({}) !== null", xpath_lookup_js(&js_string(&xpath)));
        let deadline = Instant::now() + timeout;

        loop {
            if self.evaluate(check_js.clone()).await?.as_bool().unwrap_or(false) {
                break;
            }
            if Instant::now() >= deadline {
                warn!(option = text, "dropdown option did not appear");
                return Ok(false);
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }

        self.on_tab(ACTION_TIMEOUT + hold, action_timeout("option click"), move |tab| {
            hover_then_click(&tab.find_element_by_xpath(&xpath)?, hold)
        })
        .await?;
        Ok(true)
    }

    async fn wait_for_any_text(
        &self,
        texts: &[&str],
        timeout: Duration,
    ) -> Result<Option<usize>, RegistrationError> {
        let queries: Vec<String> = texts.iter().map(|t| text_xpath(t)).collect();
        let check_js = format!(
            "(() => {{ const xs = {}; for (let i = 0; i < xs.length; i++) {{ if ({}) return i; }} return -1; }})()",
            serde_json::Value::from(queries),
            xpath_lookup_js("xs[i]")
        );
        let deadline = Instant::now() + timeout;

        loop {
            let index = self.evaluate(check_js.clone()).await?.as_i64().unwrap_or(-1);
            if index >= 0 {
                return Ok(Some(index as usize));
            }
            if Instant::now() >= deadline {
                return Ok(None);
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn inner_text(&self, locator: &Locator) -> Result<Option<String>, RegistrationError> {
        let text = self
            .evaluate(format!(
                "(() => {{ const el = {}; return el ? el.innerText : null; }})()",
                lookup_js(locator)
            ))
            .await?;
        Ok(text.as_str().map(str::to_string))
    }

    async fn screenshot(&self, path: &Path) -> Result<(), RegistrationError> {
        let path = path.to_path_buf();
        self.on_tab(ACTION_TIMEOUT, action_timeout("screenshot"), move |tab| {
            let png = tab.capture_screenshot(
                Page::CaptureScreenshotFormatOption::Png,
                None,
                None,
                true,
            )?;
            std::fs::write(&path, png)?;
            Ok(())
        })
        .await
    }

    async fn close(self: Box<Self>) {
        let context_id = self.context_id.clone();
        let closing = tokio::task::spawn_blocking(move || {
            let ChromeSession {
                browser,
                context_id,
                tab,
            } = *self;
            // Disposing the context closes its tabs as well.
            if let Err(e) = tab.call_method(dispose_context(context_id)) {
                debug!(error = %e, "context dispose failed, closing tab");
                if let Err(e) = tab.close(false) {
                    debug!(error = %e, "tab close failed");
                }
            }
            // Dropping the last handle terminates the Chrome process.
            drop(browser);
        });

        match tokio::time::timeout(CLOSE_TIMEOUT, closing).await {
            Ok(Ok(())) => info!(context = %context_id, "browser session closed"),
            Ok(Err(e)) => warn!(context = %context_id, error = %e, "browser close task failed"),
            Err(_) => warn!(context = %context_id, "browser close timed out"),
        }
    }
}
