//! In-memory page and launcher used by the unit tests.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use formpilot_core::RegistrationError;

use crate::session::{BrowserLauncher, PageSession};
use crate::site::{DeviceProfile, Locator, SignupSelectors};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageCall {
    Goto(String),
    NetworkIdle,
    IsPresent(String),
    Click(String),
    Type(String, String),
    ClickOption(String),
    WaitText,
    InnerText(String),
    Screenshot,
}

impl PageCall {
    pub fn is_action(&self) -> bool {
        matches!(self, PageCall::Click(_) | PageCall::Type(..) | PageCall::ClickOption(_))
    }

    pub fn targets(&self, selector: &str) -> bool {
        match self {
            PageCall::IsPresent(s) | PageCall::Click(s) | PageCall::InnerText(s) => s == selector,
            PageCall::Type(s, _) => s == selector,
            _ => false,
        }
    }
}

/// Page operation a fault can be injected into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Goto,
    NetworkIdle,
    IsPresent,
    Click,
    Type,
    ClickOption,
    WaitText,
    InnerText,
}

impl Op {
    pub const ALL: [Op; 8] = [
        Op::Goto,
        Op::NetworkIdle,
        Op::IsPresent,
        Op::Click,
        Op::Type,
        Op::ClickOption,
        Op::WaitText,
        Op::InnerText,
    ];
}

pub struct FakePage {
    present: HashSet<String>,
    options: Option<HashSet<String>>,
    texts: HashMap<String, String>,
    visible_marker: Option<usize>,
    fault: Option<(Op, RegistrationError)>,
    calls: Arc<Mutex<Vec<PageCall>>>,
    closed: Option<Arc<AtomicUsize>>,
}

impl FakePage {
    pub fn with_present(selectors: &[&str]) -> Self {
        Self {
            present: selectors.iter().map(|s| s.to_string()).collect(),
            options: Some(HashSet::new()),
            texts: HashMap::new(),
            visible_marker: None,
            fault: None,
            calls: Arc::new(Mutex::new(Vec::new())),
            closed: None,
        }
    }

    /// Signup form where the first candidate of every control exists and
    /// every dropdown offers whatever is asked for.
    pub fn signup_form() -> Self {
        let sets = [
            SignupSelectors::FIRST_NAME,
            SignupSelectors::LAST_NAME,
            SignupSelectors::EMAIL,
            SignupSelectors::PASSWORD,
            SignupSelectors::BUSINESS_TYPE,
            SignupSelectors::BUSINESS_PURPOSE,
            SignupSelectors::BUDGET,
            SignupSelectors::TERMS,
            SignupSelectors::SUBMIT,
        ];
        let mut page = Self::with_present(&[]);
        for set in sets {
            page.present.insert(set.locators[0].to_string());
        }
        page.options = None;
        page
    }

    pub fn with_options(mut self, options: &[&str]) -> Self {
        self.options = Some(options.iter().map(|s| s.to_string()).collect());
        self
    }

    /// Makes `selector` present with the given visible text.
    pub fn with_text(mut self, selector: &str, text: &str) -> Self {
        self.present.insert(selector.to_string());
        self.texts.insert(selector.to_string(), text.to_string());
        self
    }

    pub fn with_marker(mut self, index: usize) -> Self {
        self.visible_marker = Some(index);
        self
    }

    pub fn with_fault(mut self, op: Op, error: RegistrationError) -> Self {
        self.fault = Some((op, error));
        self
    }

    pub fn calls(&self) -> Vec<PageCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, op: Op, call: PageCall) -> Result<(), RegistrationError> {
        self.calls.lock().unwrap().push(call);
        match &self.fault {
            Some((fault_op, error)) if *fault_op == op => Err(error.clone()),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl PageSession for FakePage {
    async fn goto(&self, url: &str, _timeout: Duration) -> Result<(), RegistrationError> {
        self.record(Op::Goto, PageCall::Goto(url.to_string()))
    }

    async fn wait_for_network_idle(&self, _timeout: Duration) -> Result<(), RegistrationError> {
        self.record(Op::NetworkIdle, PageCall::NetworkIdle)
    }

    async fn is_present(&self, locator: &Locator) -> Result<bool, RegistrationError> {
        let key = locator.to_string();
        self.record(Op::IsPresent, PageCall::IsPresent(key.clone()))?;
        Ok(self.present.contains(&key))
    }

    async fn click(&self, locator: &Locator, _hold: Duration) -> Result<(), RegistrationError> {
        self.record(Op::Click, PageCall::Click(locator.to_string()))
    }

    async fn type_text(
        &self,
        locator: &Locator,
        text: &str,
        _key_delay: Duration,
    ) -> Result<(), RegistrationError> {
        self.record(Op::Type, PageCall::Type(locator.to_string(), text.to_string()))
    }

    async fn click_option(
        &self,
        text: &str,
        _timeout: Duration,
        _hold: Duration,
    ) -> Result<bool, RegistrationError> {
        self.record(Op::ClickOption, PageCall::ClickOption(text.to_string()))?;
        Ok(match &self.options {
            Some(options) => options.contains(text),
            None => true,
        })
    }

    async fn wait_for_any_text(
        &self,
        texts: &[&str],
        _timeout: Duration,
    ) -> Result<Option<usize>, RegistrationError> {
        self.record(Op::WaitText, PageCall::WaitText)?;
        Ok(self.visible_marker.filter(|i| *i < texts.len()))
    }

    async fn inner_text(&self, locator: &Locator) -> Result<Option<String>, RegistrationError> {
        let key = locator.to_string();
        self.record(Op::InnerText, PageCall::InnerText(key.clone()))?;
        Ok(self.texts.get(&key).cloned())
    }

    async fn screenshot(&self, _path: &Path) -> Result<(), RegistrationError> {
        self.calls.lock().unwrap().push(PageCall::Screenshot);
        Ok(())
    }

    async fn close(self: Box<Self>) {
        if let Some(closed) = &self.closed {
            closed.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// Hands out a fresh [`FakePage`] per launch and counts opens and closes.
pub struct FakeLauncher {
    build: Box<dyn Fn() -> FakePage + Send + Sync>,
    launch_error: Option<RegistrationError>,
    pub opened: Arc<AtomicUsize>,
    pub closed: Arc<AtomicUsize>,
    pub calls: Arc<Mutex<Vec<PageCall>>>,
    pub devices: Arc<Mutex<Vec<DeviceProfile>>>,
}

impl FakeLauncher {
    pub fn new<F>(build: F) -> Self
    where
        F: Fn() -> FakePage + Send + Sync + 'static,
    {
        Self {
            build: Box::new(build),
            launch_error: None,
            opened: Arc::new(AtomicUsize::new(0)),
            closed: Arc::new(AtomicUsize::new(0)),
            calls: Arc::new(Mutex::new(Vec::new())),
            devices: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn failing(error: RegistrationError) -> Self {
        let mut launcher = Self::new(|| FakePage::with_present(&[]));
        launcher.launch_error = Some(error);
        launcher
    }
}

#[async_trait]
impl BrowserLauncher for FakeLauncher {
    async fn launch(&self, device: &DeviceProfile) -> Result<Box<dyn PageSession>, RegistrationError> {
        if let Some(error) = &self.launch_error {
            return Err(error.clone());
        }
        self.devices.lock().unwrap().push(device.clone());
        self.opened.fetch_add(1, Ordering::SeqCst);

        let mut page = (self.build)();
        self.calls.lock().unwrap().clear();
        page.calls = Arc::clone(&self.calls);
        page.closed = Some(Arc::clone(&self.closed));
        Ok(Box::new(page))
    }
}
