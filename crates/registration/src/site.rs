//! What we know about the signup page we drive.
//!
//! The markup is not ours and drifts between cohorts, so every control is
//! described by an ordered list of equivalent locators. Earlier entries win.

use std::fmt;

/// A way to find one element on the rendered page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Locator {
    Css(&'static str),
    XPath(&'static str),
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Css(s) => write!(f, "{}", s),
            Locator::XPath(s) => write!(f, "xpath={}", s),
        }
    }
}

/// Ordered fallbacks for one logical form control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CandidateSet {
    pub name: &'static str,
    pub locators: &'static [Locator],
}

impl CandidateSet {
    pub const fn new(name: &'static str, locators: &'static [Locator]) -> Self {
        Self { name, locators }
    }

    pub fn describe(&self) -> Vec<String> {
        self.locators.iter().map(ToString::to_string).collect()
    }
}

pub struct SignupSelectors;

impl SignupSelectors {
    pub const FIRST_NAME: CandidateSet = CandidateSet::new(
        "first name field",
        &[
            Locator::Css(r#"input[name="first_name"]"#),
            Locator::Css(r#"input[name="firstName"]"#),
        ],
    );

    pub const LAST_NAME: CandidateSet = CandidateSet::new(
        "last name field",
        &[
            Locator::Css(r#"input[name="last_name"]"#),
            Locator::Css(r#"input[name="lastName"]"#),
        ],
    );

    pub const EMAIL: CandidateSet = CandidateSet::new(
        "email field",
        &[
            Locator::Css(r#"input[name="email"]"#),
            Locator::Css(r#"input[type="email"]"#),
        ],
    );

    pub const PASSWORD: CandidateSet = CandidateSet::new(
        "password field",
        &[
            Locator::Css(r#"input[name="password"]"#),
            Locator::Css(r#"input[type="password"]"#),
        ],
    );

    pub const BUSINESS_TYPE: CandidateSet = CandidateSet::new(
        "business type dropdown",
        &[
            Locator::Css(r#"div[role="button"]:first-of-type"#),
            Locator::Css(r#"div[aria-haspopup="listbox"]:first-of-type"#),
        ],
    );

    pub const BUSINESS_PURPOSE: CandidateSet = CandidateSet::new(
        "business purpose dropdown",
        &[
            Locator::Css(r#"div[role="button"]:nth-of-type(2)"#),
            Locator::Css(r#"div[aria-haspopup="listbox"]:nth-of-type(2)"#),
        ],
    );

    pub const BUDGET: CandidateSet = CandidateSet::new(
        "budget dropdown",
        &[
            Locator::Css(r#"div[role="button"]:nth-of-type(3)"#),
            Locator::Css(r#"div[aria-haspopup="listbox"]:nth-of-type(3)"#),
        ],
    );

    pub const TERMS: CandidateSet = CandidateSet::new(
        "terms checkbox",
        &[
            Locator::Css(r#"input[name="terms"]"#),
            Locator::Css(r#"input[type="checkbox"]"#),
        ],
    );

    pub const SUBMIT: CandidateSet = CandidateSet::new(
        "submit button",
        &[
            Locator::Css(r#"button[type="submit"]"#),
            Locator::XPath("//button[contains(normalize-space(.), 'Sign Up')]"),
        ],
    );

    /// Checked in this order after a submission that produced no success marker.
    pub const ERROR_CONTAINERS: &'static [Locator] = &[
        Locator::Css(".error-message"),
        Locator::Css(".text-red-500"),
        Locator::Css(r#"[role="alert"]"#),
        Locator::Css(".alert-danger"),
    ];

    /// Tags whose `role="option"` children make up an opened dropdown.
    pub const OPTION_TAGS: &'static [&'static str] = &["li", "div"];
}

/// Text that shows up once a submission went through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuccessMarker {
    AccountCreated,
    VerifyEmail,
}

impl SuccessMarker {
    pub const ALL: [SuccessMarker; 2] = [SuccessMarker::AccountCreated, SuccessMarker::VerifyEmail];

    pub fn text(self) -> &'static str {
        match self {
            SuccessMarker::AccountCreated => "Your account has been created successfully",
            SuccessMarker::VerifyEmail => "Verify your email",
        }
    }
}

pub const BUSINESS_TYPES: &[&str] = &[
    "Freelancer",
    "Digital Agency",
    "Software House",
    "E-commerce Business",
    "Startup",
    "Enterprise",
];

pub const BUSINESS_PURPOSES: &[&str] = &[
    "Web Application",
    "E-commerce Store",
    "CMS Website",
    "Custom Development",
    "Mobile App Backend",
    "API Services",
];

pub const BUDGET_BAND: &str = "$0 to $50";

pub const MOBILE_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (iPhone; CPU iPhone OS 15_0 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/15.0 Mobile/15E148 Safari/604.1",
    "Mozilla/5.0 (Linux; Android 10; SM-A205U) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/112.0.5615.47 Mobile Safari/537.36",
    "Mozilla/5.0 (Linux; Android 12; SM-S906N Build/QP1A.190711.020; wv) AppleWebKit/537.36 (KHTML, like Gecko) Version/4.0 Chrome/80.0.3987.119 Mobile Safari/537.36",
];

/// Mobile device the browser context pretends to be.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceProfile {
    pub user_agent: String,
    pub locale: &'static str,
    pub viewport: (u32, u32),
    pub device_scale_factor: f64,
    pub touch: bool,
}

impl DeviceProfile {
    pub fn mobile(user_agent: &str) -> Self {
        Self {
            user_agent: user_agent.to_string(),
            locale: "en-US",
            viewport: (360, 640),
            device_scale_factor: 2.0,
            touch: true,
        }
    }
}
