use formpilot_core::{RegistrationRequest, RegistrationResult};

use crate::validate::Rejection;

pub const WELCOME: &str = "🌟 Cloudways Auto-Registration Bot 🌟\n\n\
    This performs REAL registration through Cloudways' official website.\n\
    Use /new to start a fresh registration.";

pub const ASK_FIRST_NAME: &str = "📝 Enter First Name:";
pub const ASK_LAST_NAME: &str = "📝 Enter Last Name:";
pub const ASK_EMAIL: &str = "📧 Enter Email Address:";
pub const ASK_PASSWORD: &str =
    "🔑 Create Password (min 8 characters with mix of letters and numbers):";

pub const RETRY_FIRST_NAME: &str = "❌ Name too short. Please enter valid first name:";
pub const RETRY_LAST_NAME: &str = "❌ Name too short. Please enter valid last name:";
pub const RETRY_EMAIL_FORMAT: &str = "❌ Invalid email format. Please enter a valid email:";
pub const RETRY_EMAIL_DISPOSABLE: &str = "❌ Temporary emails not allowed. Please use a real email:";
pub const RETRY_PASSWORD: &str = "❌ Weak password. Minimum 8 chars with letters and numbers:";

pub const PROCESSING: &str = "⏳ Processing registration with Cloudways...";
pub const CANCELLED: &str = "❌ Registration cancelled";
pub const RETRY_HINT: &str = "Try again with /new";

pub fn reprompt(rejection: Rejection, asking_first_name: bool) -> &'static str {
    match rejection {
        Rejection::NameTooShort if asking_first_name => RETRY_FIRST_NAME,
        Rejection::NameTooShort => RETRY_LAST_NAME,
        Rejection::MalformedEmail => RETRY_EMAIL_FORMAT,
        Rejection::DisposableEmail => RETRY_EMAIL_DISPOSABLE,
        Rejection::WeakPassword => RETRY_PASSWORD,
    }
}

/// Final text that replaces the processing placeholder.
pub fn final_report(request: &RegistrationRequest, result: &RegistrationResult, login_url: &str) -> String {
    if result.success {
        format!(
            "🎉 REGISTRATION SUCCESSFUL!\n\n\
             Your Cloudways account details:\n\
             👤 Name: {}\n\
             📧 Email: {}\n\
             🔑 Password: {}\n\n\
             📩 Check your email for verification link\n\
             🔗 Login at: {}",
            request.full_name(),
            request.email,
            request.masked_password(),
            login_url
        )
    } else {
        format!("❌ REGISTRATION FAILED\n\n{}\n\n{}", result.message, RETRY_HINT)
    }
}
