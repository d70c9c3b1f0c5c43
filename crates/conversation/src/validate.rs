use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,}$").unwrap());

static DIGIT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[0-9]").unwrap());

static LETTER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[a-zA-Z]").unwrap());

pub const MIN_NAME_CHARS: usize = 2;
pub const MIN_PASSWORD_CHARS: usize = 8;

/// Throwaway-mail providers, matched as substrings of the address.
pub const DISALLOWED_EMAIL_DOMAINS: &[&str] = &["tempmail", "mailinator", "10minutemail"];

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    #[error("name too short")]
    NameTooShort,
    #[error("invalid email format")]
    MalformedEmail,
    #[error("temporary email provider")]
    DisposableEmail,
    #[error("weak password")]
    WeakPassword,
}

/// Trimmed name. The length rule counts the message as typed, so `" J"`
/// passes while blank input never does.
pub fn name(input: &str) -> Result<String, Rejection> {
    let name = input.trim();
    if input.chars().count() < MIN_NAME_CHARS || name.is_empty() {
        return Err(Rejection::NameTooShort);
    }
    Ok(name.to_string())
}

/// Lower-cased address, well formed and not from a throwaway provider.
pub fn email(input: &str) -> Result<String, Rejection> {
    let email = input.trim().to_lowercase();
    if !EMAIL_RE.is_match(&email) {
        return Err(Rejection::MalformedEmail);
    }
    if DISALLOWED_EMAIL_DOMAINS.iter().any(|d| email.contains(d)) {
        return Err(Rejection::DisposableEmail);
    }
    Ok(email)
}

/// At least eight characters mixing letters and digits. Kept verbatim.
pub fn password(input: &str) -> Result<String, Rejection> {
    if input.chars().count() < MIN_PASSWORD_CHARS
        || !DIGIT_RE.is_match(input)
        || !LETTER_RE.is_match(input)
    {
        return Err(Rejection::WeakPassword);
    }
    Ok(input.to_string())
}
