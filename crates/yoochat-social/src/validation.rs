use std::sync::LazyLock;

use regex::Regex;

use crate::error::{SocialError, SocialResult};

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.(com|io|net|org|edu)$")
        .expect("email pattern compiles")
});

pub const PASSWORD_RULE: &str = "Password must be at least 6 characters and contain \
     an uppercase letter, a lowercase letter and a number";

pub const MIN_PASSWORD_LEN: usize = 6;

/// Trim and lowercase, the form emails are stored and compared in.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL.is_match(email)
}

pub fn is_valid_password(password: &str) -> bool {
    password.chars().count() >= MIN_PASSWORD_LEN
        && password.chars().any(|c| c.is_ascii_lowercase())
        && password.chars().any(|c| c.is_ascii_uppercase())
        && password.chars().any(|c| c.is_ascii_digit())
}

pub fn check_email(email: &str) -> SocialResult<()> {
    if is_valid_email(email) {
        Ok(())
    } else {
        Err(SocialError::invalid("Invalid email format"))
    }
}

pub fn check_password(password: &str) -> SocialResult<()> {
    if is_valid_password(password) {
        Ok(())
    } else {
        Err(SocialError::invalid(PASSWORD_RULE))
    }
}

/// Blank strings count as missing.
pub fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn require_id(value: Option<i64>, field: &str) -> SocialResult<i64> {
    value.ok_or_else(|| SocialError::invalid(format!("Missing {field}")))
}
