use lazy_static::lazy_static;
use regex::Regex;

use super::dto::{RegisterRequest, UpdateProfileRequest};

const PASSWORD_SYMBOLS: &str = "!@#$%^&*()-_=+[]{};:,.<>?";

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Password policy: length plus one of each character class. Returns every
/// violated rule so the client can show them all at once.
pub(crate) fn password_errors(password: &str) -> Vec<String> {
    let mut errors = Vec::new();
    if password.len() < 8 {
        errors.push("Password must be at least 8 characters".to_string());
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        errors.push("Password must contain an uppercase letter".to_string());
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        errors.push("Password must contain a lowercase letter".to_string());
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        errors.push("Password must contain a digit".to_string());
    }
    if !password.chars().any(|c| PASSWORD_SYMBOLS.contains(c)) {
        errors.push("Password must contain a symbol".to_string());
    }
    errors
}

pub(crate) fn validate_registration(payload: &RegisterRequest) -> Vec<String> {
    let mut errors = Vec::new();
    if !is_valid_email(&payload.email) {
        errors.push("A valid email is required".to_string());
    }
    errors.extend(password_errors(&payload.password));
    if payload.first_name.trim().len() < 2 {
        errors.push("First name must be at least 2 characters".to_string());
    }
    if payload.last_name.trim().len() < 2 {
        errors.push("Last name must be at least 2 characters".to_string());
    }
    errors
}

pub(crate) fn validate_profile_update(payload: &UpdateProfileRequest) -> Vec<String> {
    let mut errors = Vec::new();
    if let Some(first) = &payload.first_name {
        if first.trim().len() < 2 {
            errors.push("First name must be at least 2 characters".to_string());
        }
    }
    if let Some(last) = &payload.last_name {
        if last.trim().len() < 2 {
            errors.push("Last name must be at least 2 characters".to_string());
        }
    }
    errors
}

/// The counter is read before the increment, so a pre-increment count of
/// `max - 1` means the failure being recorded is the max-th one.
pub(crate) fn locks_account(attempts_before_failure: i32, max_attempts: i32) -> bool {
    attempts_before_failure >= max_attempts - 1
}
