//! Input validation for API requests.
//!
//! For collecting multiple validation errors and returning them as an
//! ApiError, use the `ValidationErrorBuilder` from the `error` module.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Regex for validating usernames (alphanumeric with dots, dashes,
    /// underscores; 3-32 chars, starting with a letter or digit)
    static ref USERNAME_REGEX: Regex = Regex::new(
        r"^[a-zA-Z0-9][a-zA-Z0-9._-]{2,31}$"
    ).unwrap();

    /// Regex for a plausible email shape; real verification is out of scope
    static ref EMAIL_REGEX: Regex = Regex::new(
        r"^[^@\s]+@[^@\s]+\.[^@\s]+$"
    ).unwrap();
}

/// Validate a username
pub fn validate_username(username: &str) -> Result<(), String> {
    if username.is_empty() {
        return Err("Username is required".to_string());
    }

    if !USERNAME_REGEX.is_match(username) {
        return Err(
            "Username must be 3-32 characters: letters, digits, dots, dashes, underscores"
                .to_string(),
        );
    }

    Ok(())
}

/// Validate an email address
pub fn validate_email(email: &str) -> Result<(), String> {
    if email.is_empty() {
        return Err("Email is required".to_string());
    }

    if email.len() > 254 || !EMAIL_REGEX.is_match(email) {
        return Err("Invalid email address".to_string());
    }

    Ok(())
}

/// Validate a required free-text field
pub fn validate_required(value: &str, label: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{label} is required"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_normal_usernames() {
        assert!(validate_username("alice").is_ok());
        assert!(validate_username("j.doe-42").is_ok());
        assert!(validate_username("0x_ray").is_ok());
    }

    #[test]
    fn rejects_bad_usernames() {
        assert!(validate_username("").is_err());
        assert!(validate_username("ab").is_err());
        assert!(validate_username("-leading").is_err());
        assert!(validate_username("has space").is_err());
        assert!(validate_username(&"x".repeat(40)).is_err());
    }

    #[test]
    fn email_shape_check() {
        assert!(validate_email("a@b.co").is_ok());
        assert!(validate_email("").is_err());
        assert!(validate_email("not-an-email").is_err());
        assert!(validate_email("two@@ats.com").is_err());
    }

    #[test]
    fn required_fields() {
        assert!(validate_required("x", "First name").is_ok());
        assert_eq!(
            validate_required("  ", "First name").unwrap_err(),
            "First name is required"
        );
    }
}
