//! Input rules for registration and profile edits.

use std::sync::LazyLock;

use regex::Regex;

use crate::errors::AppError;
use crate::models::identity::ProfileUpdate;

pub const MIN_NAME_LEN: usize = 2;
pub const MIN_PASSWORD_LEN: usize = 8;

static REGISTRATION_EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[A-Z0-9._%+-]+@[A-Z0-9.-]+\.[A-Z]{2,}$").expect("valid email regex")
});

static PROFILE_EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));

pub fn validate_registration(
    first_name: &str,
    last_name: &str,
    email: &str,
    password: &str,
) -> Result<(), AppError> {
    require_name("First name", first_name)?;
    require_name("Last name", last_name)?;

    let email = email.trim();
    if email.is_empty() {
        return Err(AppError::validation("Email is required"));
    }
    if !REGISTRATION_EMAIL.is_match(email) {
        return Err(AppError::validation("Invalid email address"));
    }

    if password.is_empty() {
        return Err(AppError::validation("Password is required"));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::validation(format!(
            "Password must have at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

fn require_name(label: &str, value: &str) -> Result<(), AppError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::validation(format!("{label} is required")));
    }
    if value.chars().count() < MIN_NAME_LEN {
        return Err(AppError::validation(format!(
            "{label} must have at least {MIN_NAME_LEN} characters"
        )));
    }
    Ok(())
}

pub fn validate_profile_update(update: &ProfileUpdate) -> Result<(), AppError> {
    if update.first_name.trim().is_empty()
        || update.last_name.trim().is_empty()
        || update.email.trim().is_empty()
    {
        return Err(AppError::validation(
            "First name, last name, and email are required",
        ));
    }
    if !PROFILE_EMAIL.is_match(update.email.trim()) {
        return Err(AppError::validation("Please enter a valid email address"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(result: Result<(), AppError>) -> String {
        result.unwrap_err().to_string()
    }

    #[test]
    fn test_valid_registration() {
        assert!(validate_registration("Ada", "Lovelace", "ada@example.com", "analytical").is_ok());
    }

    #[test]
    fn test_email_is_case_insensitive() {
        assert!(validate_registration("Ada", "Lovelace", "ADA@EXAMPLE.COM", "analytical").is_ok());
    }

    #[test]
    fn test_short_first_name() {
        assert_eq!(
            message(validate_registration("A", "Lovelace", "ada@example.com", "analytical")),
            "First name must have at least 2 characters"
        );
    }

    #[test]
    fn test_missing_last_name() {
        assert_eq!(
            message(validate_registration("Ada", "  ", "ada@example.com", "analytical")),
            "Last name is required"
        );
    }

    #[test]
    fn test_bad_email() {
        assert_eq!(
            message(validate_registration("Ada", "Lovelace", "ada@example", "analytical")),
            "Invalid email address"
        );
    }

    #[test]
    fn test_short_password() {
        assert_eq!(
            message(validate_registration("Ada", "Lovelace", "ada@example.com", "short")),
            "Password must have at least 8 characters"
        );
    }

    #[test]
    fn test_profile_update_requires_core_fields() {
        let update = ProfileUpdate {
            first_name: "Ada".into(),
            last_name: String::new(),
            email: "ada@example.com".into(),
            ..Default::default()
        };
        assert_eq!(
            message(validate_profile_update(&update)),
            "First name, last name, and email are required"
        );
    }

    #[test]
    fn test_profile_update_email_shape() {
        let update = ProfileUpdate {
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            email: "ada at example.com".into(),
            ..Default::default()
        };
        assert_eq!(
            message(validate_profile_update(&update)),
            "Please enter a valid email address"
        );
    }
}
