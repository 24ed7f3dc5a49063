//! Input validation utilities

use regex::Regex;
use std::sync::OnceLock;

/// Validate email
pub fn validate_email(email: &str) -> Result<(), String> {
    if email.is_empty() {
        return Err("Email is required".to_string());
    }

    if email.len() > 254 {
        return Err("Email must be at most 254 characters long".to_string());
    }

    static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = EMAIL_REGEX.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
            .expect("Failed to compile email regex")
    });

    if !regex.is_match(email) {
        return Err("Invalid email format".to_string());
    }

    Ok(())
}

/// Validate password
pub fn validate_password(password: &str) -> Result<(), String> {
    if password.is_empty() {
        return Err("Password is required".to_string());
    }

    if password.len() < 8 {
        return Err("Password must be at least 8 characters long".to_string());
    }

    if password.len() > 128 {
        return Err("Password must be at most 128 characters long".to_string());
    }

    Ok(())
}

/// Validate display name
pub fn validate_display_name(display_name: &str) -> Result<(), String> {
    if display_name.trim().is_empty() {
        return Err("Display name is required".to_string());
    }

    if display_name.len() > 64 {
        return Err("Display name must be at most 64 characters long".to_string());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_ordinary_emails() {
        assert!(validate_email("a@x.com").is_ok());
        assert!(validate_email("user.name+tag@example.co.uk").is_ok());
    }

    #[test]
    fn rejects_malformed_emails() {
        assert!(validate_email("").is_err());
        assert!(validate_email("not-an-email").is_err());
        assert!(validate_email("missing@tld").is_err());
        assert!(validate_email("@x.com").is_err());
    }

    #[test]
    fn password_length_bounds() {
        assert!(validate_password("p@ss1234").is_ok());
        assert!(validate_password("").is_err());
        assert!(validate_password("short7!").is_err());
        assert!(validate_password(&"x".repeat(129)).is_err());
    }

    #[test]
    fn display_name_bounds() {
        assert!(validate_display_name("Ada").is_ok());
        assert!(validate_display_name("   ").is_err());
        assert!(validate_display_name(&"n".repeat(65)).is_err());
    }
}
