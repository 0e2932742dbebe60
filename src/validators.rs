/// Input validators module - protects against invalid accounts and attacks
/// Features:
/// 1. DoS Protection: Input length limits
/// 2. Data Theft Protection: Input sanitization
/// 3. Phishing Protection: Email validation

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::ValidationError;

const MAX_EMAIL_LENGTH: usize = 254; // RFC 5321
const MAX_NAME_LENGTH: usize = 256;
const MIN_EMAIL_LENGTH: usize = 5;
const MIN_NAME_LENGTH: usize = 1;

lazy_static! {
    // RFC 5322 simplified email regex (practical validation)
    static ref EMAIL_REGEX: Regex = Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$"
    ).unwrap();
}

/// Validates an email address.
/// - Checks format using RFC 5322 simplified regex
/// - Verifies length constraints
/// - Detects potential phishing patterns
///
/// The returned address is trimmed and lowercased; directory lookups treat
/// addresses as case-insensitive.
pub fn is_valid_email(email: &str) -> Result<String, ValidationError> {
    let trimmed = email.trim();

    // Length validation - prevent DoS attacks with extremely long inputs
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField("email".to_string()));
    }

    if trimmed.len() < MIN_EMAIL_LENGTH {
        return Err(ValidationError::TooShort("email".to_string(), MIN_EMAIL_LENGTH));
    }

    if trimmed.len() > MAX_EMAIL_LENGTH {
        return Err(ValidationError::TooLong("email".to_string(), MAX_EMAIL_LENGTH));
    }

    // Format validation - RFC 5322 simplified
    if !EMAIL_REGEX.is_match(trimmed) {
        return Err(ValidationError::InvalidFormat("email".to_string()));
    }

    // Check for suspicious patterns (phishing protection)
    if has_suspicious_email_patterns(trimmed) {
        return Err(ValidationError::SuspiciousContent("email".to_string()));
    }

    Ok(trimmed.to_lowercase())
}

/// Validates a display name.
/// - Checks length constraints
/// - Validates against control characters
pub fn is_valid_name(name: &str) -> Result<String, ValidationError> {
    let trimmed = name.trim();

    // Length validation - prevent DoS attacks
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField("name".to_string()));
    }

    if trimmed.len() < MIN_NAME_LENGTH {
        return Err(ValidationError::TooShort("name".to_string(), MIN_NAME_LENGTH));
    }

    if trimmed.len() > MAX_NAME_LENGTH {
        return Err(ValidationError::TooLong("name".to_string(), MAX_NAME_LENGTH));
    }

    // Check for control characters and suspicious content
    if has_suspicious_name_patterns(trimmed) {
        return Err(ValidationError::SuspiciousContent("name".to_string()));
    }

    Ok(trimmed.to_string())
}

/// Detects suspicious patterns in email addresses that might indicate phishing
fn has_suspicious_email_patterns(email: &str) -> bool {
    // Check for extremely long local part (before @) - phishing indicator
    if let Some(at_pos) = email.find('@') {
        let local_part = &email[..at_pos];
        if local_part.len() > 64 {
            return true;
        }
    }

    // Check for multiple @ symbols
    if email.matches('@').count() != 1 {
        return true;
    }

    // Check for null bytes
    if email.contains('\0') {
        return true;
    }

    false
}

/// Detects suspicious patterns in names
fn has_suspicious_name_patterns(name: &str) -> bool {
    // Check for null bytes (data theft protection)
    if name.contains('\0') {
        return true;
    }

    // Check for control characters
    if name.chars().any(|c| c.is_control()) {
        return true;
    }

    // Check for excessive special characters (potential injection)
    let special_char_count = name
        .chars()
        .filter(|c| {
            !c.is_alphanumeric() && !c.is_whitespace() && *c != '-' && *c != '.' && *c != '_' && *c != '\''
        })
        .count();

    if special_char_count > 5 {
        return true;
    }

    false
}
