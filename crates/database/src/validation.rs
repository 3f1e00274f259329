//! Input validation for account, plan and material fields.

use std::fmt;

/// Validation error types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Invalid email format.
    InvalidEmail(String),
    /// Password does not meet the minimum policy.
    WeakPassword(String),
    /// Invalid e-mail domain for a company.
    InvalidDomain(String),
    /// Value too long.
    TooLong { field: String, max: usize, actual: usize },
    /// Too many entries in a list field.
    TooMany { field: String, max: usize, actual: usize },
    /// Empty value where one is required.
    Empty(String),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::InvalidEmail(msg) => write!(f, "Invalid email: {}", msg),
            ValidationError::WeakPassword(msg) => write!(f, "Weak password: {}", msg),
            ValidationError::InvalidDomain(msg) => write!(f, "Invalid domain: {}", msg),
            ValidationError::TooLong { field, max, actual } => {
                write!(f, "{} is too long ({} chars, max {})", field, actual, max)
            }
            ValidationError::TooMany { field, max, actual } => {
                write!(f, "{} has too many entries ({}, max {})", field, actual, max)
            }
            ValidationError::Empty(field) => write!(f, "{} cannot be empty", field),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Maximum allowed length for email addresses.
pub const MAX_EMAIL_LENGTH: usize = 254;

/// Password length bounds.
pub const MIN_PASSWORD_LENGTH: usize = 8;
pub const MAX_PASSWORD_LENGTH: usize = 128;

/// Maximum allowed length for titles and names.
pub const MAX_TITLE_LENGTH: usize = 200;

/// Tag limits for materials.
pub const MAX_TAGS: usize = 20;
pub const MAX_TAG_LENGTH: usize = 40;

/// Validate an email address (basic RFC 5322 format check).
///
/// This is a basic validation that checks:
/// - Contains exactly one @
/// - Has at least one character before @
/// - Has a valid domain after @
/// - Is not too long
pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    let email = email.trim();

    if email.is_empty() {
        return Err(ValidationError::Empty("email".to_string()));
    }

    if email.len() > MAX_EMAIL_LENGTH {
        return Err(ValidationError::TooLong {
            field: "email".to_string(),
            max: MAX_EMAIL_LENGTH,
            actual: email.len(),
        });
    }

    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 {
        return Err(ValidationError::InvalidEmail(
            "must contain exactly one @ symbol".to_string(),
        ));
    }

    let (local, domain) = (parts[0], parts[1]);

    if local.is_empty() {
        return Err(ValidationError::InvalidEmail(
            "missing local part (before @)".to_string(),
        ));
    }

    if domain.is_empty() {
        return Err(ValidationError::InvalidEmail(
            "missing domain (after @)".to_string(),
        ));
    }

    validate_domain(domain).map_err(|err| match err {
        ValidationError::InvalidDomain(msg) => ValidationError::InvalidEmail(msg),
        other => other,
    })
}

/// Validate a bare e-mail domain such as `clinic.com`.
pub fn validate_domain(domain: &str) -> Result<(), ValidationError> {
    let domain = domain.trim();

    if domain.is_empty() {
        return Err(ValidationError::Empty("domain".to_string()));
    }

    if !domain.contains('.') {
        return Err(ValidationError::InvalidDomain(
            "domain must contain at least one dot".to_string(),
        ));
    }

    if domain.starts_with('.') || domain.ends_with('.') {
        return Err(ValidationError::InvalidDomain(
            "domain cannot start or end with a dot".to_string(),
        ));
    }

    if domain.contains("..") {
        return Err(ValidationError::InvalidDomain(
            "domain cannot contain consecutive dots".to_string(),
        ));
    }

    if domain.chars().any(|c| c.is_whitespace() || c == '@') {
        return Err(ValidationError::InvalidDomain(
            "domain contains invalid characters".to_string(),
        ));
    }

    Ok(())
}

/// Validate a new password: length bounds, at least one letter and one digit.
pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    if password.is_empty() {
        return Err(ValidationError::Empty("password".to_string()));
    }

    let len = password.chars().count();
    if len < MIN_PASSWORD_LENGTH {
        return Err(ValidationError::WeakPassword(format!(
            "must be at least {} characters",
            MIN_PASSWORD_LENGTH
        )));
    }

    if len > MAX_PASSWORD_LENGTH {
        return Err(ValidationError::TooLong {
            field: "password".to_string(),
            max: MAX_PASSWORD_LENGTH,
            actual: len,
        });
    }

    if !password.chars().any(|c| c.is_alphabetic()) || !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(ValidationError::WeakPassword(
            "must contain letters and digits".to_string(),
        ));
    }

    Ok(())
}

/// Validate a required display text (plan title, material title, names).
pub fn validate_title(field: &str, value: &str) -> Result<(), ValidationError> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Empty(field.to_string()));
    }

    let len = value.chars().count();
    if len > MAX_TITLE_LENGTH {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_TITLE_LENGTH,
            actual: len,
        });
    }

    Ok(())
}

/// Validate material tags.
pub fn validate_tags(tags: &[String]) -> Result<(), ValidationError> {
    if tags.len() > MAX_TAGS {
        return Err(ValidationError::TooMany {
            field: "tags".to_string(),
            max: MAX_TAGS,
            actual: tags.len(),
        });
    }

    for tag in tags {
        let len = tag.trim().chars().count();
        if len == 0 {
            return Err(ValidationError::Empty("tag".to_string()));
        }
        if len > MAX_TAG_LENGTH {
            return Err(ValidationError::TooLong {
                field: "tag".to_string(),
                max: MAX_TAG_LENGTH,
                actual: len,
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_email_valid() {
        assert!(validate_email("test@example.com").is_ok());
        assert!(validate_email("user.name@domain.co.uk").is_ok());
        assert!(validate_email("a@b.c").is_ok());
        assert!(validate_email(" test@example.com ").is_ok()); // trimmed
    }

    #[test]
    fn test_validate_email_invalid() {
        assert!(matches!(validate_email(""), Err(ValidationError::Empty(_))));

        assert!(matches!(
            validate_email("test.example.com"),
            Err(ValidationError::InvalidEmail(_))
        ));

        assert!(matches!(
            validate_email("test@example@com"),
            Err(ValidationError::InvalidEmail(_))
        ));

        assert!(matches!(
            validate_email("@example.com"),
            Err(ValidationError::InvalidEmail(_))
        ));

        assert!(matches!(
            validate_email("test@"),
            Err(ValidationError::InvalidEmail(_))
        ));

        assert!(matches!(
            validate_email("test@localhost"),
            Err(ValidationError::InvalidEmail(_))
        ));

        assert!(matches!(
            validate_email("test@example..com"),
            Err(ValidationError::InvalidEmail(_))
        ));
    }

    #[test]
    fn test_validate_domain() {
        assert!(validate_domain("clinic.com").is_ok());
        assert!(matches!(
            validate_domain("clinic"),
            Err(ValidationError::InvalidDomain(_))
        ));
        assert!(matches!(
            validate_domain("a@clinic.com"),
            Err(ValidationError::InvalidDomain(_))
        ));
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("s3cretpass").is_ok());

        assert!(matches!(validate_password(""), Err(ValidationError::Empty(_))));
        assert!(matches!(
            validate_password("abc1"),
            Err(ValidationError::WeakPassword(_))
        ));
        assert!(matches!(
            validate_password("onlyletters"),
            Err(ValidationError::WeakPassword(_))
        ));
        assert!(matches!(
            validate_password(&"a1".repeat(100)),
            Err(ValidationError::TooLong { .. })
        ));
    }

    #[test]
    fn test_validate_title_and_tags() {
        assert!(validate_title("title", "Thyroid follow-up").is_ok());
        assert!(matches!(
            validate_title("title", "   "),
            Err(ValidationError::Empty(_))
        ));

        let tags = vec!["thyroid".to_string(), "iodine".to_string()];
        assert!(validate_tags(&tags).is_ok());

        let many: Vec<String> = (0..21).map(|i| format!("tag{}", i)).collect();
        assert!(matches!(
            validate_tags(&many),
            Err(ValidationError::TooMany { .. })
        ));
    }

    #[test]
    fn test_validation_error_display() {
        let err = ValidationError::InvalidEmail("test message".to_string());
        assert_eq!(err.to_string(), "Invalid email: test message");

        let err = ValidationError::TooLong {
            field: "email".to_string(),
            max: 254,
            actual: 300,
        };
        assert_eq!(err.to_string(), "email is too long (300 chars, max 254)");
    }
}
