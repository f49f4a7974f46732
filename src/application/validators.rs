use validator::ValidateEmail;

/// Validates that the input looks like a valid email address
pub fn is_valid_email(email: &str) -> bool {
    let email = email.trim();
    !email.is_empty() && email.validate_email()
}

/// Validates a plan name used as the catalog key.
/// Rules:
/// - 1-50 characters
/// - Only lowercase ASCII letters, numbers, hyphens, underscores
/// - Must start with a letter or number
pub fn is_valid_plan_name(name: &str) -> bool {
    if name.is_empty() || name.len() > 50 {
        return false;
    }

    let starts_alnum = name
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_lowercase() || c.is_ascii_digit());
    if !starts_alnum {
        return false;
    }

    name.chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
}

/// Validates an ISO 4217 style currency code (three ASCII letters).
pub fn is_valid_currency(currency: &str) -> bool {
    currency.len() == 3 && currency.chars().all(|c| c.is_ascii_alphabetic())
}
