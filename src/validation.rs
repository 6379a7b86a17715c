//! Input validation helpers shared by the auth, catalog and checkout handlers.

use std::sync::LazyLock;

use regex::Regex;

pub const PASSWORD_MIN_LENGTH: usize = 8;
pub const PASSWORD_MAX_LENGTH: usize = 128;
pub const EMAIL_MAX_LENGTH: usize = 254;

pub const PRODUCT_NAME_MIN_LENGTH: usize = 3;
pub const PRODUCT_NAME_MAX_LENGTH: usize = 100;
pub const PRODUCT_DESCRIPTION_MAX_LENGTH: usize = 2000;
pub const PRODUCT_SKU_MAX_LENGTH: usize = 50;
pub const PRODUCT_PRICE_MAX: f64 = 999_999.99;
pub const MAX_IMAGES_PER_PRODUCT: usize = 10;
pub const ORDER_NOTES_MAX_LENGTH: usize = 500;

const PASSWORD_SPECIAL_CHARS: &str = "!@#$%^&*(),.?\":{}|<>";

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("static email pattern"));

static PHONE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\+?1?\s*\(?[0-9]{3}\)?[-.\s]?[0-9]{3}[-.\s]?[0-9]{4}$")
        .expect("static phone pattern")
});

static SLUG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").expect("static slug pattern"));

static EVENT_HANDLER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)on\w+=").expect("static handler pattern"));

static JAVASCRIPT_SCHEME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)javascript:").expect("static scheme pattern"));

/// Basic `local@domain.tld` shape check, bounded by the RFC 5321 length limit.
pub fn is_valid_email(email: &str) -> bool {
    email.len() <= EMAIL_MAX_LENGTH && EMAIL_RE.is_match(email)
}

/// Returns every password rule the candidate violates, in a fixed order.
///
/// An empty vector means the password is acceptable.
pub fn password_errors(password: &str) -> Vec<&'static str> {
    let mut errors = Vec::new();
    let length = password.chars().count();

    if length < PASSWORD_MIN_LENGTH {
        errors.push("Password must be at least 8 characters long");
    }
    if length > PASSWORD_MAX_LENGTH {
        errors.push("Password must be less than 128 characters");
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        errors.push("Password must contain at least one uppercase letter");
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        errors.push("Password must contain at least one lowercase letter");
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        errors.push("Password must contain at least one number");
    }
    if !password.chars().any(|c| PASSWORD_SPECIAL_CHARS.contains(c)) {
        errors.push("Password must contain at least one special character");
    }

    errors
}

/// US phone numbers, optionally prefixed with `+1`; whitespace is ignored.
pub fn is_valid_phone_number(phone: &str) -> bool {
    let compact: String = phone.chars().filter(|c| !c.is_whitespace()).collect();
    PHONE_RE.is_match(&compact)
}

/// Absolute URL with a scheme.
pub fn is_valid_url(value: &str) -> bool {
    url::Url::parse(value).is_ok()
}

/// Lowercase ASCII words joined by single hyphens.
pub fn is_valid_slug(value: &str) -> bool {
    SLUG_RE.is_match(value)
}

/// Luhn checksum over 13 to 19 digits; spaces are ignored.
pub fn is_valid_credit_card(card_number: &str) -> bool {
    let digits: Vec<u32> = card_number
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| c.to_digit(10))
        .collect::<Option<Vec<_>>>()
        .unwrap_or_default();

    if !(13..=19).contains(&digits.len()) {
        return false;
    }

    let sum: u32 = digits
        .iter()
        .rev()
        .enumerate()
        .map(|(index, &digit)| {
            if index % 2 == 1 {
                let doubled = digit * 2;
                if doubled > 9 { doubled - 9 } else { doubled }
            } else {
                digit
            }
        })
        .sum();

    sum % 10 == 0
}

/// Strips markup brackets, `javascript:` schemes and inline event handlers, then trims.
pub fn sanitize_input(input: &str) -> String {
    let without_brackets: String = input.chars().filter(|c| *c != '<' && *c != '>').collect();
    let without_scheme = JAVASCRIPT_SCHEME_RE.replace_all(&without_brackets, "");
    let without_handlers = EVENT_HANDLER_RE.replace_all(&without_scheme, "");
    without_handlers.trim().to_string()
}

/// Sanitizes an optional free-text field, mapping blank results to `None`.
pub fn sanitize_optional(input: Option<String>) -> Option<String> {
    input
        .map(|value| sanitize_input(&value))
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_validation() {
        assert!(is_valid_email("user@example.com"));
        assert!(is_valid_email("first.last+tag@shop.co.uk"));
        assert!(!is_valid_email("user@example"));
        assert!(!is_valid_email("user example@test.com"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email(""));

        let long_local = "a".repeat(250);
        assert!(!is_valid_email(&format!("{long_local}@example.com")));
    }

    #[test]
    fn test_password_errors_strong_password() {
        assert!(password_errors("Str0ng!Pass").is_empty());
    }

    #[test]
    fn test_password_errors_report_each_rule() {
        let errors = password_errors("abc");
        assert_eq!(
            errors,
            vec![
                "Password must be at least 8 characters long",
                "Password must contain at least one uppercase letter",
                "Password must contain at least one number",
                "Password must contain at least one special character",
            ]
        );

        assert_eq!(
            password_errors("ALLUPPER1!"),
            vec!["Password must contain at least one lowercase letter"]
        );
    }

    #[test]
    fn test_password_errors_too_long() {
        let password = format!("Aa1!{}", "x".repeat(130));
        assert_eq!(
            password_errors(&password),
            vec!["Password must be less than 128 characters"]
        );
    }

    #[test]
    fn test_phone_validation() {
        assert!(is_valid_phone_number("(555) 123-4567"));
        assert!(is_valid_phone_number("+1 555.123.4567"));
        assert!(is_valid_phone_number("5551234567"));
        assert!(!is_valid_phone_number("12345"));
        assert!(!is_valid_phone_number("phone"));
    }

    #[test]
    fn test_url_validation() {
        assert!(is_valid_url("https://example.com/logo.png"));
        assert!(!is_valid_url("not a url"));
        assert!(!is_valid_url("/relative/path"));
    }

    #[test]
    fn test_slug_validation() {
        assert!(is_valid_slug("default"));
        assert!(is_valid_slug("acme-store-2"));
        assert!(!is_valid_slug("Acme"));
        assert!(!is_valid_slug("double--dash"));
        assert!(!is_valid_slug("-leading"));
    }

    #[test]
    fn test_luhn_check() {
        assert!(is_valid_credit_card("4111 1111 1111 1111"));
        assert!(is_valid_credit_card("5500000000000004"));
        assert!(!is_valid_credit_card("4111 1111 1111 1112"));
        assert!(!is_valid_credit_card("4111"));
        assert!(!is_valid_credit_card("4111-1111-1111-1111"));
    }

    #[test]
    fn test_sanitize_input() {
        assert_eq!(sanitize_input("  <b>Hello</b>  "), "bHello/b");
        assert_eq!(sanitize_input("JavaScript:alert(1)"), "alert(1)");
        assert_eq!(sanitize_input("img onerror=steal()"), "img steal()");
        assert_eq!(sanitize_input("plain text"), "plain text");
    }

    #[test]
    fn test_sanitize_optional_drops_blank() {
        assert_eq!(sanitize_optional(Some("  <>  ".to_string())), None);
        assert_eq!(sanitize_optional(None), None);
        assert_eq!(
            sanitize_optional(Some(" Nice ".to_string())),
            Some("Nice".to_string())
        );
    }
}
