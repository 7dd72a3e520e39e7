//! # Validation Module
//!
//! Input validation run before any storage access.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: HTTP handler                                                 │
//! │  └── Type validation (JSON deserialization)                            │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── Empty codes, negative totals, out-of-range percentages            │
//! │  └── Reported as ValidationError with a specific message               │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── UNIQUE (tenant_id, code COLLATE NOCASE)                           │
//! │  └── CHECK constraints on balances and counters                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use storefront_core::validation::{validate_lookup_code, validate_cart_total};
//!
//! assert_eq!(validate_lookup_code("code", "  save10 ").unwrap(), "save10");
//! assert!(validate_cart_total(-1).is_err());
//! ```

use crate::error::ValidationError;
use crate::{MAX_COUPON_CODE_LEN, MAX_ITEM_QUANTITY, MAX_LIST_LIMIT};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a code presented for lookup (coupon or gift card).
///
/// Only emptiness and length are checked; anything else is left to the
/// lookup so that malformed and unknown codes get the same generic answer.
///
/// ## Returns
/// The trimmed code.
pub fn validate_lookup_code(field: &str, code: &str) -> ValidationResult<String> {
    let code = code.trim();

    if code.is_empty() {
        return Err(ValidationError::required(field));
    }

    if code.len() > 64 {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: 64,
        });
    }

    Ok(code.to_string())
}

/// Validates a coupon code entered by the store operator.
///
/// ## Rules
/// - Must not be empty
/// - At most 50 characters
/// - Letters, digits, hyphens and underscores only
///
/// ## Returns
/// The code trimmed and upper-cased, the form it is stored in.
///
/// ## Example
/// ```rust
/// use storefront_core::validation::validate_coupon_code;
///
/// assert_eq!(validate_coupon_code("summer-25").unwrap(), "SUMMER-25");
/// assert!(validate_coupon_code("").is_err());
/// assert!(validate_coupon_code("has space").is_err());
/// ```
pub fn validate_coupon_code(code: &str) -> ValidationResult<String> {
    let code = code.trim();

    if code.is_empty() {
        return Err(ValidationError::required("code"));
    }

    if code.len() > MAX_COUPON_CODE_LEN {
        return Err(ValidationError::TooLong {
            field: "code".to_string(),
            max: MAX_COUPON_CODE_LEN,
        });
    }

    if !code
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "code".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(code.to_ascii_uppercase())
}

/// Validates optional free text (descriptions, gift messages).
pub fn validate_optional_text(
    field: &str,
    value: Option<&str>,
    max: usize,
) -> ValidationResult<Option<String>> {
    let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(Some(value.to_string()))
}

/// Validates a required name-like field.
pub fn validate_name(field: &str, value: &str, max: usize) -> ValidationResult<String> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::required(field));
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(value.to_string())
}

/// Validates an email address.
///
/// ## Rules
/// - Exactly one `@`
/// - Non-empty local part
/// - Domain contains a dot that is neither first nor last
/// - No whitespace, at most 254 characters
///
/// ## Example
/// ```rust
/// use storefront_core::validation::validate_email;
///
/// assert!(validate_email("ada@example.com").is_ok());
/// assert!(validate_email("ada@localhost").is_err());
/// assert!(validate_email("not an email").is_err());
/// ```
pub fn validate_email(email: &str) -> ValidationResult<String> {
    let email = email.trim();

    if email.is_empty() {
        return Err(ValidationError::required("email"));
    }

    if email.len() > 254 {
        return Err(ValidationError::TooLong {
            field: "email".to_string(),
            max: 254,
        });
    }

    let invalid = |reason: &str| ValidationError::InvalidFormat {
        field: "email".to_string(),
        reason: reason.to_string(),
    };

    if email.chars().any(char::is_whitespace) {
        return Err(invalid("must not contain spaces"));
    }

    let mut parts = email.split('@');
    let (local, domain) = match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => (local, domain),
        _ => return Err(invalid("must contain a single @")),
    };

    if local.is_empty() {
        return Err(invalid("missing name before @"));
    }

    let dot_ok = domain
        .find('.')
        .map(|i| i > 0 && !domain.ends_with('.'))
        .unwrap_or(false);
    if !dot_ok {
        return Err(invalid("domain is not valid"));
    }

    Ok(email.to_string())
}

/// Validates a search query.
///
/// ## Rules
/// - Can be empty (returns everything up to the limit)
/// - Maximum 100 characters
///
/// ## Returns
/// The trimmed query string.
pub fn validate_search_query(query: &str) -> ValidationResult<String> {
    let query = query.trim();

    if query.len() > 100 {
        return Err(ValidationError::TooLong {
            field: "query".to_string(),
            max: 100,
        });
    }

    Ok(query.to_string())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a cart total in cents.
///
/// ## Rules
/// - Must be non-negative (an empty cart is 0)
pub fn validate_cart_total(cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: "cart total".to_string(),
        });
    }

    Ok(())
}

/// Validates a strictly positive amount in cents.
pub fn validate_amount_cents(field: &str, cents: i64) -> ValidationResult<()> {
    if cents <= 0 {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }

    Ok(())
}

/// Validates a non-negative amount in cents.
pub fn validate_non_negative_cents(field: &str, cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }

    Ok(())
}

/// Validates a percentage discount value.
///
/// ## Rules
/// - 0 < value <= 100
///
/// ## Example
/// ```rust
/// use storefront_core::validation::validate_percentage;
///
/// assert!(validate_percentage(100).is_ok());
/// assert!(validate_percentage(0).is_err());
/// assert!(validate_percentage(101).is_err());
/// ```
pub fn validate_percentage(value: i64) -> ValidationResult<()> {
    if !(1..=100).contains(&value) {
        return Err(ValidationError::OutOfRange {
            field: "discount_value".to_string(),
            min: 1,
            max: 100,
        });
    }

    Ok(())
}

/// Validates an optional usage cap.
pub fn validate_max_uses(max_uses: Option<i64>) -> ValidationResult<()> {
    match max_uses {
        Some(max) if max <= 0 => Err(ValidationError::MustBePositive {
            field: "max_uses".to_string(),
        }),
        _ => Ok(()),
    }
}

/// Validates an optional download limit.
pub fn validate_download_limit(limit: Option<i64>) -> ValidationResult<()> {
    match limit {
        Some(limit) if limit <= 0 => Err(ValidationError::MustBePositive {
            field: "download_limit".to_string(),
        }),
        _ => Ok(()),
    }
}

/// Validates a line item quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_QUANTITY (999)
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Clamps a listing limit into `1..=MAX_LIST_LIMIT`, defaulting to 50.
pub fn clamp_list_limit(limit: Option<u32>) -> u32 {
    limit.unwrap_or(50).clamp(1, MAX_LIST_LIMIT)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_lookup_code() {
        assert_eq!(validate_lookup_code("code", " abc ").unwrap(), "abc");
        assert_eq!(
            validate_lookup_code("code", "   "),
            Err(ValidationError::required("code"))
        );
        assert!(validate_lookup_code("code", &"A".repeat(65)).is_err());
    }

    #[test]
    fn test_validate_coupon_code() {
        assert_eq!(validate_coupon_code("save10").unwrap(), "SAVE10");
        assert_eq!(validate_coupon_code("black_friday-24").unwrap(), "BLACK_FRIDAY-24");

        assert!(validate_coupon_code("").is_err());
        assert!(validate_coupon_code("10%OFF").is_err());
        assert!(validate_coupon_code(&"A".repeat(51)).is_err());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("a@b.co").is_ok());
        assert_eq!(validate_email(" ada@example.com ").unwrap(), "ada@example.com");

        assert!(validate_email("").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("a@@example.com").is_err());
        assert!(validate_email("a@example.").is_err());
        assert!(validate_email("a@.com").is_err());
        assert!(validate_email("a b@example.com").is_err());
    }

    #[test]
    fn test_numeric_validators() {
        assert!(validate_cart_total(0).is_ok());
        assert!(validate_cart_total(-5).is_err());

        assert!(validate_amount_cents("amount", 1).is_ok());
        assert!(validate_amount_cents("amount", 0).is_err());

        assert!(validate_percentage(1).is_ok());
        assert!(validate_percentage(-10).is_err());

        assert!(validate_max_uses(None).is_ok());
        assert!(validate_max_uses(Some(1)).is_ok());
        assert!(validate_max_uses(Some(0)).is_err());

        assert!(validate_download_limit(Some(0)).is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(999).is_ok());
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(1000).is_err());
    }

    #[test]
    fn test_optional_text() {
        assert_eq!(validate_optional_text("message", Some("  "), 10).unwrap(), None);
        assert_eq!(
            validate_optional_text("message", Some(" hi "), 10).unwrap(),
            Some("hi".to_string())
        );
        assert!(validate_optional_text("message", Some("toolongtext"), 10).is_err());
    }

    #[test]
    fn test_clamp_list_limit() {
        assert_eq!(clamp_list_limit(None), 50);
        assert_eq!(clamp_list_limit(Some(0)), 1);
        assert_eq!(clamp_list_limit(Some(10_000)), MAX_LIST_LIMIT);
    }
}
