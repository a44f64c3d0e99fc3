//! # Validation Module
//!
//! Input validation utilities for Troli POS.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Host UI                                                      │
//! │  ├── Basic format checks (empty, numeric keyboard)                     │
//! │  └── Immediate user feedback                                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE - business rule validation                       │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: State machine preconditions (CartSession)                    │
//! │                                                                         │
//! │  A validation failure blocks only the triggering action; nothing       │
//! │  else about the session changes.                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::types::canonical_product_id;
use crate::{CART_NUMBER_MAX, CART_NUMBER_MIN, CART_NUMBER_WIDTH};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Cart Number
// =============================================================================

/// Validates a cart number and returns its zero-padded session identifier.
///
/// ## Rules
/// - Must be an integer in [1, 100]
/// - Formatted as a 3-digit zero-padded string
///
/// ## Example
/// ```rust
/// use troli_core::validation::validate_cart_number;
///
/// assert_eq!(validate_cart_number(7).unwrap(), "007");
/// assert_eq!(validate_cart_number(100).unwrap(), "100");
/// assert!(validate_cart_number(0).is_err());
/// assert!(validate_cart_number(101).is_err());
/// assert!(validate_cart_number(-5).is_err());
/// ```
pub fn validate_cart_number(number: i64) -> ValidationResult<String> {
    if !(CART_NUMBER_MIN..=CART_NUMBER_MAX).contains(&number) {
        return Err(ValidationError::OutOfRange {
            field: "cart number".to_string(),
            min: CART_NUMBER_MIN,
            max: CART_NUMBER_MAX,
        });
    }

    Ok(format!("{:0width$}", number, width = CART_NUMBER_WIDTH))
}

/// Parses operator keypad input into a cart number.
///
/// The keypad hands us a string; anything non-numeric fails fast with a
/// format error before the range check runs.
pub fn parse_cart_number(input: &str) -> ValidationResult<String> {
    let input = input.trim();

    if input.is_empty() {
        return Err(ValidationError::Required {
            field: "cart number".to_string(),
        });
    }

    let number: i64 = input.parse().map_err(|_| ValidationError::InvalidFormat {
        field: "cart number".to_string(),
        reason: "must be a whole number".to_string(),
    })?;

    validate_cart_number(number)
}

// =============================================================================
// Product Identifier
// =============================================================================

/// Validates a raw product identifier and returns its canonical form.
///
/// ## Rules
/// - Must be non-empty after trimming
/// - Canonical form is trimmed + uppercased
/// - Maximum 64 characters (barcodes are far shorter; this caps abuse)
pub fn validate_product_id(raw: &str) -> ValidationResult<String> {
    let canonical = canonical_product_id(raw);

    if canonical.is_empty() {
        return Err(ValidationError::Required {
            field: "product id".to_string(),
        });
    }

    if canonical.len() > 64 {
        return Err(ValidationError::TooLong {
            field: "product id".to_string(),
            max: 64,
        });
    }

    Ok(canonical)
}

// =============================================================================
// Search Query
// =============================================================================

/// Validates a search query.
///
/// ## Rules
/// - Maximum 100 characters
/// - The 2-character minimum is a *debounce* concern, enforced by the
///   search path, not a validation failure: shorter input simply clears
///   the results
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
// Credentials
// =============================================================================

/// Validates a username.
pub fn validate_username(username: &str) -> ValidationResult<String> {
    let username = username.trim();

    if username.is_empty() {
        return Err(ValidationError::Required {
            field: "username".to_string(),
        });
    }

    if username.len() > 50 {
        return Err(ValidationError::TooLong {
            field: "username".to_string(),
            max: 50,
        });
    }

    Ok(username.to_string())
}

/// Validates a password is present before hashing/verification runs.
pub fn validate_password(password: &str) -> ValidationResult<()> {
    if password.is_empty() {
        return Err(ValidationError::Required {
            field: "password".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_cart_number_range() {
        assert_eq!(validate_cart_number(1).unwrap(), "001");
        assert_eq!(validate_cart_number(7).unwrap(), "007");
        assert_eq!(validate_cart_number(42).unwrap(), "042");
        assert_eq!(validate_cart_number(100).unwrap(), "100");

        assert!(validate_cart_number(0).is_err());
        assert!(validate_cart_number(101).is_err());
        assert!(validate_cart_number(-5).is_err());
    }

    #[test]
    fn test_parse_cart_number() {
        assert_eq!(parse_cart_number("7").unwrap(), "007");
        assert_eq!(parse_cart_number(" 42 ").unwrap(), "042");

        assert!(parse_cart_number("").is_err());
        assert!(parse_cart_number("abc").is_err());
        assert!(parse_cart_number("7.5").is_err());
        assert!(parse_cart_number("0").is_err());
    }

    #[test]
    fn test_validate_product_id() {
        assert_eq!(validate_product_id(" a01 ").unwrap(), "A01");
        assert!(validate_product_id("").is_err());
        assert!(validate_product_id("   ").is_err());
        assert!(validate_product_id(&"X".repeat(65)).is_err());
    }

    #[test]
    fn test_validate_search_query() {
        assert_eq!(validate_search_query("  teh  ").unwrap(), "teh");
        assert_eq!(validate_search_query("").unwrap(), "");
        assert!(validate_search_query(&"a".repeat(101)).is_err());
    }

    #[test]
    fn test_validate_credentials() {
        assert_eq!(validate_username(" budi ").unwrap(), "budi");
        assert!(validate_username("").is_err());
        assert!(validate_username(&"u".repeat(51)).is_err());

        assert!(validate_password("rahasia").is_ok());
        assert!(validate_password("").is_err());
    }
}
