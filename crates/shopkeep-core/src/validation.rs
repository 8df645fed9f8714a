//! # Input Validation
//!
//! Validation functions for user input.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Validation Layers                                   │
//! │                                                                         │
//! │  Layer 1: Dashboard                                                     │
//! │  ├── Form constraints (required, min=1)                                 │
//! │  └── Immediate feedback                                                 │
//! │                                                                         │
//! │  Layer 2: API handlers                                                  │
//! │  └── serde deserialization (shape, types)                               │
//! │                                                                         │
//! │  Layer 3: THIS MODULE                                                   │
//! │  ├── Business rules (quantity > 0, price >= 0)                          │
//! │  ├── Format validation (UUID, phone)                                    │
//! │  └── Length limits                                                      │
//! │                                                                         │
//! │  Layer 4: Database constraints                                          │
//! │  └── UNIQUE barcode/phone/order number, CHECK stock >= 0, FKs           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::{MAX_ITEM_QUANTITY, MAX_PAGE_LIMIT, MAX_STOCK};

/// Maximum product name length.
pub const MAX_NAME_LENGTH: usize = 100;

/// Maximum search query length.
pub const MAX_SEARCH_LENGTH: usize = 100;

/// Maximum phone number length.
pub const MAX_PHONE_LENGTH: usize = 20;

/// Maximum free-text length (notes, descriptions).
pub const MAX_TEXT_LENGTH: usize = 1000;

// =============================================================================
// Numbers
// =============================================================================

/// Validates a line quantity (1..=MAX_ITEM_QUANTITY).
pub fn validate_quantity(quantity: i64) -> Result<(), ValidationError> {
    if quantity <= 0 {
        return Err(ValidationError::must_be_positive("quantity"));
    }
    if quantity > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }
    Ok(())
}

/// Validates a stock movement quantity (1..=MAX_STOCK).
pub fn validate_movement_quantity(quantity: i64) -> Result<(), ValidationError> {
    if quantity <= 0 {
        return Err(ValidationError::must_be_positive("quantity"));
    }
    if quantity > MAX_STOCK {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_STOCK,
        });
    }
    Ok(())
}

/// Validates a stock level set directly (0..=MAX_STOCK).
pub fn validate_stock(stock: i64) -> Result<(), ValidationError> {
    if stock > MAX_STOCK {
        return Err(stock_out_of_range());
    }
    Ok(())
}

/// Stock after receiving `quantity` more units.
pub fn stock_after_increment(stock: i64, quantity: i64) -> Result<i64, ValidationError> {
    stock
        .checked_add(quantity)
        .filter(|s| *s <= MAX_STOCK)
        .ok_or_else(stock_out_of_range)
}

/// Error for a stock level past [`MAX_STOCK`].
pub fn stock_out_of_range() -> ValidationError {
    ValidationError::OutOfRange {
        field: "stock".to_string(),
        min: 0,
        max: MAX_STOCK,
    }
}

/// Validates that a money amount or count is not negative.
pub fn validate_non_negative(field: &str, value: i64) -> Result<(), ValidationError> {
    if value < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Validates that a money amount is strictly positive.
pub fn validate_positive(field: &str, value: i64) -> Result<(), ValidationError> {
    if value <= 0 {
        return Err(ValidationError::must_be_positive(field));
    }
    Ok(())
}

/// Validates a requested list size for "top N" style queries.
pub fn validate_limit(limit: u32) -> Result<(), ValidationError> {
    if limit == 0 || limit > MAX_PAGE_LIMIT {
        return Err(ValidationError::OutOfRange {
            field: "limit".to_string(),
            min: 1,
            max: MAX_PAGE_LIMIT as i64,
        });
    }
    Ok(())
}

// =============================================================================
// Strings
// =============================================================================

/// Validates a required free-text field and returns it trimmed.
pub fn validate_required(field: &str, value: &str, max: usize) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::required(field));
    }
    if trimmed.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }
    Ok(trimmed.to_string())
}

/// Validates a product name.
pub fn validate_product_name(name: &str) -> Result<String, ValidationError> {
    validate_required("name", name, MAX_NAME_LENGTH)
}

/// Validates a search query and returns it trimmed.
pub fn validate_search_query(query: &str) -> Result<String, ValidationError> {
    validate_required("q", query, MAX_SEARCH_LENGTH)
}

/// Validates a phone number.
///
/// Digits with optional `+`, spaces, dots and dashes. At least 8 digits.
pub fn validate_phone(phone: &str) -> Result<String, ValidationError> {
    let trimmed = validate_required("phone", phone, MAX_PHONE_LENGTH)?;
    let allowed = trimmed
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | ' ' | '.' | '-'));
    let digits = trimmed.chars().filter(|c| c.is_ascii_digit()).count();
    if !allowed || digits < 8 {
        return Err(ValidationError::InvalidFormat {
            field: "phone".to_string(),
            reason: "must be a phone number".to_string(),
        });
    }
    Ok(trimmed)
}

/// Validates a UUID string.
pub fn validate_uuid(field: &str, value: &str) -> Result<(), ValidationError> {
    uuid::Uuid::parse_str(value).map_err(|_| ValidationError::InvalidFormat {
        field: field.to_string(),
        reason: "must be a valid id".to_string(),
    })?;
    Ok(())
}

/// Trims an optional string and drops it when blank.
pub fn non_blank(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
