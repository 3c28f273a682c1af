//! # Validation Module
//!
//! Form validation for catalog, cart and checkout input.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: HTTP extractor (axum)                                        │
//! │  ├── Type validation (deserialization, path ids)                       │
//! │  └── Unknown / malformed filter keys                                   │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE: Business rule validation                        │
//! │  ├── Required fields, lengths                                          │
//! │  └── Price / quantity ranges                                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (PostgreSQL)                                        │
//! │  ├── NOT NULL / CHECK constraints                                      │
//! │  ├── UNIQUE (sku code)                 → AlreadyExists                 │
//! │  └── Foreign keys                      → InvalidInput                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use storefront_core::validation::{validate_sku_code, validate_quantity};
//!
//! validate_sku_code("TSHIRT-RED-M").unwrap();
//! validate_quantity(5).unwrap();
//! ```

use crate::error::ValidationError;
use crate::types::{
    CategoryFields, OptionFields, OptionValueFields, OrderFields, ProductFields, SkuFields,
};
use crate::{MAX_CART_ITEMS, MAX_ITEM_QUANTITY, MAX_PRICE_CENTS};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

const MAX_NAME_LEN: usize = 200;
const MAX_TEXT_LEN: usize = 4000;
const MAX_SKU_LEN: usize = 50;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a required short text field (names).
///
/// ## Rules
/// - Must not be blank
/// - At most 200 characters
pub fn validate_name(field: &str, value: &str) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.chars().count() > MAX_NAME_LEN {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_NAME_LEN,
        });
    }

    Ok(())
}

/// Validates an optional long text field (descriptions, comments).
pub fn validate_text(field: &str, value: &str) -> ValidationResult<()> {
    if value.chars().count() > MAX_TEXT_LEN {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_TEXT_LEN,
        });
    }
    Ok(())
}

/// Validates a sku business code.
///
/// ## Rules
/// - Must not be empty
/// - At most 50 characters
/// - Letters, digits, hyphens and underscores only
///
/// ## Example
/// ```rust
/// use storefront_core::validation::validate_sku_code;
///
/// assert!(validate_sku_code("TSHIRT-RED-M").is_ok());
/// assert!(validate_sku_code("").is_err());
/// assert!(validate_sku_code("has space").is_err());
/// ```
pub fn validate_sku_code(sku: &str) -> ValidationResult<()> {
    let sku = sku.trim();

    if sku.is_empty() {
        return Err(ValidationError::Required {
            field: "sku".to_string(),
        });
    }

    if sku.len() > MAX_SKU_LEN {
        return Err(ValidationError::TooLong {
            field: "sku".to_string(),
            max: MAX_SKU_LEN,
        });
    }

    if !sku
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "sku".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

/// Validates a phone number captured at checkout.
///
/// ## Rules
/// - Must not be blank
/// - Digits plus `+ - ( )` and spaces, 6 to 20 characters
pub fn validate_phone(phone: &str) -> ValidationResult<()> {
    let phone = phone.trim();

    if phone.is_empty() {
        return Err(ValidationError::Required {
            field: "phone".to_string(),
        });
    }

    let digits = phone.chars().filter(|c| c.is_ascii_digit()).count();
    let allowed = phone
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '(' | ')' | ' '));

    if !allowed || digits < 6 || phone.len() > 20 {
        return Err(ValidationError::InvalidFormat {
            field: "phone".to_string(),
            reason: "must be a phone number".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a cart quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_QUANTITY (999)
///
/// ## User Workflow
/// ```text
/// POST /cart {sku, quantity: 5}
///      │
///      ▼
/// validate_quantity(5) ← THIS FUNCTION
///      │
///      ├── qty <= 0?   → 422 "quantity must be positive"
///      ├── qty > 999?  → 422 "quantity must be between 1 and 999"
///      └── OK → CartRepository::add
/// ```
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

/// Validates a price in cents. Zero is allowed, the ceiling is
/// `MAX_PRICE_CENTS`.
///
/// ## Example
/// ```rust
/// use storefront_core::validation::validate_price_cents;
///
/// assert!(validate_price_cents(1099).is_ok());
/// assert!(validate_price_cents(0).is_ok());
/// assert!(validate_price_cents(-100).is_err());
/// assert!(validate_price_cents(50_000_000_000_000_000).is_err());
/// ```
pub fn validate_price_cents(cents: i64) -> ValidationResult<()> {
    if !(0..=MAX_PRICE_CENTS).contains(&cents) {
        return Err(ValidationError::OutOfRange {
            field: "price".to_string(),
            min: 0,
            max: MAX_PRICE_CENTS,
        });
    }

    Ok(())
}

/// Validates a stock level. Zero is allowed (sold out).
pub fn validate_stock(quantity: i64) -> ValidationResult<()> {
    if quantity < 0 {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }
    Ok(())
}

// =============================================================================
// Collection Validators
// =============================================================================

/// Validates cart size before adding a new line.
///
/// ## Rules
/// - Must not exceed MAX_CART_ITEMS (100)
pub fn validate_cart_size(current_items: usize) -> ValidationResult<()> {
    if current_items >= MAX_CART_ITEMS {
        return Err(ValidationError::OutOfRange {
            field: "cart items".to_string(),
            min: 0,
            max: MAX_CART_ITEMS as i64,
        });
    }

    Ok(())
}

// =============================================================================
// Form Validators
// =============================================================================

pub fn validate_category(fields: &CategoryFields) -> ValidationResult<()> {
    validate_name("name", &fields.name)
}

pub fn validate_product(fields: &ProductFields) -> ValidationResult<()> {
    validate_name("productName", &fields.product_name)?;
    validate_text("description", &fields.description)?;
    if fields.category_id <= 0 {
        return Err(ValidationError::Required {
            field: "categoryId".to_string(),
        });
    }
    Ok(())
}

pub fn validate_sku(fields: &SkuFields) -> ValidationResult<()> {
    validate_sku_code(&fields.sku)?;
    validate_price_cents(fields.price_cents)?;
    validate_stock(fields.quantity)
}

pub fn validate_option(fields: &OptionFields) -> ValidationResult<()> {
    validate_name("name", &fields.name)?;
    if fields.category_id <= 0 {
        return Err(ValidationError::Required {
            field: "categoryId".to_string(),
        });
    }
    Ok(())
}

pub fn validate_option_value(fields: &OptionValueFields) -> ValidationResult<()> {
    validate_name("name", &fields.name)
}

pub fn validate_order(fields: &OrderFields) -> ValidationResult<()> {
    validate_phone(&fields.phone)?;
    validate_name("address", &fields.address)?;
    validate_text("comment", &fields.comment)?;
    validate_text("notes", &fields.notes)
}

// =============================================================================
// Unit Tests
// =============================================================================
