//! # Error Types
//!
//! The error taxonomy shared by every layer, plus the domain errors raised
//! by storefront-core itself.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  storefront-core (this file)                                           │
//! │  ├── ErrorKind        - The closed taxonomy (NotFound, Conflict, ...)  │
//! │  ├── CoreError        - Domain rule violations                         │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  storefront-db                                                         │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  storefront-api                                                        │
//! │  └── ApiError         - What the client sees (status + JSON)           │
//! │                                                                         │
//! │  Every layer answers `kind()`; the HTTP boundary maps kind → status.   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;
use thiserror::Error;

// =============================================================================
// Error Kind
// =============================================================================

/// The closed set of error categories a client can observe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    NotFound,
    Unauthorized,
    Forbidden,
    AlreadyExists,
    BadRequest,
    InvalidInput,
    Conflict,
    TooManyRequests,
    InternalServerError,
    TypeNotMatched,
}

impl ErrorKind {
    /// Short human-readable description used as the default message.
    pub fn message(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not found",
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::AlreadyExists => "already exists",
            ErrorKind::BadRequest => "bad request",
            ErrorKind::InvalidInput => "invalid input",
            ErrorKind::Conflict => "conflict",
            ErrorKind::TooManyRequests => "too many requests",
            ErrorKind::InternalServerError => "internal server error",
            ErrorKind::TypeNotMatched => "type not matched",
        }
    }
}

// =============================================================================
// Core Error
// =============================================================================

/// Domain rule violations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A stored state string is not one of `enabled | disabled | deleted`,
    /// or a role/status string is not recognised.
    #[error("{field}: type not matched ({value})")]
    TypeNotMatched { field: String, value: String },

    /// A list filter key is not part of the supported set.
    #[error("unsupported filter key: {0}")]
    UnknownFilter(String),

    /// Cart has exceeded the allowed number of lines.
    #[error("Cart cannot have more than {max} items")]
    CartTooLarge { max: usize },

    /// Checkout was requested with nothing in the cart.
    #[error("Cart is empty")]
    EmptyCart,

    /// Not enough stock on a sku for the requested quantity.
    #[error("Insufficient stock for {sku}: available {available}, requested {requested}")]
    InsufficientStock {
        sku: String,
        available: i64,
        requested: i64,
    },

    /// A price times quantity, or a cart total, does not fit in cents.
    #[error("Amount out of range")]
    AmountOverflow,

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Taxonomy bucket for this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::TypeNotMatched { .. } => ErrorKind::TypeNotMatched,
            CoreError::UnknownFilter(_) => ErrorKind::BadRequest,
            CoreError::CartTooLarge { .. } => ErrorKind::InvalidInput,
            CoreError::EmptyCart => ErrorKind::BadRequest,
            CoreError::InsufficientStock { .. } => ErrorKind::Conflict,
            CoreError::AmountOverflow => ErrorKind::InvalidInput,
            CoreError::Validation(e) => e.kind(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when a form or query doesn't meet requirements.
/// Used for early validation before any SQL is built.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., non-numeric id, malformed price).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

impl ValidationError {
    /// Missing fields are malformed requests; bad values are invalid input.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ValidationError::Required { .. } => ErrorKind::BadRequest,
            _ => ErrorKind::InvalidInput,
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
