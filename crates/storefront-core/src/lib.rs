//! # storefront-core: Pure Catalog Logic
//!
//! This crate is the **heart** of the storefront backend. It holds the
//! entity records, the soft-delete/versioning vocabulary and every rule that
//! can be decided without touching the database.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Storefront Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 HTTP handlers (storefront-api)                  │   │
//! │  │     /product  /admin/product  /admin/sku  /cart  /order         │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ typed forms                            │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │            ★ storefront-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │  filter   │  │ validation│  │   │
//! │  │   │  Product  │  │   Money   │  │ SkuFilter │  │   rules   │  │   │
//! │  │   │  Sku, ... │  │  parsing  │  │ Paginate  │  │  checks   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 storefront-db (Database Layer)                  │   │
//! │  │          PostgreSQL queries, migrations, repositories           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Entity records (Category, Product, Sku, Option, ...), `State`, `Role`
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`filter`] - Typed list filters and pagination
//! - [`error`] - Error taxonomy shared by every layer
//! - [`validation`] - Form validation rules
//!
//! ## Example Usage
//!
//! ```rust
//! use std::collections::HashMap;
//! use storefront_core::filter::SkuFilters;
//! use storefront_core::money::Money;
//!
//! let mut raw = HashMap::new();
//! raw.insert("priceStart".to_string(), "10".to_string());
//!
//! let filters = SkuFilters::parse(&raw).unwrap();
//! assert_eq!(filters.price_from(), Some(Money::from_cents(1000)));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod filter;
pub mod money;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, ErrorKind, ValidationError};
pub use filter::{Page, Pagination, SkuFilter, SkuFilters};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Page size used when a list request does not specify one.
pub const DEFAULT_PAGE_LIMIT: i64 = 20;

/// Upper bound on a single page.
///
/// ## Business Reason
/// Keeps list endpoints from dumping the whole catalog in one response.
pub const MAX_PAGE_LIMIT: i64 = 100;

/// Largest accepted sku price, in cents (1,000,000,000.00).
///
/// A full cart of maximum lines at this price still fits in `i64` cents.
pub const MAX_PRICE_CENTS: i64 = 100_000_000_000;

/// Maximum quantity of a single sku in a cart line.
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Maximum number of distinct lines in one cart.
pub const MAX_CART_ITEMS: usize = 100;
