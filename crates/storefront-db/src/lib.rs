//! # storefront-db: Database Layer for the Storefront
//!
//! This crate provides PostgreSQL access for the storefront: the pool,
//! embedded migrations, one repository per entity family, scoped
//! transactions and the single visibility predicate.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Storefront Data Flow                             │
//! │                                                                         │
//! │  HTTP handler (storefront-api) ──► checkout / repositories             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  storefront-db (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │ over &mut     │    │  (embedded)  │  │   │
//! │  │   │               │    │ PgConnection  │    │              │  │   │
//! │  │   │ PgPool        │◄───│ Category      │    │ 001_catalog  │  │   │
//! │  │   │ begin()       │    │ Product, Sku  │    │ 002_cart_... │  │   │
//! │  │   │ transaction() │    │ Option, Cart  │    │              │  │   │
//! │  │   └───────────────┘    │ Order         │    └──────────────┘  │   │
//! │  │                        └───────┬───────┘                       │   │
//! │  │                                │ Visibility::restrict          │   │
//! │  └────────────────────────────────┼────────────────────────────────┘   │
//! │                                   ▼                                     │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     PostgreSQL (unaccent)                       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool, scoped transactions
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`visibility`] - Enabled-only vs. everything, decided from the caller role
//! - [`repository`] - Repository implementations
//! - [`checkout`] - Cart → order, atomically
//!
//! ## Usage
//!
//! ```rust,ignore
//! use storefront_db::{Database, DbConfig, ProductRepository, Visibility};
//!
//! let db = Database::new(DbConfig::new("postgres://localhost/storefront")).await?;
//!
//! let mut conn = db.acquire().await?;
//! let page = ProductRepository::new(&mut conn)
//!     .list_skus(&filters, Pagination::default(), Visibility::EnabledOnly)
//!     .await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod checkout;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod visibility;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig, TxFuture};
pub use visibility::Visibility;

// Repository re-exports for convenience
pub use repository::cart::CartRepository;
pub use repository::category::CategoryRepository;
pub use repository::option::OptionRepository;
pub use repository::order::OrderRepository;
pub use repository::product::ProductRepository;
pub use repository::sku::SkuRepository;
