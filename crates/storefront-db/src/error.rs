//! # Database Error Types
//!
//! Error types for database operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  PostgreSQL Error (sqlx::Error)                                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbError (this module) ← Categorized by SQLSTATE, not message text     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ApiError (storefront-api) ← kind() → HTTP status + JSON body          │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use storefront_core::{CoreError, ErrorKind};
use thiserror::Error;

/// Database operation errors.
///
/// Repositories never log-and-swallow: every failure comes back as one of
/// these variants.
#[derive(Debug, Error)]
pub enum DbError {
    /// Entity not found, not visible to the caller, or already deleted.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// The row exists but its version moved on since the caller read it.
    #[error("{entity} {id} was modified: expected version {expected}, found {actual}")]
    Conflict {
        entity: String,
        id: String,
        expected: i64,
        actual: i64,
    },

    /// Unique constraint violation (e.g. duplicate sku code).
    #[error("Duplicate value violates {constraint}")]
    UniqueViolation { constraint: String, message: String },

    /// Foreign key constraint violation (e.g. unknown category id).
    #[error("Reference violates {constraint}")]
    ForeignKeyViolation { constraint: String, message: String },

    /// CHECK constraint violation (e.g. negative stock).
    #[error("Value violates {constraint}")]
    CheckViolation { constraint: String, message: String },

    /// Request is well-formed but refers to things that do not fit together.
    #[error("Invalid reference: {0}")]
    Invalid(String),

    /// Domain rule raised while running a multi-step operation.
    #[error(transparent)]
    Domain(#[from] CoreError),

    /// Database connection failed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl ToString) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    pub fn conflict(entity: impl Into<String>, id: impl ToString, expected: i64, actual: i64) -> Self {
        DbError::Conflict {
            entity: entity.into(),
            id: id.to_string(),
            expected,
            actual,
        }
    }

    /// Taxonomy bucket for this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            DbError::NotFound { .. } => ErrorKind::NotFound,
            DbError::Conflict { .. } => ErrorKind::Conflict,
            DbError::UniqueViolation { .. } => ErrorKind::AlreadyExists,
            DbError::ForeignKeyViolation { .. }
            | DbError::CheckViolation { .. }
            | DbError::Invalid(_) => ErrorKind::InvalidInput,
            DbError::Domain(e) => e.kind(),
            DbError::ConnectionFailed(_)
            | DbError::MigrationFailed(_)
            | DbError::PoolExhausted
            | DbError::Internal(_) => ErrorKind::InternalServerError,
        }
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound        → DbError::NotFound
/// Database (23505 unique)         → DbError::UniqueViolation
/// Database (23503 foreign key)    → DbError::ForeignKeyViolation
/// Database (23514 check)          → DbError::CheckViolation
/// sqlx::Error::PoolTimedOut       → DbError::PoolExhausted
/// Other                           → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => DbError::not_found("Record", "unknown"),

            sqlx::Error::Database(db_err) => {
                let constraint = db_err.constraint().unwrap_or("constraint").to_string();
                let message = db_err.message().to_string();

                if db_err.is_unique_violation() {
                    DbError::UniqueViolation { constraint, message }
                } else if db_err.is_foreign_key_violation() {
                    DbError::ForeignKeyViolation { constraint, message }
                } else if db_err.is_check_violation() {
                    DbError::CheckViolation { constraint, message }
                } else {
                    DbError::Internal(err.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

// =============================================================================
// Unit Tests
// =============================================================================
