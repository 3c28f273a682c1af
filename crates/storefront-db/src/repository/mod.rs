//! # Repository Module
//!
//! Database repository implementations for the storefront.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repositories over a connection                       │
//! │                                                                         │
//! │  Service                                                               │
//! │       │                                                                 │
//! │       │  let mut conn = db.acquire().await?;      (or &mut *tx)        │
//! │       │  ProductRepository::new(&mut conn).get_by_id(id, vis)          │
//! │       ▼                                                                 │
//! │  XxxRepository<'c> { conn: &'c mut PgConnection }                      │
//! │  ├── list(filter, pagination, visibility) → Page<T>                    │
//! │  ├── get_by_id(id, visibility)            → T | NotFound               │
//! │  ├── create(fields)                       → id                         │
//! │  ├── update(id, fields, expected_version) → version | NotFound | Conflict│
//! │  └── soft_delete(id)                      → () | NotFound              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  PostgreSQL                                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`CategoryRepository`](category::CategoryRepository) - Category tree
//! - [`ProductRepository`](product::ProductRepository) - Products and catalog listing
//! - [`SkuRepository`](sku::SkuRepository) - Skus, stock and view counts
//! - [`OptionRepository`](option::OptionRepository) - Options, values, sku values
//! - [`CartRepository`](cart::CartRepository) - Per-user cart lines
//! - [`OrderRepository`](order::OrderRepository) - Orders and their snapshot items

pub mod cart;
pub mod category;
pub mod option;
pub mod order;
pub mod product;
pub mod sku;

use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgConnection, Row};
use storefront_core::{Page, Pagination};

use crate::error::{DbError, DbResult};

// =============================================================================
// Windowed Pages
// =============================================================================

/// A row plus the `count(*) OVER() AS total_count` column.
pub(crate) struct Counted<T> {
    pub item: T,
    pub total: i64,
}

impl<'r, T: FromRow<'r, PgRow>> FromRow<'r, PgRow> for Counted<T> {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Counted {
            item: T::from_row(row)?,
            total: row.try_get("total_count")?,
        })
    }
}

/// Folds windowed rows into a page.
///
/// Returns `None` when the page is empty at a non-zero offset: the window
/// total is unknown there and the caller must issue a COUNT.
pub(crate) fn into_page<T>(rows: Vec<Counted<T>>, pagination: Pagination) -> Option<Page<T>> {
    if rows.is_empty() && pagination.offset > 0 {
        return None;
    }
    let total = rows.first().map(|r| r.total).unwrap_or(0);
    Some(Page::new(rows.into_iter().map(|r| r.item).collect(), total))
}

// =============================================================================
// Versioned Mutations
// =============================================================================

/// Resolves an `UPDATE ... RETURNING version` that matched no row.
///
/// `table` is always a compile-time constant from the calling repository.
pub(crate) async fn missing_or_conflict(
    conn: &mut PgConnection,
    table: &'static str,
    id: i64,
    expected_version: Option<i64>,
) -> DbError {
    let current: Result<Option<i64>, sqlx::Error> =
        sqlx::query_scalar(&format!("SELECT version FROM {table} WHERE id = $1"))
            .bind(id)
            .fetch_optional(&mut *conn)
            .await;

    match (current, expected_version) {
        (Ok(Some(actual)), Some(expected)) if actual != expected => {
            DbError::conflict(table, id, expected, actual)
        }
        (Ok(_), _) => DbError::not_found(table, id),
        (Err(e), _) => e.into(),
    }
}

/// Marks a row deleted and bumps its version.
///
/// A row that is already deleted counts as not found.
pub(crate) async fn soft_delete(
    conn: &mut PgConnection,
    table: &'static str,
    id: i64,
) -> DbResult<()> {
    let result = sqlx::query(&format!(
        "UPDATE {table} \
         SET state = 'deleted', version = version + 1, update_ts = now() \
         WHERE id = $1 AND state <> 'deleted'"
    ))
    .bind(id)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found(table, id));
    }
    Ok(())
}

/// Applies an optimistic-concurrency guard when the caller supplied one.
pub(crate) fn push_version_guard(
    query: &mut sqlx::QueryBuilder<'_, sqlx::Postgres>,
    expected_version: Option<i64>,
) {
    if let Some(version) = expected_version {
        query.push(" AND version = ");
        query.push_bind(version);
    }
}
