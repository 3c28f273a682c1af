//! # Sku Repository
//!
//! Database operations for skus: the purchasable variants of a product.
//!
//! ## Key Operations
//! - Lookup by business code or id
//! - CRUD with versioning (update is keyed by sku code)
//! - View counting (does not bump `version`)
//! - Stock decrement at checkout

use chrono::Utc;
use sqlx::{PgConnection, Postgres, QueryBuilder};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::product::SKU_COLUMNS;
use crate::repository::{missing_or_conflict, push_version_guard, soft_delete};
use crate::visibility::Visibility;
use storefront_core::{CoreError, Sku, SkuFields};

const TABLE: &str = "sku";

pub struct SkuRepository<'c> {
    conn: &'c mut PgConnection,
}

impl<'c> SkuRepository<'c> {
    pub fn new(conn: &'c mut PgConnection) -> Self {
        SkuRepository { conn }
    }

    pub async fn list_by_product(&mut self, product_id: i64, visibility: Visibility) -> DbResult<Vec<Sku>> {
        self.list_by_products(&[product_id], visibility).await
    }

    /// Skus of several products in one round-trip, ordered by product then id.
    pub async fn list_by_products(&mut self, product_ids: &[i64], visibility: Visibility) -> DbResult<Vec<Sku>> {
        debug!(products = product_ids.len(), "Listing skus by product");

        if product_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut query =
            QueryBuilder::<Postgres>::new(format!("SELECT {SKU_COLUMNS} FROM sku WHERE sku.product_id = ANY("));
        query.push_bind(product_ids.to_vec());
        query.push(")");
        visibility.restrict(&mut query, "sku");
        query.push(" ORDER BY sku.product_id, sku.id");

        let skus = query.build_query_as().fetch_all(&mut *self.conn).await?;
        Ok(skus)
    }

    pub async fn get_by_code(&mut self, code: &str, visibility: Visibility) -> DbResult<Sku> {
        debug!(sku = %code, "Getting sku by code");

        let mut query = QueryBuilder::<Postgres>::new(format!("SELECT {SKU_COLUMNS} FROM sku WHERE sku.sku = "));
        query.push_bind(code);
        visibility.restrict(&mut query, "sku");

        query
            .build_query_as()
            .fetch_optional(&mut *self.conn)
            .await?
            .ok_or_else(|| DbError::not_found(TABLE, code))
    }

    pub async fn get_by_id(&mut self, id: i64, visibility: Visibility) -> DbResult<Sku> {
        debug!(id, "Getting sku");

        let mut query = QueryBuilder::<Postgres>::new(format!("SELECT {SKU_COLUMNS} FROM sku WHERE sku.id = "));
        query.push_bind(id);
        visibility.restrict(&mut query, "sku");

        query
            .build_query_as()
            .fetch_optional(&mut *self.conn)
            .await?
            .ok_or_else(|| DbError::not_found(TABLE, id))
    }

    /// Inserts a sku under `product_id` and returns its id.
    ///
    /// A duplicate code fails with `UniqueViolation`; an unknown product with
    /// `ForeignKeyViolation`.
    pub async fn create(&mut self, product_id: i64, fields: &SkuFields) -> DbResult<i64> {
        debug!(product_id, sku = %fields.sku, price_cents = fields.price_cents, "Creating sku");
        let now = Utc::now();

        let id = sqlx::query_scalar(
            r#"
            INSERT INTO sku (
                product_id, sku, price_cents, quantity,
                large_name, small_name, thumb_name, count_viewed,
                create_ts, update_ts, state, version
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, 0, $8, $8, $9, 0)
            RETURNING id
            "#,
        )
        .bind(product_id)
        .bind(&fields.sku)
        .bind(fields.price_cents)
        .bind(fields.quantity)
        .bind(&fields.large_name)
        .bind(&fields.small_name)
        .bind(&fields.thumb_name)
        .bind(now)
        .bind(fields.state)
        .fetch_one(&mut *self.conn)
        .await?;

        Ok(id)
    }

    /// Overwrites the sku identified by `code`; returns the new version.
    ///
    /// `fields.sku` may rename the code.
    pub async fn update(
        &mut self,
        code: &str,
        fields: &SkuFields,
        expected_version: Option<i64>,
    ) -> DbResult<i64> {
        debug!(sku = %code, ?expected_version, "Updating sku");

        let id: i64 = sqlx::query_scalar("SELECT id FROM sku WHERE sku = $1")
            .bind(code)
            .fetch_optional(&mut *self.conn)
            .await?
            .ok_or_else(|| DbError::not_found(TABLE, code))?;

        let mut query = QueryBuilder::<Postgres>::new("UPDATE sku SET sku = ");
        query.push_bind(&fields.sku);
        query.push(", price_cents = ");
        query.push_bind(fields.price_cents);
        query.push(", quantity = ");
        query.push_bind(fields.quantity);
        query.push(", large_name = ");
        query.push_bind(&fields.large_name);
        query.push(", small_name = ");
        query.push_bind(&fields.small_name);
        query.push(", thumb_name = ");
        query.push_bind(&fields.thumb_name);
        query.push(", state = ");
        query.push_bind(fields.state);
        query.push(", update_ts = ");
        query.push_bind(Utc::now());
        query.push(", version = version + 1 WHERE id = ");
        query.push_bind(id);
        push_version_guard(&mut query, expected_version);
        query.push(" RETURNING version");

        let version: Option<i64> = query.build_query_scalar().fetch_optional(&mut *self.conn).await?;

        match version {
            Some(v) => Ok(v),
            None => Err(missing_or_conflict(&mut *self.conn, TABLE, id, expected_version).await),
        }
    }

    pub async fn soft_delete(&mut self, id: i64) -> DbResult<()> {
        debug!(id, "Soft-deleting sku");
        soft_delete(&mut *self.conn, TABLE, id).await
    }

    /// Counts a product page view; returns whether a row was counted.
    ///
    /// Only enabled skus are counted and `version` is left alone. A sku that
    /// is missing or no longer enabled is not an error: the page was already
    /// read.
    pub async fn record_view(&mut self, code: &str) -> DbResult<bool> {
        debug!(sku = %code, "Recording view");

        let result = sqlx::query(
            "UPDATE sku SET count_viewed = count_viewed + 1 WHERE sku = $1 AND state = 'enabled'",
        )
        .bind(code)
        .execute(&mut *self.conn)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Takes `quantity` units from stock.
    ///
    /// Fails with `InsufficientStock` instead of letting stock go negative.
    pub async fn take_stock(&mut self, id: i64, quantity: i64) -> DbResult<()> {
        debug!(id, quantity, "Taking stock");

        let result = sqlx::query(
            r#"
            UPDATE sku
            SET quantity = quantity - $2, version = version + 1, update_ts = now()
            WHERE id = $1 AND state = 'enabled' AND quantity >= $2
            "#,
        )
        .bind(id)
        .bind(quantity)
        .execute(&mut *self.conn)
        .await?;

        if result.rows_affected() == 0 {
            let sku = self.get_by_id(id, Visibility::EnabledOnly).await?;
            return Err(CoreError::InsufficientStock {
                sku: sku.sku,
                available: sku.quantity,
                requested: quantity,
            }
            .into());
        }
        Ok(())
    }
}
