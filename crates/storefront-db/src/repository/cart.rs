//! # Cart Repository
//!
//! Per-user cart lines. A user holds at most one live line per sku
//! (`uq_cart_item_live`); adding the same sku again raises the quantity.
//!
//! Every method is scoped by `user_id`: a line owned by someone else reads
//! as not found.

use chrono::Utc;
use sqlx::{PgConnection, Postgres, QueryBuilder};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::push_version_guard;
use storefront_core::validation::{validate_cart_size, validate_quantity};
use storefront_core::{CartLine, CoreError, MAX_CART_ITEMS};

const TABLE: &str = "cart_item";

pub struct CartRepository<'c> {
    conn: &'c mut PgConnection,
}

impl<'c> CartRepository<'c> {
    pub fn new(conn: &'c mut PgConnection) -> Self {
        CartRepository { conn }
    }

    /// Live lines joined with the current sku price. Lines whose sku or
    /// product is no longer enabled are left out.
    pub async fn list_for_user(&mut self, user_id: &str) -> DbResult<Vec<CartLine>> {
        debug!(user_id, "Listing cart");

        let lines = sqlx::query_as(
            r#"
            SELECT cart_item.id, cart_item.sku_id, sku.sku, product.product_name,
                   sku.thumb_name, sku.price_cents AS unit_price_cents,
                   sku.quantity AS stock, cart_item.quantity, cart_item.version
            FROM cart_item
            JOIN sku ON sku.id = cart_item.sku_id
            JOIN product ON product.id = sku.product_id
            WHERE cart_item.user_id = $1
              AND cart_item.state = 'enabled'
              AND sku.state = 'enabled'
              AND product.state = 'enabled'
            ORDER BY cart_item.id
            "#,
        )
        .bind(user_id)
        .fetch_all(&mut *self.conn)
        .await?;

        Ok(lines)
    }

    pub async fn count_lines(&mut self, user_id: &str) -> DbResult<i64> {
        let count = sqlx::query_scalar(
            "SELECT COUNT(*) FROM cart_item WHERE user_id = $1 AND state = 'enabled'",
        )
        .bind(user_id)
        .fetch_one(&mut *self.conn)
        .await?;
        Ok(count)
    }

    /// Adds `quantity` of the sku `sku_code`; returns the line id.
    ///
    /// An existing live line for the same sku has its quantity raised and
    /// version bumped instead of getting a second line.
    pub async fn add(&mut self, user_id: &str, sku_code: &str, quantity: i64) -> DbResult<i64> {
        debug!(user_id, sku = %sku_code, quantity, "Adding to cart");
        validate_quantity(quantity).map_err(CoreError::from)?;

        let sku_id: i64 = sqlx::query_scalar(
            r#"
            SELECT sku.id FROM sku
            JOIN product ON product.id = sku.product_id
            WHERE sku.sku = $1 AND sku.state = 'enabled' AND product.state = 'enabled'
            "#,
        )
        .bind(sku_code)
        .fetch_optional(&mut *self.conn)
        .await?
        .ok_or_else(|| DbError::not_found("sku", sku_code))?;

        let existing: Option<i64> = sqlx::query_scalar(
            "SELECT quantity FROM cart_item WHERE user_id = $1 AND sku_id = $2 AND state = 'enabled'",
        )
        .bind(user_id)
        .bind(sku_id)
        .fetch_optional(&mut *self.conn)
        .await?;

        match existing {
            Some(current) => validate_quantity(current + quantity).map_err(CoreError::from)?,
            None => {
                let lines = self.count_lines(user_id).await?;
                validate_cart_size(lines as usize)
                    .map_err(|_| CoreError::CartTooLarge { max: MAX_CART_ITEMS })?;
            }
        }

        let now = Utc::now();
        let id = sqlx::query_scalar(
            r#"
            INSERT INTO cart_item (user_id, sku_id, quantity, create_ts, update_ts, state, version)
            VALUES ($1, $2, $3, $4, $4, 'enabled', 0)
            ON CONFLICT (user_id, sku_id) WHERE state = 'enabled'
            DO UPDATE SET quantity = cart_item.quantity + EXCLUDED.quantity,
                          update_ts = EXCLUDED.update_ts,
                          version = cart_item.version + 1
            RETURNING id
            "#,
        )
        .bind(user_id)
        .bind(sku_id)
        .bind(quantity)
        .bind(now)
        .fetch_one(&mut *self.conn)
        .await?;

        Ok(id)
    }

    /// Replaces the quantity of a line; returns the new version.
    pub async fn set_quantity(
        &mut self,
        user_id: &str,
        item_id: i64,
        quantity: i64,
        expected_version: Option<i64>,
    ) -> DbResult<i64> {
        debug!(user_id, item_id, quantity, ?expected_version, "Setting cart quantity");
        validate_quantity(quantity).map_err(CoreError::from)?;

        let current = self.live_version(user_id, item_id).await?;

        let mut query = QueryBuilder::<Postgres>::new("UPDATE cart_item SET quantity = ");
        query.push_bind(quantity);
        query.push(", update_ts = ");
        query.push_bind(Utc::now());
        query.push(", version = version + 1 WHERE id = ");
        query.push_bind(item_id);
        query.push(" AND state = 'enabled'");
        push_version_guard(&mut query, expected_version);
        query.push(" RETURNING version");

        let version: Option<i64> = query.build_query_scalar().fetch_optional(&mut *self.conn).await?;

        match (version, expected_version) {
            (Some(v), _) => Ok(v),
            (None, Some(expected)) => Err(DbError::conflict(TABLE, item_id, expected, current)),
            (None, None) => Err(DbError::not_found(TABLE, item_id)),
        }
    }

    /// Soft-deletes one of the caller's lines.
    pub async fn remove(&mut self, user_id: &str, item_id: i64) -> DbResult<()> {
        debug!(user_id, item_id, "Removing cart line");

        let result = sqlx::query(
            r#"
            UPDATE cart_item
            SET state = 'deleted', version = version + 1, update_ts = now()
            WHERE id = $1 AND user_id = $2 AND state = 'enabled'
            "#,
        )
        .bind(item_id)
        .bind(user_id)
        .execute(&mut *self.conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found(TABLE, item_id));
        }
        Ok(())
    }

    /// Soft-deletes the given live lines of the user; returns how many.
    ///
    /// Checkout passes the lines it ordered, so lines hidden from
    /// `list_for_user` (disabled sku or product) stay in the cart.
    pub async fn clear_lines(&mut self, user_id: &str, item_ids: &[i64]) -> DbResult<u64> {
        debug!(user_id, lines = item_ids.len(), "Clearing cart lines");

        let result = sqlx::query(
            r#"
            UPDATE cart_item
            SET state = 'deleted', version = version + 1, update_ts = now()
            WHERE user_id = $1 AND id = ANY($2) AND state = 'enabled'
            "#,
        )
        .bind(user_id)
        .bind(item_ids)
        .execute(&mut *self.conn)
        .await?;

        Ok(result.rows_affected())
    }

    async fn live_version(&mut self, user_id: &str, item_id: i64) -> DbResult<i64> {
        sqlx::query_scalar(
            "SELECT version FROM cart_item WHERE id = $1 AND user_id = $2 AND state = 'enabled'",
        )
        .bind(item_id)
        .bind(user_id)
        .fetch_optional(&mut *self.conn)
        .await?
        .ok_or_else(|| DbError::not_found(TABLE, item_id))
    }
}
