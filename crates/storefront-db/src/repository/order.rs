//! # Order Repository
//!
//! Orders and their line items.
//!
//! ## Snapshot Pattern
//! ```text
//! cart line (live sku price) ──► order_item (frozen copy)
//!
//! order_item.sku_snapshot      = sku.sku at checkout
//! order_item.name_snapshot     = product.product_name at checkout
//! order_item.unit_price_cents  = sku.price_cents at checkout
//! ```
//! Later catalog edits never rewrite an order. Order items are immutable:
//! they carry only `create_ts`.

use chrono::Utc;
use sqlx::{PgConnection, Postgres, QueryBuilder};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::{into_page, missing_or_conflict, push_version_guard, soft_delete, Counted};
use crate::visibility::Visibility;
use storefront_core::{
    CartLine, Money, Order, OrderFields, OrderItem, OrderStatus, Page, Pagination,
};

const TABLE: &str = "orders";

const COLUMNS: &str = "orders.id, orders.user_id, orders.phone, orders.address, orders.comment, \
     orders.notes, orders.status, orders.total_cents, \
     orders.create_ts, orders.update_ts, orders.state, orders.version";

pub struct OrderRepository<'c> {
    conn: &'c mut PgConnection,
}

impl<'c> OrderRepository<'c> {
    pub fn new(conn: &'c mut PgConnection) -> Self {
        OrderRepository { conn }
    }

    /// Inserts an order and one snapshot item per cart line; returns the
    /// order id.
    ///
    /// Run this on a transaction: a failure between the two inserts must
    /// not leave an order without its items.
    pub async fn create(&mut self, user_id: &str, fields: &OrderFields, lines: &[CartLine]) -> DbResult<i64> {
        let line_totals = lines
            .iter()
            .map(CartLine::line_total)
            .collect::<Result<Vec<Money>, _>>()?;
        let total = Money::try_sum(line_totals.iter().copied().map(Ok))?;
        debug!(user_id, lines = lines.len(), total = %total, "Creating order");
        let now = Utc::now();

        let order_id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO orders (
                user_id, phone, address, comment, notes, status, total_cents,
                create_ts, update_ts, state, version
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8, 'enabled', 0)
            RETURNING id
            "#,
        )
        .bind(user_id)
        .bind(&fields.phone)
        .bind(&fields.address)
        .bind(&fields.comment)
        .bind(&fields.notes)
        .bind(OrderStatus::New)
        .bind(total.cents())
        .bind(now)
        .fetch_one(&mut *self.conn)
        .await?;

        for (line, line_total) in lines.iter().zip(&line_totals) {
            sqlx::query(
                r#"
                INSERT INTO order_item (
                    order_id, sku_id, sku_snapshot, name_snapshot,
                    unit_price_cents, quantity, line_total_cents, create_ts
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(order_id)
            .bind(line.sku_id)
            .bind(&line.sku)
            .bind(&line.product_name)
            .bind(line.unit_price_cents)
            .bind(line.quantity)
            .bind(line_total.cents())
            .bind(now)
            .execute(&mut *self.conn)
            .await?;
        }

        Ok(order_id)
    }

    /// Loads an order. `owner` scopes the read to one user; `None` is the
    /// admin view.
    pub async fn get_by_id(&mut self, id: i64, owner: Option<&str>, visibility: Visibility) -> DbResult<Order> {
        debug!(id, ?owner, "Getting order");

        let mut query = QueryBuilder::<Postgres>::new(format!("SELECT {COLUMNS} FROM orders WHERE orders.id = "));
        query.push_bind(id);
        if let Some(user_id) = owner {
            query.push(" AND orders.user_id = ");
            query.push_bind(user_id);
        }
        visibility.restrict(&mut query, "orders");

        query
            .build_query_as()
            .fetch_optional(&mut *self.conn)
            .await?
            .ok_or_else(|| DbError::not_found(TABLE, id))
    }

    /// The user's live orders, newest first.
    pub async fn list_for_user(&mut self, user_id: &str, pagination: Pagination) -> DbResult<Page<Order>> {
        debug!(user_id, limit = pagination.limit, offset = pagination.offset, "Listing orders");

        let rows: Vec<Counted<Order>> = sqlx::query_as(&format!(
            "SELECT {COLUMNS}, count(*) OVER() AS total_count FROM orders \
             WHERE orders.user_id = $1 AND orders.state = 'enabled' \
             ORDER BY orders.create_ts DESC, orders.id DESC LIMIT $2 OFFSET $3"
        ))
        .bind(user_id)
        .bind(pagination.limit)
        .bind(pagination.offset)
        .fetch_all(&mut *self.conn)
        .await?;

        match into_page(rows, pagination) {
            Some(page) => Ok(page),
            None => {
                let total: i64 = sqlx::query_scalar(
                    "SELECT COUNT(*) FROM orders WHERE user_id = $1 AND state = 'enabled'",
                )
                .bind(user_id)
                .fetch_one(&mut *self.conn)
                .await?;
                Ok(Page::new(Vec::new(), total))
            }
        }
    }

    pub async fn items(&mut self, order_id: i64) -> DbResult<Vec<OrderItem>> {
        let items = sqlx::query_as(
            r#"
            SELECT id, order_id, sku_id, sku_snapshot, name_snapshot,
                   unit_price_cents, quantity, line_total_cents, create_ts
            FROM order_item
            WHERE order_id = $1
            ORDER BY id
            "#,
        )
        .bind(order_id)
        .fetch_all(&mut *self.conn)
        .await?;

        Ok(items)
    }

    /// Moves an order to `status`; returns the new version.
    pub async fn update_status(
        &mut self,
        id: i64,
        status: OrderStatus,
        expected_version: Option<i64>,
    ) -> DbResult<i64> {
        debug!(id, ?status, ?expected_version, "Updating order status");

        let mut query = QueryBuilder::<Postgres>::new("UPDATE orders SET status = ");
        query.push_bind(status);
        query.push(", update_ts = ");
        query.push_bind(Utc::now());
        query.push(", version = version + 1 WHERE id = ");
        query.push_bind(id);
        query.push(" AND state <> 'deleted'");
        push_version_guard(&mut query, expected_version);
        query.push(" RETURNING version");

        let version: Option<i64> = query.build_query_scalar().fetch_optional(&mut *self.conn).await?;

        match version {
            Some(v) => Ok(v),
            None => Err(missing_or_conflict(&mut *self.conn, TABLE, id, expected_version).await),
        }
    }

    pub async fn soft_delete(&mut self, id: i64) -> DbResult<()> {
        debug!(id, "Soft-deleting order");
        soft_delete(&mut *self.conn, TABLE, id).await
    }
}
