//! # Checkout
//!
//! Turns a user's cart into an order in a single transaction.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  BEGIN                                                                  │
//! │    1. live cart lines (sku + product enabled)   empty → EmptyCart       │
//! │    2. per line, in sku id order:                                        │
//! │       sku.quantity -= qty                       short → InsufficientStock│
//! │    3. INSERT orders + order_item snapshots      overflow → AmountOverflow│
//! │    4. soft-delete the ordered cart lines                                │
//! │  COMMIT                    (any error above → ROLLBACK, cart untouched) │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use tracing::{debug, info, instrument};

use crate::error::{DbError, DbResult};
use crate::pool::Database;
use crate::repository::cart::CartRepository;
use crate::repository::order::OrderRepository;
use crate::repository::sku::SkuRepository;
use crate::visibility::Visibility;
use storefront_core::validation::validate_order;
use storefront_core::{CoreError, OrderFields, OrderWithItems};

/// Places an order for everything orderable in `user_id`'s cart.
///
/// Stock rows are locked in sku id order, so two checkouts touching the
/// same skus queue behind each other instead of deadlocking.
#[instrument(skip_all, fields(user_id = %user_id))]
pub async fn checkout(db: &Database, user_id: &str, fields: &OrderFields) -> DbResult<OrderWithItems> {
    validate_order(fields).map_err(CoreError::from)?;

    let user_id = user_id.to_string();
    let fields = fields.clone();

    let order = db
        .transaction(move |conn| {
            Box::pin(async move {
                let lines = CartRepository::new(&mut *conn).list_for_user(&user_id).await?;
                if lines.is_empty() {
                    return Err(CoreError::EmptyCart.into());
                }
                debug!(user_id = %user_id, lines = lines.len(), "Checking out cart");

                let mut by_sku: Vec<_> = lines.iter().collect();
                by_sku.sort_by_key(|line| line.sku_id);
                for line in by_sku {
                    SkuRepository::new(&mut *conn)
                        .take_stock(line.sku_id, line.quantity)
                        .await?;
                }

                let mut orders = OrderRepository::new(&mut *conn);
                let order_id = orders.create(&user_id, &fields, &lines).await?;
                let order = orders.get_by_id(order_id, None, Visibility::All).await?;
                let items = orders.items(order_id).await?;

                let ordered: Vec<i64> = lines.iter().map(|line| line.id).collect();
                CartRepository::new(&mut *conn).clear_lines(&user_id, &ordered).await?;

                Ok::<_, DbError>(OrderWithItems { order, items })
            })
        })
        .await?;

    info!(
        order_id = order.order.id,
        total_cents = order.order.total_cents,
        items = order.items.len(),
        "Order placed"
    );
    Ok(order)
}
