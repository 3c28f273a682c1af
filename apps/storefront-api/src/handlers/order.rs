//! Checkout, order history and admin order maintenance.

use axum::extract::State;
use axum::Json;
use storefront_core::{Order, OrderFields, OrderStatus, OrderWithItems, Page};
use storefront_db::checkout::checkout as place_order;
use storefront_db::{OrderRepository, Visibility};
use tracing::{info, instrument};

use crate::auth::{AdminUser, CurrentUser};
use crate::error::ApiResult;
use crate::forms::{ApiForm, ApiJson, ApiPath, ApiQuery, CheckoutForm, OrderStatusRequest, PageQuery};
use crate::handlers::{success, version, VersionResponse};
use crate::AppState;

/// `POST /order` (form): turns the caller's cart into an order.
#[instrument(skip_all)]
pub async fn checkout(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiForm(form): ApiForm<CheckoutForm>,
) -> ApiResult<Json<OrderWithItems>> {
    let fields = OrderFields::from(form);
    let order = place_order(&state.db, &user.id, &fields).await?;
    Ok(Json(order))
}

#[instrument(skip_all)]
pub async fn list(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> ApiResult<Json<Page<Order>>> {
    let pagination = state.pagination(query.limit, query.offset);

    let mut conn = state.db.acquire().await?;
    let page = OrderRepository::new(&mut conn)
        .list_for_user(&user.id, pagination)
        .await?;
    Ok(Json(page))
}

/// One order with its items. Customers only see their own orders; admins
/// see any.
#[instrument(skip_all)]
pub async fn get(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<OrderWithItems>> {
    let owner = (!user.role.is_admin()).then_some(user.id.as_str());

    let mut conn = state.db.acquire().await?;
    let mut orders = OrderRepository::new(&mut conn);
    let order = orders.get_by_id(id, owner, Visibility::for_role(user.role)).await?;
    let items = orders.items(order.id).await?;

    Ok(Json(OrderWithItems { order, items }))
}

#[instrument(skip_all)]
pub async fn update_status(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(request): ApiJson<OrderStatusRequest>,
) -> ApiResult<Json<VersionResponse>> {
    let status: OrderStatus = request.status.trim().parse()?;

    let mut conn = state.db.acquire().await?;
    let new_version = OrderRepository::new(&mut conn)
        .update_status(id, status, request.version)
        .await?;

    info!(id, ?status, admin = %admin.username, "Order status changed");
    Ok(version(new_version))
}

#[instrument(skip_all)]
pub async fn remove(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<&'static str>> {
    let mut conn = state.db.acquire().await?;
    OrderRepository::new(&mut conn).soft_delete(id).await?;

    info!(id, admin = %admin.username, "Order deleted");
    Ok(success())
}
