//! The signed-in customer's cart. Every operation is scoped to the caller.

use axum::extract::State;
use axum::Json;
use storefront_core::Cart;
use storefront_db::CartRepository;
use tracing::{debug, instrument};

use crate::auth::CurrentUser;
use crate::error::ApiResult;
use crate::forms::{AddToCartRequest, ApiJson, ApiPath, SetQuantityRequest};
use crate::handlers::{success, version, VersionResponse};
use crate::AppState;

#[instrument(skip_all)]
pub async fn list(State(state): State<AppState>, CurrentUser(user): CurrentUser) -> ApiResult<Json<Cart>> {
    let mut conn = state.db.acquire().await?;
    let lines = CartRepository::new(&mut conn).list_for_user(&user.id).await?;
    Ok(Json(Cart::from_lines(lines)?))
}

/// Adds `quantity` of a sku; repeated adds merge into one line.
#[instrument(skip_all)]
pub async fn add(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiJson(request): ApiJson<AddToCartRequest>,
) -> ApiResult<Json<i64>> {
    let mut conn = state.db.acquire().await?;
    let id = CartRepository::new(&mut conn)
        .add(&user.id, request.sku.trim(), request.quantity)
        .await?;

    debug!(id, user_id = %user.id, sku = %request.sku, "Added to cart");
    Ok(Json(id))
}

#[instrument(skip_all)]
pub async fn set_quantity(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiPath(item_id): ApiPath<i64>,
    ApiJson(request): ApiJson<SetQuantityRequest>,
) -> ApiResult<Json<VersionResponse>> {
    let mut conn = state.db.acquire().await?;
    let new_version = CartRepository::new(&mut conn)
        .set_quantity(&user.id, item_id, request.quantity, request.version)
        .await?;
    Ok(version(new_version))
}

#[instrument(skip_all)]
pub async fn remove(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiPath(item_id): ApiPath<i64>,
) -> ApiResult<Json<&'static str>> {
    let mut conn = state.db.acquire().await?;
    CartRepository::new(&mut conn).remove(&user.id, item_id).await?;
    Ok(success())
}
