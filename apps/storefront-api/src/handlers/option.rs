//! Options (e.g. "Color"), their values ("Red") and the sku ⇄ value links.

use axum::extract::State;
use axum::Json;
use storefront_core::validation::{validate_option, validate_option_value};
use storefront_core::{OptionWithValues, SkuOption};
use storefront_db::{DbError, OptionRepository, Visibility};
use tracing::{info, instrument};

use crate::auth::{AdminUser, MaybeUser};
use crate::error::ApiResult;
use crate::forms::{ApiJson, ApiPath, ApiQuery, OptionRequest, OptionValueRequest, SkuOptionQuery};
use crate::handlers::{success, version, VersionResponse};
use crate::AppState;

// =============================================================================
// Public
// =============================================================================

/// `POST /product/skuvalue/{id}`: the option behind a sku value, with only
/// the selected value.
#[instrument(skip_all)]
pub async fn option_by_sku_value(
    State(state): State<AppState>,
    caller: MaybeUser,
    ApiPath(sku_value_id): ApiPath<i64>,
) -> ApiResult<Json<OptionWithValues>> {
    let mut conn = state.db.acquire().await?;
    let option = OptionRepository::new(&mut conn)
        .get_option_by_sku_value(sku_value_id, caller.visibility())
        .await?;
    Ok(Json(option))
}

#[instrument(skip_all)]
pub async fn list_by_category(
    State(state): State<AppState>,
    caller: MaybeUser,
    ApiPath(category_id): ApiPath<i64>,
) -> ApiResult<Json<Vec<OptionWithValues>>> {
    let mut conn = state.db.acquire().await?;
    let options = OptionRepository::new(&mut conn)
        .list_by_category(category_id, caller.visibility())
        .await?;
    Ok(Json(options))
}

#[instrument(skip_all)]
pub async fn list_sku_options(
    State(state): State<AppState>,
    caller: MaybeUser,
    ApiPath(sku_id): ApiPath<i64>,
) -> ApiResult<Json<Vec<SkuOption>>> {
    let mut conn = state.db.acquire().await?;
    let pairs = OptionRepository::new(&mut conn)
        .list_sku_values(sku_id, caller.visibility())
        .await?;
    Ok(Json(pairs))
}

// =============================================================================
// Admin: options
// =============================================================================

#[instrument(skip_all)]
pub async fn create(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    ApiJson(request): ApiJson<OptionRequest>,
) -> ApiResult<Json<i64>> {
    let fields = request.fields()?;
    validate_option(&fields)?;

    let mut conn = state.db.acquire().await?;
    let id = OptionRepository::new(&mut conn).create_option(&fields).await?;

    info!(id, category_id = fields.category_id, name = %fields.name, "Option created");
    Ok(Json(id))
}

#[instrument(skip_all)]
pub async fn update(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(request): ApiJson<OptionRequest>,
) -> ApiResult<Json<VersionResponse>> {
    let fields = request.fields()?;
    validate_option(&fields)?;

    let mut conn = state.db.acquire().await?;
    let new_version = OptionRepository::new(&mut conn)
        .update_option(id, &fields, request.version)
        .await?;
    Ok(version(new_version))
}

#[instrument(skip_all)]
pub async fn remove(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<&'static str>> {
    let mut conn = state.db.acquire().await?;
    OptionRepository::new(&mut conn).remove_option(id).await?;
    Ok(success())
}

// =============================================================================
// Admin: values
// =============================================================================

/// `POST /admin/option/{id}/value`: creates the value and links it to every
/// listed sku. All or nothing.
#[instrument(skip_all)]
pub async fn create_value(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    ApiPath(option_id): ApiPath<i64>,
    ApiJson(request): ApiJson<OptionValueRequest>,
) -> ApiResult<Json<i64>> {
    let fields = request.fields()?;
    validate_option_value(&fields)?;
    let skus = request.skus;
    let linked = skus.len();

    let id = state
        .db
        .transaction(move |conn| {
            Box::pin(async move {
                let mut options = OptionRepository::new(conn);
                options.get_option(option_id, Visibility::All).await?;

                let id = options.create_value(option_id, &fields).await?;
                for code in &skus {
                    options.create_sku_value(code, option_id, id).await?;
                }
                Ok::<_, DbError>(id)
            })
        })
        .await?;

    info!(id, option_id, linked, "Option value created");
    Ok(Json(id))
}

#[instrument(skip_all)]
pub async fn update_value(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(request): ApiJson<OptionValueRequest>,
) -> ApiResult<Json<VersionResponse>> {
    let fields = request.fields()?;
    validate_option_value(&fields)?;

    let mut conn = state.db.acquire().await?;
    let new_version = OptionRepository::new(&mut conn)
        .update_value(id, &fields, request.version)
        .await?;
    Ok(version(new_version))
}

#[instrument(skip_all)]
pub async fn remove_value(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<&'static str>> {
    let mut conn = state.db.acquire().await?;
    OptionRepository::new(&mut conn).remove_value(id).await?;
    Ok(success())
}

// =============================================================================
// Admin: sku links
// =============================================================================

/// `POST /admin/sku/option/{sku}?optionId=..&optionValueId=..`. Answers the
/// new sku value id.
#[instrument(skip_all)]
pub async fn attach_to_sku(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    ApiPath(code): ApiPath<String>,
    ApiQuery(query): ApiQuery<SkuOptionQuery>,
) -> ApiResult<Json<i64>> {
    let mut conn = state.db.acquire().await?;
    let id = OptionRepository::new(&mut conn)
        .create_sku_value(&code, query.option_id, query.option_value_id)
        .await?;

    info!(id, sku = %code, option_id = query.option_id, "Option value attached to sku");
    Ok(Json(id))
}

/// `DELETE /admin/sku/option/{skuValueId}`.
#[instrument(skip_all)]
pub async fn detach_from_sku(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    ApiPath(sku_value_id): ApiPath<i64>,
) -> ApiResult<Json<&'static str>> {
    let mut conn = state.db.acquire().await?;
    OptionRepository::new(&mut conn).remove_sku_value(sku_value_id).await?;
    Ok(success())
}
