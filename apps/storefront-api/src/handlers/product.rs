//! Catalog listing, single-product pages and product/sku maintenance.

use axum::extract::State;
use axum::Json;
use storefront_core::validation::{validate_product, validate_sku};
use storefront_core::{Page, ProductWithSkus, Sku, SkuFields, SkuLookup, SkuWithProduct};
use storefront_db::{ProductRepository, SkuRepository, Visibility};
use tracing::{debug, info, instrument};

use crate::auth::{AdminUser, MaybeUser};
use crate::error::ApiResult;
use crate::forms::{AdminProductsQuery, ApiForm, ApiJson, ApiPath, ApiQuery, ListSkusRequest, MultipartForm, ProductForm};
use crate::handlers::{success, version, VersionResponse};
use crate::AppState;

// =============================================================================
// Public
// =============================================================================

/// `POST /product`: filtered sku listing.
#[instrument(skip_all)]
pub async fn list_skus(
    State(state): State<AppState>,
    caller: MaybeUser,
    ApiJson(request): ApiJson<ListSkusRequest>,
) -> ApiResult<Json<Page<SkuWithProduct>>> {
    let filters = request.filters()?;
    let pagination = state.pagination(request.limit, request.offset);

    let mut conn = state.db.acquire().await?;
    let page = ProductRepository::new(&mut conn)
        .list_skus(&filters, pagination, caller.visibility())
        .await?;
    Ok(Json(page))
}

/// `POST /product/{sku}`: one sku with its product. Counts a view when the
/// sku is live.
#[instrument(skip_all)]
pub async fn single_product(
    State(state): State<AppState>,
    caller: MaybeUser,
    ApiPath(code): ApiPath<String>,
) -> ApiResult<Json<SkuWithProduct>> {
    debug!(sku = %code, "Single product");
    let mut conn = state.db.acquire().await?;
    let found = ProductRepository::new(&mut conn)
        .get_single_product(&SkuLookup::Code(code.clone()), caller.visibility())
        .await?;

    if !SkuRepository::new(&mut conn).record_view(&code).await? {
        debug!(sku = %code, state = %found.sku.state, "View not counted");
    }
    Ok(Json(found))
}

// =============================================================================
// Admin: products
// =============================================================================

/// `POST /admin/products?categoryId=..`: products of a category with all
/// their skus, tombstones included.
#[instrument(skip_all)]
pub async fn admin_list(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    ApiQuery(query): ApiQuery<AdminProductsQuery>,
) -> ApiResult<Json<Page<ProductWithSkus>>> {
    let pagination = state.pagination(query.limit, query.offset);

    let mut conn = state.db.acquire().await?;
    let page = ProductRepository::new(&mut conn)
        .list_with_skus(query.category_id, pagination, Visibility::All)
        .await?;
    Ok(Json(page))
}

#[instrument(skip_all)]
pub async fn create(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    ApiForm(form): ApiForm<ProductForm>,
) -> ApiResult<Json<i64>> {
    let fields = form.fields()?;
    validate_product(&fields)?;

    let mut conn = state.db.acquire().await?;
    let id = ProductRepository::new(&mut conn).create(&fields).await?;

    info!(id, admin = %admin.username, "Product created");
    Ok(Json(id))
}

#[instrument(skip_all)]
pub async fn update(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    ApiPath(id): ApiPath<i64>,
    ApiForm(form): ApiForm<ProductForm>,
) -> ApiResult<Json<VersionResponse>> {
    let fields = form.fields()?;
    validate_product(&fields)?;

    let mut conn = state.db.acquire().await?;
    let new_version = ProductRepository::new(&mut conn)
        .update(id, &fields, form.version)
        .await?;
    Ok(version(new_version))
}

#[instrument(skip_all)]
pub async fn remove(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<&'static str>> {
    let mut conn = state.db.acquire().await?;
    ProductRepository::new(&mut conn).soft_delete(id).await?;

    info!(id, admin = %admin.username, "Product deleted");
    Ok(success())
}

// =============================================================================
// Admin: skus
// =============================================================================

/// Stores the uploaded `images[]` and fills the three image names.
///
/// The first upload is the large image, the second the small one, the third
/// the thumbnail; missing slots reuse the first. With no uploads the
/// current names are kept.
async fn attach_images(
    state: &AppState,
    form: &MultipartForm,
    fields: &mut SkuFields,
    current: Option<&Sku>,
) -> ApiResult<()> {
    let mut names = Vec::new();
    for file in form.files("images") {
        names.push(state.images.save("sku", &fields.sku, file).await?);
    }

    match names.first() {
        Some(first) => {
            fields.large_name = first.clone();
            fields.small_name = names.get(1).unwrap_or(first).clone();
            fields.thumb_name = names.get(2).unwrap_or(first).clone();
        }
        None => {
            if let Some(current) = current {
                fields.large_name = current.large_name.clone();
                fields.small_name = current.small_name.clone();
                fields.thumb_name = current.thumb_name.clone();
            }
        }
    }
    Ok(())
}

/// `POST /admin/product/{id}/sku` (multipart). Answers the sku code.
#[instrument(skip_all)]
pub async fn create_sku(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    ApiPath(product_id): ApiPath<i64>,
    form: MultipartForm,
) -> ApiResult<Json<String>> {
    let mut fields = form.sku_fields()?;
    validate_sku(&fields)?;
    attach_images(&state, &form, &mut fields, None).await?;

    let mut conn = state.db.acquire().await?;
    let id = SkuRepository::new(&mut conn).create(product_id, &fields).await?;

    info!(id, product_id, sku = %fields.sku, "Sku created");
    Ok(Json(fields.sku))
}

/// `PUT /admin/sku/{sku}` (multipart). The form may rename the code.
#[instrument(skip_all)]
pub async fn update_sku(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    ApiPath(code): ApiPath<String>,
    form: MultipartForm,
) -> ApiResult<Json<VersionResponse>> {
    let mut fields = form.sku_fields()?;
    validate_sku(&fields)?;
    let expected_version = form.version()?;

    let mut conn = state.db.acquire().await?;
    let current = SkuRepository::new(&mut conn).get_by_code(&code, Visibility::All).await?;
    attach_images(&state, &form, &mut fields, Some(&current)).await?;

    let new_version = SkuRepository::new(&mut conn)
        .update(&code, &fields, expected_version)
        .await?;

    info!(sku = %code, new_code = %fields.sku, version = new_version, "Sku updated");
    Ok(version(new_version))
}

/// `DELETE /admin/sku/{id}`.
#[instrument(skip_all)]
pub async fn remove_sku(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<&'static str>> {
    let mut conn = state.db.acquire().await?;
    SkuRepository::new(&mut conn).soft_delete(id).await?;

    info!(id, "Sku deleted");
    Ok(success())
}
