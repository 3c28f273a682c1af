//! Category tree: public reads, admin maintenance with icon/image uploads.

use axum::extract::State;
use axum::Json;
use serde::Serialize;
use storefront_core::validation::validate_category;
use storefront_core::{Category, CategoryFields, Page};
use storefront_db::{CategoryRepository, DbError, Visibility};
use tracing::{info, instrument};

use crate::auth::{AdminUser, MaybeUser};
use crate::error::ApiResult;
use crate::forms::{ApiPath, ApiQuery, MultipartForm, PageQuery};
use crate::handlers::{success, version, VersionResponse};
use crate::AppState;

/// A category with its direct children.
#[derive(Debug, Serialize)]
pub struct CategoryDetail {
    #[serde(flatten)]
    pub category: Category,
    pub children: Vec<Category>,
}

#[instrument(skip_all)]
pub async fn list(
    State(state): State<AppState>,
    caller: MaybeUser,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> ApiResult<Json<Page<Category>>> {
    let pagination = state.pagination(query.limit, query.offset);

    let mut conn = state.db.acquire().await?;
    let page = CategoryRepository::new(&mut conn)
        .list(pagination, caller.visibility())
        .await?;
    Ok(Json(page))
}

#[instrument(skip_all)]
pub async fn get(
    State(state): State<AppState>,
    caller: MaybeUser,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<CategoryDetail>> {
    let visibility = caller.visibility();

    let mut conn = state.db.acquire().await?;
    let mut categories = CategoryRepository::new(&mut conn);
    let category = categories.get_by_id(id, visibility).await?;
    let children = categories.children(id, visibility).await?;

    Ok(Json(CategoryDetail { category, children }))
}

/// Saves the `icon` and `image` parts under the category id. Absent parts
/// keep `current`'s names.
async fn attach_images(
    state: &AppState,
    id: i64,
    form: &MultipartForm,
    fields: &mut CategoryFields,
    current: Option<&Category>,
) -> ApiResult<bool> {
    let key = id.to_string();
    let mut stored = false;

    match form.file("icon") {
        Some(file) => {
            fields.icon = state.images.save("category", &key, file).await?;
            stored = true;
        }
        None => {
            if let Some(current) = current {
                fields.icon = current.icon.clone();
            }
        }
    }
    match form.file("image") {
        Some(file) => {
            fields.image = state.images.save("category", &key, file).await?;
            stored = true;
        }
        None => {
            if let Some(current) = current {
                fields.image = current.image.clone();
            }
        }
    }
    Ok(stored)
}

/// `POST /admin/category` (multipart: name, parentId, state, icon, image).
///
/// Uploads live under the new id, so the row is inserted first and the
/// image names written in the same transaction. The new row keeps
/// `version = 0`.
#[instrument(skip_all)]
pub async fn create(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    form: MultipartForm,
) -> ApiResult<Json<i64>> {
    let mut fields = form.category_fields()?;
    validate_category(&fields)?;

    let mut tx = state.db.begin().await?;
    let id = CategoryRepository::new(&mut *tx).create(&fields).await?;

    if attach_images(&state, id, &form, &mut fields, None).await? {
        CategoryRepository::new(&mut *tx)
            .set_images(id, &fields.icon, &fields.image)
            .await?;
    }
    tx.commit().await.map_err(DbError::from)?;

    info!(id, admin = %admin.username, "Category created");
    Ok(Json(id))
}

#[instrument(skip_all)]
pub async fn update(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    ApiPath(id): ApiPath<i64>,
    form: MultipartForm,
) -> ApiResult<Json<VersionResponse>> {
    let mut fields = form.category_fields()?;
    validate_category(&fields)?;
    let expected_version = form.version()?;

    let mut conn = state.db.acquire().await?;
    let current = CategoryRepository::new(&mut conn).get_by_id(id, Visibility::All).await?;
    attach_images(&state, id, &form, &mut fields, Some(&current)).await?;

    let new_version = CategoryRepository::new(&mut conn)
        .update(id, &fields, expected_version)
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
    CategoryRepository::new(&mut conn).soft_delete(id).await?;

    info!(id, admin = %admin.username, "Category deleted");
    Ok(success())
}
