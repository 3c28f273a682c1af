//! # storefront-api
//!
//! HTTP surface of the storefront: catalog reads for everyone, cart and
//! orders for signed-in customers, catalog maintenance for admins.
//!
//! ## Architecture
//! ```text
//! client
//!   │
//!   ▼
//! Router (TraceLayer, body limit)
//!   ├── /static/* ──► ServeDir (uploaded images)
//!   │
//!   ▼
//! extractors: MaybeUser | CurrentUser | AdminUser, ApiJson | ApiForm | multipart
//!   │
//!   ▼
//! handlers: health, product, category, option, cart, order
//!   │
//!   ▼
//! storefront-db repositories ──► PostgreSQL
//! ```
//!
//! ## Module Organization
//!
//! - [`auth`] - Bearer tokens and role extractors
//! - [`config`] - Layered configuration
//! - [`error`] - `ApiError` and the JSON error body
//! - [`forms`] - Request bodies and rejection-mapping extractors
//! - [`handlers`] - Route handlers
//! - [`uploads`] - Image storage for sku and category uploads

pub mod auth;
pub mod config;
pub mod error;
pub mod forms;
pub mod handlers;
pub mod uploads;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, post, put};
use axum::Router;
use storefront_core::Pagination;
use storefront_db::Database;
use tower::ServiceBuilder;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::auth::JwtManager;
use crate::config::ApiConfig;
use crate::uploads::ImageStore;

/// Shared application state. Cloned per request; everything inside is
/// either a pool handle or behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Arc<ApiConfig>,
    pub jwt: Arc<JwtManager>,
    pub images: ImageStore,
}

impl AppState {
    pub fn new(db: Database, config: ApiConfig) -> Self {
        let jwt = JwtManager::new(&config.jwt_secret, config.token_lifetime_secs);
        let images = ImageStore::new(config.static_dir.clone());
        AppState {
            db,
            config: Arc::new(config),
            jwt: Arc::new(jwt),
            images,
        }
    }

    pub fn pagination(&self, limit: Option<i64>, offset: Option<i64>) -> Pagination {
        self.config.pagination(limit, offset)
    }
}

/// Builds the full router.
pub fn router(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes;
    let static_dir = state.config.static_dir.clone();

    let public = Router::new()
        .route("/health", get(handlers::health::health))
        .route("/product", post(handlers::product::list_skus))
        .route("/product/{sku}", post(handlers::product::single_product))
        .route("/product/skuvalue/{id}", post(handlers::option::option_by_sku_value))
        .route("/category", get(handlers::category::list))
        .route("/category/{id}", get(handlers::category::get))
        .route("/category/{id}/options", get(handlers::option::list_by_category))
        .route("/sku/{id}/options", get(handlers::option::list_sku_options));

    let customer = Router::new()
        .route(
            "/cart",
            get(handlers::cart::list).post(handlers::cart::add),
        )
        .route(
            "/cart/{id}",
            put(handlers::cart::set_quantity).delete(handlers::cart::remove),
        )
        .route(
            "/order",
            get(handlers::order::list).post(handlers::order::checkout),
        )
        .route("/order/{id}", get(handlers::order::get));

    // `{sku}` is a code for PUT and a numeric id for DELETE; one name per
    // position keeps the routes from conflicting.
    let admin = Router::new()
        .route("/products", post(handlers::product::admin_list))
        .route("/product", post(handlers::product::create))
        .route(
            "/product/{id}",
            put(handlers::product::update).delete(handlers::product::remove),
        )
        .route("/product/{id}/sku", post(handlers::product::create_sku))
        .route(
            "/sku/{sku}",
            put(handlers::product::update_sku).delete(handlers::product::remove_sku),
        )
        .route(
            "/sku/option/{key}",
            post(handlers::option::attach_to_sku).delete(handlers::option::detach_from_sku),
        )
        .route("/category", post(handlers::category::create))
        .route(
            "/category/{id}",
            put(handlers::category::update).delete(handlers::category::remove),
        )
        .route("/option", post(handlers::option::create))
        .route(
            "/option/{id}",
            put(handlers::option::update).delete(handlers::option::remove),
        )
        .route("/option/{id}/value", post(handlers::option::create_value))
        .route(
            "/option/value/{id}",
            put(handlers::option::update_value).delete(handlers::option::remove_value),
        )
        .route("/order/{id}/status", put(handlers::order::update_status))
        .route("/order/{id}", delete(handlers::order::remove));

    Router::new()
        .merge(public)
        .merge(customer)
        .nest("/admin", admin)
        .nest_service("/static", ServeDir::new(static_dir))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(DefaultBodyLimit::max(body_limit)),
        )
        .with_state(state)
}
