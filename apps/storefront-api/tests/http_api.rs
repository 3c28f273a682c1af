//! End-to-end tests over the real router.
//!
//! Each test gets a fresh database from `#[sqlx::test]` (requires
//! `DATABASE_URL`) and a temporary static directory for uploads.

use axum::http::StatusCode;
use axum_test::multipart::{MultipartForm, Part};
use axum_test::TestServer;
use serde_json::{json, Value};
use sqlx::PgPool;
use storefront_api::config::ApiConfig;
use storefront_api::{router, AppState};
use storefront_core::{CategoryFields, ProductFields, Role, SkuFields, User};
use storefront_db::{CategoryRepository, Database, ProductRepository, SkuRepository, Visibility};
use tempfile::TempDir;

// =============================================================================
// Fixtures
// =============================================================================

struct TestApp {
    server: TestServer,
    state: AppState,
    _static_dir: TempDir,
}

impl TestApp {
    fn new(pool: PgPool) -> Self {
        let static_dir = tempfile::tempdir().unwrap();
        let config = ApiConfig {
            jwt_secret: "test-secret".to_string(),
            static_dir: static_dir.path().to_path_buf(),
            run_migrations: false,
            ..ApiConfig::default()
        };
        let state = AppState::new(Database::from_pool(pool), config);
        let server = TestServer::new(router(state.clone())).unwrap();

        TestApp {
            server,
            state,
            _static_dir: static_dir,
        }
    }

    fn bearer(&self, id: &str, role: Role) -> String {
        let user = User {
            id: id.to_string(),
            username: id.to_string(),
            role,
        };
        format!("Bearer {}", self.state.jwt.issue_token(&user).unwrap())
    }

    fn admin(&self) -> String {
        self.bearer("admin-1", Role::Admin)
    }

    fn customer(&self, id: &str) -> String {
        self.bearer(id, Role::Customer)
    }
}

/// One category, one product, one sku with `stock` units at 19.90.
async fn seed_sku(state: &AppState, code: &str, stock: i64) -> i64 {
    let mut conn = state.db.acquire().await.unwrap();
    let category_id = CategoryRepository::new(&mut conn)
        .create(&CategoryFields {
            name: "Apparel".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();
    let product_id = ProductRepository::new(&mut conn)
        .create(&ProductFields {
            product_name: "Classic Tee".to_string(),
            description: "Cotton".to_string(),
            category_id,
            ..Default::default()
        })
        .await
        .unwrap();
    SkuRepository::new(&mut conn)
        .create(
            product_id,
            &SkuFields {
                sku: code.to_string(),
                price_cents: 1990,
                quantity: stock,
                ..Default::default()
            },
        )
        .await
        .unwrap()
}

fn png() -> Part {
    Part::bytes(vec![0x89, b'P', b'N', b'G', 0x0d, 0x0a])
        .file_name("front.png")
        .mime_type("image/png")
}

// =============================================================================
// Public catalog
// =============================================================================

#[sqlx::test(migrations = "../../migrations/postgres")]
async fn test_health(pool: PgPool) {
    let app = TestApp::new(pool);

    let response = app.server.get("/health").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"], "ok");
}

#[sqlx::test(migrations = "../../migrations/postgres")]
async fn test_anonymous_listing_with_filters(pool: PgPool) {
    let app = TestApp::new(pool);
    seed_sku(&app.state, "TEE-1", 5).await;

    let response = app
        .server
        .post("/product")
        .json(&json!({"limit": 10, "filter": {"priceStart": "10", "priceEnd": 20}}))
        .await;
    response.assert_status_ok();
    let page: Value = response.json();
    assert_eq!(page["total"], 1);
    assert_eq!(page["items"][0]["sku"]["sku"], "TEE-1");
    assert_eq!(page["items"][0]["product"]["product_name"], "Classic Tee");

    let response = app
        .server
        .post("/product")
        .json(&json!({"filter": {"priceStart": "25"}}))
        .await;
    let page: Value = response.json();
    assert_eq!(page["total"], 0);
}

#[sqlx::test(migrations = "../../migrations/postgres")]
async fn test_unknown_filter_is_bad_request(pool: PgPool) {
    let app = TestApp::new(pool);

    let response = app
        .server
        .post("/product")
        .json(&json!({"filter": {"password": "hunter2"}}))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["code"], "BAD_REQUEST");
    assert!(body["message"].as_str().unwrap().contains("password"));
}

#[sqlx::test(migrations = "../../migrations/postgres")]
async fn test_single_product_counts_views(pool: PgPool) {
    let app = TestApp::new(pool);
    let sku_id = seed_sku(&app.state, "TEE-1", 5).await;

    app.server.post("/product/TEE-1").await.assert_status_ok();
    let response = app.server.post("/product/TEE-1").await;
    response.assert_status_ok();

    let mut conn = app.state.db.acquire().await.unwrap();
    let sku = SkuRepository::new(&mut conn)
        .get_by_id(sku_id, Visibility::All)
        .await
        .unwrap();
    assert_eq!(sku.count_viewed, 2);
    assert_eq!(sku.version, 0);

    let response = app.server.post("/product/NOPE").await;
    response.assert_status(StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert_eq!(body["code"], "NOT_FOUND");
}

#[sqlx::test(migrations = "../../migrations/postgres")]
async fn test_non_numeric_id_is_type_mismatch(pool: PgPool) {
    let app = TestApp::new(pool);

    let response = app.server.get("/category/abc").await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["code"], "TYPE_NOT_MATCHED");
}

// =============================================================================
// Authorization
// =============================================================================

#[sqlx::test(migrations = "../../migrations/postgres")]
async fn test_admin_routes_require_admin(pool: PgPool) {
    let app = TestApp::new(pool);
    let form = [("productName", "Tee"), ("categoryId", "1")];

    let response = app.server.post("/admin/product").form(&form).await;
    response.assert_status(StatusCode::UNAUTHORIZED);

    let response = app
        .server
        .post("/admin/product")
        .add_header("authorization", app.customer("cust-1"))
        .form(&form)
        .await;
    response.assert_status(StatusCode::FORBIDDEN);
    let body: Value = response.json();
    assert_eq!(body["code"], "FORBIDDEN");

    let response = app
        .server
        .get("/cart")
        .add_header("authorization", "Bearer not-a-token")
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "../../migrations/postgres")]
async fn test_deleted_rows_are_hidden_from_customers(pool: PgPool) {
    let app = TestApp::new(pool);
    seed_sku(&app.state, "TEE-1", 5).await;

    let category_id = {
        let mut conn = app.state.db.acquire().await.unwrap();
        let page = CategoryRepository::new(&mut conn)
            .list(Default::default(), Visibility::All)
            .await
            .unwrap();
        page.items[0].id
    };

    app.server
        .delete(&format!("/admin/category/{category_id}"))
        .add_header("authorization", app.admin())
        .await
        .assert_status_ok();

    app.server
        .get(&format!("/category/{category_id}"))
        .await
        .assert_status(StatusCode::NOT_FOUND);

    let response = app
        .server
        .get(&format!("/category/{category_id}"))
        .add_header("authorization", app.admin())
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["state"], "deleted");
    assert_eq!(body["version"], 1);
}

// =============================================================================
// Admin catalog maintenance
// =============================================================================

#[sqlx::test(migrations = "../../migrations/postgres")]
async fn test_admin_builds_catalog(pool: PgPool) {
    let app = TestApp::new(pool);
    let admin = app.admin();

    let response = app
        .server
        .post("/admin/category")
        .add_header("authorization", admin.clone())
        .multipart(MultipartForm::new().add_text("name", "Apparel"))
        .await;
    response.assert_status_ok();
    let category_id: i64 = response.json();

    let category_field = category_id.to_string();
    let response = app
        .server
        .post("/admin/product")
        .add_header("authorization", admin.clone())
        .form(&[
            ("productName", "Classic Tee"),
            ("description", "Heavy cotton"),
            ("categoryId", category_field.as_str()),
        ])
        .await;
    response.assert_status_ok();
    let product_id: i64 = response.json();

    let response = app
        .server
        .post(&format!("/admin/product/{product_id}/sku"))
        .add_header("authorization", admin.clone())
        .multipart(
            MultipartForm::new()
                .add_text("sku", "TEE-RED-M")
                .add_text("price", "19.90")
                .add_text("quantity", "12")
                .add_part("images[]", png()),
        )
        .await;
    response.assert_status_ok();
    let code: String = response.json();
    assert_eq!(code, "TEE-RED-M");

    let response = app.server.post("/product/TEE-RED-M").await;
    response.assert_status_ok();
    let found: Value = response.json();
    assert_eq!(found["product"]["id"], product_id);
    assert_eq!(found["sku"]["price_cents"], 1990);

    let large = found["sku"]["large_name"].as_str().unwrap().to_string();
    assert!(large.starts_with("images/sku/TEE-RED-M/"));
    assert_eq!(found["sku"]["thumb_name"], large.as_str());
    app.server
        .get(&format!("/static/{large}"))
        .await
        .assert_status_ok();

    let response = app
        .server
        .post(&format!("/admin/products?categoryId={category_id}"))
        .add_header("authorization", admin)
        .await;
    response.assert_status_ok();
    let page: Value = response.json();
    assert_eq!(page["total"], 1);
    assert_eq!(page["items"][0]["skus"][0]["sku"], "TEE-RED-M");
}

#[sqlx::test(migrations = "../../migrations/postgres")]
async fn test_category_created_with_images_starts_at_version_zero(pool: PgPool) {
    let app = TestApp::new(pool);

    let response = app
        .server
        .post("/admin/category")
        .add_header("authorization", app.admin())
        .multipart(
            MultipartForm::new()
                .add_text("name", "Kitchen")
                .add_part("icon", png())
                .add_part("image", png()),
        )
        .await;
    response.assert_status_ok();
    let category_id: i64 = response.json();

    let response = app.server.get(&format!("/category/{category_id}")).await;
    response.assert_status_ok();
    let detail: Value = response.json();
    assert_eq!(detail["version"], 0);

    let prefix = format!("images/category/{category_id}/");
    let icon = detail["icon"].as_str().unwrap().to_string();
    let image = detail["image"].as_str().unwrap().to_string();
    assert!(icon.starts_with(&prefix));
    assert!(image.starts_with(&prefix));
    assert_ne!(icon, image);
    app.server
        .get(&format!("/static/{icon}"))
        .await
        .assert_status_ok();
}

#[sqlx::test(migrations = "../../migrations/postgres")]
async fn test_sku_price_above_ceiling_is_invalid(pool: PgPool) {
    let app = TestApp::new(pool);
    seed_sku(&app.state, "TEE-1", 5).await;
    let product_id = {
        let found: Value = app.server.post("/product/TEE-1").await.json();
        found["product"]["id"].as_i64().unwrap()
    };

    let response = app
        .server
        .post(&format!("/admin/product/{product_id}/sku"))
        .add_header("authorization", app.admin())
        .multipart(
            MultipartForm::new()
                .add_text("sku", "TEE-GOLD")
                .add_text("price", "500000000000000.00")
                .add_text("quantity", "1"),
        )
        .await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = response.json();
    assert_eq!(body["code"], "INVALID_INPUT");
}

#[sqlx::test(migrations = "../../migrations/postgres")]
async fn test_sku_update_keeps_images_without_uploads(pool: PgPool) {
    let app = TestApp::new(pool);
    let admin = app.admin();
    seed_sku(&app.state, "TEE-1", 5).await;

    let upload = app
        .server
        .put("/admin/sku/TEE-1")
        .add_header("authorization", admin.clone())
        .multipart(
            MultipartForm::new()
                .add_text("sku", "TEE-1")
                .add_text("price", "21")
                .add_text("quantity", "5")
                .add_part("images", png()),
        )
        .await;
    upload.assert_status_ok();
    let body: Value = upload.json();
    assert_eq!(body["version"], 1);

    let response = app
        .server
        .put("/admin/sku/TEE-1")
        .add_header("authorization", admin)
        .multipart(
            MultipartForm::new()
                .add_text("sku", "TEE-1")
                .add_text("price", "22.50")
                .add_text("quantity", "5")
                .add_text("version", "1"),
        )
        .await;
    response.assert_status_ok();

    let found: Value = app.server.post("/product/TEE-1").await.json();
    assert_eq!(found["sku"]["price_cents"], 2250);
    assert!(found["sku"]["large_name"]
        .as_str()
        .unwrap()
        .starts_with("images/sku/TEE-1/"));
}

#[sqlx::test(migrations = "../../migrations/postgres")]
async fn test_stale_product_update_is_conflict(pool: PgPool) {
    let app = TestApp::new(pool);
    let admin = app.admin();
    seed_sku(&app.state, "TEE-1", 5).await;

    let (product_id, category_id) = {
        let found: Value = app.server.post("/product/TEE-1").await.json();
        (
            found["product"]["id"].as_i64().unwrap(),
            found["product"]["category_id"].as_i64().unwrap(),
        )
    };
    let category_field = category_id.to_string();

    let form = |version: &'static str| {
        vec![
            ("productName", "Renamed Tee".to_string()),
            ("categoryId", category_field.clone()),
            ("version", version.to_string()),
        ]
    };

    let response = app
        .server
        .put(&format!("/admin/product/{product_id}"))
        .add_header("authorization", admin.clone())
        .form(&form("0"))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["version"], 1);

    let response = app
        .server
        .put(&format!("/admin/product/{product_id}"))
        .add_header("authorization", admin)
        .form(&form("0"))
        .await;
    response.assert_status(StatusCode::CONFLICT);
    let body: Value = response.json();
    assert_eq!(body["code"], "CONFLICT");
}

#[sqlx::test(migrations = "../../migrations/postgres")]
async fn test_option_value_with_unknown_sku_rolls_back(pool: PgPool) {
    let app = TestApp::new(pool);
    let admin = app.admin();
    seed_sku(&app.state, "TEE-1", 5).await;
    let found: Value = app.server.post("/product/TEE-1").await.json();
    let category_id = found["product"]["category_id"].as_i64().unwrap();

    let response = app
        .server
        .post("/admin/option")
        .add_header("authorization", admin.clone())
        .json(&json!({"categoryId": category_id, "name": "Color"}))
        .await;
    response.assert_status_ok();
    let option_id: i64 = response.json();

    let response = app
        .server
        .post(&format!("/admin/option/{option_id}/value"))
        .add_header("authorization", admin.clone())
        .json(&json!({"name": "Red", "skus": ["TEE-1", "MISSING"]}))
        .await;
    response.assert_status(StatusCode::NOT_FOUND);

    let options: Value = app
        .server
        .get(&format!("/category/{category_id}/options"))
        .await
        .json();
    assert_eq!(options[0]["option"]["name"], "Color");
    assert_eq!(options[0]["values"].as_array().unwrap().len(), 0);

    let response = app
        .server
        .post(&format!("/admin/option/{option_id}/value"))
        .add_header("authorization", admin)
        .json(&json!({"name": "Red", "skus": ["TEE-1"]}))
        .await;
    response.assert_status_ok();

    let sku_id = found["sku"]["id"].as_i64().unwrap();
    let pairs: Value = app.server.get(&format!("/sku/{sku_id}/options")).await.json();
    assert_eq!(pairs[0]["option_name"], "Color");
    assert_eq!(pairs[0]["value_name"], "Red");

    let sku_value_id = pairs[0]["sku_value_id"].as_i64().unwrap();
    let selected: Value = app
        .server
        .post(&format!("/product/skuvalue/{sku_value_id}"))
        .await
        .json();
    assert_eq!(selected["option"]["id"], option_id);
    assert_eq!(selected["values"][0]["name"], "Red");
}

// =============================================================================
// Cart & checkout
// =============================================================================

#[sqlx::test(migrations = "../../migrations/postgres")]
async fn test_cart_checkout_flow(pool: PgPool) {
    let app = TestApp::new(pool);
    let customer = app.customer("cust-1");
    seed_sku(&app.state, "TEE-1", 5).await;

    app.server
        .get("/cart")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    for _ in 0..2 {
        app.server
            .post("/cart")
            .add_header("authorization", customer.clone())
            .json(&json!({"sku": "TEE-1", "quantity": 1}))
            .await
            .assert_status_ok();
    }

    let cart: Value = app
        .server
        .get("/cart")
        .add_header("authorization", customer.clone())
        .await
        .json();
    assert_eq!(cart["lines"].as_array().unwrap().len(), 1);
    assert_eq!(cart["lines"][0]["quantity"], 2);
    assert_eq!(cart["total_cents"], 3980);

    let response = app
        .server
        .post("/order")
        .add_header("authorization", customer.clone())
        .form(&[("phone", "+1 555 0100"), ("address", "1 Main St")])
        .await;
    response.assert_status_ok();
    let placed: Value = response.json();
    assert_eq!(placed["order"]["total_cents"], 3980);
    assert_eq!(placed["items"][0]["sku_snapshot"], "TEE-1");
    let order_id = placed["order"]["id"].as_i64().unwrap();

    let cart: Value = app
        .server
        .get("/cart")
        .add_header("authorization", customer.clone())
        .await
        .json();
    assert_eq!(cart["lines"].as_array().unwrap().len(), 0);

    let response = app
        .server
        .get(&format!("/order/{order_id}"))
        .add_header("authorization", customer.clone())
        .await;
    response.assert_status_ok();

    app.server
        .get(&format!("/order/{order_id}"))
        .add_header("authorization", app.customer("cust-2"))
        .await
        .assert_status(StatusCode::NOT_FOUND);

    let orders: Value = app
        .server
        .get("/order")
        .add_header("authorization", customer.clone())
        .await
        .json();
    assert_eq!(orders["total"], 1);

    let response = app
        .server
        .put(&format!("/admin/order/{order_id}/status"))
        .add_header("authorization", app.admin())
        .json(&json!({"status": "processing", "version": 0}))
        .await;
    response.assert_status_ok();

    let response = app
        .server
        .post("/order")
        .add_header("authorization", customer)
        .form(&[("phone", "+1 555 0100"), ("address", "1 Main St")])
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../../migrations/postgres")]
async fn test_checkout_beyond_stock_is_conflict(pool: PgPool) {
    let app = TestApp::new(pool);
    let customer = app.customer("cust-1");
    seed_sku(&app.state, "TEE-1", 1).await;

    app.server
        .post("/cart")
        .add_header("authorization", customer.clone())
        .json(&json!({"sku": "TEE-1", "quantity": 3}))
        .await
        .assert_status_ok();

    let response = app
        .server
        .post("/order")
        .add_header("authorization", customer.clone())
        .form(&[("phone", "+1 555 0100"), ("address", "1 Main St")])
        .await;
    response.assert_status(StatusCode::CONFLICT);

    let cart: Value = app
        .server
        .get("/cart")
        .add_header("authorization", customer)
        .await
        .json();
    assert_eq!(cart["lines"][0]["quantity"], 3);
}
