//! Repository behaviour against a real PostgreSQL database.
//!
//! Each test gets a fresh database from `#[sqlx::test]` (requires
//! `DATABASE_URL`) with the embedded migrations applied.

use std::collections::HashMap;

use sqlx::PgPool;
use storefront_core::{
    CategoryFields, CoreError, ErrorKind, OptionFields, OptionValueFields, OrderFields, OrderStatus,
    Pagination, ProductFields, SkuFields, SkuFilters, SkuLookup, State,
};
use storefront_db::checkout::checkout;
use storefront_db::{
    CartRepository, CategoryRepository, Database, DbError, OptionRepository, OrderRepository,
    ProductRepository, SkuRepository, Visibility,
};

// =============================================================================
// Fixtures
// =============================================================================

async fn category(db: &Database, name: &str) -> i64 {
    let mut conn = db.acquire().await.unwrap();
    CategoryRepository::new(&mut conn)
        .create(&CategoryFields {
            name: name.to_string(),
            ..Default::default()
        })
        .await
        .unwrap()
}

async fn product(db: &Database, category_id: i64, name: &str) -> i64 {
    let mut conn = db.acquire().await.unwrap();
    ProductRepository::new(&mut conn)
        .create(&ProductFields {
            product_name: name.to_string(),
            description: format!("About {name}"),
            category_id,
            ..Default::default()
        })
        .await
        .unwrap()
}

fn sku_fields(code: &str, price_cents: i64, quantity: i64) -> SkuFields {
    SkuFields {
        sku: code.to_string(),
        price_cents,
        quantity,
        ..Default::default()
    }
}

async fn sku(db: &Database, product_id: i64, code: &str, price_cents: i64, quantity: i64) -> i64 {
    let mut conn = db.acquire().await.unwrap();
    SkuRepository::new(&mut conn)
        .create(product_id, &sku_fields(code, price_cents, quantity))
        .await
        .unwrap()
}

fn filters(pairs: &[(&str, &str)]) -> SkuFilters {
    let raw: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    SkuFilters::parse(&raw).unwrap()
}

// =============================================================================
// Lifecycle
// =============================================================================

#[sqlx::test(migrations = "../../migrations/postgres")]
async fn test_product_sku_lifecycle(pool: PgPool) {
    let db = Database::from_pool(pool);
    let category_id = category(&db, "Apparel").await;
    let product_id = product(&db, category_id, "Classic Tee").await;

    let mut conn = db.acquire().await.unwrap();
    let created = ProductRepository::new(&mut conn)
        .get_by_id(product_id, Visibility::EnabledOnly)
        .await
        .unwrap();
    assert_eq!(created.state, State::Enabled);
    assert_eq!(created.version, 0);
    drop(conn);

    let sku_id = sku(&db, product_id, "TEE-RED-M", 1999, 10).await;

    let mut conn = db.acquire().await.unwrap();
    let mut products = ProductRepository::new(&mut conn);
    let single = products
        .get_single_product(&SkuLookup::Code("TEE-RED-M".to_string()), Visibility::EnabledOnly)
        .await
        .unwrap();
    assert_eq!(single.sku.id, sku_id);
    assert_eq!(single.product.id, product_id);
    assert_eq!(single.sku.product_id, product_id);

    products.soft_delete(product_id).await.unwrap();

    let err = products
        .get_single_product(&SkuLookup::Code("TEE-RED-M".to_string()), Visibility::EnabledOnly)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    // Row still exists for the admin view.
    let deleted = products.get_by_id(product_id, Visibility::All).await.unwrap();
    assert_eq!(deleted.state, State::Deleted);
    assert_eq!(deleted.version, 1);
}

#[sqlx::test(migrations = "../../migrations/postgres")]
async fn test_soft_delete_twice_is_not_found(pool: PgPool) {
    let db = Database::from_pool(pool);
    let category_id = category(&db, "Kitchen").await;

    let mut conn = db.acquire().await.unwrap();
    let mut categories = CategoryRepository::new(&mut conn);
    categories.soft_delete(category_id).await.unwrap();

    let err = categories.soft_delete(category_id).await.unwrap_err();
    assert!(matches!(err, DbError::NotFound { .. }));

    let row = categories.get_by_id(category_id, Visibility::All).await.unwrap();
    assert_eq!(row.version, 1);
    assert!(categories.get_by_id(category_id, Visibility::EnabledOnly).await.is_err());
}

// =============================================================================
// Versioning
// =============================================================================

#[sqlx::test(migrations = "../../migrations/postgres")]
async fn test_update_bumps_version_and_detects_stale_writes(pool: PgPool) {
    let db = Database::from_pool(pool);
    let category_id = category(&db, "Books").await;
    let product_id = product(&db, category_id, "Dune").await;

    let mut conn = db.acquire().await.unwrap();
    let mut products = ProductRepository::new(&mut conn);

    let fields = ProductFields {
        product_name: "Dune (Deluxe)".to_string(),
        description: "Hardcover".to_string(),
        category_id,
        ..Default::default()
    };
    assert_eq!(products.update(product_id, &fields, Some(0)).await.unwrap(), 1);
    assert_eq!(products.update(product_id, &fields, None).await.unwrap(), 2);

    let stale = ProductFields {
        product_name: "Stale write".to_string(),
        ..fields.clone()
    };
    let err = products.update(product_id, &stale, Some(0)).await.unwrap_err();
    match err {
        DbError::Conflict { expected, actual, .. } => {
            assert_eq!(expected, 0);
            assert_eq!(actual, 2);
        }
        other => panic!("expected conflict, got {other:?}"),
    }

    let row = products.get_by_id(product_id, Visibility::All).await.unwrap();
    assert_eq!(row.product_name, "Dune (Deluxe)");
    assert_eq!(row.version, 2);

    let err = products.update(9999, &fields, Some(0)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[sqlx::test(migrations = "../../migrations/postgres")]
async fn test_sku_update_by_code_and_duplicate_code(pool: PgPool) {
    let db = Database::from_pool(pool);
    let category_id = category(&db, "Apparel").await;
    let product_id = product(&db, category_id, "Hoodie").await;
    sku(&db, product_id, "HOD-M", 4000, 5).await;
    sku(&db, product_id, "HOD-L", 4200, 5).await;

    let mut conn = db.acquire().await.unwrap();
    let mut skus = SkuRepository::new(&mut conn);

    let version = skus
        .update("HOD-M", &sku_fields("HOD-M", 3500, 7), Some(0))
        .await
        .unwrap();
    assert_eq!(version, 1);
    let row = skus.get_by_code("HOD-M", Visibility::EnabledOnly).await.unwrap();
    assert_eq!(row.price_cents, 3500);
    assert_eq!(row.quantity, 7);

    let err = skus
        .update("HOD-M", &sku_fields("HOD-L", 3500, 7), None)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AlreadyExists);

    let err = skus
        .create(product_id, &sku_fields("HOD-L", 100, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::UniqueViolation { .. }));

    let err = skus.create(9999, &sku_fields("ORPHAN", 100, 1)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
}

#[sqlx::test(migrations = "../../migrations/postgres")]
async fn test_record_view_leaves_version_alone(pool: PgPool) {
    let db = Database::from_pool(pool);
    let category_id = category(&db, "Kitchen").await;
    let product_id = product(&db, category_id, "Café Mug").await;
    sku(&db, product_id, "MUG-1", 1200, 3).await;

    let mut conn = db.acquire().await.unwrap();
    let mut skus = SkuRepository::new(&mut conn);
    assert!(skus.record_view("MUG-1").await.unwrap());
    assert!(skus.record_view("MUG-1").await.unwrap());

    let row = skus.get_by_code("MUG-1", Visibility::EnabledOnly).await.unwrap();
    assert_eq!(row.count_viewed, 2);
    assert_eq!(row.version, 0);

    assert!(!skus.record_view("NOPE").await.unwrap());
}

#[sqlx::test(migrations = "../../migrations/postgres")]
async fn test_record_view_after_sku_disappears_is_not_an_error(pool: PgPool) {
    let db = Database::from_pool(pool);
    let category_id = category(&db, "Kitchen").await;
    let product_id = product(&db, category_id, "Mug").await;
    let id = sku(&db, product_id, "MUG-1", 1200, 3).await;

    let mut conn = db.acquire().await.unwrap();
    let mut skus = SkuRepository::new(&mut conn);
    skus.update("MUG-1", &SkuFields { state: State::Disabled, ..sku_fields("MUG-1", 1200, 3) }, None)
        .await
        .unwrap();
    assert!(!skus.record_view("MUG-1").await.unwrap());

    skus.soft_delete(id).await.unwrap();
    assert!(!skus.record_view("MUG-1").await.unwrap());

    let row = skus.get_by_id(id, Visibility::All).await.unwrap();
    assert_eq!(row.count_viewed, 0);
    assert_eq!(row.version, 2);
}

// =============================================================================
// Listing
// =============================================================================

#[sqlx::test(migrations = "../../migrations/postgres")]
async fn test_price_range_filter(pool: PgPool) {
    let db = Database::from_pool(pool);
    let category_id = category(&db, "Apparel").await;
    let product_id = product(&db, category_id, "Tee").await;
    for (code, cents) in [("P5", 500), ("P10", 1000), ("P30", 3000), ("P50", 5000), ("P60", 6000)] {
        sku(&db, product_id, code, cents, 1).await;
    }

    let mut conn = db.acquire().await.unwrap();
    let mut products = ProductRepository::new(&mut conn);
    let page_size = Pagination::new(Some(50), None);

    let from = products
        .list_skus(&filters(&[("priceStart", "10")]), page_size, Visibility::EnabledOnly)
        .await
        .unwrap();
    assert!(from.items.iter().all(|r| r.sku.price_cents >= 1000));
    assert_eq!(from.total, 4);

    let to = products
        .list_skus(&filters(&[("priceEnd", "50")]), page_size, Visibility::EnabledOnly)
        .await
        .unwrap();
    assert!(to.items.iter().all(|r| r.sku.price_cents <= 5000));
    assert_eq!(to.total, 4);

    let both = products
        .list_skus(
            &filters(&[("priceStart", "10"), ("priceEnd", "50")]),
            page_size,
            Visibility::EnabledOnly,
        )
        .await
        .unwrap();
    let mut codes: Vec<_> = both.items.iter().map(|r| r.sku.sku.clone()).collect();
    codes.sort();
    assert_eq!(codes, vec!["P10", "P30", "P50"]);
}

#[sqlx::test(migrations = "../../migrations/postgres")]
async fn test_product_name_filter_ignores_case_and_accents(pool: PgPool) {
    let db = Database::from_pool(pool);
    let category_id = category(&db, "Kitchen").await;
    let plain = product(&db, category_id, "Foo Mug").await;
    let accented = product(&db, category_id, "Fóo Plate").await;
    let other = product(&db, category_id, "Bar Bowl").await;
    sku(&db, plain, "FOO-1", 100, 1).await;
    sku(&db, accented, "FOO-2", 100, 1).await;
    sku(&db, other, "BAR-1", 100, 1).await;

    let mut conn = db.acquire().await.unwrap();
    let page = ProductRepository::new(&mut conn)
        .list_skus(
            &filters(&[("productName", "foo")]),
            Pagination::default(),
            Visibility::EnabledOnly,
        )
        .await
        .unwrap();

    let mut codes: Vec<_> = page.items.iter().map(|r| r.sku.sku.clone()).collect();
    codes.sort();
    assert_eq!(codes, vec!["FOO-1", "FOO-2"]);
}

#[sqlx::test(migrations = "../../migrations/postgres")]
async fn test_like_metacharacters_are_literal(pool: PgPool) {
    let db = Database::from_pool(pool);
    let category_id = category(&db, "Misc").await;
    let percent = product(&db, category_id, "100% Cotton").await;
    let plain = product(&db, category_id, "1000 Threads").await;
    sku(&db, percent, "PCT-1", 100, 1).await;
    sku(&db, plain, "THR-1", 100, 1).await;

    let mut conn = db.acquire().await.unwrap();
    let page = ProductRepository::new(&mut conn)
        .list_skus(
            &filters(&[("productName", "100%")]),
            Pagination::default(),
            Visibility::EnabledOnly,
        )
        .await
        .unwrap();

    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].sku.sku, "PCT-1");
}

#[sqlx::test(migrations = "../../migrations/postgres")]
async fn test_total_is_independent_of_limit_and_offset(pool: PgPool) {
    let db = Database::from_pool(pool);
    let category_id = category(&db, "Books").await;
    let product_id = product(&db, category_id, "Dune").await;
    for i in 0..5 {
        sku(&db, product_id, &format!("DUNE-{i}"), 1000 + i, 1).await;
    }
    // Hidden from customers, never counted.
    let hidden = sku(&db, product_id, "DUNE-HIDDEN", 1000, 1).await;
    let mut conn = db.acquire().await.unwrap();
    SkuRepository::new(&mut conn).soft_delete(hidden).await.unwrap();

    let mut products = ProductRepository::new(&mut conn);
    let none = SkuFilters::default();

    let first = products
        .list_skus(&none, Pagination::new(Some(2), Some(0)), Visibility::EnabledOnly)
        .await
        .unwrap();
    assert_eq!(first.items.len(), 2);
    assert_eq!(first.total, 5);

    let last = products
        .list_skus(&none, Pagination::new(Some(2), Some(4)), Visibility::EnabledOnly)
        .await
        .unwrap();
    assert_eq!(last.items.len(), 1);
    assert_eq!(last.total, 5);

    let past_end = products
        .list_skus(&none, Pagination::new(Some(2), Some(10)), Visibility::EnabledOnly)
        .await
        .unwrap();
    assert!(past_end.items.is_empty());
    assert_eq!(past_end.total, 5);

    let admin = products
        .list_skus(&none, Pagination::new(Some(2), Some(0)), Visibility::All)
        .await
        .unwrap();
    assert_eq!(admin.total, 6);
}

#[sqlx::test(migrations = "../../migrations/postgres")]
async fn test_list_with_skus_groups_by_product(pool: PgPool) {
    let db = Database::from_pool(pool);
    let category_id = category(&db, "Apparel").await;
    let tee = product(&db, category_id, "Tee").await;
    let hoodie = product(&db, category_id, "Hoodie").await;
    sku(&db, tee, "TEE-S", 1000, 1).await;
    sku(&db, tee, "TEE-M", 1000, 1).await;
    sku(&db, hoodie, "HOD-S", 3000, 1).await;

    let mut conn = db.acquire().await.unwrap();
    let page = ProductRepository::new(&mut conn)
        .list_with_skus(category_id, Pagination::default(), Visibility::All)
        .await
        .unwrap();

    assert_eq!(page.total, 2);
    let tee_row = page.items.iter().find(|p| p.product.id == tee).unwrap();
    assert_eq!(tee_row.skus.len(), 2);
    let hoodie_row = page.items.iter().find(|p| p.product.id == hoodie).unwrap();
    assert_eq!(hoodie_row.skus.len(), 1);
}

#[sqlx::test(migrations = "../../migrations/postgres")]
async fn test_category_children_and_self_parent(pool: PgPool) {
    let db = Database::from_pool(pool);
    let apparel = category(&db, "Apparel").await;

    let mut conn = db.acquire().await.unwrap();
    let mut categories = CategoryRepository::new(&mut conn);
    let tees = categories
        .create(&CategoryFields {
            name: "T-Shirts".to_string(),
            parent: Some(apparel),
            ..Default::default()
        })
        .await
        .unwrap();

    let children = categories.children(apparel, Visibility::EnabledOnly).await.unwrap();
    assert_eq!(children.len(), 1);
    assert_eq!(children[0].id, tees);

    let err = categories
        .update(
            tees,
            &CategoryFields {
                name: "T-Shirts".to_string(),
                parent: Some(tees),
                ..Default::default()
            },
            None,
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
}

// =============================================================================
// Transactions
// =============================================================================

#[sqlx::test(migrations = "../../migrations/postgres")]
async fn test_failed_second_insert_rolls_back_the_first(pool: PgPool) {
    let db = Database::from_pool(pool);
    let category_id = category(&db, "Apparel").await;
    let existing = product(&db, category_id, "Tee").await;
    sku(&db, existing, "TAKEN", 100, 1).await;

    let result = db
        .transaction(move |conn| {
            Box::pin(async move {
                let product_id = ProductRepository::new(&mut *conn)
                    .create(&ProductFields {
                        product_name: "Ghost".to_string(),
                        category_id,
                        ..Default::default()
                    })
                    .await?;
                SkuRepository::new(&mut *conn)
                    .create(product_id, &sku_fields("TAKEN", 100, 1))
                    .await?;
                Ok::<_, DbError>(product_id)
            })
        })
        .await;
    assert!(matches!(result, Err(DbError::UniqueViolation { .. })));

    let ghosts: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM product WHERE product_name = 'Ghost'")
        .fetch_one(db.pool())
        .await
        .unwrap();
    assert_eq!(ghosts, 0);
}

// =============================================================================
// Options
// =============================================================================

#[sqlx::test(migrations = "../../migrations/postgres")]
async fn test_option_by_sku_value_respects_state(pool: PgPool) {
    let db = Database::from_pool(pool);
    let category_id = category(&db, "Apparel").await;
    let product_id = product(&db, category_id, "Tee").await;
    let sku_id = sku(&db, product_id, "TEE-RED", 1000, 1).await;

    let mut conn = db.acquire().await.unwrap();
    let mut options = OptionRepository::new(&mut conn);
    let color = options
        .create_option(&OptionFields {
            category_id,
            name: "Color".to_string(),
            state: State::Enabled,
        })
        .await
        .unwrap();
    let red = options
        .create_value(color, &OptionValueFields { name: "Red".to_string(), state: State::Enabled })
        .await
        .unwrap();
    let blue = options
        .create_value(color, &OptionValueFields { name: "Blue".to_string(), state: State::Enabled })
        .await
        .unwrap();

    let link = options.create_sku_value("TEE-RED", color, red).await.unwrap();

    let selected = options
        .get_option_by_sku_value(link, Visibility::EnabledOnly)
        .await
        .unwrap();
    assert_eq!(selected.option.id, color);
    assert_eq!(selected.values.len(), 1);
    assert_eq!(selected.values[0].name, "Red");

    let pairs = options.list_sku_values(sku_id, Visibility::EnabledOnly).await.unwrap();
    assert_eq!(pairs.len(), 1);
    assert_eq!(pairs[0].value_name, "Red");

    let by_category = options.list_by_category(category_id, Visibility::EnabledOnly).await.unwrap();
    assert_eq!(by_category.len(), 1);
    assert_eq!(by_category[0].values.len(), 2);
    assert!(by_category[0].values.iter().any(|v| v.id == blue));

    options.remove_option(color).await.unwrap();
    let err = options
        .get_option_by_sku_value(link, Visibility::EnabledOnly)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(options.get_option_by_sku_value(link, Visibility::All).await.is_ok());
}

#[sqlx::test(migrations = "../../migrations/postgres")]
async fn test_sku_value_must_match_option(pool: PgPool) {
    let db = Database::from_pool(pool);
    let category_id = category(&db, "Apparel").await;
    let product_id = product(&db, category_id, "Tee").await;
    sku(&db, product_id, "TEE-1", 1000, 1).await;

    let mut conn = db.acquire().await.unwrap();
    let mut options = OptionRepository::new(&mut conn);
    let color = options
        .create_option(&OptionFields { category_id, name: "Color".to_string(), state: State::Enabled })
        .await
        .unwrap();
    let size = options
        .create_option(&OptionFields { category_id, name: "Size".to_string(), state: State::Enabled })
        .await
        .unwrap();
    let small = options
        .create_value(size, &OptionValueFields { name: "S".to_string(), state: State::Enabled })
        .await
        .unwrap();

    let err = options.create_sku_value("TEE-1", color, small).await.unwrap_err();
    assert!(matches!(err, DbError::Invalid(_)));

    let err = options.create_sku_value("MISSING", size, small).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[sqlx::test(migrations = "../../migrations/postgres")]
async fn test_option_writes_bump_version_and_hide_deleted_rows(pool: PgPool) {
    let db = Database::from_pool(pool);
    let category_id = category(&db, "Apparel").await;
    let product_id = product(&db, category_id, "Tee").await;
    let sku_id = sku(&db, product_id, "TEE-1", 1000, 1).await;

    let mut conn = db.acquire().await.unwrap();
    let mut options = OptionRepository::new(&mut conn);
    let color = options
        .create_option(&OptionFields { category_id, name: "Color".to_string(), state: State::Enabled })
        .await
        .unwrap();
    let red = options
        .create_value(color, &OptionValueFields { name: "Red".to_string(), state: State::Enabled })
        .await
        .unwrap();
    let link = options.create_sku_value("TEE-1", color, red).await.unwrap();

    // Option: update, stale update, delete.
    let version = options
        .update_option(
            color,
            &OptionFields { category_id, name: "Colour".to_string(), state: State::Enabled },
            Some(0),
        )
        .await
        .unwrap();
    assert_eq!(version, 1);
    let err = options
        .update_option(
            color,
            &OptionFields { category_id, name: "Hue".to_string(), state: State::Enabled },
            Some(0),
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    // Value: update, stale update, delete.
    let version = options
        .update_value(red, &OptionValueFields { name: "Crimson".to_string(), state: State::Enabled }, Some(0))
        .await
        .unwrap();
    assert_eq!(version, 1);
    let err = options
        .update_value(red, &OptionValueFields { name: "Scarlet".to_string(), state: State::Enabled }, Some(0))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(options.get_value(red, Visibility::EnabledOnly).await.unwrap().name, "Crimson");

    // Sku value: delete hides it from the public reads.
    options.remove_sku_value(link).await.unwrap();
    let err = options
        .get_option_by_sku_value(link, Visibility::EnabledOnly)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(options.list_sku_values(sku_id, Visibility::EnabledOnly).await.unwrap().is_empty());
    let link_version: i64 = sqlx::query_scalar("SELECT version FROM sku_value WHERE id = $1")
        .bind(link)
        .fetch_one(&mut *conn)
        .await
        .unwrap();
    assert_eq!(link_version, 1);

    let mut options = OptionRepository::new(&mut conn);
    options.remove_value(red).await.unwrap();
    let err = options.get_value(red, Visibility::EnabledOnly).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    let removed = options.get_value(red, Visibility::All).await.unwrap();
    assert_eq!(removed.state, State::Deleted);
    assert_eq!(removed.version, 2);

    options.remove_option(color).await.unwrap();
    let err = options.get_option(color, Visibility::EnabledOnly).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    let removed = options.get_option(color, Visibility::All).await.unwrap();
    assert_eq!(removed.state, State::Deleted);
    assert_eq!(removed.version, 2);

    for err in [
        options.remove_option(color).await.unwrap_err(),
        options.remove_value(red).await.unwrap_err(),
        options.remove_sku_value(link).await.unwrap_err(),
    ] {
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}

// =============================================================================
// Cart & Checkout
// =============================================================================

fn order_fields() -> OrderFields {
    OrderFields {
        phone: "+1 555 0100".to_string(),
        address: "1 Main St".to_string(),
        ..Default::default()
    }
}

#[sqlx::test(migrations = "../../migrations/postgres")]
async fn test_cart_add_merges_lines(pool: PgPool) {
    let db = Database::from_pool(pool);
    let category_id = category(&db, "Apparel").await;
    let product_id = product(&db, category_id, "Tee").await;
    sku(&db, product_id, "TEE-1", 1050, 10).await;

    let mut conn = db.acquire().await.unwrap();
    let mut cart = CartRepository::new(&mut conn);
    let first = cart.add("alice", "TEE-1", 2).await.unwrap();
    let second = cart.add("alice", "TEE-1", 3).await.unwrap();
    assert_eq!(first, second);

    let lines = cart.list_for_user("alice").await.unwrap();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].quantity, 5);
    assert_eq!(lines[0].version, 1);

    assert!(cart.list_for_user("bob").await.unwrap().is_empty());
    assert!(cart.remove("bob", first).await.is_err());

    let version = cart.set_quantity("alice", first, 1, Some(1)).await.unwrap();
    assert_eq!(version, 2);
    let err = cart.set_quantity("alice", first, 4, Some(1)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    let err = cart.add("alice", "TEE-1", 0).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
}

#[sqlx::test(migrations = "../../migrations/postgres")]
async fn test_checkout_snapshots_prices_and_empties_cart(pool: PgPool) {
    let db = Database::from_pool(pool);
    let category_id = category(&db, "Apparel").await;
    let product_id = product(&db, category_id, "Tee").await;
    sku(&db, product_id, "TEE-1", 1050, 10).await;
    sku(&db, product_id, "TEE-2", 299, 10).await;

    {
        let mut conn = db.acquire().await.unwrap();
        let mut cart = CartRepository::new(&mut conn);
        cart.add("alice", "TEE-1", 2).await.unwrap();
        cart.add("alice", "TEE-2", 3).await.unwrap();
    }

    let placed = checkout(&db, "alice", &order_fields()).await.unwrap();
    assert_eq!(placed.order.total_cents, 2100 + 897);
    assert_eq!(placed.order.status, OrderStatus::New);
    assert_eq!(placed.items.len(), 2);
    assert!(placed.items.iter().all(|i| i.name_snapshot == "Tee"));

    let mut conn = db.acquire().await.unwrap();
    assert!(CartRepository::new(&mut conn).list_for_user("alice").await.unwrap().is_empty());

    let stock = SkuRepository::new(&mut conn)
        .get_by_code("TEE-1", Visibility::All)
        .await
        .unwrap();
    assert_eq!(stock.quantity, 8);

    // Later price edits never touch the order.
    SkuRepository::new(&mut conn)
        .update("TEE-1", &sku_fields("TEE-1", 9999, 8), None)
        .await
        .unwrap();
    let items = OrderRepository::new(&mut conn).items(placed.order.id).await.unwrap();
    let tee1 = items.iter().find(|i| i.sku_snapshot == "TEE-1").unwrap();
    assert_eq!(tee1.unit_price_cents, 1050);
    assert_eq!(tee1.line_total_cents, 2100);

    let mut orders = OrderRepository::new(&mut conn);
    let mine = orders.list_for_user("alice", Pagination::default()).await.unwrap();
    assert_eq!(mine.total, 1);
    assert!(orders
        .get_by_id(placed.order.id, Some("bob"), Visibility::EnabledOnly)
        .await
        .is_err());

    let version = orders
        .update_status(placed.order.id, OrderStatus::Processing, Some(0))
        .await
        .unwrap();
    assert_eq!(version, 1);
}

#[sqlx::test(migrations = "../../migrations/postgres")]
async fn test_checkout_failure_leaves_cart_and_stock(pool: PgPool) {
    let db = Database::from_pool(pool);
    let category_id = category(&db, "Apparel").await;
    let product_id = product(&db, category_id, "Tee").await;
    sku(&db, product_id, "TEE-1", 1000, 5).await;
    sku(&db, product_id, "TEE-2", 1000, 1).await;

    {
        let mut conn = db.acquire().await.unwrap();
        let mut cart = CartRepository::new(&mut conn);
        cart.add("alice", "TEE-1", 2).await.unwrap();
        cart.add("alice", "TEE-2", 1).await.unwrap();
    }
    // Someone else bought the last TEE-2.
    {
        let mut conn = db.acquire().await.unwrap();
        let id = SkuRepository::new(&mut conn)
            .get_by_code("TEE-2", Visibility::All)
            .await
            .unwrap()
            .id;
        SkuRepository::new(&mut conn).take_stock(id, 1).await.unwrap();
    }

    let err = checkout(&db, "alice", &order_fields()).await.unwrap_err();
    assert!(matches!(
        err,
        DbError::Domain(CoreError::InsufficientStock { available: 0, requested: 1, .. })
    ));

    let mut conn = db.acquire().await.unwrap();
    assert_eq!(CartRepository::new(&mut conn).list_for_user("alice").await.unwrap().len(), 2);
    let tee1 = SkuRepository::new(&mut conn)
        .get_by_code("TEE-1", Visibility::All)
        .await
        .unwrap();
    assert_eq!(tee1.quantity, 5);

    let orders: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders")
        .fetch_one(db.pool())
        .await
        .unwrap();
    assert_eq!(orders, 0);
}

#[sqlx::test(migrations = "../../migrations/postgres")]
async fn test_checkout_keeps_lines_of_unavailable_skus(pool: PgPool) {
    let db = Database::from_pool(pool);
    let category_id = category(&db, "Apparel").await;
    let product_id = product(&db, category_id, "Tee").await;
    sku(&db, product_id, "TEE-1", 1000, 5).await;
    sku(&db, product_id, "TEE-2", 700, 5).await;

    {
        let mut conn = db.acquire().await.unwrap();
        let mut cart = CartRepository::new(&mut conn);
        cart.add("alice", "TEE-1", 1).await.unwrap();
        cart.add("alice", "TEE-2", 2).await.unwrap();
    }
    {
        let mut conn = db.acquire().await.unwrap();
        SkuRepository::new(&mut conn)
            .update("TEE-2", &SkuFields { state: State::Disabled, ..sku_fields("TEE-2", 700, 5) }, None)
            .await
            .unwrap();
    }

    let placed = checkout(&db, "alice", &order_fields()).await.unwrap();
    assert_eq!(placed.items.len(), 1);
    assert_eq!(placed.order.total_cents, 1000);

    let mut conn = db.acquire().await.unwrap();
    SkuRepository::new(&mut conn)
        .update("TEE-2", &sku_fields("TEE-2", 700, 5), None)
        .await
        .unwrap();
    let lines = CartRepository::new(&mut conn).list_for_user("alice").await.unwrap();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].sku, "TEE-2");
    assert_eq!(lines[0].quantity, 2);
}

#[sqlx::test(migrations = "../../migrations/postgres")]
async fn test_checkout_rejects_overflowing_total(pool: PgPool) {
    let db = Database::from_pool(pool);
    let category_id = category(&db, "Apparel").await;
    let product_id = product(&db, category_id, "Tee").await;
    let sku_id = sku(&db, product_id, "TEE-1", 1000, 5).await;

    // A price written around validation, e.g. by a bulk import.
    sqlx::query("UPDATE sku SET price_cents = $1 WHERE id = $2")
        .bind(i64::MAX / 2)
        .bind(sku_id)
        .execute(db.pool())
        .await
        .unwrap();
    {
        let mut conn = db.acquire().await.unwrap();
        CartRepository::new(&mut conn).add("alice", "TEE-1", 3).await.unwrap();
    }

    let err = checkout(&db, "alice", &order_fields()).await.unwrap_err();
    assert!(matches!(err, DbError::Domain(CoreError::AmountOverflow)));
    assert_eq!(err.kind(), ErrorKind::InvalidInput);

    let mut conn = db.acquire().await.unwrap();
    let tee1 = SkuRepository::new(&mut conn)
        .get_by_code("TEE-1", Visibility::All)
        .await
        .unwrap();
    assert_eq!(tee1.quantity, 5);
    assert_eq!(CartRepository::new(&mut conn).list_for_user("alice").await.unwrap().len(), 1);
}

#[sqlx::test(migrations = "../../migrations/postgres")]
async fn test_concurrent_checkouts_over_shared_skus_both_succeed(pool: PgPool) {
    let db = Database::from_pool(pool);
    let category_id = category(&db, "Apparel").await;
    let product_id = product(&db, category_id, "Tee").await;
    sku(&db, product_id, "TEE-A", 1000, 100).await;
    sku(&db, product_id, "TEE-B", 1000, 100).await;

    for _ in 0..10 {
        {
            let mut conn = db.acquire().await.unwrap();
            let mut cart = CartRepository::new(&mut conn);
            // Opposite line order per customer.
            cart.add("alice", "TEE-A", 1).await.unwrap();
            cart.add("alice", "TEE-B", 1).await.unwrap();
            cart.add("bob", "TEE-B", 1).await.unwrap();
            cart.add("bob", "TEE-A", 1).await.unwrap();
        }

        let alice_fields = order_fields();
        let bob_fields = order_fields();
        let (alice, bob) = tokio::join!(
            checkout(&db, "alice", &alice_fields),
            checkout(&db, "bob", &bob_fields),
        );
        assert_eq!(alice.unwrap().items.len(), 2);
        assert_eq!(bob.unwrap().items.len(), 2);
    }

    let mut conn = db.acquire().await.unwrap();
    let mut skus = SkuRepository::new(&mut conn);
    assert_eq!(skus.get_by_code("TEE-A", Visibility::All).await.unwrap().quantity, 80);
    assert_eq!(skus.get_by_code("TEE-B", Visibility::All).await.unwrap().quantity, 80);
}

#[sqlx::test(migrations = "../../migrations/postgres")]
async fn test_checkout_empty_cart(pool: PgPool) {
    let db = Database::from_pool(pool);
    let err = checkout(&db, "nobody", &order_fields()).await.unwrap_err();
    assert!(matches!(err, DbError::Domain(CoreError::EmptyCart)));
    assert_eq!(err.kind(), ErrorKind::BadRequest);
}
