//! # Product Repository
//!
//! Database operations for products and the public catalog listing.
//!
//! ## Catalog Listing
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    How list_skus Builds Its Query                       │
//! │                                                                         │
//! │  SELECT sku.*, product.* AS p_*, count(*) OVER() AS total_count        │
//! │  FROM sku INNER JOIN product ON sku.product_id = product.id            │
//! │  WHERE 1=1                                                             │
//! │    AND sku.state = 'enabled'       ◄── Visibility::restrict (sku)      │
//! │    AND product.state = 'enabled'   ◄── Visibility::restrict (product)  │
//! │    AND sku.price_cents >= $1       ◄── SkuFilter::PriceFrom            │
//! │    AND unaccent(product.product_name) ILIKE unaccent($2)               │
//! │  ORDER BY sku.id LIMIT $3 OFFSET $4                                    │
//! │                                                                         │
//! │  Every user value is a bound parameter; column names come only from    │
//! │  the closed SkuFilter enum.                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;

use chrono::Utc;
use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgConnection, Postgres, QueryBuilder, Row};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::sku::SkuRepository;
use crate::repository::{into_page, missing_or_conflict, push_version_guard, soft_delete, Counted};
use crate::visibility::Visibility;
use storefront_core::filter::contains_pattern;
use storefront_core::{
    Page, Pagination, Product, ProductFields, ProductWithSkus, Sku, SkuFilter, SkuFilters,
    SkuLookup, SkuWithProduct,
};

const TABLE: &str = "product";

const PRODUCT_COLUMNS: &str =
    "product.id, product.product_name, product.description, product.category_id, \
     product.brand_id, product.region_id, product.create_ts, product.update_ts, \
     product.state, product.version";

pub(crate) const SKU_COLUMNS: &str =
    "sku.id, sku.product_id, sku.sku, sku.price_cents, sku.quantity, sku.large_name, \
     sku.small_name, sku.thumb_name, sku.count_viewed, sku.create_ts, sku.update_ts, \
     sku.state, sku.version";

const JOINED_PRODUCT_COLUMNS: &str =
    "product.id AS p_id, product.product_name AS p_product_name, \
     product.description AS p_description, product.category_id AS p_category_id, \
     product.brand_id AS p_brand_id, product.region_id AS p_region_id, \
     product.create_ts AS p_create_ts, product.update_ts AS p_update_ts, \
     product.state AS p_state, product.version AS p_version";

/// A `sku ⋈ product` row: sku columns as-is, product columns prefixed `p_`.
struct SkuProductRow(SkuWithProduct);

impl<'r> FromRow<'r, PgRow> for SkuProductRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let sku = Sku::from_row(row)?;
        let product = Product {
            id: row.try_get("p_id")?,
            product_name: row.try_get("p_product_name")?,
            description: row.try_get("p_description")?,
            category_id: row.try_get("p_category_id")?,
            brand_id: row.try_get("p_brand_id")?,
            region_id: row.try_get("p_region_id")?,
            create_ts: row.try_get("p_create_ts")?,
            update_ts: row.try_get("p_update_ts")?,
            state: row.try_get("p_state")?,
            version: row.try_get("p_version")?,
        };
        Ok(SkuProductRow(SkuWithProduct { sku, product }))
    }
}

/// Pushes one `AND ...` per filter.
fn push_sku_filters(query: &mut QueryBuilder<'_, Postgres>, filters: &SkuFilters) {
    for filter in filters.iter() {
        match filter {
            SkuFilter::PriceFrom(min) => {
                query.push(" AND sku.price_cents >= ");
                query.push_bind(min.cents());
            }
            SkuFilter::PriceTo(max) => {
                query.push(" AND sku.price_cents <= ");
                query.push_bind(max.cents());
            }
            SkuFilter::ProductName(needle) => {
                query.push(" AND unaccent(product.product_name) ILIKE unaccent(");
                query.push_bind(contains_pattern(needle));
                query.push(")");
            }
            SkuFilter::Description(needle) => {
                query.push(" AND unaccent(product.description) ILIKE unaccent(");
                query.push_bind(contains_pattern(needle));
                query.push(")");
            }
            SkuFilter::Category(id) => {
                query.push(" AND product.category_id = ");
                query.push_bind(*id);
            }
            SkuFilter::Brand(id) => {
                query.push(" AND product.brand_id = ");
                query.push_bind(*id);
            }
            SkuFilter::Region(id) => {
                query.push(" AND product.region_id = ");
                query.push_bind(*id);
            }
            SkuFilter::Product(id) => {
                query.push(" AND product.id = ");
                query.push_bind(*id);
            }
        }
    }
}

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let mut conn = db.acquire().await?;
/// let mut products = ProductRepository::new(&mut conn);
///
/// let page = products.list_skus(&filters, Pagination::default(), Visibility::EnabledOnly).await?;
/// let single = products.get_single_product(&SkuLookup::Code("TEE-RED-M".into()), vis).await?;
/// ```
pub struct ProductRepository<'c> {
    conn: &'c mut PgConnection,
}

impl<'c> ProductRepository<'c> {
    pub fn new(conn: &'c mut PgConnection) -> Self {
        ProductRepository { conn }
    }

    /// Lists skus joined with their product, filtered and paginated.
    ///
    /// `total` counts every matching row regardless of `limit/offset`.
    pub async fn list_skus(
        &mut self,
        filters: &SkuFilters,
        pagination: Pagination,
        visibility: Visibility,
    ) -> DbResult<Page<SkuWithProduct>> {
        debug!(
            limit = pagination.limit,
            offset = pagination.offset,
            filters = ?filters,
            ?visibility,
            "Listing skus"
        );

        let mut query = QueryBuilder::<Postgres>::new(format!(
            "SELECT {SKU_COLUMNS}, {JOINED_PRODUCT_COLUMNS}, count(*) OVER() AS total_count \
             FROM sku INNER JOIN product ON sku.product_id = product.id WHERE 1=1"
        ));
        visibility.restrict(&mut query, "sku");
        visibility.restrict(&mut query, "product");
        push_sku_filters(&mut query, filters);
        query.push(" ORDER BY sku.id LIMIT ");
        query.push_bind(pagination.limit);
        query.push(" OFFSET ");
        query.push_bind(pagination.offset);

        let rows: Vec<Counted<SkuProductRow>> =
            query.build_query_as().fetch_all(&mut *self.conn).await?;

        let page = match into_page(rows, pagination) {
            Some(page) => page.map(|row| row.0),
            None => {
                let mut count = QueryBuilder::<Postgres>::new(
                    "SELECT COUNT(*) FROM sku INNER JOIN product ON sku.product_id = product.id WHERE 1=1",
                );
                visibility.restrict(&mut count, "sku");
                visibility.restrict(&mut count, "product");
                push_sku_filters(&mut count, filters);
                let total: i64 = count.build_query_scalar().fetch_one(&mut *self.conn).await?;
                Page::new(Vec::new(), total)
            }
        };

        debug!(count = page.items.len(), total = page.total, "Listed skus");
        Ok(page)
    }

    /// Lists the products of a category.
    pub async fn list_by_category(
        &mut self,
        category_id: i64,
        pagination: Pagination,
        visibility: Visibility,
    ) -> DbResult<Page<Product>> {
        debug!(category_id, limit = pagination.limit, offset = pagination.offset, "Listing products by category");

        let mut query = QueryBuilder::<Postgres>::new(format!(
            "SELECT {PRODUCT_COLUMNS}, count(*) OVER() AS total_count \
             FROM product WHERE product.category_id = "
        ));
        query.push_bind(category_id);
        visibility.restrict(&mut query, "product");
        query.push(" ORDER BY product.id LIMIT ");
        query.push_bind(pagination.limit);
        query.push(" OFFSET ");
        query.push_bind(pagination.offset);

        let rows: Vec<Counted<Product>> = query.build_query_as().fetch_all(&mut *self.conn).await?;

        match into_page(rows, pagination) {
            Some(page) => Ok(page),
            None => {
                let mut count =
                    QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM product WHERE product.category_id = ");
                count.push_bind(category_id);
                visibility.restrict(&mut count, "product");
                let total: i64 = count.build_query_scalar().fetch_one(&mut *self.conn).await?;
                Ok(Page::new(Vec::new(), total))
            }
        }
    }

    /// Admin listing: a page of products of a category, each with its skus.
    pub async fn list_with_skus(
        &mut self,
        category_id: i64,
        pagination: Pagination,
        visibility: Visibility,
    ) -> DbResult<Page<ProductWithSkus>> {
        let products = self.list_by_category(category_id, pagination, visibility).await?;
        let ids: Vec<i64> = products.items.iter().map(|p| p.id).collect();

        let mut by_product: HashMap<i64, Vec<Sku>> = HashMap::new();
        for sku in SkuRepository::new(&mut *self.conn)
            .list_by_products(&ids, visibility)
            .await?
        {
            by_product.entry(sku.product_id).or_default().push(sku);
        }

        Ok(products.map(|product| {
            let skus = by_product.remove(&product.id).unwrap_or_default();
            ProductWithSkus { product, skus }
        }))
    }

    pub async fn get_by_id(&mut self, id: i64, visibility: Visibility) -> DbResult<Product> {
        debug!(id, "Getting product");

        let mut query =
            QueryBuilder::<Postgres>::new(format!("SELECT {PRODUCT_COLUMNS} FROM product WHERE product.id = "));
        query.push_bind(id);
        visibility.restrict(&mut query, "product");

        query
            .build_query_as()
            .fetch_optional(&mut *self.conn)
            .await?
            .ok_or_else(|| DbError::not_found(TABLE, id))
    }

    /// Single product page: one sku plus its product, both visibility-filtered.
    pub async fn get_single_product(
        &mut self,
        lookup: &SkuLookup,
        visibility: Visibility,
    ) -> DbResult<SkuWithProduct> {
        debug!(?lookup, "Getting single product");

        let mut query = QueryBuilder::<Postgres>::new(format!(
            "SELECT {SKU_COLUMNS}, {JOINED_PRODUCT_COLUMNS} \
             FROM sku INNER JOIN product ON sku.product_id = product.id WHERE "
        ));
        match lookup {
            SkuLookup::Code(code) => {
                query.push("sku.sku = ");
                query.push_bind(code.as_str());
            }
            SkuLookup::Id(id) => {
                query.push("sku.id = ");
                query.push_bind(*id);
            }
        }
        visibility.restrict(&mut query, "sku");
        visibility.restrict(&mut query, "product");

        let row: Option<SkuProductRow> = query.build_query_as().fetch_optional(&mut *self.conn).await?;

        row.map(|r| r.0).ok_or_else(|| match lookup {
            SkuLookup::Code(code) => DbError::not_found("sku", code),
            SkuLookup::Id(id) => DbError::not_found("sku", id),
        })
    }

    /// Inserts a product and returns its id.
    pub async fn create(&mut self, fields: &ProductFields) -> DbResult<i64> {
        debug!(product_name = %fields.product_name, category_id = fields.category_id, "Creating product");
        let now = Utc::now();

        let id = sqlx::query_scalar(
            r#"
            INSERT INTO product (
                product_name, description, category_id, brand_id, region_id,
                create_ts, update_ts, state, version
            )
            VALUES ($1, $2, $3, $4, $5, $6, $6, $7, 0)
            RETURNING id
            "#,
        )
        .bind(&fields.product_name)
        .bind(&fields.description)
        .bind(fields.category_id)
        .bind(fields.brand_id)
        .bind(fields.region_id)
        .bind(now)
        .bind(fields.state)
        .fetch_one(&mut *self.conn)
        .await?;

        Ok(id)
    }

    /// Overwrites the mutable fields; returns the new version.
    pub async fn update(
        &mut self,
        id: i64,
        fields: &ProductFields,
        expected_version: Option<i64>,
    ) -> DbResult<i64> {
        debug!(id, ?expected_version, "Updating product");

        let mut query = QueryBuilder::<Postgres>::new("UPDATE product SET product_name = ");
        query.push_bind(&fields.product_name);
        query.push(", description = ");
        query.push_bind(&fields.description);
        query.push(", category_id = ");
        query.push_bind(fields.category_id);
        query.push(", brand_id = ");
        query.push_bind(fields.brand_id);
        query.push(", region_id = ");
        query.push_bind(fields.region_id);
        query.push(", state = ");
        query.push_bind(fields.state);
        query.push(", update_ts = ");
        query.push_bind(Utc::now());
        query.push(", version = version + 1 WHERE id = ");
        query.push_bind(id);
        push_version_guard(&mut query, expected_version);
        query.push(" RETURNING version");

        let version: Option<i64> = query.build_query_scalar().fetch_optional(&mut *self.conn).await?;

        match version {
            Some(v) => Ok(v),
            None => Err(missing_or_conflict(&mut *self.conn, TABLE, id, expected_version).await),
        }
    }

    /// Soft-deletes the product. Its skus stay as they are and are hidden
    /// from listings by the product predicate.
    pub async fn soft_delete(&mut self, id: i64) -> DbResult<()> {
        debug!(id, "Soft-deleting product");
        soft_delete(&mut *self.conn, TABLE, id).await
    }
}
