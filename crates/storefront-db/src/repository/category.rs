//! # Category Repository
//!
//! Database operations for the category tree.

use chrono::Utc;
use sqlx::{PgConnection, Postgres, QueryBuilder};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::{into_page, missing_or_conflict, push_version_guard, soft_delete, Counted};
use crate::visibility::Visibility;
use storefront_core::{Category, CategoryFields, Page, Pagination};

const TABLE: &str = "category";

const COLUMNS: &str =
    "category.id, category.name, category.parent, category.icon, category.image, \
     category.create_ts, category.update_ts, category.state, category.version";

/// Repository for category database operations.
pub struct CategoryRepository<'c> {
    conn: &'c mut PgConnection,
}

impl<'c> CategoryRepository<'c> {
    pub fn new(conn: &'c mut PgConnection) -> Self {
        CategoryRepository { conn }
    }

    /// Lists categories ordered by parent then name.
    pub async fn list(
        &mut self,
        pagination: Pagination,
        visibility: Visibility,
    ) -> DbResult<Page<Category>> {
        debug!(limit = pagination.limit, offset = pagination.offset, ?visibility, "Listing categories");

        let mut query = QueryBuilder::<Postgres>::new(format!(
            "SELECT {COLUMNS}, count(*) OVER() AS total_count FROM category WHERE 1=1"
        ));
        visibility.restrict(&mut query, "category");
        query.push(" ORDER BY category.parent NULLS FIRST, category.name, category.id LIMIT ");
        query.push_bind(pagination.limit);
        query.push(" OFFSET ");
        query.push_bind(pagination.offset);

        let rows: Vec<Counted<Category>> = query.build_query_as().fetch_all(&mut *self.conn).await?;

        match into_page(rows, pagination) {
            Some(page) => Ok(page),
            None => {
                let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM category WHERE 1=1");
                visibility.restrict(&mut count, "category");
                let total: i64 = count.build_query_scalar().fetch_one(&mut *self.conn).await?;
                Ok(Page::new(Vec::new(), total))
            }
        }
    }

    /// Direct children of `parent_id`.
    pub async fn children(&mut self, parent_id: i64, visibility: Visibility) -> DbResult<Vec<Category>> {
        debug!(parent_id, "Listing category children");

        let mut query = QueryBuilder::<Postgres>::new(format!(
            "SELECT {COLUMNS} FROM category WHERE category.parent = "
        ));
        query.push_bind(parent_id);
        visibility.restrict(&mut query, "category");
        query.push(" ORDER BY category.name, category.id");

        let children = query.build_query_as().fetch_all(&mut *self.conn).await?;
        Ok(children)
    }

    pub async fn get_by_id(&mut self, id: i64, visibility: Visibility) -> DbResult<Category> {
        debug!(id, "Getting category");

        let mut query =
            QueryBuilder::<Postgres>::new(format!("SELECT {COLUMNS} FROM category WHERE category.id = "));
        query.push_bind(id);
        visibility.restrict(&mut query, "category");

        query
            .build_query_as()
            .fetch_optional(&mut *self.conn)
            .await?
            .ok_or_else(|| DbError::not_found(TABLE, id))
    }

    /// Inserts a category and returns its id.
    pub async fn create(&mut self, fields: &CategoryFields) -> DbResult<i64> {
        debug!(name = %fields.name, parent = ?fields.parent, "Creating category");
        let now = Utc::now();

        let id = sqlx::query_scalar(
            r#"
            INSERT INTO category (name, parent, icon, image, create_ts, update_ts, state, version)
            VALUES ($1, $2, $3, $4, $5, $5, $6, 0)
            RETURNING id
            "#,
        )
        .bind(&fields.name)
        .bind(fields.parent)
        .bind(&fields.icon)
        .bind(&fields.image)
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
        fields: &CategoryFields,
        expected_version: Option<i64>,
    ) -> DbResult<i64> {
        debug!(id, ?expected_version, "Updating category");

        if fields.parent == Some(id) {
            return Err(DbError::Invalid("category cannot be its own parent".to_string()));
        }

        let mut query = QueryBuilder::<Postgres>::new("UPDATE category SET name = ");
        query.push_bind(&fields.name);
        query.push(", parent = ");
        query.push_bind(fields.parent);
        query.push(", icon = ");
        query.push_bind(&fields.icon);
        query.push(", image = ");
        query.push_bind(&fields.image);
        query.push(", state = ");
        query.push_bind(fields.state);
        query.push(", update_ts = ");
        query.push_bind(Utc::now());
        query.push(", version = version + 1 WHERE id = ");
        query.push_bind(id);
        push_version_guard(&mut query, expected_version);
        query.push(" RETURNING version");

        let version: Option<i64> = query
            .build_query_scalar()
            .fetch_optional(&mut *self.conn)
            .await?;

        match version {
            Some(v) => Ok(v),
            None => Err(missing_or_conflict(&mut *self.conn, TABLE, id, expected_version).await),
        }
    }

    /// Writes the icon and image names of a category created in the same
    /// transaction. `version` is left alone, so the new row stays at 0.
    pub async fn set_images(&mut self, id: i64, icon: &str, image: &str) -> DbResult<()> {
        debug!(id, icon, image, "Setting category images");

        let result = sqlx::query("UPDATE category SET icon = $2, image = $3 WHERE id = $1")
            .bind(id)
            .bind(icon)
            .bind(image)
            .execute(&mut *self.conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found(TABLE, id));
        }
        Ok(())
    }

    pub async fn soft_delete(&mut self, id: i64) -> DbResult<()> {
        debug!(id, "Soft-deleting category");
        soft_delete(&mut *self.conn, TABLE, id).await
    }
}
