//! # Option Repository
//!
//! Options ("Color"), their values ("Red") and the sku ⇄ value links.
//!
//! ```text
//! option ──< option_value
//!    │            │
//!    └────< sku_value >──── sku
//! ```
//!
//! Every read goes through [`Visibility`]; joined reads restrict each table
//! they touch.

use std::collections::HashMap;

use chrono::Utc;
use sqlx::{PgConnection, Postgres, QueryBuilder};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::{missing_or_conflict, push_version_guard, soft_delete};
use crate::visibility::Visibility;
use storefront_core::{
    OptionFields, OptionValue, OptionValueFields, OptionWithValues, ProductOption, SkuOption,
};

const OPTION_TABLE: &str = "option";
const VALUE_TABLE: &str = "option_value";
const SKU_VALUE_TABLE: &str = "sku_value";

const OPTION_COLUMNS: &str = "option.id, option.category_id, option.name, \
     option.create_ts, option.update_ts, option.state, option.version";

const VALUE_COLUMNS: &str = "option_value.id, option_value.option_id, option_value.name, \
     option_value.create_ts, option_value.update_ts, option_value.state, option_value.version";

pub struct OptionRepository<'c> {
    conn: &'c mut PgConnection,
}

impl<'c> OptionRepository<'c> {
    pub fn new(conn: &'c mut PgConnection) -> Self {
        OptionRepository { conn }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub async fn get_option(&mut self, id: i64, visibility: Visibility) -> DbResult<ProductOption> {
        debug!(id, "Getting option");

        let mut query =
            QueryBuilder::<Postgres>::new(format!("SELECT {OPTION_COLUMNS} FROM option WHERE option.id = "));
        query.push_bind(id);
        visibility.restrict(&mut query, "option");

        query
            .build_query_as()
            .fetch_optional(&mut *self.conn)
            .await?
            .ok_or_else(|| DbError::not_found(OPTION_TABLE, id))
    }

    /// Options of a category, each with its values.
    pub async fn list_by_category(
        &mut self,
        category_id: i64,
        visibility: Visibility,
    ) -> DbResult<Vec<OptionWithValues>> {
        debug!(category_id, "Listing options by category");

        let mut query = QueryBuilder::<Postgres>::new(format!(
            "SELECT {OPTION_COLUMNS} FROM option WHERE option.category_id = "
        ));
        query.push_bind(category_id);
        visibility.restrict(&mut query, "option");
        query.push(" ORDER BY option.name, option.id");

        let options: Vec<ProductOption> = query.build_query_as().fetch_all(&mut *self.conn).await?;
        if options.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<i64> = options.iter().map(|o| o.id).collect();
        let mut query = QueryBuilder::<Postgres>::new(format!(
            "SELECT {VALUE_COLUMNS} FROM option_value WHERE option_value.option_id = ANY("
        ));
        query.push_bind(ids);
        query.push(")");
        visibility.restrict(&mut query, "option_value");
        query.push(" ORDER BY option_value.name, option_value.id");

        let values: Vec<OptionValue> = query.build_query_as().fetch_all(&mut *self.conn).await?;

        let mut by_option: HashMap<i64, Vec<OptionValue>> = HashMap::new();
        for value in values {
            by_option.entry(value.option_id).or_default().push(value);
        }

        Ok(options
            .into_iter()
            .map(|option| {
                let values = by_option.remove(&option.id).unwrap_or_default();
                OptionWithValues { option, values }
            })
            .collect())
    }

    pub async fn get_value(&mut self, id: i64, visibility: Visibility) -> DbResult<OptionValue> {
        debug!(id, "Getting option value");

        let mut query = QueryBuilder::<Postgres>::new(format!(
            "SELECT {VALUE_COLUMNS} FROM option_value WHERE option_value.id = "
        ));
        query.push_bind(id);
        visibility.restrict(&mut query, "option_value");

        query
            .build_query_as()
            .fetch_optional(&mut *self.conn)
            .await?
            .ok_or_else(|| DbError::not_found(VALUE_TABLE, id))
    }

    pub async fn list_values(&mut self, option_id: i64, visibility: Visibility) -> DbResult<Vec<OptionValue>> {
        debug!(option_id, "Listing option values");

        let mut query = QueryBuilder::<Postgres>::new(format!(
            "SELECT {VALUE_COLUMNS} FROM option_value WHERE option_value.option_id = "
        ));
        query.push_bind(option_id);
        visibility.restrict(&mut query, "option_value");
        query.push(" ORDER BY option_value.name, option_value.id");

        let values = query.build_query_as().fetch_all(&mut *self.conn).await?;
        Ok(values)
    }

    /// Option/value pairs attached to a sku.
    pub async fn list_sku_values(&mut self, sku_id: i64, visibility: Visibility) -> DbResult<Vec<SkuOption>> {
        debug!(sku_id, "Listing sku values");

        let mut query = QueryBuilder::<Postgres>::new(
            r#"
            SELECT sku_value.id AS sku_value_id, sku_value.sku_id,
                   option.id AS option_id, option.name AS option_name,
                   option_value.id AS option_value_id, option_value.name AS value_name
            FROM sku_value
            JOIN option ON option.id = sku_value.option_id
            JOIN option_value ON option_value.id = sku_value.option_value_id
            WHERE sku_value.sku_id = "#,
        );
        query.push_bind(sku_id);
        visibility.restrict(&mut query, "sku_value");
        visibility.restrict(&mut query, "option");
        visibility.restrict(&mut query, "option_value");
        query.push(" ORDER BY option.name, option.id");

        let pairs = query.build_query_as().fetch_all(&mut *self.conn).await?;
        Ok(pairs)
    }

    /// The option behind a sku value, carrying only the selected value.
    pub async fn get_option_by_sku_value(
        &mut self,
        sku_value_id: i64,
        visibility: Visibility,
    ) -> DbResult<OptionWithValues> {
        debug!(sku_value_id, "Getting option by sku value");

        let mut query = QueryBuilder::<Postgres>::new(
            r#"
            SELECT sku_value.option_id, sku_value.option_value_id
            FROM sku_value
            JOIN option ON option.id = sku_value.option_id
            JOIN option_value ON option_value.id = sku_value.option_value_id
            WHERE sku_value.id = "#,
        );
        query.push_bind(sku_value_id);
        visibility.restrict(&mut query, "sku_value");
        visibility.restrict(&mut query, "option");
        visibility.restrict(&mut query, "option_value");

        let (option_id, value_id): (i64, i64) = query
            .build_query_as()
            .fetch_optional(&mut *self.conn)
            .await?
            .ok_or_else(|| DbError::not_found(SKU_VALUE_TABLE, sku_value_id))?;

        // States were already checked by the join.
        let option = self.get_option(option_id, Visibility::All).await?;
        let value = self.get_value(value_id, Visibility::All).await?;

        Ok(OptionWithValues {
            option,
            values: vec![value],
        })
    }

    // =========================================================================
    // Writes
    // =========================================================================

    pub async fn create_option(&mut self, fields: &OptionFields) -> DbResult<i64> {
        debug!(category_id = fields.category_id, name = %fields.name, "Creating option");
        let now = Utc::now();

        let id = sqlx::query_scalar(
            r#"
            INSERT INTO option (category_id, name, create_ts, update_ts, state, version)
            VALUES ($1, $2, $3, $3, $4, 0)
            RETURNING id
            "#,
        )
        .bind(fields.category_id)
        .bind(&fields.name)
        .bind(now)
        .bind(fields.state)
        .fetch_one(&mut *self.conn)
        .await?;

        Ok(id)
    }

    pub async fn create_value(&mut self, option_id: i64, fields: &OptionValueFields) -> DbResult<i64> {
        debug!(option_id, name = %fields.name, "Creating option value");
        let now = Utc::now();

        let id = sqlx::query_scalar(
            r#"
            INSERT INTO option_value (option_id, name, create_ts, update_ts, state, version)
            VALUES ($1, $2, $3, $3, $4, 0)
            RETURNING id
            "#,
        )
        .bind(option_id)
        .bind(&fields.name)
        .bind(now)
        .bind(fields.state)
        .fetch_one(&mut *self.conn)
        .await?;

        Ok(id)
    }

    /// Links the sku identified by `sku_code` to an option value.
    ///
    /// The value must belong to `option_id`; a deleted or unknown sku is
    /// `NotFound`.
    pub async fn create_sku_value(
        &mut self,
        sku_code: &str,
        option_id: i64,
        option_value_id: i64,
    ) -> DbResult<i64> {
        debug!(sku = %sku_code, option_id, option_value_id, "Creating sku value");

        let owner: i64 = sqlx::query_scalar("SELECT option_id FROM option_value WHERE id = $1")
            .bind(option_value_id)
            .fetch_optional(&mut *self.conn)
            .await?
            .ok_or_else(|| DbError::not_found(VALUE_TABLE, option_value_id))?;

        if owner != option_id {
            return Err(DbError::Invalid(format!(
                "option value {option_value_id} does not belong to option {option_id}"
            )));
        }

        let now = Utc::now();
        let id: Option<i64> = sqlx::query_scalar(
            r#"
            INSERT INTO sku_value (sku_id, option_id, option_value_id, create_ts, update_ts, state, version)
            SELECT sku.id, $2, $3, $4, $4, 'enabled', 0
            FROM sku
            WHERE sku.sku = $1 AND sku.state <> 'deleted'
            RETURNING id
            "#,
        )
        .bind(sku_code)
        .bind(option_id)
        .bind(option_value_id)
        .bind(now)
        .fetch_optional(&mut *self.conn)
        .await?;

        id.ok_or_else(|| DbError::not_found("sku", sku_code))
    }

    pub async fn update_option(
        &mut self,
        id: i64,
        fields: &OptionFields,
        expected_version: Option<i64>,
    ) -> DbResult<i64> {
        debug!(id, ?expected_version, "Updating option");

        let mut query = QueryBuilder::<Postgres>::new("UPDATE option SET category_id = ");
        query.push_bind(fields.category_id);
        query.push(", name = ");
        query.push_bind(&fields.name);
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
            None => Err(missing_or_conflict(&mut *self.conn, OPTION_TABLE, id, expected_version).await),
        }
    }

    pub async fn update_value(
        &mut self,
        id: i64,
        fields: &OptionValueFields,
        expected_version: Option<i64>,
    ) -> DbResult<i64> {
        debug!(id, ?expected_version, "Updating option value");

        let mut query = QueryBuilder::<Postgres>::new("UPDATE option_value SET name = ");
        query.push_bind(&fields.name);
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
            None => Err(missing_or_conflict(&mut *self.conn, VALUE_TABLE, id, expected_version).await),
        }
    }

    pub async fn remove_option(&mut self, id: i64) -> DbResult<()> {
        debug!(id, "Soft-deleting option");
        soft_delete(&mut *self.conn, OPTION_TABLE, id).await
    }

    pub async fn remove_value(&mut self, id: i64) -> DbResult<()> {
        debug!(id, "Soft-deleting option value");
        soft_delete(&mut *self.conn, VALUE_TABLE, id).await
    }

    pub async fn remove_sku_value(&mut self, id: i64) -> DbResult<()> {
        debug!(id, "Soft-deleting sku value");
        soft_delete(&mut *self.conn, SKU_VALUE_TABLE, id).await
    }
}
