//! # List Filters and Pagination
//!
//! Catalog listings accept a loose `{"filter": {"key": "value"}}` map from
//! the client. This module turns that map into a closed set of typed
//! predicates **once**, at the edge, so the SQL builder never sees an
//! arbitrary key.
//!
//! ## Parsing Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  {"priceStart": "10", "productName": "tee", "categoryId": "4"}         │
//! │       │                                                                 │
//! │       ▼  SkuFilters::parse                                              │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │ PriceFrom(Money(1000))                                           │  │
//! │  │ ProductName("tee")                                               │  │
//! │  │ Category(4)                                                      │  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! │       │                                                                 │
//! │       ▼  storefront-db pushes each variant as a bound predicate         │
//! │  WHERE sku.price_cents >= $1                                            │
//! │    AND unaccent(product.product_name) ILIKE unaccent($2)               │
//! │    AND product.category_id = $3                                        │
//! │                                                                         │
//! │  {"password": "x"}  ──►  CoreError::UnknownFilter  (400)               │
//! │  {"categoryId": "x"} ──► ValidationError::InvalidFormat  (422)         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::{DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};

// =============================================================================
// Sku Filter
// =============================================================================

/// One typed predicate over the `sku ⋈ product` listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkuFilter {
    /// `sku.price_cents >= cents`
    PriceFrom(Money),
    /// `sku.price_cents <= cents`
    PriceTo(Money),
    /// Case- and accent-insensitive substring of `product.product_name`.
    ProductName(String),
    /// Case- and accent-insensitive substring of `product.description`.
    Description(String),
    Category(i64),
    Brand(i64),
    Region(i64),
    Product(i64),
}

impl SkuFilter {
    /// Parses a single `key = value` pair.
    ///
    /// Id keys are accepted in both camelCase and snake_case.
    pub fn parse(key: &str, value: &str) -> CoreResult<SkuFilter> {
        let value = value.trim();
        let filter = match key {
            "priceStart" => SkuFilter::PriceFrom(Money::parse_field(key, value)?),
            "priceEnd" => SkuFilter::PriceTo(Money::parse_field(key, value)?),
            "productName" => SkuFilter::ProductName(value.to_string()),
            "description" => SkuFilter::Description(value.to_string()),
            "categoryId" | "category_id" => SkuFilter::Category(parse_id(key, value)?),
            "brandId" | "brand_id" => SkuFilter::Brand(parse_id(key, value)?),
            "regionId" | "region_id" => SkuFilter::Region(parse_id(key, value)?),
            "productId" | "product_id" => SkuFilter::Product(parse_id(key, value)?),
            other => return Err(CoreError::UnknownFilter(other.to_string())),
        };
        Ok(filter)
    }
}

/// Parses a positive numeric id, naming the field in the error.
pub fn parse_id(field: &str, raw: &str) -> Result<i64, ValidationError> {
    let id: i64 = raw
        .trim()
        .parse()
        .map_err(|_| ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: format!("'{raw}' is not a numeric id"),
        })?;
    if id <= 0 {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }
    Ok(id)
}

/// Builds an ILIKE pattern matching `needle` anywhere, with `%`, `_` and `\`
/// in the user text matched literally.
pub fn contains_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

// =============================================================================
// Filter Set
// =============================================================================

/// The conjunction of parsed predicates for one listing request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SkuFilters(Vec<SkuFilter>);

impl SkuFilters {
    /// Parses the raw client map. Blank values are treated as absent.
    ///
    /// Keys are processed in sorted order so the generated SQL is stable for
    /// the same input.
    pub fn parse(raw: &HashMap<String, String>) -> CoreResult<SkuFilters> {
        let mut keys: Vec<&String> = raw.keys().collect();
        keys.sort();

        let mut filters = Vec::with_capacity(keys.len());
        for key in keys {
            let value = &raw[key];
            if value.trim().is_empty() {
                continue;
            }
            filters.push(SkuFilter::parse(key, value)?);
        }
        Ok(SkuFilters(filters))
    }

    pub fn new(filters: Vec<SkuFilter>) -> Self {
        SkuFilters(filters)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SkuFilter> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn price_from(&self) -> Option<Money> {
        self.0.iter().find_map(|f| match f {
            SkuFilter::PriceFrom(m) => Some(*m),
            _ => None,
        })
    }

    pub fn price_to(&self) -> Option<Money> {
        self.0.iter().find_map(|f| match f {
            SkuFilter::PriceTo(m) => Some(*m),
            _ => None,
        })
    }
}

// =============================================================================
// Pagination
// =============================================================================

/// A clamped `LIMIT / OFFSET` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Pagination {
    pub limit: i64,
    pub offset: i64,
}

impl Pagination {
    /// Clamps raw values: a non-positive limit becomes the default, a limit
    /// above the ceiling becomes the ceiling, a negative offset becomes 0.
    pub fn new(limit: Option<i64>, offset: Option<i64>) -> Self {
        Pagination::with_bounds(limit, offset, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT)
    }

    /// Same as [`Pagination::new`] with configurable bounds.
    pub fn with_bounds(
        limit: Option<i64>,
        offset: Option<i64>,
        default_limit: i64,
        max_limit: i64,
    ) -> Self {
        let limit = match limit {
            Some(l) if l > 0 => l.min(max_limit),
            _ => default_limit,
        };
        let offset = offset.unwrap_or(0).max(0);
        Pagination { limit, offset }
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Pagination::new(None, None)
    }
}

/// One page of a listing plus the total number of matching rows.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: i64) -> Self {
        Page { items, total }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
