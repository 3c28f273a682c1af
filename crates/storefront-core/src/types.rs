//! # Domain Types
//!
//! Entity records and vocabulary used throughout the storefront.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Category     │◄──│     Product     │◄──│       Sku       │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  name, parent   │   │  product_name   │   │  sku (business) │       │
//! │  │  icon, image    │   │  category_id    │   │  price_cents    │       │
//! │  └────────▲────────┘   └─────────────────┘   └────────▲────────┘       │
//! │           │                                           │                 │
//! │  ┌────────┴────────┐   ┌─────────────────┐   ┌────────┴────────┐       │
//! │  │  ProductOption  │◄──│   OptionValue   │◄──│    SkuValue     │       │
//! │  │  "Color"        │   │  "Red"          │   │  sku ⇄ value    │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  CartItem ──► Sku          Order ◄── OrderItem (frozen snapshot)       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Record Envelope
//! Every record carries `id`, `create_ts`, `update_ts`, `state` and
//! `version`. `version` starts at 0 and grows by exactly one on every update
//! or soft delete. Rows are never physically removed; deletion sets
//! `state = deleted`.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;

// =============================================================================
// State
// =============================================================================

/// Lifecycle state of every catalog row.
///
/// ```text
///   create ──► Enabled ◄──► Disabled
///                 │             │
///                 └──► Deleted ◄┘   (tombstone, admin-visible only)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "entity_state", rename_all = "lowercase")
)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum State {
    Enabled,
    Disabled,
    Deleted,
}

impl State {
    pub fn as_str(&self) -> &'static str {
        match self {
            State::Enabled => "enabled",
            State::Disabled => "disabled",
            State::Deleted => "deleted",
        }
    }
}

impl Default for State {
    fn default() -> Self {
        State::Enabled
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for State {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "enabled" => Ok(State::Enabled),
            "disabled" => Ok(State::Disabled),
            "deleted" => Ok(State::Deleted),
            _ => Err(CoreError::TypeNotMatched {
                field: "state".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

// =============================================================================
// Role
// =============================================================================

/// Caller role carried in the bearer token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Customer,
}

impl Role {
    #[inline]
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

impl Default for Role {
    fn default() -> Self {
        Role::Customer
    }
}

impl FromStr for Role {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "customer" => Ok(Role::Customer),
            _ => Err(CoreError::TypeNotMatched {
                field: "role".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// An authenticated caller. There is no users table; identity comes from
/// the token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct User {
    pub id: String,
    pub username: String,
    pub role: Role,
}

// =============================================================================
// Order Status
// =============================================================================

/// Fulfilment status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "order_status", rename_all = "lowercase")
)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    New,
    Processing,
    Completed,
    Cancelled,
}

impl Default for OrderStatus {
    fn default() -> Self {
        OrderStatus::New
    }
}

impl FromStr for OrderStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "new" => Ok(OrderStatus::New),
            "processing" => Ok(OrderStatus::Processing),
            "completed" => Ok(OrderStatus::Completed),
            "cancelled" => Ok(OrderStatus::Cancelled),
            _ => Err(CoreError::TypeNotMatched {
                field: "status".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

// =============================================================================
// Category
// =============================================================================

/// A node in the category tree. `parent = None` marks a root.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub parent: Option<i64>,
    /// Path of the icon under the static directory.
    pub icon: String,
    /// Path of the banner image under the static directory.
    pub image: String,
    #[ts(as = "String")]
    pub create_ts: DateTime<Utc>,
    #[ts(as = "String")]
    pub update_ts: DateTime<Utc>,
    pub state: State,
    pub version: i64,
}

/// Mutable fields of a category, used for both create and update.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CategoryFields {
    pub name: String,
    pub parent: Option<i64>,
    pub icon: String,
    pub image: String,
    pub state: State,
}

// =============================================================================
// Product
// =============================================================================

/// A product. Purchasable variants live in [`Sku`].
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    pub id: i64,
    pub product_name: String,
    pub description: String,
    pub category_id: i64,
    pub brand_id: Option<i64>,
    pub region_id: Option<i64>,
    #[ts(as = "String")]
    pub create_ts: DateTime<Utc>,
    #[ts(as = "String")]
    pub update_ts: DateTime<Utc>,
    pub state: State,
    pub version: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductFields {
    pub product_name: String,
    pub description: String,
    pub category_id: i64,
    pub brand_id: Option<i64>,
    pub region_id: Option<i64>,
    pub state: State,
}

// =============================================================================
// Sku
// =============================================================================

/// A concrete purchasable variant of a product.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Sku {
    pub id: i64,
    pub product_id: i64,
    /// Business code, unique across all skus.
    pub sku: String,
    pub price_cents: i64,
    pub quantity: i64,
    pub large_name: String,
    pub small_name: String,
    pub thumb_name: String,
    pub count_viewed: i64,
    #[ts(as = "String")]
    pub create_ts: DateTime<Utc>,
    #[ts(as = "String")]
    pub update_ts: DateTime<Utc>,
    pub state: State,
    pub version: i64,
}

impl Sku {
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }
}

/// Mutable fields of a sku. `product_id` is fixed at creation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SkuFields {
    pub sku: String,
    pub price_cents: i64,
    pub quantity: i64,
    pub large_name: String,
    pub small_name: String,
    pub thumb_name: String,
    pub state: State,
}

/// How a single product page is looked up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkuLookup {
    Code(String),
    Id(i64),
}

/// A sku joined with its product, the shape of catalog listings.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SkuWithProduct {
    pub sku: Sku,
    pub product: Product,
}

/// A product with all of its skus, the admin listing shape.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductWithSkus {
    pub product: Product,
    pub skus: Vec<Sku>,
}

// =============================================================================
// Options
// =============================================================================

/// A product attribute axis scoped to a category, e.g. "Color".
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct ProductOption {
    pub id: i64,
    pub category_id: i64,
    pub name: String,
    #[ts(as = "String")]
    pub create_ts: DateTime<Utc>,
    #[ts(as = "String")]
    pub update_ts: DateTime<Utc>,
    pub state: State,
    pub version: i64,
}

/// One value of an option, e.g. "Red".
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct OptionValue {
    pub id: i64,
    pub option_id: i64,
    pub name: String,
    #[ts(as = "String")]
    pub create_ts: DateTime<Utc>,
    #[ts(as = "String")]
    pub update_ts: DateTime<Utc>,
    pub state: State,
    pub version: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct OptionFields {
    pub category_id: i64,
    pub name: String,
    #[serde(default)]
    pub state: State,
}

/// Mutable fields of an option value. The owning option is fixed at creation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OptionValueFields {
    pub name: String,
    #[serde(default)]
    pub state: State,
}

/// Association of a sku with an option/value pair.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SkuValue {
    pub id: i64,
    pub sku_id: i64,
    pub option_id: i64,
    pub option_value_id: i64,
    #[ts(as = "String")]
    pub create_ts: DateTime<Utc>,
    #[ts(as = "String")]
    pub update_ts: DateTime<Utc>,
    pub state: State,
    pub version: i64,
}

/// An option together with its values.
///
/// When read through a sku value, `values` holds only the selected value.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OptionWithValues {
    pub option: ProductOption,
    pub values: Vec<OptionValue>,
}

/// Flat view of one option/value pair attached to a sku.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SkuOption {
    pub sku_value_id: i64,
    pub sku_id: i64,
    pub option_id: i64,
    pub option_name: String,
    pub option_value_id: i64,
    pub value_name: String,
}

// =============================================================================
// Cart
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct CartItem {
    pub id: i64,
    pub user_id: String,
    pub sku_id: i64,
    pub quantity: i64,
    #[ts(as = "String")]
    pub create_ts: DateTime<Utc>,
    #[ts(as = "String")]
    pub update_ts: DateTime<Utc>,
    pub state: State,
    pub version: i64,
}

/// A cart line joined with the current sku price.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct CartLine {
    pub id: i64,
    pub sku_id: i64,
    pub sku: String,
    pub product_name: String,
    pub thumb_name: String,
    pub unit_price_cents: i64,
    pub stock: i64,
    pub quantity: i64,
    pub version: i64,
}

impl CartLine {
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    /// Unit price times quantity; `AmountOverflow` when it does not fit.
    #[inline]
    pub fn line_total(&self) -> CoreResult<Money> {
        self.unit_price()
            .checked_mul(self.quantity)
            .ok_or(CoreError::AmountOverflow)
    }

    /// Whether the sku still has enough stock for this line.
    #[inline]
    pub fn in_stock(&self) -> bool {
        self.stock >= self.quantity
    }
}

/// A caller's cart with its computed total.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Cart {
    pub lines: Vec<CartLine>,
    pub total_cents: i64,
}

impl Cart {
    pub fn from_lines(lines: Vec<CartLine>) -> CoreResult<Self> {
        let total = Money::try_sum(lines.iter().map(CartLine::line_total))?;
        Ok(Cart {
            lines,
            total_cents: total.cents(),
        })
    }

    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

// =============================================================================
// Order
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Order {
    pub id: i64,
    pub user_id: String,
    pub phone: String,
    pub address: String,
    pub comment: String,
    pub notes: String,
    pub status: OrderStatus,
    pub total_cents: i64,
    #[ts(as = "String")]
    pub create_ts: DateTime<Utc>,
    #[ts(as = "String")]
    pub update_ts: DateTime<Utc>,
    pub state: State,
    pub version: i64,
}

/// Contact details captured at checkout.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderFields {
    pub phone: String,
    pub address: String,
    pub comment: String,
    pub notes: String,
}

/// A line of an order.
/// Uses snapshot pattern to freeze sku data at time of checkout.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub sku_id: i64,
    /// Sku code at time of checkout (frozen).
    pub sku_snapshot: String,
    /// Product name at time of checkout (frozen).
    pub name_snapshot: String,
    pub unit_price_cents: i64,
    pub quantity: i64,
    pub line_total_cents: i64,
    #[ts(as = "String")]
    pub create_ts: DateTime<Utc>,
}

impl OrderItem {
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.line_total_cents)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderWithItems {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

// =============================================================================
// Unit Tests
// =============================================================================
