//! # Money Module
//!
//! Provides the `Money` type for sku prices, cart lines and order totals.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  Prices arrive from forms as text: "10", "10.5", "10.50"               │
//! │  Parsed as f64 and multiplied by 100:                                   │
//! │    "1.15" → 114.99999999999999  ❌ WRONG!                               │
//! │                                                                         │
//! │  OUR SOLUTION: Parse the decimal text straight into integer cents       │
//! │    "1.15" → 1 * 100 + 15 = 115 cents                                    │
//! │    Stored as sku.price_cents BIGINT                                     │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use storefront_core::money::Money;
//!
//! let price: Money = "10.5".parse().unwrap();
//! assert_eq!(price.cents(), 1050);
//!
//! let line_total = price.checked_mul(3).unwrap();
//! assert_eq!(line_total.to_string(), "31.50");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Mul, Sub};
use std::str::FromStr;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};

// =============================================================================
// Money Type
// =============================================================================

/// Represents a monetary value in the smallest currency unit (cents).
///
/// ## Where Money is Used
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Sku.price_cents ──┬──► CartLine.line_total ──► Cart.total              │
/// │                    │                                                    │
/// │                    ├──► OrderItem.unit_price_cents (snapshot)           │
/// │                    │                                                    │
/// │                    └──► priceStart / priceEnd list filters              │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents (the smallest currency unit).
    ///
    /// ## Example
    /// ```rust
    /// use storefront_core::money::Money;
    ///
    /// let price = Money::from_cents(1099);
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from major and minor units.
    ///
    /// For negative amounts, only the major unit should be negative:
    /// `from_major_minor(-5, 50)` is -5.50.
    #[inline]
    pub const fn from_major_minor(major: i64, minor: i64) -> Self {
        if major < 0 {
            Money(major * 100 - minor)
        } else {
            Money(major * 100 + minor)
        }
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit portion.
    #[inline]
    pub const fn major(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit portion (always 0-99).
    #[inline]
    pub const fn minor(&self) -> i64 {
        (self.0 % 100).abs()
    }

    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Multiplies money by a quantity, `None` on overflow.
    ///
    /// ## Example
    /// ```rust
    /// use storefront_core::money::Money;
    ///
    /// let unit_price = Money::from_cents(299);
    /// assert_eq!(unit_price.checked_mul(3).unwrap().cents(), 897);
    /// assert!(Money::from_cents(i64::MAX).checked_mul(2).is_none());
    /// ```
    #[inline]
    pub const fn checked_mul(&self, qty: i64) -> Option<Self> {
        match self.0.checked_mul(qty) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// Adds two amounts, `None` on overflow.
    #[inline]
    pub const fn checked_add(&self, other: Money) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// Sums amounts, failing with `AmountOverflow` instead of wrapping.
    pub fn try_sum<I>(amounts: I) -> CoreResult<Money>
    where
        I: IntoIterator<Item = CoreResult<Money>>,
    {
        amounts.into_iter().try_fold(Money::zero(), |total, amount| {
            total.checked_add(amount?).ok_or(CoreError::AmountOverflow)
        })
    }

    /// Parses a form field into Money, naming the field in the error.
    pub fn parse_field(field: &str, raw: &str) -> Result<Money, ValidationError> {
        raw.parse::<Money>().map_err(|reason| ValidationError::InvalidFormat {
            field: field.to_string(),
            reason,
        })
    }
}

// =============================================================================
// Parsing
// =============================================================================

/// Parses decimal text with at most two fractional digits.
///
/// Accepted: `"10"`, `"10.5"`, `"10.50"`, `"-3.25"`, `" 7 "`.
/// Rejected: `""`, `"abc"`, `"1.234"`, `"1e3"`, `"."`.
impl FromStr for Money {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (negative, digits) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };

        let (major_str, minor_str) = match digits.split_once('.') {
            Some((major, minor)) => (major, minor),
            None => (digits, ""),
        };

        if major_str.is_empty() || !major_str.bytes().all(|b| b.is_ascii_digit()) {
            return Err(format!("'{s}' is not a decimal amount"));
        }
        if minor_str.len() > 2 || !minor_str.bytes().all(|b| b.is_ascii_digit()) {
            return Err(format!("'{s}' must have at most two decimal places"));
        }
        if digits.ends_with('.') {
            return Err(format!("'{s}' is not a decimal amount"));
        }

        let major: i64 = major_str
            .parse()
            .map_err(|_| format!("'{s}' is out of range"))?;
        let minor: i64 = match minor_str.len() {
            0 => 0,
            1 => minor_str.parse::<i64>().map_err(|e| e.to_string())? * 10,
            _ => minor_str.parse::<i64>().map_err(|e| e.to_string())?,
        };

        let cents = major
            .checked_mul(100)
            .and_then(|c| c.checked_add(minor))
            .ok_or_else(|| format!("'{s}' is out of range"))?;

        Ok(Money(if negative { -cents } else { cents }))
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Plain decimal rendering, e.g. `10.50`. Currency symbols are a frontend concern.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, self.major().abs(), self.minor())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

/// Multiplication by quantity. Totals built from stored prices go through
/// [`Money::checked_mul`].
impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
