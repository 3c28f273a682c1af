//! # Read Visibility
//!
//! The one place where the admin bypass is decided.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  caller role ──► Visibility::for_role ──► every read query              │
//! │                                                                         │
//! │  Admin     ──► All          (no state predicate; sees deleted rows)    │
//! │  Customer  ──► EnabledOnly  (AND <alias>.state = 'enabled')            │
//! │  anonymous ──► EnabledOnly                                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use sqlx::{Postgres, QueryBuilder};
use storefront_core::{Role, State};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// Only `state = 'enabled'` rows.
    EnabledOnly,
    /// Every row, tombstones included.
    All,
}

impl Visibility {
    pub fn for_role(role: Role) -> Self {
        if role.is_admin() {
            Visibility::All
        } else {
            Visibility::EnabledOnly
        }
    }

    /// Appends the state predicate for `alias` to a query already inside a
    /// `WHERE` clause.
    pub fn restrict(&self, query: &mut QueryBuilder<'_, Postgres>, alias: &str) {
        if let Visibility::EnabledOnly = self {
            query.push(format!(" AND {alias}.state = 'enabled'"));
        }
    }

    /// Same predicate applied to an already-fetched row.
    pub fn allows(&self, state: State) -> bool {
        match self {
            Visibility::All => true,
            Visibility::EnabledOnly => state == State::Enabled,
        }
    }
}
