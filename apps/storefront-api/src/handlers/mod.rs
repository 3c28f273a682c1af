//! Route handlers.
//!
//! Handlers stay thin: extract, call a repository (or a transaction over
//! several), wrap the result in `Json`. Errors bubble up as [`ApiError`].
//!
//! | Response | Shape |
//! |----------|-------|
//! | read | the record / `Page<T>` as JSON |
//! | create | new id (or sku code) as a bare JSON value |
//! | update | `{"version": n}` |
//! | delete, attach, detach | `"success"` |
//!
//! [`ApiError`]: crate::error::ApiError

pub mod cart;
pub mod category;
pub mod health;
pub mod option;
pub mod order;
pub mod product;

use axum::Json;
use serde::Serialize;

/// Acknowledgement body for mutations without a payload.
pub const SUCCESS: &str = "success";

pub fn success() -> Json<&'static str> {
    Json(SUCCESS)
}

/// Body of every update endpoint.
#[derive(Debug, Serialize)]
pub struct VersionResponse {
    pub version: i64,
}

pub fn version(version: i64) -> Json<VersionResponse> {
    Json(VersionResponse { version })
}
