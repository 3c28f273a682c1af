//! # Request Forms
//!
//! Request bodies and the extractors that read them. Every extractor here
//! rejects with [`ApiError`], so malformed input gets the same JSON error
//! body as everything else.
//!
//! ```text
//! JSON body ───► ApiJson<T>      list requests, cart, options, order status
//! urlencoded ──► ApiForm<T>      product form, checkout form
//! multipart ───► MultipartForm   sku and category forms (with images)
//! path/query ──► ApiPath<T> / ApiQuery<T>
//! ```

use std::collections::HashMap;

use axum::extract::{FromRequest, FromRequestParts, Multipart, Path, Query, Request};
use axum::http::request::Parts;
use axum::{Form, Json};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use storefront_core::filter::parse_id;
use storefront_core::{
    CategoryFields, CoreError, Money, OptionFields, OptionValueFields, OrderFields, ProductFields,
    SkuFields, SkuFilters, State, ValidationError,
};

use crate::error::ApiError;
use crate::uploads::UploadedFile;

// =============================================================================
// Extractors
// =============================================================================

pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(ApiJson(value))
    }
}

pub struct ApiForm<T>(pub T);

impl<S, T> FromRequest<S> for ApiForm<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Form(value) = Form::<T>::from_request(req, state).await?;
        Ok(ApiForm(value))
    }
}

pub struct ApiPath<T>(pub T);

impl<S, T> FromRequestParts<S> for ApiPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state).await?;
        Ok(ApiPath(value))
    }
}

pub struct ApiQuery<T>(pub T);

impl<S, T> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state).await?;
        Ok(ApiQuery(value))
    }
}

// =============================================================================
// Field Helpers
// =============================================================================

/// Optional `state` field; absent means enabled.
fn parse_state(raw: Option<&str>) -> Result<State, CoreError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(State::Enabled),
        Some(raw) => raw.parse(),
    }
}

fn field_matches(field: &str, name: &str) -> bool {
    field == name || field.strip_suffix("[]") == Some(name)
}

fn parse_int(field: &str, raw: &str) -> Result<i64, ValidationError> {
    raw.trim().parse().map_err(|_| ValidationError::InvalidFormat {
        field: field.to_string(),
        reason: format!("'{raw}' is not a whole number"),
    })
}

// =============================================================================
// Listing
// =============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Body of `POST /product`.
#[derive(Debug, Default, Deserialize)]
pub struct ListSkusRequest {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    #[serde(default)]
    pub filter: HashMap<String, serde_json::Value>,
}

impl ListSkusRequest {
    /// Filter values may be sent as strings or numbers; `null` counts as
    /// absent.
    pub fn filters(&self) -> Result<SkuFilters, ApiError> {
        let mut raw = HashMap::with_capacity(self.filter.len());
        for (key, value) in &self.filter {
            let text = match value {
                serde_json::Value::String(s) => s.clone(),
                serde_json::Value::Number(n) => n.to_string(),
                serde_json::Value::Null => continue,
                other => {
                    return Err(CoreError::TypeNotMatched {
                        field: key.clone(),
                        value: other.to_string(),
                    }
                    .into())
                }
            };
            raw.insert(key.clone(), text);
        }
        Ok(SkuFilters::parse(&raw)?)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminProductsQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub category_id: i64,
}

// =============================================================================
// Product
// =============================================================================

/// Urlencoded product form.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductForm {
    pub product_name: String,
    #[serde(default)]
    pub description: String,
    pub category_id: i64,
    pub brand_id: Option<i64>,
    pub region_id: Option<i64>,
    pub state: Option<String>,
    pub version: Option<i64>,
}

impl ProductForm {
    pub fn fields(&self) -> Result<ProductFields, ApiError> {
        Ok(ProductFields {
            product_name: self.product_name.trim().to_string(),
            description: self.description.clone(),
            category_id: self.category_id,
            brand_id: self.brand_id,
            region_id: self.region_id,
            state: parse_state(self.state.as_deref())?,
        })
    }
}

// =============================================================================
// Multipart
// =============================================================================

/// A fully-read multipart body: text fields plus file parts.
#[derive(Debug, Default)]
pub struct MultipartForm {
    fields: HashMap<String, String>,
    files: Vec<UploadedFile>,
}

impl<S> FromRequest<S> for MultipartForm
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let multipart = Multipart::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
        MultipartForm::read(multipart).await
    }
}

impl MultipartForm {
    pub async fn read(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut form = MultipartForm::default();

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or("").to_string();
            match field.file_name().map(str::to_string) {
                Some(file_name) => {
                    let bytes = field.bytes().await?;
                    if bytes.is_empty() {
                        // Browsers send an empty part for an untouched file input.
                        continue;
                    }
                    form.files.push(UploadedFile {
                        field: name,
                        file_name: Some(file_name),
                        bytes: bytes.to_vec(),
                    });
                }
                None => {
                    let text = field.text().await?;
                    form.fields.insert(name, text);
                }
            }
        }

        Ok(form)
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn required(&self, name: &str) -> Result<&str, ValidationError> {
        match self.text(name).map(str::trim) {
            Some(value) if !value.is_empty() => Ok(value),
            _ => Err(ValidationError::Required {
                field: name.to_string(),
            }),
        }
    }

    /// An optional integer field; blank counts as absent.
    pub fn optional_int(&self, name: &str) -> Result<Option<i64>, ValidationError> {
        match self.text(name).map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => parse_int(name, raw).map(Some),
        }
    }

    pub fn state(&self) -> Result<State, CoreError> {
        parse_state(self.text("state"))
    }

    pub fn version(&self) -> Result<Option<i64>, ValidationError> {
        self.optional_int("version")
    }

    /// File parts sent as `name` or `name[]`.
    pub fn files<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a UploadedFile> + 'a {
        self.files.iter().filter(move |f| field_matches(&f.field, name))
    }

    pub fn file(&self, name: &str) -> Option<&UploadedFile> {
        self.files.iter().find(|f| field_matches(&f.field, name))
    }

    /// Sku fields. Image names are left empty; the handler fills them from
    /// the stored uploads.
    pub fn sku_fields(&self) -> Result<SkuFields, ApiError> {
        let price = Money::parse_field("price", self.required("price")?)?;
        let quantity = parse_int("quantity", self.required("quantity")?)?;

        Ok(SkuFields {
            sku: self.required("sku")?.to_string(),
            price_cents: price.cents(),
            quantity,
            large_name: String::new(),
            small_name: String::new(),
            thumb_name: String::new(),
            state: self.state()?,
        })
    }

    /// Category fields without icon/image (filled from uploads).
    pub fn category_fields(&self) -> Result<CategoryFields, ApiError> {
        let parent = match self.text("parentId").map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(parse_id("parentId", raw)?),
        };

        Ok(CategoryFields {
            name: self.required("name")?.to_string(),
            parent,
            icon: String::new(),
            image: String::new(),
            state: self.state()?,
        })
    }
}

// =============================================================================
// Options
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionRequest {
    pub category_id: i64,
    pub name: String,
    pub state: Option<String>,
    pub version: Option<i64>,
}

impl OptionRequest {
    pub fn fields(&self) -> Result<OptionFields, ApiError> {
        Ok(OptionFields {
            category_id: self.category_id,
            name: self.name.trim().to_string(),
            state: parse_state(self.state.as_deref())?,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct OptionValueRequest {
    pub name: String,
    /// Sku codes to attach the new value to.
    #[serde(default)]
    pub skus: Vec<String>,
    pub state: Option<String>,
    pub version: Option<i64>,
}

impl OptionValueRequest {
    pub fn fields(&self) -> Result<OptionValueFields, ApiError> {
        Ok(OptionValueFields {
            name: self.name.trim().to_string(),
            state: parse_state(self.state.as_deref())?,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkuOptionQuery {
    pub option_id: i64,
    pub option_value_id: i64,
}

// =============================================================================
// Cart & Orders
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct AddToCartRequest {
    pub sku: String,
    #[serde(default = "one")]
    pub quantity: i64,
}

fn one() -> i64 {
    1
}

#[derive(Debug, Deserialize)]
pub struct SetQuantityRequest {
    pub quantity: i64,
    pub version: Option<i64>,
}

/// Urlencoded checkout form.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CheckoutForm {
    pub phone: String,
    pub address: String,
    pub comment: String,
    pub notes: String,
}

impl From<CheckoutForm> for OrderFields {
    fn from(form: CheckoutForm) -> Self {
        OrderFields {
            phone: form.phone,
            address: form.address,
            comment: form.comment,
            notes: form.notes,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct OrderStatusRequest {
    pub status: String,
    pub version: Option<i64>,
}
