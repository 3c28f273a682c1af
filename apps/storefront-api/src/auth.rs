//! JWT authentication module.
//!
//! Tokens are issued elsewhere (the account service) and validated here;
//! [`JwtManager::issue_token`] exists for tooling and tests.
//!
//! ## Extractors
//! ```text
//! ┌──────────────┬──────────────────────────┬──────────────────────────────┐
//! │ Extractor    │ No token                 │ Token present                │
//! ├──────────────┼──────────────────────────┼──────────────────────────────┤
//! │ MaybeUser    │ Ok(None) → customer view │ valid → Some(user), else 401 │
//! │ CurrentUser  │ 401                      │ valid → user, else 401       │
//! │ AdminUser    │ 401                      │ admin → user, customer → 403 │
//! └──────────────┴──────────────────────────┴──────────────────────────────┘
//! ```

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, TokenData, Validation};
use serde::{Deserialize, Serialize};
use storefront_core::{Role, User};
use storefront_db::Visibility;
use uuid::Uuid;

use crate::error::ApiError;
use crate::AppState;

/// JWT claims structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user id)
    pub sub: String,

    pub username: String,

    /// `admin` or `customer`
    pub role: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration (Unix timestamp)
    pub exp: i64,

    /// JWT ID (unique identifier for this token)
    pub jti: String,
}

/// JWT token manager.
pub struct JwtManager {
    encoding: EncodingKey,
    decoding: DecodingKey,
    lifetime_secs: i64,
}

impl JwtManager {
    pub fn new(secret: &str, lifetime_secs: i64) -> Self {
        JwtManager {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            lifetime_secs,
        }
    }

    /// Signs a token for `user`.
    pub fn issue_token(&self, user: &User) -> Result<String, ApiError> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.lifetime_secs);

        let claims = Claims {
            sub: user.id.clone(),
            username: user.username.clone(),
            role: role_name(user.role).to_string(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| ApiError::Internal(format!("Failed to generate token: {}", e)))
    }

    /// Validates signature and expiry and resolves the caller.
    pub fn validate_token(&self, token: &str) -> Result<User, ApiError> {
        let token_data: TokenData<Claims> = decode(token, &self.decoding, &Validation::default())
            .map_err(|e| ApiError::InvalidToken(e.to_string()))?;
        let claims = token_data.claims;

        let role: Role = claims
            .role
            .parse()
            .map_err(|_| ApiError::InvalidToken(format!("unknown role {}", claims.role)))?;

        Ok(User {
            id: claims.sub,
            username: claims.username,
            role,
        })
    }
}

fn role_name(role: Role) -> &'static str {
    match role {
        Role::Admin => "admin",
        Role::Customer => "customer",
    }
}

/// Extract bearer token from authorization header.
pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

fn caller(parts: &Parts, state: &AppState) -> Result<Option<User>, ApiError> {
    let Some(header) = parts.headers.get(AUTHORIZATION) else {
        return Ok(None);
    };
    let header = header
        .to_str()
        .map_err(|_| ApiError::InvalidToken("authorization header is not ASCII".to_string()))?;
    let token = extract_bearer_token(header)
        .ok_or_else(|| ApiError::InvalidToken("expected a bearer token".to_string()))?;

    state.jwt.validate_token(token).map(Some)
}

// =============================================================================
// Extractors
// =============================================================================

/// Optional caller. Anonymous requests get the customer view.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<User>);

impl MaybeUser {
    pub fn visibility(&self) -> Visibility {
        self.0
            .as_ref()
            .map(|u| Visibility::for_role(u.role))
            .unwrap_or(Visibility::EnabledOnly)
    }
}

impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        caller(parts, state).map(MaybeUser)
    }
}

/// Any authenticated caller.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        caller(parts, state)?.map(CurrentUser).ok_or(ApiError::Unauthenticated)
    }
}

/// An authenticated caller with the admin role.
#[derive(Debug, Clone)]
pub struct AdminUser(pub User);

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let user = caller(parts, state)?.ok_or(ApiError::Unauthenticated)?;
        if !user.role.is_admin() {
            return Err(ApiError::Forbidden);
        }
        Ok(AdminUser(user))
    }
}
