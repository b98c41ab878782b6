//! Identity extraction from edge-provided headers.
//!
//! Same contract as the orders API: the upstream edge forwards the
//! authenticated account as `x-account-id` and `x-role` headers.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use common::{AccountId, Identity, Role};

use crate::error::ApiError;

pub const ACCOUNT_HEADER: &str = "x-account-id";
pub const ROLE_HEADER: &str = "x-role";

/// Extractor for the authenticated caller.
#[derive(Debug, Clone, Copy)]
pub struct Authenticated(pub Identity);

impl<S> FromRequestParts<S> for Authenticated
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let account_id = parts
            .headers
            .get(ACCOUNT_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<i64>().ok())
            .map(AccountId::new)
            .ok_or_else(|| {
                ApiError::Unauthorized(format!("missing or invalid {ACCOUNT_HEADER} header"))
            })?;

        let role = parts
            .headers
            .get(ROLE_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(Role::parse)
            .ok_or_else(|| {
                ApiError::Unauthorized(format!("missing or invalid {ROLE_HEADER} header"))
            })?;

        Ok(Authenticated(Identity::new(account_id, role)))
    }
}

impl Authenticated {
    /// Rejects non-admin callers with 403.
    pub fn require_admin(&self) -> Result<&Identity, ApiError> {
        if self.0.is_admin() {
            Ok(&self.0)
        } else {
            Err(ApiError::Forbidden("admin role required".to_string()))
        }
    }
}
