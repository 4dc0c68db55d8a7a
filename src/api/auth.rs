//! Caller identification for the REST API
//!
//! Authentication happens in front of this service. Each request states who
//! it is acting for:
//! - `X-Api-Key` matching `ApiConfig::admin_key` marks the admin
//! - otherwise `X-User-Id: <int>` names a regular user
//! - a request with neither gets 401 Unauthorized
//!
//! Handlers take a [`Caller`] argument to require an identity.

use crate::api::AppState;
use crate::error::Error;
use crate::types::{Caller, UserId};
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{HeaderMap, request::Parts},
};

/// Header carrying the admin key
pub const API_KEY_HEADER: &str = "x-api-key";
/// Header carrying the acting user's ID
pub const USER_ID_HEADER: &str = "x-user-id";

#[async_trait]
impl FromRequestParts<AppState> for Caller {
    type Rejection = Error;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        identify(&parts.headers, state.config.api.admin_key.as_deref())
    }
}

/// Resolve the caller from request headers
///
/// The admin identity carries the `X-User-Id` value when one is sent, and
/// user ID 0 otherwise.
pub fn identify(headers: &HeaderMap, admin_key: Option<&str>) -> Result<Caller, Error> {
    let user_id = match headers.get(USER_ID_HEADER) {
        Some(value) => Some(
            value
                .to_str()
                .ok()
                .and_then(|v| v.trim().parse::<i64>().ok())
                .map(UserId)
                .ok_or_else(|| Error::Unauthorized("Invalid X-User-Id header".into()))?,
        ),
        None => None,
    };

    let provided_key = headers
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok());

    if let (Some(expected), Some(provided)) = (admin_key, provided_key)
        && constant_time_eq(provided.as_bytes(), expected.as_bytes())
    {
        return Ok(Caller::admin(user_id.unwrap_or(UserId(0))));
    }

    match user_id {
        Some(user_id) => Ok(Caller::user(user_id)),
        None if provided_key.is_some() => Err(Error::Unauthorized("Invalid API key".into())),
        None => Err(Error::Unauthorized(
            "Missing X-Api-Key or X-User-Id header".into(),
        )),
    }
}

/// Constant-time byte comparison to prevent timing side-channel attacks.
/// Always compares all bytes regardless of where the first mismatch occurs.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut result: u8 = 0;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}
