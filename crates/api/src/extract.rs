//! Requester identity taken from request headers.
//!
//! Authentication happens upstream. The gateway forwards the caller's id in
//! `X-User-Id` and marks staff with `X-User-Role: staff`.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use common::UserId;

use crate::error::ApiError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

/// The authenticated user making the request.
#[derive(Debug, Clone, Copy)]
pub struct Requester(pub UserId);

impl<S: Send + Sync> FromRequestParts<S> for Requester {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(USER_ID_HEADER)
            .ok_or_else(|| ApiError::Unauthorized("missing X-User-Id header".to_string()))?;
        let raw = raw
            .to_str()
            .map_err(|_| ApiError::Unauthorized("malformed X-User-Id header".to_string()))?;
        let user_id = UserId::parse_str(raw.trim())
            .map_err(|e| ApiError::Unauthorized(format!("invalid X-User-Id: {e}")))?;
        Ok(Requester(user_id))
    }
}

/// A request made by staff.
#[derive(Debug, Clone, Copy)]
pub struct Staff;

impl<S: Send + Sync> FromRequestParts<S> for Staff {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let is_staff = parts
            .headers
            .get(USER_ROLE_HEADER)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|role| role.trim().eq_ignore_ascii_case("staff"));
        if is_staff {
            Ok(Staff)
        } else {
            Err(ApiError::Forbidden("staff role required".to_string()))
        }
    }
}
