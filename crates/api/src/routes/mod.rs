//! Route handlers, grouped by resource.

pub mod admin;
pub mod events;
pub mod invoices;
pub mod observability;
pub mod reservations;

use uuid::Uuid;

use crate::error::ApiError;

/// Parses a path segment into a typed id.
pub(crate) fn parse_id<T: From<Uuid>>(kind: &str, raw: &str) -> Result<T, ApiError> {
    Uuid::parse_str(raw)
        .map(T::from)
        .map_err(|e| ApiError::BadRequest(format!("Invalid {kind} id: {e}")))
}
