pub mod health;
pub mod inbound;
pub mod outbound;

use axum::http::HeaderMap;
use uuid::Uuid;

use crate::errors::ServiceError;

/// Header carrying the authenticated requester's identity. Session handling
/// happens at the outer gateway; the id arriving here is already validated.
pub const REQUESTER_ID_HEADER: &str = "x-requester-id";

pub(crate) fn requester_id(headers: &HeaderMap) -> Result<Uuid, ServiceError> {
    let raw = headers
        .get(REQUESTER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            ServiceError::ValidationError(format!("missing {} header", REQUESTER_ID_HEADER))
        })?;
    raw.parse().map_err(|_| {
        ServiceError::ValidationError(format!("{} must be a valid uuid", REQUESTER_ID_HEADER))
    })
}
