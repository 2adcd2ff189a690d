use axum::{
    extract::{FromRequestParts, Path},
    http::request::Parts,
};

use crate::errors::RequestError;

/// Numeric `:id` path segment. Anything that is not an id names no resource,
/// so it is rejected as not found with the usual JSON error body.
#[derive(Debug, Clone, Copy)]
pub struct ResourceId(pub i64);

#[axum::async_trait]
impl<S> FromRequestParts<S> for ResourceId
where
    S: Send + Sync,
{
    type Rejection = RequestError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(id) = Path::<i64>::from_request_parts(parts, state)
            .await
            .map_err(|_| RequestError::NotFound("Resource not found"))?;
        Ok(ResourceId(id))
    }
}
