//! The [`Caller`] extractor.
//!
//! Authentication happens outside this crate; whatever middleware verifies
//! credentials inserts the resulting [`Identity`] into the request
//! extensions. Handlers that take a `Caller` reject the request with 401
//! when none is present.

use axum::{extract::FromRequestParts, http::request::Parts};
use campus_core::{Error, Identity};

use crate::error::ApiError;

/// The authenticated identity making the request.
#[derive(Debug, Clone)]
pub struct Caller(pub Identity);

impl<S: Send + Sync> FromRequestParts<S> for Caller {
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    _state: &S,
  ) -> Result<Self, Self::Rejection> {
    parts
      .extensions
      .get::<Identity>()
      .cloned()
      .map(Caller)
      .ok_or(ApiError(Error::Unauthenticated))
  }
}
