//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use campus_core::{Error, ErrorKind, validate::ValidationErrors};
use serde::Serialize;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct ApiError(#[from] pub Error);

/// The JSON body of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
  pub error:  String,
  pub kind:   ErrorKind,
  pub fields: ValidationErrors,
}

/// HTTP status carried by each error kind.
pub fn status_for(kind: ErrorKind) -> StatusCode {
  match kind {
    ErrorKind::Unauthenticated => StatusCode::UNAUTHORIZED,
    ErrorKind::Forbidden => StatusCode::FORBIDDEN,
    ErrorKind::NotFound => StatusCode::NOT_FOUND,
    ErrorKind::Validation => StatusCode::UNPROCESSABLE_ENTITY,
    ErrorKind::Conflict => StatusCode::CONFLICT,
    ErrorKind::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
    ErrorKind::Busy => StatusCode::TOO_MANY_REQUESTS,
    ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let kind = self.0.kind();
    if kind == ErrorKind::Internal {
      tracing::error!(error = %self.0, "request failed");
    }

    let body = ErrorBody {
      // Internal details stay in the log.
      error: match kind {
        ErrorKind::Internal => "internal error".to_owned(),
        _ => self.0.to_string(),
      },
      kind,
      fields: match self.0 {
        Error::Validation(fields) => fields,
        _ => ValidationErrors::new(),
      },
    };
    (status_for(kind), Json(body)).into_response()
  }
}
