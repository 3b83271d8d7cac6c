use axum::{
  http::{HeaderValue, header},
  response::{IntoResponse, Response},
};
use campus_api::ApiError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("unauthorized")]
  Unauthorized,
  #[error("account {username:?} has an invalid password hash")]
  InvalidHash { username: String },
  #[error("password hashing failed: {0}")]
  Hash(String),
  #[error(transparent)]
  Core(#[from] campus_core::Error),
}

impl IntoResponse for Error {
  fn into_response(self) -> Response {
    match self {
      Error::Unauthorized => {
        let mut res =
          ApiError(campus_core::Error::Unauthenticated).into_response();
        res.headers_mut().insert(
          header::WWW_AUTHENTICATE,
          HeaderValue::from_static("Basic realm=\"campus\""),
        );
        res
      }
      Error::Core(e) => ApiError(e).into_response(),
      other => {
        ApiError(campus_core::Error::Internal(other.to_string())).into_response()
      }
    }
  }
}
