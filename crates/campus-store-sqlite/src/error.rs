//! Error type for `campus-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  /// A column held text that does not decode to its domain type.
  #[error("cannot decode {what}: {value:?}")]
  Decode { what: &'static str, value: String },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
