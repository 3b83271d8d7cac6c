//! Error types for `campus-core`.
//!
//! Every failure that crosses a backend boundary carries an [`ErrorKind`], so
//! callers (and tests) branch on the kind rather than on message text.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{approval::ApprovalStatus, validate::ValidationErrors};

/// Coarse classification of an [`Error`].
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
  /// No authenticated caller.
  Unauthenticated,
  /// The caller is known but lacks the capability.
  Forbidden,
  /// The referenced record does not exist.
  NotFound,
  /// Input failed field validation.
  Validation,
  /// The request conflicts with current state (e.g. a terminal approval).
  Conflict,
  /// The backend could not be reached or is not answering.
  Unavailable,
  /// An identical mutation is already in flight.
  Busy,
  /// Anything else; not retryable by the user.
  Internal,
}

#[derive(Debug, Error)]
pub enum Error {
  #[error("not authenticated")]
  Unauthenticated,

  #[error("forbidden: {0}")]
  Forbidden(String),

  #[error("not found: {0}")]
  NotFound(String),

  #[error("invalid input: {0}")]
  Validation(ValidationErrors),

  #[error("approval cannot move from {from} to {to}")]
  InvalidTransition {
    from: ApprovalStatus,
    to:   ApprovalStatus,
  },

  #[error("conflict: {0}")]
  Conflict(String),

  #[error("backend unavailable: {0}")]
  Unavailable(String),

  #[error("{0} is already in progress")]
  Busy(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),

  #[error("{0}")]
  Internal(String),
}

impl Error {
  pub fn kind(&self) -> ErrorKind {
    match self {
      Self::Unauthenticated => ErrorKind::Unauthenticated,
      Self::Forbidden(_) => ErrorKind::Forbidden,
      Self::NotFound(_) => ErrorKind::NotFound,
      Self::Validation(_) => ErrorKind::Validation,
      Self::InvalidTransition { .. } | Self::Conflict(_) => ErrorKind::Conflict,
      Self::Unavailable(_) => ErrorKind::Unavailable,
      Self::Busy(_) => ErrorKind::Busy,
      Self::Store(_) | Self::Serialization(_) | Self::Internal(_) => {
        ErrorKind::Internal
      }
    }
  }

  /// Wrap a backend storage error.
  pub fn store(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Store(Box::new(e))
  }

  /// Rebuild an error from its wire representation.
  pub fn from_parts(
    kind: ErrorKind,
    message: String,
    fields: ValidationErrors,
  ) -> Self {
    match kind {
      ErrorKind::Unauthenticated => Self::Unauthenticated,
      ErrorKind::Forbidden => Self::Forbidden(message),
      ErrorKind::NotFound => Self::NotFound(message),
      ErrorKind::Validation => {
        let mut fields = fields;
        if fields.is_empty() {
          fields.push("request", message);
        }
        Self::Validation(fields)
      }
      ErrorKind::Conflict => Self::Conflict(message),
      ErrorKind::Unavailable => Self::Unavailable(message),
      ErrorKind::Busy => Self::Busy(message),
      ErrorKind::Internal => Self::Internal(message),
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
