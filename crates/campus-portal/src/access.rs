//! What the current caller may see, as resolved from profile and role reads.

use campus_core::{
  ErrorKind,
  identity::{Profile, Role, UserType},
};
use uuid::Uuid;

/// Whether the caller has completed profile setup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileState {
  /// Signed in but never saved a profile; distinct from a `guest` profile.
  Unset,
  Set(Profile),
}

/// A snapshot of the caller's capabilities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Access {
  pub role:     Role,
  pub profile:  ProfileState,
  pub approved: bool,
}

impl Access {
  pub fn is_admin(&self) -> bool { self.role == Role::Admin }

  pub fn user_type(&self) -> Option<UserType> {
    match &self.profile {
      ProfileState::Set(p) => Some(p.user_type),
      ProfileState::Unset => None,
    }
  }

  /// The student or teacher record the caller's profile points at.
  pub fn linked_entity(&self) -> Option<Uuid> {
    match &self.profile {
      ProfileState::Set(p) => p.entity_id,
      ProfileState::Unset => None,
    }
  }
}

/// A value that may still be in flight or may have failed to load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Loadable<T> {
  Loading,
  Ready(T),
  Failed { kind: ErrorKind, message: String },
}

impl<T> Loadable<T> {
  pub fn from_result(result: campus_core::Result<T>) -> Self {
    match result {
      Ok(v) => Self::Ready(v),
      Err(e) => Self::Failed {
        kind:    e.kind(),
        message: e.to_string(),
      },
    }
  }
}
