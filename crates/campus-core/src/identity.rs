//! Callers, their coarse roles, and the self-declared profile.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::validate::{ValidationErrors, require_text};

// ─── Identity ────────────────────────────────────────────────────────────────

/// An opaque reference to an authenticated caller.
///
/// The inner text is the principal as established by the authentication
/// layer; nothing else in the system interprets it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
  pub fn new(principal: impl Into<String>) -> Self { Self(principal.into()) }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for Identity {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl std::str::FromStr for Identity {
  type Err = std::convert::Infallible;

  fn from_str(s: &str) -> Result<Self, Self::Err> { Ok(Self::new(s)) }
}

// ─── Role ────────────────────────────────────────────────────────────────────

/// Coarse capability tier bound to an [`Identity`].
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
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
  Admin,
  User,
  Guest,
}

// ─── UserType ────────────────────────────────────────────────────────────────

/// The finer, self-declared kind of user stored in a [`Profile`].
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
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum UserType {
  Admin,
  Teacher,
  Student,
  Guest,
}

// ─── Profile ─────────────────────────────────────────────────────────────────

/// The record a caller creates after first login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
  pub name:      String,
  pub user_type: UserType,
  /// The student or teacher record this caller owns, once registered.
  #[serde(default)]
  pub entity_id: Option<Uuid>,
}

impl Profile {
  pub fn new(name: impl Into<String>, user_type: UserType) -> Self {
    Self {
      name: name.into(),
      user_type,
      entity_id: None,
    }
  }

  pub fn validate(&self) -> crate::Result<()> {
    let mut errors = ValidationErrors::new();
    require_text(&mut errors, "name", &self.name);
    if self.entity_id.is_some()
      && !matches!(self.user_type, UserType::Student | UserType::Teacher)
    {
      errors.push("entity_id", "only student and teacher profiles link a record");
    }
    errors.into_result()
  }
}

#[cfg(test)]
mod tests {
  use std::str::FromStr;

  use super::*;

  #[test]
  fn role_and_user_type_parse_lowercase() {
    assert_eq!(Role::from_str("admin").unwrap(), Role::Admin);
    assert_eq!(UserType::from_str("teacher").unwrap(), UserType::Teacher);
    assert_eq!(UserType::Guest.to_string(), "guest");
    assert!(Role::from_str("root").is_err());
  }

  #[test]
  fn profile_requires_name() {
    let err = Profile::new("  ", UserType::Student).validate().unwrap_err();
    assert_eq!(err.kind(), crate::ErrorKind::Validation);
  }

  #[test]
  fn guest_profile_cannot_link_entity() {
    let mut profile = Profile::new("Gus", UserType::Guest);
    profile.entity_id = Some(Uuid::new_v4());
    assert!(profile.validate().is_err());
  }

  #[test]
  fn identity_serialises_as_plain_string() {
    let json = serde_json::to_string(&Identity::new("alice")).unwrap();
    assert_eq!(json, "\"alice\"");
  }
}
