//! Students, teachers, and the registration inputs that create them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Identity, Result,
  approval::ApprovalStatus,
  validate::{ValidationErrors, require_contact_number, require_list, require_text},
};

/// Which kind of roster record a caller owns.
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
pub enum EntityKind {
  Student,
  Teacher,
}

// ─── Student ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
  pub student_id:       Uuid,
  pub full_name:        String,
  pub guardian_name:    String,
  pub contact_number:   String,
  pub class_assignment: String,
  pub registered_at:    DateTime<Utc>,
  /// Projected from the owner's approval record; never written directly.
  pub status:           ApprovalStatus,
  pub owner:            Identity,
}

/// Input to student self-registration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentRegistration {
  pub full_name:        String,
  pub guardian_name:    String,
  pub contact_number:   String,
  pub class_assignment: String,
}

impl StudentRegistration {
  pub fn validate(&self) -> Result<()> {
    let mut errors = ValidationErrors::new();
    require_text(&mut errors, "full_name", &self.full_name);
    require_text(&mut errors, "guardian_name", &self.guardian_name);
    require_contact_number(&mut errors, "contact_number", &self.contact_number);
    require_text(&mut errors, "class_assignment", &self.class_assignment);
    errors.into_result()
  }

  /// A copy with surrounding whitespace removed from every field.
  pub fn normalized(&self) -> Self {
    Self {
      full_name:        self.full_name.trim().to_owned(),
      guardian_name:    self.guardian_name.trim().to_owned(),
      contact_number:   self.contact_number.trim().to_owned(),
      class_assignment: self.class_assignment.trim().to_owned(),
    }
  }
}

// ─── Teacher ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Teacher {
  pub teacher_id:     Uuid,
  pub full_name:      String,
  pub contact_number: String,
  pub subjects:       Vec<String>,
  pub classes:        Vec<String>,
  pub registered_at:  DateTime<Utc>,
  /// Projected from the owner's approval record; never written directly.
  pub status:         ApprovalStatus,
  pub owner:          Identity,
}

/// Input to teacher self-registration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeacherRegistration {
  pub full_name:      String,
  pub contact_number: String,
  pub subjects:       Vec<String>,
  #[serde(default)]
  pub classes:        Vec<String>,
}

impl TeacherRegistration {
  pub fn validate(&self) -> Result<()> {
    let mut errors = ValidationErrors::new();
    require_text(&mut errors, "full_name", &self.full_name);
    require_contact_number(&mut errors, "contact_number", &self.contact_number);
    require_list(&mut errors, "subjects", &self.subjects);
    if self.classes.iter().any(|c| c.trim().is_empty()) {
      errors.push("classes", "entries must not be blank");
    }
    errors.into_result()
  }

  pub fn normalized(&self) -> Self {
    let trim_all =
      |v: &[String]| v.iter().map(|s| s.trim().to_owned()).collect::<Vec<_>>();
    Self {
      full_name:      self.full_name.trim().to_owned(),
      contact_number: self.contact_number.trim().to_owned(),
      subjects:       trim_all(&self.subjects),
      classes:        trim_all(&self.classes),
    }
  }
}
