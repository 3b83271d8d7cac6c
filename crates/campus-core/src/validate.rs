//! Field validation shared by the client forms and the registry.
//!
//! Validation runs twice: in the portal before anything is sent, and again in
//! the [`Registry`](crate::registry::Registry) so that a client skipping the
//! first pass cannot store malformed records.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// A single field-level problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
  pub field:   String,
  pub message: String,
}

/// All problems found in one input, in field order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationErrors(pub Vec<FieldError>);

impl ValidationErrors {
  pub fn new() -> Self { Self::default() }

  pub fn push(&mut self, field: &str, message: impl Into<String>) {
    self.0.push(FieldError {
      field:   field.to_owned(),
      message: message.into(),
    });
  }

  pub fn is_empty(&self) -> bool { self.0.is_empty() }

  /// The message recorded for `field`, if any.
  pub fn get(&self, field: &str) -> Option<&str> {
    self
      .0
      .iter()
      .find(|e| e.field == field)
      .map(|e| e.message.as_str())
  }

  /// `Ok(())` when nothing was recorded, otherwise [`Error::Validation`].
  pub fn into_result(self) -> Result<()> {
    if self.is_empty() {
      Ok(())
    } else {
      Err(Error::Validation(self))
    }
  }
}

impl fmt::Display for ValidationErrors {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let parts: Vec<String> = self
      .0
      .iter()
      .map(|e| format!("{}: {}", e.field, e.message))
      .collect();
    f.write_str(&parts.join("; "))
  }
}

const MAX_TEXT_LEN: usize = 200;

/// Record an error unless `value` has non-whitespace content of sane length.
pub fn require_text(errors: &mut ValidationErrors, field: &str, value: &str) {
  let trimmed = value.trim();
  if trimmed.is_empty() {
    errors.push(field, "is required");
  } else if trimmed.chars().count() > MAX_TEXT_LEN {
    errors.push(field, format!("must be at most {MAX_TEXT_LEN} characters"));
  }
}

/// Phone numbers: 7–15 digits, optionally separated by spaces, `-`, `(`, `)`
/// and a single leading `+`.
pub fn require_contact_number(
  errors: &mut ValidationErrors,
  field: &str,
  value: &str,
) {
  let trimmed = value.trim();
  if trimmed.is_empty() {
    errors.push(field, "is required");
    return;
  }

  let body = trimmed.strip_prefix('+').unwrap_or(trimmed);
  let allowed = body
    .chars()
    .all(|c| c.is_ascii_digit() || matches!(c, ' ' | '-' | '(' | ')'));
  let digits = body.chars().filter(char::is_ascii_digit).count();

  if !allowed {
    errors.push(field, "may only contain digits, spaces, '+', '-' and parentheses");
  } else if !(7..=15).contains(&digits) {
    errors.push(field, "must contain between 7 and 15 digits");
  }
}

/// Record an error when `values` has no non-blank entry, or any blank entry.
pub fn require_list(errors: &mut ValidationErrors, field: &str, values: &[String]) {
  if values.iter().all(|v| v.trim().is_empty()) {
    errors.push(field, "needs at least one entry");
  } else if values.iter().any(|v| v.trim().is_empty()) {
    errors.push(field, "entries must not be blank");
  }
}
