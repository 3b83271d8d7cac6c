//! Exams and the marks recorded against them.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Result,
  validate::{ValidationErrors, require_text},
};

/// Highest mark an exam can award.
pub const MAX_MARKS: u32 = 100;

/// Letter grade derived from a mark out of [`MAX_MARKS`].
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
)]
pub enum Grade {
  #[serde(rename = "A+")]
  #[strum(serialize = "A+")]
  APlus,
  A,
  B,
  C,
  D,
  F,
}

impl Grade {
  pub fn from_marks(marks: u32) -> Self {
    match marks {
      90.. => Self::APlus,
      80..=89 => Self::A,
      70..=79 => Self::B,
      60..=69 => Self::C,
      50..=59 => Self::D,
      _ => Self::F,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamMark {
  pub student_id: Uuid,
  pub marks:      u32,
  pub grade:      Grade,
}

impl ExamMark {
  /// A mark with its grade derived. Fails when `marks` exceeds [`MAX_MARKS`].
  pub fn new(student_id: Uuid, marks: u32) -> Result<Self> {
    let mut errors = ValidationErrors::new();
    if marks > MAX_MARKS {
      errors.push("marks", format!("must be between 0 and {MAX_MARKS}"));
    }
    errors.into_result()?;
    Ok(Self {
      student_id,
      marks,
      grade: Grade::from_marks(marks),
    })
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exam {
  pub exam_id:    Uuid,
  pub subject:    String,
  pub exam_date:  NaiveDate,
  pub created_at: DateTime<Utc>,
  /// One entry per student, ordered by student id.
  pub marks:      Vec<ExamMark>,
}

/// Input to exam creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewExam {
  pub subject:   String,
  pub exam_date: NaiveDate,
}

impl NewExam {
  pub fn validate(&self) -> Result<()> {
    let mut errors = ValidationErrors::new();
    require_text(&mut errors, "subject", &self.subject);
    errors.into_result()
  }
}
