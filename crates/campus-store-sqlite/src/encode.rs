//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings, calendar dates as `YYYY-MM-DD`.
//! Enumerations use their lowercase text form. String lists are compact JSON.
//! UUIDs are stored as hyphenated lowercase strings.

use std::str::FromStr;

use campus_core::{
  Identity,
  approval::{ApprovalRecord, ApprovalStatus},
  exam::{Exam, ExamMark, Grade},
  identity::{Profile, Role, UserType},
  roster::{Student, Teacher},
};
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|_| Error::Decode {
      what:  "timestamp",
      value: s.to_owned(),
    })
}

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| Error::Decode {
    what:  "date",
    value: s.to_owned(),
  })
}

/// Decode any of the text-backed enums (`ApprovalStatus`, `Role`, ...).
pub fn decode_enum<T: FromStr>(what: &'static str, s: &str) -> Result<T> {
  s.parse().map_err(|_| Error::Decode {
    what,
    value: s.to_owned(),
  })
}

pub fn encode_list(items: &[String]) -> Result<String> {
  Ok(serde_json::to_string(items)?)
}

pub fn decode_list(s: &str) -> Result<Vec<String>> { Ok(serde_json::from_str(s)?) }

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `profiles` row.
pub struct RawProfile {
  pub name:      String,
  pub user_type: String,
  pub entity_id: Option<String>,
}

impl RawProfile {
  pub fn into_profile(self) -> Result<Profile> {
    Ok(Profile {
      name:      self.name,
      user_type: decode_enum::<UserType>("user type", &self.user_type)?,
      entity_id: self.entity_id.as_deref().map(decode_uuid).transpose()?,
    })
  }
}

pub fn decode_role(s: &str) -> Result<Role> { decode_enum("role", s) }

/// Raw strings read directly from an `approvals` row.
pub struct RawApproval {
  pub subject:      String,
  pub status:       String,
  pub requested_at: String,
  pub decided_at:   Option<String>,
  pub decided_by:   Option<String>,
}

impl RawApproval {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      subject:      row.get(0)?,
      status:       row.get(1)?,
      requested_at: row.get(2)?,
      decided_at:   row.get(3)?,
      decided_by:   row.get(4)?,
    })
  }

  pub fn into_record(self) -> Result<ApprovalRecord> {
    Ok(ApprovalRecord {
      subject:      Identity::new(self.subject),
      status:       decode_enum::<ApprovalStatus>("approval status", &self.status)?,
      requested_at: decode_dt(&self.requested_at)?,
      decided_at:   self.decided_at.as_deref().map(decode_dt).transpose()?,
      decided_by:   self.decided_by.map(Identity::new),
    })
  }
}

/// Raw strings read from a `students` row joined with the owner's approval.
pub struct RawStudent {
  pub student_id:       String,
  pub full_name:        String,
  pub guardian_name:    String,
  pub contact_number:   String,
  pub class_assignment: String,
  pub registered_at:    String,
  pub status:           String,
  pub owner:            String,
}

impl RawStudent {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      student_id:       row.get(0)?,
      full_name:        row.get(1)?,
      guardian_name:    row.get(2)?,
      contact_number:   row.get(3)?,
      class_assignment: row.get(4)?,
      registered_at:    row.get(5)?,
      status:           row.get(6)?,
      owner:            row.get(7)?,
    })
  }

  pub fn into_student(self) -> Result<Student> {
    Ok(Student {
      student_id:       decode_uuid(&self.student_id)?,
      full_name:        self.full_name,
      guardian_name:    self.guardian_name,
      contact_number:   self.contact_number,
      class_assignment: self.class_assignment,
      registered_at:    decode_dt(&self.registered_at)?,
      status:           decode_enum("approval status", &self.status)?,
      owner:            Identity::new(self.owner),
    })
  }
}

/// Raw strings read from a `teachers` row joined with the owner's approval.
pub struct RawTeacher {
  pub teacher_id:     String,
  pub full_name:      String,
  pub contact_number: String,
  pub subjects:       String,
  pub classes:        String,
  pub registered_at:  String,
  pub status:         String,
  pub owner:          String,
}

impl RawTeacher {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      teacher_id:     row.get(0)?,
      full_name:      row.get(1)?,
      contact_number: row.get(2)?,
      subjects:       row.get(3)?,
      classes:        row.get(4)?,
      registered_at:  row.get(5)?,
      status:         row.get(6)?,
      owner:          row.get(7)?,
    })
  }

  pub fn into_teacher(self) -> Result<Teacher> {
    Ok(Teacher {
      teacher_id:     decode_uuid(&self.teacher_id)?,
      full_name:      self.full_name,
      contact_number: self.contact_number,
      subjects:       decode_list(&self.subjects)?,
      classes:        decode_list(&self.classes)?,
      registered_at:  decode_dt(&self.registered_at)?,
      status:         decode_enum("approval status", &self.status)?,
      owner:          Identity::new(self.owner),
    })
  }
}

/// Raw strings read directly from an `exams` row.
pub struct RawExam {
  pub exam_id:    String,
  pub subject:    String,
  pub exam_date:  String,
  pub created_at: String,
}

impl RawExam {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      exam_id:    row.get(0)?,
      subject:    row.get(1)?,
      exam_date:  row.get(2)?,
      created_at: row.get(3)?,
    })
  }

  /// Assemble the exam with the marks whose `exam_id` matches.
  pub fn into_exam(self, marks: &[RawMark]) -> Result<Exam> {
    let marks = marks
      .iter()
      .filter(|m| m.exam_id == self.exam_id)
      .map(RawMark::to_mark)
      .collect::<Result<Vec<_>>>()?;
    Ok(Exam {
      exam_id: decode_uuid(&self.exam_id)?,
      subject: self.subject,
      exam_date: decode_date(&self.exam_date)?,
      created_at: decode_dt(&self.created_at)?,
      marks,
    })
  }
}

/// Raw values read directly from an `exam_marks` row.
pub struct RawMark {
  pub exam_id:    String,
  pub student_id: String,
  pub marks:      u32,
  pub grade:      String,
}

impl RawMark {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      exam_id:    row.get(0)?,
      student_id: row.get(1)?,
      marks:      row.get(2)?,
      grade:      row.get(3)?,
    })
  }

  fn to_mark(&self) -> Result<ExamMark> {
    Ok(ExamMark {
      student_id: decode_uuid(&self.student_id)?,
      marks:      self.marks,
      grade:      decode_enum::<Grade>("grade", &self.grade)?,
    })
  }
}
